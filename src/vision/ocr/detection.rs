// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text-region detection
//!
//! Runs a YOLO-family detector exported to ONNX (Ultralytics layout) and
//! turns its raw output into text boxes in original image coordinates.

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_detection, LetterboxInfo};

/// Detector thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSettings {
    /// Minimum class score for a candidate box
    pub confidence_threshold: f32,
    /// Boxes overlapping a better box by more than this IoU are dropped
    pub iou_threshold: f32,
    /// Upper bound on boxes returned per image
    pub max_detections: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

/// A detected text region in original image pixels (corner format)
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Detection confidence score (0.0-1.0)
    pub confidence: f32,
    /// Best-scoring class (0 for single-class text detectors)
    pub class_id: usize,
}

impl TextBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over Union with another box
    pub fn iou(&self, other: &TextBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Integer crop rectangle `(x, y, width, height)`
    ///
    /// Coordinates are truncated toward zero. Returns `None` when the
    /// truncated box has no area.
    pub fn crop_rect(&self) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x1.max(0.0) as u32;
        let y1 = self.y1.max(0.0) as u32;
        let x2 = self.x2.max(0.0) as u32;
        let y2 = self.y2.max(0.0) as u32;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1, y1, x2 - x1, y2 - y1))
    }

    fn clip(&mut self, width: u32, height: u32) {
        let (w, h) = (width as f32, height as f32);
        self.x1 = self.x1.clamp(0.0, w);
        self.x2 = self.x2.clamp(0.0, w);
        self.y1 = self.y1.clamp(0.0, h);
        self.y2 = self.y2.clamp(0.0, h);
    }
}

/// Finds text regions in an image
///
/// The pipeline only depends on this trait so the request path can run
/// against any detector implementation.
pub trait RegionDetector: Send + Sync {
    /// Detect text regions, best first, in original image coordinates
    fn detect(&self, image: &RgbImage) -> Result<Vec<TextBox>>;
}

/// ONNX text detector
#[derive(Clone)]
pub struct TextDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    settings: DetectorSettings,
}

impl std::fmt::Debug for TextDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDetector")
            .field("input_name", &self.input_name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TextDetector {
    /// Load the text detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        settings: DetectorSettings,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Text detector model not found: {}", model_path.display());
        }

        info!("Loading text detector from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load text detector from {}", model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detector input {}: {:?}", input_name, input.input_type);
        }

        info!("✅ Text detector loaded (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            settings,
        })
    }

    pub fn settings(&self) -> DetectorSettings {
        self.settings
    }
}

impl RegionDetector for TextDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<TextBox>> {
        let (input, letterbox) = preprocess_for_detection(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Text detector session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output.shape());

        let boxes = parse_detections(output, &self.settings, &letterbox)?;
        debug!("Detected {} text regions", boxes.len());

        Ok(boxes)
    }
}

/// Decode raw detector output into boxes in original image coordinates
///
/// Accepts `[1, 4+C, N]` (Ultralytics export) or the transposed
/// `[1, N, 4+C]`; the smaller of the last two axes holds the features.
/// Each anchor carries `cx, cy, w, h` in letterboxed pixels followed by
/// one score per class.
pub fn parse_detections(
    output: ArrayViewD<f32>,
    settings: &DetectorSettings,
    letterbox: &LetterboxInfo,
) -> Result<Vec<TextBox>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected detector output shape: {:?}", shape);
    }

    let output = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .context("Detector output is not two-dimensional per batch")?;
    // Orient as [features, anchors]
    let output = if shape[1] <= shape[2] {
        output
    } else {
        output.reversed_axes()
    };

    let num_features = output.shape()[0];
    if num_features < 5 {
        anyhow::bail!(
            "Detector output has {} features per anchor, expected at least 5",
            num_features
        );
    }

    let mut candidates = Vec::new();
    for anchor in output.axis_iter(Axis(1)) {
        let (class_id, confidence) = anchor
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (idx, score)| {
                if score > best.1 {
                    (idx, score)
                } else {
                    best
                }
            });

        if confidence < settings.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        let (x1, y1) = letterbox.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.map_to_original(cx + w / 2.0, cy + h / 2.0);

        let mut text_box = TextBox {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        };
        text_box.clip(letterbox.original_width, letterbox.original_height);
        candidates.push(text_box);
    }

    debug!("Candidate regions before NMS: {}", candidates.len());

    let mut kept = non_max_suppression(candidates, settings.iou_threshold);
    kept.truncate(settings.max_detections);
    Ok(kept)
}

/// Class-agnostic non-maximum suppression
///
/// Output is sorted by descending confidence.
pub fn non_max_suppression(mut boxes: Vec<TextBox>, iou_threshold: f32) -> Vec<TextBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<TextBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if keep.iter().all(|kept| kept.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}
