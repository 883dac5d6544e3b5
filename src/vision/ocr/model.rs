// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end OCR prediction
//!
//! Detection, cropping, recognition, greedy decoding and language
//! labelling for one uploaded image.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use super::decode::{argmax_per_step, ctc_greedy_decode};
use super::detection::RegionDetector;
use super::preprocessing::{crop_region, preprocess_for_recognition};
use super::recognition::LineRecognizer;
use super::vocabulary::Vocabulary;
use crate::vision::image_utils::{
    decode_image_bytes_with_limit, encode_png_base64, ImageError, ImageInfo, MAX_IMAGE_SIZE,
};
use crate::vision::language::{LanguageIdentifier, LABEL_NOT_AVAILABLE};

/// Text of the placeholder record returned when nothing was recognized
pub const NO_TEXT_DETECTED: &str = "No text detected.";

/// Pretrained artifact required by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Detector,
    Recognizer,
    Vocabulary,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Detector => "Text detector",
            Component::Recognizer => "Text recognizer",
            Component::Vocabulary => "Vocabulary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("{0} is not loaded. Check server logs.")]
    ModelNotLoaded(Component),

    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageError),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Prediction task failed: {0}")]
    TaskFailed(String),
}

/// One recognized text line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub text: String,
    pub language: String,
    /// PNG thumbnail of the cropped region, base64
    pub image_data: Option<String>,
    /// Detector score for the region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl PredictionRecord {
    pub fn no_text_detected() -> Self {
        Self {
            text: NO_TEXT_DETECTED.to_string(),
            language: LABEL_NOT_AVAILABLE.to_string(),
            image_data: None,
            confidence: None,
        }
    }
}

/// Everything needed to run one prediction
///
/// Cheap to clone; the loaded artifacts are shared.
#[derive(Clone)]
pub struct OcrPipeline {
    detector: Arc<dyn RegionDetector>,
    recognizer: Arc<dyn LineRecognizer>,
    vocabulary: Arc<Vocabulary>,
    language: Arc<LanguageIdentifier>,
    /// Largest upload the decoder accepts
    max_image_bytes: usize,
}

impl fmt::Debug for OcrPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrPipeline")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("language", &self.language)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish_non_exhaustive()
    }
}

impl OcrPipeline {
    pub fn new(
        detector: Arc<dyn RegionDetector>,
        recognizer: Arc<dyn LineRecognizer>,
        vocabulary: Arc<Vocabulary>,
        language: Arc<LanguageIdentifier>,
    ) -> Self {
        Self {
            detector,
            recognizer,
            vocabulary,
            language,
            max_image_bytes: MAX_IMAGE_SIZE,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Run the prediction on raw upload bytes
    pub fn run(&self, bytes: &[u8]) -> Result<Vec<PredictionRecord>, PredictionError> {
        self.run_with_info(bytes).map(|(records, _)| records)
    }

    /// Like [`OcrPipeline::run`], also returning the decoded image metadata
    pub fn run_with_info(
        &self,
        bytes: &[u8],
    ) -> Result<(Vec<PredictionRecord>, ImageInfo), PredictionError> {
        let (image, image_info) = decode_image_bytes_with_limit(bytes, self.max_image_bytes)?;
        let records = self.run_image(&image)?;
        Ok((records, image_info))
    }

    /// Run the prediction on a decoded image
    ///
    /// Records follow detector order. Regions whose integer crop has no
    /// area are skipped. When no record is produced the result is a single
    /// "No text detected." placeholder.
    pub fn run_image(
        &self,
        image: &DynamicImage,
    ) -> Result<Vec<PredictionRecord>, PredictionError> {
        let start = Instant::now();
        let rgb = image.to_rgb8();

        let boxes = self
            .detector
            .detect(&rgb)
            .map_err(|e| PredictionError::Inference(format!("text detection: {:#}", e)))?;

        let mut records = Vec::with_capacity(boxes.len());
        for (i, text_box) in boxes.iter().enumerate() {
            let Some((x, y, width, height)) = text_box.crop_rect() else {
                debug!("Skipping degenerate region {}: {:?}", i, text_box);
                continue;
            };
            let Some(crop) = crop_region(&rgb, x, y, width, height) else {
                debug!("Skipping region {} outside the image: {:?}", i, text_box);
                continue;
            };

            let input = preprocess_for_recognition(&crop);
            let scores = self.recognizer.recognize(&input).map_err(|e| {
                PredictionError::Inference(format!("text recognition: {:#}", e))
            })?;

            let indices = argmax_per_step(scores.view());
            let text = ctc_greedy_decode(&indices, &self.vocabulary);
            let language = self.language.label(&text);
            let image_data = encode_png_base64(&crop)
                .map_err(|e| PredictionError::Inference(format!("thumbnail: {}", e)))?;

            debug!(
                "Region {} ({}x{} at {},{}) conf={:.3}: {:?} [{}]",
                i, width, height, x, y, text_box.confidence, text, language
            );

            records.push(PredictionRecord {
                text,
                language,
                image_data: Some(image_data),
                confidence: Some(text_box.confidence),
            });
        }

        info!(
            "OCR finished: {} regions detected, {} lines recognized in {}ms",
            boxes.len(),
            records.len(),
            start.elapsed().as_millis()
        );

        if records.is_empty() {
            records.push(PredictionRecord::no_text_detected());
        }

        Ok(records)
    }
}

/// Run the pipeline on the blocking thread pool
pub async fn predict_blocking(
    pipeline: OcrPipeline,
    bytes: Vec<u8>,
) -> Result<(Vec<PredictionRecord>, ImageInfo), PredictionError> {
    tokio::task::spawn_blocking(move || pipeline.run_with_info(&bytes))
        .await
        .map_err(|e| PredictionError::TaskFailed(e.to_string()))?
}
