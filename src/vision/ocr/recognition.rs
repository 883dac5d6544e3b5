// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CRNN text-line recognition
//!
//! The recognizer reads one cropped text line (grayscale, 32x128) and
//! returns per-timestep class scores for CTC decoding.

use anyhow::{Context, Result};
use ndarray::{Array2, Array4, ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{REC_INPUT_HEIGHT, REC_INPUT_WIDTH};

/// Turns a preprocessed text line into a `[T, C]` score matrix
pub trait LineRecognizer: Send + Sync {
    /// Recognize a `[1, 1, 32, 128]` tensor from `preprocess_for_recognition`
    fn recognize(&self, input: &Array4<f32>) -> Result<Array2<f32>>;
}

/// ONNX CRNN recognizer
#[derive(Clone)]
pub struct TextRecognizer {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
}

impl std::fmt::Debug for TextRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRecognizer")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl TextRecognizer {
    /// Load the recognizer from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Text recognizer model not found: {}", model_path.display());
        }

        info!("Loading text recognizer from {}", model_path.display());

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
                format!(
                    "Failed to load text recognizer from {}",
                    model_path.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        if let Some(output) = session.outputs.first() {
            debug!("Recognizer output {}: {:?}", output.name, output.output_type);
        }

        info!("✅ Text recognizer loaded (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }
}

impl LineRecognizer for TextRecognizer {
    fn recognize(&self, input: &Array4<f32>) -> Result<Array2<f32>> {
        validate_input_shape(input)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Text recognizer session lock poisoned"))?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Recognition inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Recognition output shape: {:?}", output.shape());

        scores_to_matrix(output)
    }
}

fn validate_input_shape(input: &Array4<f32>) -> Result<()> {
    let expected = [
        1,
        1,
        REC_INPUT_HEIGHT as usize,
        REC_INPUT_WIDTH as usize,
    ];
    if input.shape() != expected {
        anyhow::bail!(
            "Invalid input shape: {:?}, expected {:?}",
            input.shape(),
            expected
        );
    }
    Ok(())
}

/// Normalize recognizer output to a `[T, C]` matrix
///
/// The CRNN export emits time-major `[T, 1, C]`; batch-first `[1, T, C]`
/// and an already squeezed `[T, C]` are accepted as well.
pub fn scores_to_matrix(output: ArrayViewD<f32>) -> Result<Array2<f32>> {
    let shape = output.shape().to_vec();
    let matrix = match shape.as_slice() {
        [_, 1, _] => output.index_axis_move(Axis(1), 0),
        [1, _, _] => output.index_axis_move(Axis(0), 0),
        [_, _] => output,
        _ => anyhow::bail!("Unexpected recognizer output shape: {:?}", shape),
    };

    let matrix = matrix
        .into_dimensionality::<Ix2>()
        .context("Recognizer output is not a score matrix")?;

    if matrix.shape()[1] == 0 {
        anyhow::bail!("Recognizer output has no classes");
    }

    Ok(matrix.to_owned())
}
