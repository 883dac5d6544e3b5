// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-stage OCR: text-region detection followed by line recognition
//!
//! Components:
//! - `detection` - YOLO text-region detector and NMS
//! - `recognition` - CRNN line recognizer
//! - `preprocessing` - Letterbox and recognizer input transforms
//! - `vocabulary` / `decode` - Greedy CTC decoding
//! - `model` - Combined OCR pipeline

pub mod decode;
pub mod detection;
pub mod model;
pub mod preprocessing;
pub mod recognition;
pub mod vocabulary;

pub use decode::{argmax_per_step, ctc_greedy_decode};
pub use detection::{DetectorSettings, RegionDetector, TextBox, TextDetector};
pub use model::{
    predict_blocking, Component, OcrPipeline, PredictionError, PredictionRecord, NO_TEXT_DETECTED,
};
pub use recognition::{LineRecognizer, TextRecognizer};
pub use vocabulary::Vocabulary;
