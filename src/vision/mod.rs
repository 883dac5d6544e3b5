// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image analysis for the OCR server
//!
//! This module provides:
//! - Text-region detection and line recognition (ONNX, CPU only)
//! - Language identification for recognized lines
//! - Image decoding and thumbnail encoding

pub mod image_utils;
pub mod language;
pub mod model_manager;
pub mod ocr;

pub use image_utils::{
    decode_image_bytes, decode_image_bytes_with_limit, detect_format, ImageError, ImageInfo,
    MAX_IMAGE_SIZE,
};
pub use language::LanguageIdentifier;
pub use model_manager::{OcrModelConfig, OcrModelInfo, OcrModelManager};
