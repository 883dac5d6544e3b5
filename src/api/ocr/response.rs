// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR response types

use serde::{Deserialize, Serialize};

use crate::vision::image_utils::{format_to_extension, ImageInfo};
use crate::vision::ocr::PredictionRecord;

/// Metadata of the uploaded image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfoResponse {
    pub width: u32,
    pub height: u32,
    /// Format extension (png, jpg, ...)
    pub format: String,
    pub size_bytes: usize,
}

impl From<&ImageInfo> for ImageInfoResponse {
    fn from(info: &ImageInfo) -> Self {
        Self {
            width: info.width,
            height: info.height,
            format: format_to_extension(info.format).to_string(),
            size_bytes: info.size_bytes,
        }
    }
}

/// Response from OCR processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    /// One record per recognized line, in detector order
    pub results: Vec<PredictionRecord>,
    /// The uploaded image, base64
    pub original_image: String,
    pub image_info: ImageInfoResponse,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}
