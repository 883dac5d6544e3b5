// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoints
//!
//! Provides the upload page (GET/POST /) and POST /v1/ocr.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{index_handler, ocr_handler, upload_handler};
pub use request::{read_image_upload, ImageUpload, IMAGE_FIELD};
pub use response::{ImageInfoResponse, OcrResponse};
