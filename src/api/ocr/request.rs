// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR upload parsing

use axum::http::StatusCode;
use axum_extra::extract::multipart::MultipartError;
use axum_extra::extract::Multipart;
use bytes::Bytes;
use tracing::debug;

use crate::api::errors::ApiError;

/// Form field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

/// An uploaded image file
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-side file name, if sent
    pub file_name: Option<String>,
    /// Raw file bytes
    pub bytes: Bytes,
}

/// Read the first non-empty `image` field from a multipart form
///
/// Returns `Ok(None)` when the form carries no image. Other fields are
/// ignored.
pub async fn read_image_upload(mut multipart: Multipart) -> Result<Option<ImageUpload>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            debug!("Ignoring form field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            debug!("Ignoring empty image field {:?}", file_name);
            continue;
        }

        return Ok(Some(ImageUpload { file_name, bytes }));
    }

    Ok(None)
}

/// Missing-image error used by the JSON endpoint
pub fn image_required() -> ApiError {
    ApiError::ValidationError {
        field: IMAGE_FIELD.to_string(),
        message: "image is required".to_string(),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidRequest(err.body_text())
    }
}
