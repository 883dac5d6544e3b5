// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoint handlers

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use axum_extra::extract::multipart::MultipartRejection;
use axum_extra::extract::Multipart;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::{image_required, read_image_upload};
use super::response::{ImageInfoResponse, OcrResponse};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::page::{render_page, OriginalImage, PageView};
use crate::vision::image_utils::{encode_base64, ImageInfo};
use crate::vision::ocr::{predict_blocking, PredictionRecord};

/// Check the models, then run the pipeline off the async executor
///
/// The decoder accepts uploads up to the server's body limit.
async fn run_prediction(
    state: &AppState,
    bytes: Vec<u8>,
) -> Result<(Vec<PredictionRecord>, ImageInfo), ApiError> {
    let pipeline = state
        .models
        .pipeline()?
        .with_max_image_bytes(state.max_upload_bytes);
    let outcome = predict_blocking(pipeline, bytes).await?;
    Ok(outcome)
}

/// GET / - The upload page
pub async fn index_handler() -> Html<String> {
    Html(render_page(&PageView::default()))
}

/// POST / - Upload an image from the page and render the results
///
/// A POST without an image (including one that is not a multipart form at
/// all) renders the empty page. Prediction errors are shown in the page with
/// the matching status code.
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Upload form is not multipart: {}", rejection);
            return Html(render_page(&PageView::default())).into_response();
        }
    };

    let upload = match read_image_upload(multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            debug!("Upload form submitted without an image");
            return Html(render_page(&PageView::default())).into_response();
        }
        Err(e) => {
            warn!("Upload rejected: {}", e);
            return error_page(e, None);
        }
    };

    debug!(
        "Image uploaded: {:?}, {} bytes",
        upload.file_name,
        upload.bytes.len()
    );

    let original_image = OriginalImage::from_bytes(&upload.bytes);

    match run_prediction(&state, upload.bytes.to_vec()).await {
        Ok((results, _)) => Html(render_page(&PageView {
            results,
            original_image: Some(original_image),
            error: None,
        }))
        .into_response(),
        Err(e) => {
            warn!("OCR failed: {}", e);
            error_page(e, Some(original_image))
        }
    }
}

fn error_page(error: ApiError, original_image: Option<OriginalImage>) -> Response {
    let view = PageView {
        results: Vec::new(),
        original_image,
        error: Some(error.message().to_string()),
    };
    (error.status(), Html(render_page(&view))).into_response()
}

/// POST /v1/ocr - Extract text from an uploaded image
///
/// # Request
/// Multipart form with an `image` file field.
///
/// # Response
/// - `results`: One record per recognized line (`text`, `language`, `image_data`, `confidence`)
/// - `originalImage`: The uploaded image, base64
/// - `imageInfo`: Width, height, format and size of the upload
/// - `processingTimeMs`: Processing time in milliseconds
///
/// # Errors
/// - 400 Bad Request: Missing or undecodable image
/// - 413 Payload Too Large: Upload exceeds the body limit
/// - 503 Service Unavailable: A model artifact is not loaded
/// - 500 Internal Server Error: Inference failed
pub async fn ocr_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<OcrResponse>, ApiError> {
    let start = Instant::now();

    let upload = read_image_upload(multipart)
        .await?
        .ok_or_else(image_required)?;

    let original_image = encode_base64(&upload.bytes);
    let (results, image_info) = run_prediction(&state, upload.bytes.to_vec())
        .await
        .map_err(|e| {
            warn!("OCR failed: {}", e);
            e
        })?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    info!(
        "OCR complete: {}x{} image, {} records, {}ms",
        image_info.width,
        image_info.height,
        results.len(),
        processing_time_ms
    );

    Ok(Json(OcrResponse {
        results,
        original_image,
        image_info: ImageInfoResponse::from(&image_info),
        processing_time_ms,
    }))
}
