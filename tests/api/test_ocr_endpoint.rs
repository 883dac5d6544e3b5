// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! OCR endpoint tests for POST /v1/ocr
//!
//! These tests verify that the ocr_handler correctly:
//! - Runs the pipeline on a multipart upload
//! - Returns records, the original image and image metadata
//! - Maps missing models, bad images and oversized bodies to status codes
//! - Honours a configured upload limit above the decoder default

use super::support::*;
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use textlens::vision::MAX_IMAGE_SIZE;
use std::sync::Arc;
use textlens::api::{create_app, AppState};
use tower::util::ServiceExt;

#[cfg(test)]
mod ocr_endpoint_tests {
    use super::*;

    /// Test 1: Successful upload returns one record per region
    #[tokio::test]
    async fn test_ocr_returns_records() {
        let state = ready_state(
            vec![
                text_box(4.0, 4.0, 60.0, 20.0, 0.91),
                text_box(4.0, 30.0, 90.0, 50.0, 0.42),
            ],
            spell("hello"),
        );
        let app = create_app(state);
        let image = png_bytes(100, 60);

        let response = app
            .oneshot(multipart_request(
                "/v1/ocr",
                multipart_file("image", "sign.png", &image),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;

        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["text"], "hello");
        assert_eq!(results[0]["language"], "TOO SHORT");
        assert!(results[0]["image_data"].is_string());
        assert!((results[0]["confidence"].as_f64().unwrap() - 0.91).abs() < 1e-6);

        assert_eq!(json["originalImage"], STANDARD.encode(&image));
        assert_eq!(json["imageInfo"]["width"], 100);
        assert_eq!(json["imageInfo"]["height"], 60);
        assert_eq!(json["imageInfo"]["format"], "png");
        assert_eq!(json["imageInfo"]["sizeBytes"], image.len());
        assert!(json["processingTimeMs"].is_u64());
    }

    /// Test 2: No detected regions yields the placeholder record
    #[tokio::test]
    async fn test_ocr_no_text_detected() {
        let app = create_app(ready_state(Vec::new(), spell("abc")));

        let response = app
            .oneshot(multipart_request(
                "/v1/ocr",
                multipart_file("image", "blank.png", &png_bytes(32, 32)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["text"], "No text detected.");
        assert_eq!(results[0]["language"], "N/A");
        assert!(results[0]["image_data"].is_null());
    }

    /// Test 3: Missing image field is a validation error
    #[tokio::test]
    async fn test_ocr_missing_image() {
        let app = create_app(ready_state(Vec::new(), Vec::new()));

        let response = app
            .oneshot(multipart_request("/v1/ocr", multipart_text("note", "hi")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error_type"], "validation_error");
        assert_eq!(json["message"], "image is required");
        assert_eq!(json["details"]["field"], "image");
    }

    /// Test 4: Empty image field counts as missing
    #[tokio::test]
    async fn test_ocr_empty_image_field() {
        let app = create_app(ready_state(Vec::new(), Vec::new()));

        let response = app
            .oneshot(multipart_request(
                "/v1/ocr",
                multipart_file("image", "empty.png", &[]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Test 5: Undecodable upload returns 400
    #[tokio::test]
    async fn test_ocr_invalid_image() {
        let app = create_app(ready_state(Vec::new(), Vec::new()));

        let response = app
            .oneshot(multipart_request(
                "/v1/ocr",
                multipart_file("image", "notes.txt", b"this is not an image"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid image"));
    }

    /// Test 6: Missing models return 503 naming the detector first
    #[tokio::test]
    async fn test_ocr_models_not_loaded() {
        let app = create_app(empty_state());

        let response = app
            .oneshot(multipart_request(
                "/v1/ocr",
                multipart_file("image", "sign.png", &png_bytes(10, 10)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error_type"], "service_unavailable");
        assert_eq!(
            json["message"],
            "Text detector is not loaded. Check server logs."
        );
    }

    /// Test 7: Bodies over the configured limit return 413
    #[tokio::test]
    async fn test_ocr_payload_too_large() {
        let state = ready_state(Vec::new(), Vec::new());
        let state = Arc::new(
            AppState::new(state.models.clone()).with_max_upload_bytes(1024),
        );
        let app = create_app(state);

        let response = app
            .oneshot(multipart_request(
                "/v1/ocr",
                multipart_file("image", "big.bin", &vec![0x89u8; 8 * 1024]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    /// Test 8: A configured limit above the decoder default accepts larger images
    #[tokio::test]
    async fn test_ocr_configured_limit_above_default() {
        let state = ready_state(vec![text_box(0.0, 0.0, 40.0, 20.0, 0.8)], spell("big"));
        let state = Arc::new(
            AppState::new(state.models.clone()).with_max_upload_bytes(32 * 1024 * 1024),
        );
        let app = create_app(state);

        // Uncompressed BMP: 1900 * 3 * 2000 bytes of pixel data
        let image = bmp_bytes(1900, 2000);
        assert!(image.len() > MAX_IMAGE_SIZE);

        let response = app
            .oneshot(multipart_request(
                "/v1/ocr",
                multipart_file("image", "scan.bmp", &image),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["results"][0]["text"], "big");
        assert_eq!(json["imageInfo"]["format"], "bmp");
        assert_eq!(json["imageInfo"]["sizeBytes"], image.len());
    }
}
