// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Upload page tests for GET / and POST /
//!
//! These tests verify that:
//! - The empty page renders the upload form
//! - A form post with an image renders results and the original image
//! - A form post without an image renders the empty page, multipart or not
//! - Prediction errors render in the page with the mapped status

use super::support::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use textlens::api::create_app;
use tower::util::ServiceExt;

#[cfg(test)]
mod upload_page_tests {
    use super::*;

    /// Test 1: GET / returns the form
    #[tokio::test]
    async fn test_index_renders_form() {
        let app = create_app(ready_state(Vec::new(), Vec::new()));

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/html"));

        let html = body_string(response).await;
        assert!(html.contains(r#"id="ocr-form""#));
        assert!(html.contains(r#"name="image""#));
        assert!(!html.contains("<table>"));
    }

    /// Test 2: Posting an image renders records and the original upload
    #[tokio::test]
    async fn test_upload_renders_results() {
        let state = ready_state(vec![text_box(2.0, 2.0, 40.0, 18.0, 0.8)], spell("bagel"));
        let app = create_app(state);
        let image = png_bytes(64, 32);

        let response = app
            .oneshot(multipart_request("/", multipart_file("image", "menu.png", &image)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("bagel"));
        assert!(html.contains("TOO&#32;SHORT") || html.contains("TOO SHORT"));
        assert!(html.contains(r#"class="thumb""#));
        assert!(html.contains(&format!(
            "data:image/png;base64,{}",
            STANDARD.encode(&image)
        )));
    }

    /// Test 3: A form without a file renders the empty page
    #[tokio::test]
    async fn test_upload_without_file_renders_empty_page() {
        let app = create_app(ready_state(Vec::new(), Vec::new()));

        let response = app
            .oneshot(multipart_request("/", multipart_text("note", "nothing here")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains(r#"id="ocr-form""#));
        assert!(!html.contains("<table>"));
        assert!(!html.contains(r#"class="error""#));
    }

    /// Test 4: Missing models show the error in the page with 503
    #[tokio::test]
    async fn test_upload_models_not_loaded() {
        let app = create_app(empty_state());

        let response = app
            .oneshot(multipart_request(
                "/",
                multipart_file("image", "menu.png", &png_bytes(8, 8)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let html = body_string(response).await;
        assert!(html.contains(r#"class="error""#));
        assert!(html.contains("detector"));
        // The upload is still shown
        assert!(html.contains("Uploaded image"));
    }

    /// Test 5: Recognized text is HTML-escaped
    #[tokio::test]
    async fn test_upload_escapes_text() {
        let state = ready_state(vec![text_box(0.0, 0.0, 20.0, 10.0, 0.7)], Vec::new());
        let app = create_app(state);

        let response = app
            .oneshot(multipart_request(
                "/",
                multipart_file("image", "<b>.png", &png_bytes(30, 20)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        // Empty recognition result is labelled, not dropped
        assert!(html.contains("UNKNOWN"));
        assert!(!html.contains("<b>"));
    }

    /// Test 6: A POST that is not a multipart form renders the empty page
    #[tokio::test]
    async fn test_upload_non_multipart_renders_empty_page() {
        let app = create_app(ready_state(Vec::new(), Vec::new()));

        let urlencoded = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("a=b"))
            .unwrap();
        let bare = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        for request in [urlencoded, bare] {
            let response = app.clone().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let content_type = response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .to_string();
            assert!(content_type.starts_with("text/html"));
            let html = body_string(response).await;
            assert!(html.contains(r#"id="ocr-form""#));
            assert!(!html.contains(r#"class="error""#));
        }
    }
}
