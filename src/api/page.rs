// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server-rendered upload page

use std::fmt::Write;

use crate::vision::image_utils::{detect_format, encode_base64, format_to_mime};
use crate::vision::ocr::PredictionRecord;

/// The uploaded image, embedded as a data URI
#[derive(Debug, Clone, PartialEq)]
pub struct OriginalImage {
    pub mime: &'static str,
    pub base64: String,
}

impl OriginalImage {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mime = detect_format(bytes)
            .map(format_to_mime)
            .unwrap_or("image/png");
        Self {
            mime,
            base64: encode_base64(bytes),
        }
    }

    fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

/// What the page shows besides the upload form
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub results: Vec<PredictionRecord>,
    pub original_image: Option<OriginalImage>,
    pub error: Option<String>,
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>textlens</title>
<style>
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #1f2937; }
#upload-area { border: 2px dashed #9ca3af; border-radius: 8px; padding: 2rem; text-align: center; cursor: pointer; }
#upload-area.dragover { border-color: #1d4ed8; background: #eff6ff; }
#file-upload { display: none; }
.text-gray-600 { color: #4b5563; }
.text-blue-700 { color: #1d4ed8; }
#loader { display: none; justify-content: center; padding: 1rem; }
.error { background: #fee2e2; color: #991b1b; padding: 0.75rem 1rem; border-radius: 6px; }
table { width: 100%; border-collapse: collapse; margin-top: 1rem; }
th, td { border-bottom: 1px solid #e5e7eb; padding: 0.5rem; text-align: left; vertical-align: middle; }
td.lang { font-family: monospace; white-space: nowrap; }
img.thumb { max-height: 48px; }
img.original { max-width: 100%; margin-top: 1rem; }
</style>
</head>
<body>
<h1>textlens</h1>
<form id="ocr-form" method="post" action="/" enctype="multipart/form-data">
<div id="upload-area">
<input id="file-upload" type="file" name="image" accept="image/*">
<p>Drop an image here or click to choose one</p>
<span id="file-name" class="text-gray-600">No file chosen</span>
</div>
<p><button type="submit">Extract text</button></p>
</form>
<div id="loader">Processing&hellip;</div>
"#;

const PAGE_TAIL: &str = r#"<script src="/static/script.js"></script>
</body>
</html>
"#;

/// Render the page; all recognized text is HTML-escaped
pub fn render_page(view: &PageView) -> String {
    let mut html = String::from(PAGE_HEAD);

    if let Some(error) = &view.error {
        let _ = writeln!(
            html,
            r#"<p class="error">{}</p>"#,
            ammonia::clean_text(error)
        );
    }

    if !view.results.is_empty() {
        html.push_str("<h2>Results</h2>\n<table>\n<thead><tr><th>Region</th><th>Text</th><th>Language</th></tr></thead>\n<tbody>\n");
        for record in &view.results {
            html.push_str("<tr><td>");
            if let Some(data) = &record.image_data {
                let _ = write!(
                    html,
                    r#"<img class="thumb" alt="text region" src="data:image/png;base64,{}">"#,
                    data
                );
            }
            let _ = writeln!(
                html,
                r#"</td><td>{}</td><td class="lang">{}</td></tr>"#,
                ammonia::clean_text(&record.text),
                ammonia::clean_text(&record.language)
            );
        }
        html.push_str("</tbody>\n</table>\n");
    }

    if let Some(original) = &view.original_image {
        let _ = writeln!(
            html,
            r#"<h2>Uploaded image</h2>
<img class="original" alt="uploaded image" src="{}">"#,
            original.data_uri()
        );
    }

    html.push_str(PAGE_TAIL);
    html
}
