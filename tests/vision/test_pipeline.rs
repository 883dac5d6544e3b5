// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! OCR pipeline tests
//!
//! These tests drive the full prediction path (decode, detect, crop,
//! recognize, greedy decode, language labelling, thumbnail) with stub
//! models, plus detector output parsing on realistic tensors.

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lingua::Language;
use ndarray::{Array, Array2, Array4, IxDyn};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use textlens::vision::image_utils::decode_image_bytes;
use textlens::vision::ocr::detection::parse_detections;
use textlens::vision::ocr::preprocessing::LetterboxInfo;
use textlens::vision::ocr::{
    DetectorSettings, LineRecognizer, OcrPipeline, PredictionError, RegionDetector, TextBox,
    TextDetector, TextRecognizer, Vocabulary,
};
use textlens::vision::LanguageIdentifier;

const SPACE_INDEX: usize = 27;

/// Returns fixed boxes
struct StubDetector(Vec<TextBox>);

impl RegionDetector for StubDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<TextBox>> {
        Ok(self.0.clone())
    }
}

/// Returns a different one-hot sequence per call, cycling
struct SequenceRecognizer {
    lines: Vec<Vec<usize>>,
    calls: std::sync::Mutex<usize>,
}

impl LineRecognizer for SequenceRecognizer {
    fn recognize(&self, input: &Array4<f32>) -> Result<Array2<f32>> {
        assert_eq!(input.shape(), &[1, 1, 32, 128]);
        let mut calls = self.calls.lock().unwrap();
        let line = &self.lines[*calls % self.lines.len()];
        *calls += 1;

        // Time-major scores: blank, 26 letters, space
        let mut scores = Array2::zeros((line.len(), 28));
        for (t, &idx) in line.iter().enumerate() {
            scores[[t, idx]] = 5.0;
        }
        Ok(scores)
    }
}

fn alphabet() -> Arc<Vocabulary> {
    let symbols = ('a'..='z')
        .chain(std::iter::once(' '))
        .enumerate()
        .map(|(i, c)| (i + 1, c.to_string()));
    Arc::new(symbols.collect())
}

fn spell(text: &str) -> Vec<usize> {
    text.chars()
        .flat_map(|c| {
            let idx = if c == ' ' {
                SPACE_INDEX
            } else {
                (c as usize) - ('a' as usize) + 1
            };
            [idx, idx, 0]
        })
        .collect()
}

fn text_box(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> TextBox {
    TextBox {
        x1,
        y1,
        x2,
        y2,
        confidence,
        class_id: 0,
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn pipeline(boxes: Vec<TextBox>, lines: Vec<Vec<usize>>) -> OcrPipeline {
    OcrPipeline::new(
        Arc::new(StubDetector(boxes)),
        Arc::new(SequenceRecognizer {
            lines,
            calls: std::sync::Mutex::new(0),
        }),
        alphabet(),
        Arc::new(LanguageIdentifier::new(
            &[Language::English, Language::German, Language::French],
            6,
        )),
    )
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    /// Test 1: Each region becomes a record with its own text and language
    #[test]
    fn test_multiple_lines_with_languages() {
        let pipeline = pipeline(
            vec![
                text_box(0.0, 0.0, 200.0, 30.0, 0.95),
                text_box(0.0, 40.0, 200.0, 70.0, 0.90),
                text_box(0.0, 80.0, 100.0, 110.0, 0.85),
            ],
            vec![
                spell("the weather is nice today and the sun is shining"),
                spell("ich habe heute keine zeit fuer dich"),
                spell("hi"),
            ],
        );

        let records = pipeline.run(&png_bytes(240, 120)).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].text,
            "the weather is nice today and the sun is shining"
        );
        assert_eq!(records[0].language, "EN");
        assert_eq!(records[1].language, "DE");
        assert_eq!(records[2].text, "hi");
        assert_eq!(records[2].language, "TOO SHORT");
    }

    /// Test 2: Thumbnails are PNG crops of the region
    #[test]
    fn test_thumbnails_are_png_crops() {
        let pipeline = pipeline(
            vec![text_box(12.9, 8.2, 52.7, 24.0, 0.9)],
            vec![spell("abc")],
        );

        let records = pipeline.run(&png_bytes(64, 32)).unwrap();
        let png = STANDARD
            .decode(records[0].image_data.as_ref().unwrap())
            .unwrap();
        let (thumb, info) = decode_image_bytes(&png).unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!((thumb.width(), thumb.height()), (40, 16));
    }

    /// Test 3: JPEG uploads work the same as PNG
    #[test]
    fn test_jpeg_upload() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 40, Rgb([10, 10, 10])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();

        let pipeline = pipeline(vec![text_box(0.0, 0.0, 25.0, 20.0, 0.9)], vec![spell("ok")]);
        let (records, info) = pipeline.run_with_info(buffer.get_ref()).unwrap();
        assert_eq!(info.format, ImageFormat::Jpeg);
        assert_eq!(records[0].text, "ok");
    }

    /// Test 4: Boxes entirely outside the image are skipped
    #[test]
    fn test_box_outside_image_skipped() {
        let pipeline = pipeline(
            vec![text_box(500.0, 500.0, 600.0, 550.0, 0.9)],
            vec![spell("ghost")],
        );

        let records = pipeline.run(&png_bytes(64, 32)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "No text detected.");
    }

    /// Test 5: Garbage upload is an invalid image
    #[test]
    fn test_garbage_upload() {
        let pipeline = pipeline(Vec::new(), vec![spell("x")]);
        let err = pipeline.run(&[0x89, 0x50, 0x4E, 0x47, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, PredictionError::InvalidImage(_)));
    }

    /// Test 6: Raw detector tensor to boxes on the original image
    #[test]
    fn test_parse_detections_letterboxed() {
        // 1280x640 image: scale 0.5, content rows 160..480 of the 640 canvas
        let letterbox = LetterboxInfo::new(1280, 640, 640);
        assert_eq!(letterbox.offset_y, 160);

        // [1, 5, 8]: cx, cy, w, h, score; two overlapping boxes and one weak box
        let anchors: [[f32; 5]; 3] = [
            [320.0, 320.0, 100.0, 40.0, 0.9],
            [322.0, 320.0, 100.0, 40.0, 0.8],
            [100.0, 200.0, 50.0, 20.0, 0.1],
        ];
        let mut data = vec![0.0f32; 5 * 8];
        for (a, anchor) in anchors.iter().enumerate() {
            for (f, value) in anchor.iter().enumerate() {
                data[f * 8 + a] = *value;
            }
        }
        let output = Array::from_shape_vec(IxDyn(&[1, 5, 8]), data).unwrap();

        let boxes =
            parse_detections(output.view(), &DetectorSettings::default(), &letterbox).unwrap();
        assert_eq!(boxes.len(), 1);

        let best = &boxes[0];
        assert!((best.confidence - 0.9).abs() < 1e-6);
        // (270..370, 300..340) in canvas -> (540..740, 280..360) in the image
        assert!((best.x1 - 540.0).abs() < 1e-3);
        assert!((best.x2 - 740.0).abs() < 1e-3);
        assert!((best.y1 - 280.0).abs() < 1e-3);
        assert!((best.y2 - 360.0).abs() < 1e-3);
    }

    /// Test 7: Full pipeline on real models (requires downloaded models)
    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_real_models_end_to_end() {
        let dir = PathBuf::from("./models");
        let detector = TextDetector::new(
            dir.join("text_detector.onnx"),
            DetectorSettings::default(),
            2,
        )
        .await
        .expect("Failed to load detector");
        let recognizer = TextRecognizer::new(dir.join("crnn_ocr_model.onnx"), 2)
            .await
            .expect("Failed to load recognizer");
        let vocabulary =
            Vocabulary::load(dir.join("vocabulary.json")).expect("Failed to load vocabulary");

        let pipeline = OcrPipeline::new(
            Arc::new(detector),
            Arc::new(recognizer),
            Arc::new(vocabulary),
            Arc::new(LanguageIdentifier::default()),
        );

        let records = pipeline.run(&png_bytes(320, 240)).expect("OCR failed");
        assert!(!records.is_empty());
    }
}
