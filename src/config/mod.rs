// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every option can be given as a command-line flag or through the
//! environment (`OCR_*`). `main` loads an optional `.env` file first.

use anyhow::{bail, Context, Result};
use clap::Parser;
use lingua::Language;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::vision::ocr::DetectorSettings;
use crate::vision::OcrModelConfig;

/// Default request body limit (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// textlens OCR server
#[derive(Parser, Debug, Clone)]
#[command(name = "textlens")]
#[command(version)]
#[command(about = "Upload an image, get its text lines and their languages", long_about = None)]
pub struct AppConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "OCR_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory holding the pretrained artifacts
    #[arg(long, env = "OCR_MODEL_DIR", default_value = "./models")]
    pub model_dir: PathBuf,

    /// Text-region detector (ONNX)
    #[arg(long, env = "OCR_DETECTOR_MODEL", default_value = "text_detector.onnx")]
    pub detector_model: PathBuf,

    /// Text-line recognizer (ONNX)
    #[arg(long, env = "OCR_RECOGNIZER_MODEL", default_value = "crnn_ocr_model.onnx")]
    pub recognizer_model: PathBuf,

    /// Recognizer vocabulary (JSON with an `idx_to_char` map)
    #[arg(long, env = "OCR_VOCABULARY", default_value = "vocabulary.json")]
    pub vocabulary: PathBuf,

    /// Minimum detector score for a text region
    #[arg(long, env = "OCR_CONFIDENCE_THRESHOLD", default_value_t = 0.25)]
    pub confidence_threshold: f32,

    /// IoU above which overlapping regions are suppressed
    #[arg(long, env = "OCR_IOU_THRESHOLD", default_value_t = 0.7)]
    pub iou_threshold: f32,

    /// Maximum number of regions per image
    #[arg(long, env = "OCR_MAX_DETECTIONS", default_value_t = 300)]
    pub max_detections: usize,

    /// ONNX Runtime intra-op threads per session
    #[arg(long, env = "OCR_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Lines shorter than this are labelled "TOO SHORT" instead of detected
    #[arg(long, env = "OCR_LANGUAGE_MIN_CHARS", default_value_t = 6)]
    pub language_min_chars: usize,

    /// Comma-separated ISO 639-1 codes to restrict language detection to
    #[arg(long, env = "OCR_LANGUAGES", value_delimiter = ',')]
    pub languages: Vec<String>,

    /// Maximum request body size in bytes
    #[arg(long, env = "OCR_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            model_dir: PathBuf::from("./models"),
            detector_model: PathBuf::from("text_detector.onnx"),
            recognizer_model: PathBuf::from("crnn_ocr_model.onnx"),
            vocabulary: PathBuf::from("vocabulary.json"),
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            intra_threads: 4,
            language_min_chars: 6,
            languages: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Resolve an artifact file name against the model directory.
    /// Absolute paths are returned unchanged.
    pub fn artifact_path(&self, name: &Path) -> PathBuf {
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.model_dir.join(name)
        }
    }

    /// Check value ranges that clap cannot express
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            bail!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            bail!(
                "IoU threshold must be within [0, 1], got {}",
                self.iou_threshold
            );
        }
        if self.max_detections == 0 {
            bail!("max detections must be at least 1");
        }
        if self.intra_threads == 0 {
            bail!("intra threads must be at least 1");
        }
        if self.max_upload_bytes == 0 {
            bail!("max upload bytes must be at least 1");
        }
        self.detection_languages()?;
        Ok(())
    }

    /// Parsed `languages` list (empty means every supported language).
    /// A restricted set needs at least two languages to choose between.
    pub fn detection_languages(&self) -> Result<Vec<Language>> {
        let languages = self
            .languages
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|code| {
                let code_lower = code.to_lowercase();
                Language::all()
                    .into_iter()
                    .find(|language| language.iso_code_639_1().to_string() == code_lower)
                    .with_context(|| format!("unknown ISO 639-1 language code '{}'", code))
            })
            .collect::<Result<Vec<_>>>()?;

        if languages.len() == 1 {
            bail!(
                "language restriction needs at least two languages, got {}",
                self.languages.join(",")
            );
        }
        Ok(languages)
    }

    /// Bind address; `host` may be an IP literal or a name such as `localhost`
    pub async fn socket_addr(&self) -> Result<SocketAddr> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))?
            .next()
            .with_context(|| format!("{} did not resolve to any address", self.host))
    }

    /// Artifact locations and detector settings for the model manager
    pub fn model_config(&self) -> OcrModelConfig {
        OcrModelConfig {
            detector_path: Some(self.artifact_path(&self.detector_model)),
            recognizer_path: Some(self.artifact_path(&self.recognizer_model)),
            vocabulary_path: Some(self.artifact_path(&self.vocabulary)),
            detector: DetectorSettings {
                confidence_threshold: self.confidence_threshold,
                iou_threshold: self.iou_threshold,
                max_detections: self.max_detections,
            },
            intra_threads: self.intra_threads,
        }
    }
}
