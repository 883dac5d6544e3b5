// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR model manager: loads the pretrained artifacts once at startup

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::vision::language::LanguageIdentifier;
use crate::vision::ocr::{
    Component, DetectorSettings, LineRecognizer, OcrPipeline, PredictionError, RegionDetector,
    TextDetector, TextRecognizer, Vocabulary,
};

/// Configuration for loading the OCR artifacts
#[derive(Debug, Clone)]
pub struct OcrModelConfig {
    /// Path to the text detector ONNX file (optional)
    pub detector_path: Option<PathBuf>,
    /// Path to the line recognizer ONNX file (optional)
    pub recognizer_path: Option<PathBuf>,
    /// Path to the vocabulary JSON file (optional)
    pub vocabulary_path: Option<PathBuf>,
    /// Detector thresholds
    pub detector: DetectorSettings,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
}

impl Default for OcrModelConfig {
    fn default() -> Self {
        Self {
            detector_path: Some(PathBuf::from("./models/text_detector.onnx")),
            recognizer_path: Some(PathBuf::from("./models/crnn_ocr_model.onnx")),
            vocabulary_path: Some(PathBuf::from("./models/vocabulary.json")),
            detector: DetectorSettings::default(),
            intra_threads: 4,
        }
    }
}

/// Information about a loaded artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrModelInfo {
    /// Artifact name
    pub name: String,
    /// Artifact type (detector, recognizer, vocabulary)
    pub model_type: String,
    /// Whether the artifact is available
    pub available: bool,
}

/// Holds the detector, recognizer and vocabulary
///
/// Each artifact loads independently; a missing one is logged and leaves
/// its slot empty so the server still starts and reports the problem on
/// every prediction.
pub struct OcrModelManager {
    detector: Option<Arc<dyn RegionDetector>>,
    recognizer: Option<Arc<dyn LineRecognizer>>,
    vocabulary: Option<Arc<Vocabulary>>,
    language: Arc<LanguageIdentifier>,
}

impl OcrModelManager {
    /// Load every configured artifact
    pub async fn new(config: OcrModelConfig, language: Arc<LanguageIdentifier>) -> Self {
        let detector = if let Some(ref path) = config.detector_path {
            match TextDetector::new(path, config.detector, config.intra_threads).await {
                Ok(model) => {
                    tracing::info!("✅ Text detector loaded from {}", path.display());
                    Some(Arc::new(model) as Arc<dyn RegionDetector>)
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Failed to load text detector from {}: {:#}",
                        path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        let recognizer = if let Some(ref path) = config.recognizer_path {
            match TextRecognizer::new(path, config.intra_threads).await {
                Ok(model) => {
                    tracing::info!("✅ Text recognizer loaded from {}", path.display());
                    Some(Arc::new(model) as Arc<dyn LineRecognizer>)
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Failed to load text recognizer from {}: {:#}",
                        path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        let vocabulary = if let Some(ref path) = config.vocabulary_path {
            match Vocabulary::load(path) {
                Ok(vocabulary) => Some(Arc::new(vocabulary)),
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Failed to load vocabulary from {}: {:#}",
                        path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            detector,
            recognizer,
            vocabulary,
            language,
        }
    }

    /// Assemble a manager from already loaded parts
    pub fn from_parts(
        detector: Option<Arc<dyn RegionDetector>>,
        recognizer: Option<Arc<dyn LineRecognizer>>,
        vocabulary: Option<Arc<Vocabulary>>,
        language: Arc<LanguageIdentifier>,
    ) -> Self {
        Self {
            detector,
            recognizer,
            vocabulary,
            language,
        }
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn has_vocabulary(&self) -> bool {
        self.vocabulary.is_some()
    }

    /// True when every artifact is loaded
    pub fn is_ready(&self) -> bool {
        self.has_detector() && self.has_recognizer() && self.has_vocabulary()
    }

    /// Pipeline over the loaded artifacts
    ///
    /// Fails with the first missing artifact, checked in the order
    /// detector, recognizer, vocabulary.
    pub fn pipeline(&self) -> Result<OcrPipeline, PredictionError> {
        let detector = self
            .detector
            .clone()
            .ok_or(PredictionError::ModelNotLoaded(Component::Detector))?;
        let recognizer = self
            .recognizer
            .clone()
            .ok_or(PredictionError::ModelNotLoaded(Component::Recognizer))?;
        let vocabulary = self
            .vocabulary
            .clone()
            .ok_or(PredictionError::ModelNotLoaded(Component::Vocabulary))?;

        Ok(OcrPipeline::new(
            detector,
            recognizer,
            vocabulary,
            self.language.clone(),
        ))
    }

    /// List all artifacts and whether they loaded
    pub fn list_models(&self) -> Vec<OcrModelInfo> {
        vec![
            OcrModelInfo {
                name: "text-detector".to_string(),
                model_type: "detector".to_string(),
                available: self.has_detector(),
            },
            OcrModelInfo {
                name: "crnn-recognizer".to_string(),
                model_type: "recognizer".to_string(),
                available: self.has_recognizer(),
            },
            OcrModelInfo {
                name: "vocabulary".to_string(),
                model_type: "vocabulary".to_string(),
                available: self.has_vocabulary(),
            },
        ]
    }
}
