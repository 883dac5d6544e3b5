// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Best-effort language identification for recognized text lines

use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use std::fmt;
use tracing::debug;

/// Label for an empty line
pub const LABEL_UNKNOWN: &str = "UNKNOWN";
/// Label for a line too short to classify
pub const LABEL_TOO_SHORT: &str = "TOO SHORT";
/// Label when the detector gives no answer
pub const LABEL_NOT_AVAILABLE: &str = "N/A";

/// Default minimum line length (in characters) before detection runs
pub const DEFAULT_MIN_CHARS: usize = 6;

/// Labels text lines with an upper-cased ISO 639-1 code
pub struct LanguageIdentifier {
    detector: LanguageDetector,
    min_chars: usize,
}

impl fmt::Debug for LanguageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageIdentifier")
            .field("min_chars", &self.min_chars)
            .finish_non_exhaustive()
    }
}

impl Default for LanguageIdentifier {
    fn default() -> Self {
        Self::new(&[], DEFAULT_MIN_CHARS)
    }
}

impl LanguageIdentifier {
    /// Build the identifier
    ///
    /// An empty `languages` slice considers every language lingua supports.
    /// A single language cannot be distinguished from anything, so it is
    /// treated the same as no restriction.
    pub fn new(languages: &[Language], min_chars: usize) -> Self {
        let detector = if languages.len() >= 2 {
            LanguageDetectorBuilder::from_languages(languages).build()
        } else {
            LanguageDetectorBuilder::from_all_languages().build()
        };

        Self {
            detector,
            min_chars,
        }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Language label for one recognized line
    pub fn label(&self, text: &str) -> String {
        if text.is_empty() {
            return LABEL_UNKNOWN.to_string();
        }

        if text.chars().count() < self.min_chars {
            return LABEL_TOO_SHORT.to_string();
        }

        match self.detector.detect_language_of(text) {
            Some(language) => language.iso_code_639_1().to_string().to_uppercase(),
            None => {
                debug!("No language detected for {:?}", text);
                LABEL_NOT_AVAILABLE.to_string()
            }
        }
    }
}
