// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognizer vocabulary (class index -> symbol)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    idx_to_char: HashMap<String, String>,
}

/// Symbol table for greedy CTC decoding
///
/// Index 0 is the CTC blank and has no symbol.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    symbols: HashMap<usize, String>,
}

impl Vocabulary {
    /// Load a vocabulary JSON file of the form
    /// `{"idx_to_char": {"1": "a", "2": "b", ...}}`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Vocabulary not found: {}", path.display());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary: {}", path.display()))?;
        let vocabulary = Self::from_json_str(&raw)
            .with_context(|| format!("Failed to parse vocabulary: {}", path.display()))?;

        info!(
            "Loaded vocabulary with {} symbols from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    /// Parse the vocabulary JSON
    ///
    /// Keys that are not decimal indices are skipped with a warning; lookups
    /// for them simply miss. At least one usable entry is required.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: VocabularyFile =
            serde_json::from_str(raw).context("Vocabulary is not valid JSON")?;

        let mut symbols = HashMap::with_capacity(file.idx_to_char.len());
        for (key, symbol) in file.idx_to_char {
            match key.trim().parse::<usize>() {
                Ok(idx) => {
                    symbols.insert(idx, symbol);
                }
                Err(_) => warn!("Skipping vocabulary key '{}': not an index", key),
            }
        }

        if symbols.is_empty() {
            anyhow::bail!("Vocabulary has no symbols");
        }

        Ok(Self { symbols })
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.symbols.get(&idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl FromIterator<(usize, String)> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = (usize, String)>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}
