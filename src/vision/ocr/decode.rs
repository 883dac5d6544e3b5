// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Greedy (best path) CTC decoding

use ndarray::{ArrayView2, Axis};

use super::vocabulary::Vocabulary;

/// CTC blank class index
pub const BLANK_INDEX: usize = 0;

/// Symbol emitted for indices missing from the vocabulary
pub const UNKNOWN_SYMBOL: &str = "?";

/// Highest-scoring class at each timestep of a `[T, C]` score matrix
pub fn argmax_per_step(scores: ArrayView2<f32>) -> Vec<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|step| {
            step.iter()
                .enumerate()
                .fold((BLANK_INDEX, f32::NEG_INFINITY), |best, (idx, &score)| {
                    if score > best.1 {
                        (idx, score)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}

/// Collapse a best-path index sequence into text
///
/// A symbol is emitted when its index is not the blank and differs from
/// the previous timestep's index. The previous index is updated on every
/// step, blanks included, so a blank between two equal symbols keeps both.
pub fn ctc_greedy_decode(indices: &[usize], vocabulary: &Vocabulary) -> String {
    let mut text = String::new();
    let mut last: Option<usize> = None;

    for &idx in indices {
        if idx != BLANK_INDEX && Some(idx) != last {
            text.push_str(vocabulary.get(idx).unwrap_or(UNKNOWN_SYMBOL));
        }
        last = Some(idx);
    }

    text
}
