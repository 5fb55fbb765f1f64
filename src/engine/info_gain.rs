//! Information gain ranking
//!
//! Gain of attribute `A` is `H(C) - H(C | A)`, with `A` discretized into
//! [`DISCRETIZATION_BINS`] equal-width bins over its observed range.
//! Rows without a class value do not contribute.

use crate::table::FeatureTable;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Number of equal-width bins used to discretize numeric attributes
pub const DISCRETIZATION_BINS: usize = 10;

/// Gains below this are reported as exactly zero
const GAIN_EPSILON: f64 = 1e-12;

/// Usefulness score of one attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfoGainEntry {
    /// Information gain in bits
    pub gain: f64,
    /// Attribute index in the training table
    pub attribute: usize,
}

/// Attributes ordered by descending information gain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoGainTable {
    entries: Vec<InfoGainEntry>,
}

impl InfoGainTable {
    /// Build a ranking; entries are sorted by gain (descending), ties by index
    #[must_use]
    pub fn new(mut entries: Vec<InfoGainEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.gain
                .partial_cmp(&a.gain)
                .unwrap_or(Ordering::Equal)
                .then(a.attribute.cmp(&b.attribute))
        });
        Self { entries }
    }

    /// Ranked entries
    #[must_use]
    pub fn entries(&self) -> &[InfoGainEntry] {
        &self.entries
    }

    /// Number of ranked attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was ranked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attribute indices of the `n` best entries
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<usize> {
        self.entries.iter().take(n).map(|e| e.attribute).collect()
    }

    /// Keep entries whose attribute survives in `mapping` (old index → new
    /// index), rewriting their indices
    #[must_use]
    pub fn reindex(&self, mapping: impl Fn(usize) -> Option<usize>) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter_map(|e| {
                    mapping(e.attribute).map(|attribute| InfoGainEntry {
                        gain: e.gain,
                        attribute,
                    })
                })
                .collect(),
        }
    }
}

fn entropy(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

/// Rank the numeric attributes of `table` against its class attribute
///
/// # Errors
/// Returns error if the table has no class attribute
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn compute_info_gain(table: &FeatureTable) -> Result<InfoGainTable> {
    let labels = table
        .class_labels()
        .ok_or_else(|| Error::InvalidInput("info gain requires a class attribute".to_string()))?;
    let num_classes = labels.len();

    let labelled: Vec<(usize, usize)> = (0..table.num_instances())
        .filter_map(|row| table.class_value(row).map(|c| (row, c)))
        .filter(|&(_, c)| c < num_classes)
        .collect();

    let mut class_counts = vec![0.0; num_classes];
    for &(_, c) in &labelled {
        class_counts[c] += 1.0;
    }
    let class_entropy = entropy(&class_counts);
    let total = labelled.len() as f64;

    let entries = table
        .numeric_attribute_indices()
        .into_iter()
        .map(|attribute| {
            let values: Vec<f64> = labelled
                .iter()
                .map(|&(row, _)| table.value(row, attribute))
                .collect();
            let (min, max) = values
                .iter()
                .filter(|v| !v.is_nan())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            if !(max > min) {
                return InfoGainEntry { gain: 0.0, attribute };
            }

            // One extra bin for missing values
            let width = (max - min) / DISCRETIZATION_BINS as f64;
            let mut joint = vec![vec![0.0; num_classes]; DISCRETIZATION_BINS + 1];
            for (&(_, class), &v) in labelled.iter().zip(&values) {
                let bin = if v.is_nan() {
                    DISCRETIZATION_BINS
                } else {
                    (((v - min) / width) as usize).min(DISCRETIZATION_BINS - 1)
                };
                joint[bin][class] += 1.0;
            }
            let conditional: f64 = joint
                .iter()
                .map(|counts| counts.iter().sum::<f64>() / total * entropy(counts))
                .sum();

            let gain = class_entropy - conditional;
            InfoGainEntry {
                gain: if gain < GAIN_EPSILON { 0.0 } else { gain },
                attribute,
            }
        })
        .collect();

    Ok(InfoGainTable::new(entries))
}
