//! Stratified k-fold splitting

use crate::table::FeatureTable;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// One train/test split of a table's rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Rows to train on
    pub train: Vec<usize>,
    /// Rows to evaluate
    pub test: Vec<usize>,
}

/// Split the labelled rows of `table` into `k` stratified folds
///
/// Rows without a class value are left out. Rows of each class are shuffled
/// with `seed` and dealt round-robin, continuing across classes so fold sizes
/// differ by at most one.
///
/// # Errors
/// Returns error if `k < 2` or `k` exceeds the number of labelled rows
pub fn stratified_folds(table: &FeatureTable, k: usize, seed: u64) -> Result<Vec<Fold>> {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for row in 0..table.num_instances() {
        if let Some(class) = table.class_value(row) {
            by_class.entry(class).or_default().push(row);
        }
    }
    let labelled: usize = by_class.values().map(Vec::len).sum();

    if k < 2 {
        return Err(Error::Evaluation(format!(
            "Cross-validation needs at least 2 folds, got {k}"
        )));
    }
    if k > labelled {
        return Err(Error::Evaluation(format!(
            "Cannot split {labelled} labelled instances into {k} folds"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut next = 0;
    for rows in by_class.values_mut() {
        rows.shuffle(&mut rng);
        for &row in rows.iter() {
            buckets[next % k].push(row);
            next += 1;
        }
    }

    Ok((0..k)
        .map(|i| {
            let mut test = buckets[i].clone();
            test.sort_unstable();
            let mut train: Vec<usize> = buckets
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .flat_map(|(_, b)| b.iter().copied())
                .collect();
            train.sort_unstable();
            Fold { train, test }
        })
        .collect())
}
