//! Profile-based attribution
//!
//! Instance-based classifiers treat every training document separately. A
//! profile-based method instead merges all of an author's documents into one
//! profile (the author's relative event frequencies) and attributes a
//! document to the author whose profile it is closest to.

use super::{
    argmax, check_ids, class_labels, cosine, labelled_rows, scores_by_label, stratified_folds,
    Analyzer, Evaluation, PredictionMap,
};
use crate::table::FeatureTable;
use crate::{Error, Result};

/// Author-profile analyzer with cosine scoring
#[derive(Debug, Clone, Default)]
pub struct AuthorProfileAnalyzer {
    labels: Vec<String>,
    profiles: Vec<Option<Vec<f64>>>,
}

impl AuthorProfileAnalyzer {
    /// Untrained analyzer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            labels: Vec::new(),
            profiles: Vec::new(),
        }
    }

    /// Labels seen by the last training call
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn train(&mut self, table: &FeatureTable) -> Result<()> {
        let labels = class_labels(table)?;
        let width = table.numeric_attribute_indices().len();
        let mut sums: Vec<Option<Vec<f64>>> = vec![None; labels.len()];
        for (row, class) in labelled_rows(table)? {
            let Some(slot) = sums.get_mut(class) else {
                continue;
            };
            let acc = slot.get_or_insert_with(|| vec![0.0; width]);
            for (s, v) in acc.iter_mut().zip(table.numeric_vector(row)) {
                *s += v.max(0.0);
            }
        }

        self.profiles = sums
            .into_iter()
            .map(|profile| {
                profile.map(|p| {
                    let total: f64 = p.iter().sum();
                    if total > 0.0 {
                        p.into_iter().map(|v| v / total).collect()
                    } else {
                        p
                    }
                })
            })
            .collect();
        self.labels = labels;
        Ok(())
    }

    fn scores(&self, table: &FeatureTable, row: usize) -> Result<Vec<f64>> {
        let x = table.numeric_vector(row);
        let scores = self
            .profiles
            .iter()
            .map(|profile| match profile {
                Some(p) => Ok((cosine(&x, p)? + 1.0) / 2.0),
                None => Ok(0.0),
            })
            .collect::<Result<Vec<f64>>>()?;

        let total: f64 = scores.iter().sum();
        if total > 0.0 {
            Ok(scores.into_iter().map(|s| s / total).collect())
        } else {
            Err(Error::Evaluation(format!(
                "No author profile is comparable with instance {row}"
            )))
        }
    }

    fn evaluate(&self, test: &FeatureTable) -> Result<Evaluation> {
        let mut eval = Evaluation::new(self.labels.clone());
        for row in 0..test.num_instances() {
            if let Some(actual) = test.class_value(row) {
                eval.record(actual, argmax(&self.scores(test, row)?));
            }
        }
        Ok(eval)
    }
}

impl Analyzer for AuthorProfileAnalyzer {
    fn name(&self) -> &str {
        "author-profile"
    }

    fn cross_validate(
        &mut self,
        table: &FeatureTable,
        folds: usize,
        seed: u64,
    ) -> Result<Evaluation> {
        let mut total = Evaluation::new(class_labels(table)?);
        for fold in stratified_folds(table, folds, seed)? {
            self.train(&table.select_rows(&fold.train))?;
            total.merge(&self.evaluate(&table.select_rows(&fold.test))?);
        }
        // Leave the analyzer trained on everything
        self.train(table)?;
        Ok(total)
    }

    fn classify(
        &mut self,
        train: &FeatureTable,
        test: &FeatureTable,
        ids: &[String],
    ) -> Result<PredictionMap> {
        check_ids(test, ids)?;
        self.train(train)?;
        ids.iter()
            .enumerate()
            .map(|(row, id)| {
                let scores = self.scores(test, row)?;
                Ok((id.clone(), scores_by_label(&self.labels, &scores)))
            })
            .collect()
    }

    fn train_test_eval(&mut self, train: &FeatureTable, test: &FeatureTable) -> Result<Evaluation> {
        self.train(train)?;
        self.evaluate(test)
    }
}
