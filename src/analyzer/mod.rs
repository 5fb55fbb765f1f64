//! Classification capability
//!
//! Two kinds of classifier plug into an experiment:
//!
//! - **Library classifiers** implement [`Classifier`]: they learn from a
//!   table and produce a class distribution for one row. The experiment wraps
//!   them in a [`ClassifierAnalyzer`], which supplies the evaluation
//!   protocols (stratified k-fold cross-validation, prediction, train/test
//!   evaluation) on top.
//! - **Specialized analyzers** implement [`Analyzer`] directly and own their
//!   protocols (see [`AuthorProfileAnalyzer`]).
//!
//! [`ClassifierRegistry`] maps stable identifiers to factories for either
//! kind.

mod classifiers;
mod evaluation;
mod folds;
mod profile;
mod registry;
mod similarity;

pub use classifiers::{NaiveBayes, NearestCentroid, ZeroR};
pub use evaluation::Evaluation;
pub use folds::{stratified_folds, Fold};
pub use profile::AuthorProfileAnalyzer;
pub use registry::{ClassifierFactory, ClassifierRegistry, ResolvedClassifier};
pub use similarity::cosine;

use crate::corpus::UNKNOWN_AUTHOR;
use crate::table::FeatureTable;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Per-document author scores: document id → (author label → probability)
pub type PredictionMap = BTreeMap<String, BTreeMap<String, f64>>;

/// A trainable classifier producing class distributions
pub trait Classifier: Send + Sync {
    /// Short identifier
    fn name(&self) -> &str;

    /// Learn from the labelled rows of `table`
    ///
    /// # Errors
    /// Fails if the table has no class attribute or no labelled rows
    fn fit(&mut self, table: &FeatureTable) -> Result<()>;

    /// Class distribution for `row` of `table`, aligned with the training
    /// class labels and summing to 1
    ///
    /// # Errors
    /// Fails if the classifier has not been fitted
    fn distribution(&self, table: &FeatureTable, row: usize) -> Result<Vec<f64>>;

    /// Untrained copy with the same settings
    fn fresh(&self) -> Box<dyn Classifier>;
}

/// The evaluation protocols an experiment dispatches to
pub trait Analyzer: Send {
    /// Short identifier
    fn name(&self) -> &str;

    /// k-fold cross-validation over `table`
    ///
    /// # Errors
    /// Fails if `folds` is out of range or training fails
    fn cross_validate(&mut self, table: &FeatureTable, folds: usize, seed: u64)
        -> Result<Evaluation>;

    /// Train on `train` and score every row of `test`, keyed by `ids`
    ///
    /// # Errors
    /// Fails if training fails or `ids` does not match the test rows
    fn classify(
        &mut self,
        train: &FeatureTable,
        test: &FeatureTable,
        ids: &[String],
    ) -> Result<PredictionMap>;

    /// Train on `train` and evaluate against the known classes of `test`
    ///
    /// # Errors
    /// Fails if training fails
    fn train_test_eval(&mut self, train: &FeatureTable, test: &FeatureTable) -> Result<Evaluation>;

    /// Wrapped library classifier, if any
    fn classifier(&self) -> Option<&dyn Classifier> {
        None
    }
}

pub(crate) fn class_labels(table: &FeatureTable) -> Result<Vec<String>> {
    table
        .class_labels()
        .map(<[String]>::to_vec)
        .ok_or_else(|| Error::Evaluation(format!("Table '{}' has no class attribute", table.relation())))
}

/// `(row, class)` of every labelled row
pub(crate) fn labelled_rows(table: &FeatureTable) -> Result<Vec<(usize, usize)>> {
    let rows: Vec<(usize, usize)> = (0..table.num_instances())
        .filter_map(|row| table.class_value(row).map(|c| (row, c)))
        .collect();
    if rows.is_empty() {
        return Err(Error::Evaluation(format!(
            "Table '{}' has no labelled instances to train on",
            table.relation()
        )));
    }
    Ok(rows)
}

/// Document ids must match the test rows one to one
pub(crate) fn check_ids(test: &FeatureTable, ids: &[String]) -> Result<()> {
    if ids.len() != test.num_instances() {
        return Err(Error::Evaluation(format!(
            "{} document ids for {} test instances",
            ids.len(),
            test.num_instances()
        )));
    }
    let mut seen = BTreeSet::new();
    if let Some(id) = ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(Error::Evaluation(format!("duplicate test document id '{id}'")));
    }
    Ok(())
}

pub(crate) fn argmax(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_score), (i, &s)| {
            if s > best_score {
                (i, s)
            } else {
                (best, best_score)
            }
        })
        .0
}

/// Label → score map for one document, without the sentinel label
pub(crate) fn scores_by_label(labels: &[String], scores: &[f64]) -> BTreeMap<String, f64> {
    labels
        .iter()
        .zip(scores)
        .filter(|(label, _)| label.as_str() != UNKNOWN_AUTHOR)
        .map(|(label, &score)| (label.clone(), score))
        .collect()
}

/// Runs the standard protocols around a [`Classifier`]
pub struct ClassifierAnalyzer {
    classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for ClassifierAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierAnalyzer")
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl ClassifierAnalyzer {
    /// Wrap `classifier`
    #[must_use]
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self { classifier }
    }

    fn evaluate(model: &dyn Classifier, labels: Vec<String>, test: &FeatureTable) -> Result<Evaluation> {
        let mut eval = Evaluation::new(labels);
        for row in 0..test.num_instances() {
            if let Some(actual) = test.class_value(row) {
                let predicted = argmax(&model.distribution(test, row)?);
                eval.record(actual, predicted);
            }
        }
        Ok(eval)
    }
}

impl Analyzer for ClassifierAnalyzer {
    fn name(&self) -> &str {
        self.classifier.name()
    }

    fn cross_validate(
        &mut self,
        table: &FeatureTable,
        folds: usize,
        seed: u64,
    ) -> Result<Evaluation> {
        let labels = class_labels(table)?;
        let mut total = Evaluation::new(labels.clone());
        for (i, fold) in stratified_folds(table, folds, seed)?.into_iter().enumerate() {
            let mut model = self.classifier.fresh();
            model.fit(&table.select_rows(&fold.train))?;
            let eval = Self::evaluate(model.as_ref(), labels.clone(), &table.select_rows(&fold.test))?;
            tracing::debug!(fold = i, correct = eval.correct(), "Evaluated fold");
            total.merge(&eval);
        }
        Ok(total)
    }

    fn classify(
        &mut self,
        train: &FeatureTable,
        test: &FeatureTable,
        ids: &[String],
    ) -> Result<PredictionMap> {
        check_ids(test, ids)?;
        let labels = class_labels(train)?;
        self.classifier.fit(train)?;
        ids.iter()
            .enumerate()
            .map(|(row, id)| {
                let dist = self.classifier.distribution(test, row)?;
                Ok((id.clone(), scores_by_label(&labels, &dist)))
            })
            .collect()
    }

    fn train_test_eval(&mut self, train: &FeatureTable, test: &FeatureTable) -> Result<Evaluation> {
        let labels = class_labels(train)?;
        self.classifier.fit(train)?;
        Self::evaluate(self.classifier.as_ref(), labels, test)
    }

    fn classifier(&self) -> Option<&dyn Classifier> {
        Some(self.classifier.as_ref())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::table::{Attribute, Row};

    /// Two well separated authors over two word counts
    pub(crate) fn separable_table(test_classes: Option<&[f64]>) -> (FeatureTable, FeatureTable) {
        let attrs = vec![
            Attribute::numeric("Words{x}"),
            Attribute::numeric("Words{y}"),
            Attribute::nominal("author", vec!["alice".into(), "bob".into()]),
        ];
        let mut train = FeatureTable::new("train", attrs.clone());
        for (x, y, c) in [
            (9.0, 1.0, 0.0),
            (8.0, 0.0, 0.0),
            (7.0, 2.0, 0.0),
            (1.0, 9.0, 1.0),
            (0.0, 8.0, 1.0),
            (2.0, 7.0, 1.0),
        ] {
            train.push_row(Row::Dense(vec![x, y, c])).unwrap();
        }
        train.set_class_index(2).unwrap();

        let classes = test_classes.unwrap_or(&[f64::NAN, f64::NAN]);
        let mut test = FeatureTable::new("test", attrs);
        test.push_row(Row::Dense(vec![10.0, 1.0, classes[0]])).unwrap();
        test.push_row(Row::Dense(vec![1.0, 10.0, classes[1]])).unwrap();
        test.set_class_index(2).unwrap();
        (train, test)
    }

    #[test]
    fn test_classifier_analyzer_cross_validate() {
        let (train, _) = separable_table(None);
        let mut analyzer = ClassifierAnalyzer::new(Box::new(NearestCentroid::new()));
        let eval = analyzer.cross_validate(&train, 3, 0).unwrap();
        assert_eq!(eval.num_instances(), 6.0);
        assert_eq!(eval.correct(), 6.0);
        assert!(analyzer.cross_validate(&train, 1, 0).is_err());
        assert!(analyzer.cross_validate(&train, 7, 0).is_err());
    }

    #[test]
    fn test_classifier_analyzer_classify() {
        let (train, test) = separable_table(None);
        let mut analyzer = ClassifierAnalyzer::new(Box::new(NaiveBayes::new()));
        let ids = vec!["q1".to_string(), "q2".to_string()];
        let predictions = analyzer.classify(&train, &test, &ids).unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(predictions["q1"]["alice"] > predictions["q1"]["bob"]);
        assert!(predictions["q2"]["bob"] > predictions["q2"]["alice"]);
        assert!(analyzer.classify(&train, &test, &ids[..1]).is_err());
    }

    #[test]
    fn test_classify_rejects_duplicate_ids() {
        let (train, test) = separable_table(None);
        let ids = vec!["q1".to_string(), "q1".to_string()];
        let mut analyzer = ClassifierAnalyzer::new(Box::new(NearestCentroid::new()));
        let err = analyzer.classify(&train, &test, &ids).unwrap_err();
        assert!(matches!(err, Error::Evaluation(ref m) if m.contains("duplicate test document id 'q1'")));

        let mut profiles = AuthorProfileAnalyzer::new();
        assert!(matches!(
            profiles.classify(&train, &test, &ids),
            Err(Error::Evaluation(_))
        ));
    }

    #[test]
    fn test_classifier_analyzer_train_test_eval() {
        let (train, test) = separable_table(Some(&[0.0, 1.0]));
        let mut analyzer = ClassifierAnalyzer::new(Box::new(ZeroR::new()));
        let eval = analyzer.train_test_eval(&train, &test).unwrap();
        assert_eq!(eval.num_instances(), 2.0);
        assert_eq!(eval.correct(), 1.0);
        assert_eq!(analyzer.classifier().unwrap().name(), "zero-r");
    }

    #[test]
    fn test_scores_by_label_drops_sentinel() {
        let labels = vec!["alice".to_string(), UNKNOWN_AUTHOR.to_string()];
        let scores = scores_by_label(&labels, &[0.7, 0.3]);
        assert_eq!(scores.len(), 1);
        assert!(scores.contains_key("alice"));
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.9]), 1);
    }
}
