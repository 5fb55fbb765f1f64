//! Built-in library classifiers
//!
//! All three read only the numeric attributes of a table; string and class
//! columns are ignored.

use super::{class_labels, cosine, labelled_rows, Classifier};
use crate::table::FeatureTable;
use crate::{Error, Result};

fn untrained(name: &str) -> Error {
    Error::Evaluation(format!("Classifier '{name}' has not been trained"))
}

fn check_width(name: &str, expected: usize, x: &[f64]) -> Result<()> {
    if x.len() == expected {
        Ok(())
    } else {
        Err(Error::Evaluation(format!(
            "Classifier '{name}' was trained on {expected} features, got {}",
            x.len()
        )))
    }
}

/// Scale non-negative scores to sum to 1; all-zero scores become uniform
#[allow(clippy::cast_precision_loss)]
fn normalize(mut scores: Vec<f64>) -> Vec<f64> {
    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        scores.iter_mut().for_each(|s| *s /= total);
    } else if !scores.is_empty() {
        let uniform = 1.0 / scores.len() as f64;
        scores.iter_mut().for_each(|s| *s = uniform);
    }
    scores
}

/// Log-space scores to probabilities
fn softmax(log_scores: &[f64]) -> Vec<f64> {
    let max = log_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    normalize(log_scores.iter().map(|s| (s - max).exp()).collect())
}

/// Majority-class baseline
///
/// Predicts the class priors (Laplace smoothed) regardless of the row.
#[derive(Debug, Clone, Default)]
pub struct ZeroR {
    prior: Option<Vec<f64>>,
}

impl ZeroR {
    /// Untrained baseline
    #[must_use]
    pub const fn new() -> Self {
        Self { prior: None }
    }
}

impl Classifier for ZeroR {
    fn name(&self) -> &str {
        "zero-r"
    }

    fn fit(&mut self, table: &FeatureTable) -> Result<()> {
        let labels = class_labels(table)?;
        let mut counts = vec![1.0; labels.len()];
        for (_, class) in labelled_rows(table)? {
            if let Some(c) = counts.get_mut(class) {
                *c += 1.0;
            }
        }
        self.prior = Some(normalize(counts));
        Ok(())
    }

    fn distribution(&self, _table: &FeatureTable, _row: usize) -> Result<Vec<f64>> {
        self.prior.clone().ok_or_else(|| untrained(self.name()))
    }

    fn fresh(&self) -> Box<dyn Classifier> {
        Box::new(Self::new())
    }
}

#[derive(Debug, Clone)]
struct MultinomialModel {
    log_prior: Vec<f64>,
    log_likelihood: Vec<Vec<f64>>,
}

/// Multinomial naive Bayes over event counts
#[derive(Debug, Clone)]
pub struct NaiveBayes {
    alpha: f64,
    model: Option<MultinomialModel>,
}

impl Default for NaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl NaiveBayes {
    /// Untrained model with add-one smoothing
    #[must_use]
    pub const fn new() -> Self {
        Self::with_alpha(1.0)
    }

    /// Untrained model with additive smoothing `alpha`
    #[must_use]
    pub const fn with_alpha(alpha: f64) -> Self {
        Self { alpha, model: None }
    }
}

impl Classifier for NaiveBayes {
    fn name(&self) -> &str {
        "naive-bayes"
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&mut self, table: &FeatureTable) -> Result<()> {
        let k = class_labels(table)?.len();
        let rows = labelled_rows(table)?;
        let width = table.numeric_attribute_indices().len();

        let mut class_counts = vec![0.0; k];
        let mut sums = vec![vec![0.0; width]; k];
        for &(row, class) in &rows {
            let Some(acc) = sums.get_mut(class) else {
                continue;
            };
            class_counts[class] += 1.0;
            for (s, v) in acc.iter_mut().zip(table.numeric_vector(row)) {
                *s += v.max(0.0);
            }
        }

        let n = rows.len() as f64;
        let log_prior = class_counts
            .iter()
            .map(|c| ((c + 1.0) / (n + k as f64)).ln())
            .collect();
        let log_likelihood = sums
            .iter()
            .map(|features| {
                let total: f64 = features.iter().sum::<f64>() + self.alpha * width as f64;
                features
                    .iter()
                    .map(|s| ((s + self.alpha) / total).ln())
                    .collect()
            })
            .collect();

        self.model = Some(MultinomialModel {
            log_prior,
            log_likelihood,
        });
        Ok(())
    }

    fn distribution(&self, table: &FeatureTable, row: usize) -> Result<Vec<f64>> {
        let model = self.model.as_ref().ok_or_else(|| untrained(self.name()))?;
        let x = table.numeric_vector(row);
        let width = model.log_likelihood.first().map_or(0, Vec::len);
        check_width(self.name(), width, &x)?;

        let scores: Vec<f64> = model
            .log_prior
            .iter()
            .zip(&model.log_likelihood)
            .map(|(prior, ll)| prior + x.iter().zip(ll).map(|(v, l)| v.max(0.0) * l).sum::<f64>())
            .collect();
        Ok(softmax(&scores))
    }

    fn fresh(&self) -> Box<dyn Classifier> {
        Box::new(Self::with_alpha(self.alpha))
    }
}

/// Cosine nearest-centroid classifier
///
/// Each class is represented by the mean of its training vectors; a row's
/// distribution is its shifted cosine similarity to every centroid,
/// normalized.
#[derive(Debug, Clone, Default)]
pub struct NearestCentroid {
    width: usize,
    centroids: Option<Vec<Option<Vec<f64>>>>,
}

impl NearestCentroid {
    /// Untrained classifier
    #[must_use]
    pub const fn new() -> Self {
        Self {
            width: 0,
            centroids: None,
        }
    }
}

impl Classifier for NearestCentroid {
    fn name(&self) -> &str {
        "nearest-centroid"
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&mut self, table: &FeatureTable) -> Result<()> {
        let k = class_labels(table)?.len();
        let width = table.numeric_attribute_indices().len();
        let mut sums = vec![vec![0.0; width]; k];
        let mut counts = vec![0usize; k];
        for (row, class) in labelled_rows(table)? {
            let Some(acc) = sums.get_mut(class) else {
                continue;
            };
            counts[class] += 1;
            for (s, v) in acc.iter_mut().zip(table.numeric_vector(row)) {
                *s += v;
            }
        }

        self.width = width;
        self.centroids = Some(
            sums.into_iter()
                .zip(counts)
                .map(|(sum, count)| {
                    (count > 0).then(|| sum.into_iter().map(|s| s / count as f64).collect())
                })
                .collect(),
        );
        Ok(())
    }

    fn distribution(&self, table: &FeatureTable, row: usize) -> Result<Vec<f64>> {
        let centroids = self.centroids.as_ref().ok_or_else(|| untrained(self.name()))?;
        let x = table.numeric_vector(row);
        check_width(self.name(), self.width, &x)?;

        let scores = centroids
            .iter()
            .map(|centroid| match centroid {
                Some(c) => Ok((cosine(&x, c)? + 1.0) / 2.0),
                None => Ok(0.0),
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(normalize(scores))
    }

    fn fresh(&self) -> Box<dyn Classifier> {
        Box::new(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::separable_table;

    fn assert_distribution(dist: &[f64]) {
        assert_eq!(dist.len(), 2);
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_untrained_classifiers_fail() {
        let (_, test) = separable_table(None);
        assert!(ZeroR::new().distribution(&test, 0).is_err());
        assert!(NaiveBayes::new().distribution(&test, 0).is_err());
        assert!(NearestCentroid::new().distribution(&test, 0).is_err());
    }

    #[test]
    fn test_zero_r_predicts_majority() {
        let (mut train, test) = separable_table(None);
        train
            .push_row(crate::table::Row::Dense(vec![0.0, 0.0, 1.0]))
            .unwrap();
        let mut zero_r = ZeroR::new();
        zero_r.fit(&train).unwrap();
        let dist = zero_r.distribution(&test, 0).unwrap();
        assert_distribution(&dist);
        assert!(dist[1] > dist[0]);
    }

    #[test]
    fn test_naive_bayes_separates_authors() {
        let (train, test) = separable_table(None);
        let mut nb = NaiveBayes::new();
        nb.fit(&train).unwrap();
        let first = nb.distribution(&test, 0).unwrap();
        let second = nb.distribution(&test, 1).unwrap();
        assert_distribution(&first);
        assert!(first[0] > 0.9);
        assert!(second[1] > 0.9);
    }

    #[test]
    fn test_nearest_centroid_separates_authors() {
        let (train, test) = separable_table(None);
        let mut nc = NearestCentroid::new();
        nc.fit(&train).unwrap();
        let first = nc.distribution(&test, 0).unwrap();
        assert_distribution(&first);
        assert!(first[0] > first[1]);
        assert!(nc.distribution(&test, 1).unwrap()[1] > 0.5);
    }

    #[test]
    fn test_fresh_is_untrained() {
        let (train, test) = separable_table(None);
        let mut nb = NaiveBayes::with_alpha(0.5);
        nb.fit(&train).unwrap();
        assert!(nb.fresh().distribution(&test, 0).is_err());
    }

    #[test]
    fn test_fit_requires_labelled_rows() {
        let (_, test) = separable_table(None);
        assert!(NaiveBayes::new().fit(&test).is_err());
    }
}
