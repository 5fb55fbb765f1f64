//! Evaluation results
//!
//! An [`Evaluation`] accumulates a confusion matrix over the class labels of a
//! table and derives the usual classification statistics from it. The text
//! renderings follow the layout experimenters are used to from classic ML
//! workbenches: a summary block, a per-class detail block, and a lettered
//! confusion matrix.

use serde::{Deserialize, Serialize};

/// Aggregate classification statistics over known author labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    labels: Vec<String>,
    /// `confusion[actual][predicted]`
    confusion: Vec<Vec<f64>>,
}

impl Evaluation {
    /// Empty evaluation over `labels`
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        let k = labels.len();
        Self {
            labels,
            confusion: vec![vec![0.0; k]; k],
        }
    }

    /// Record one prediction; out-of-range classes are ignored
    pub fn record(&mut self, actual: usize, predicted: usize) {
        if let Some(cell) = self
            .confusion
            .get_mut(actual)
            .and_then(|row| row.get_mut(predicted))
        {
            *cell += 1.0;
        }
    }

    /// Fold another evaluation over the same labels into this one
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.confusion.iter_mut().zip(&other.confusion) {
            for (a, b) in mine.iter_mut().zip(theirs) {
                *a += b;
            }
        }
    }

    /// Class labels, in matrix order
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Confusion matrix, rows are actual classes
    #[must_use]
    pub fn confusion_matrix(&self) -> &[Vec<f64>] {
        &self.confusion
    }

    /// Number of evaluated instances
    #[must_use]
    pub fn num_instances(&self) -> f64 {
        self.confusion.iter().flatten().sum()
    }

    /// Correctly classified instances
    #[must_use]
    pub fn correct(&self) -> f64 {
        (0..self.labels.len()).map(|i| self.confusion[i][i]).sum()
    }

    /// Incorrectly classified instances
    #[must_use]
    pub fn incorrect(&self) -> f64 {
        self.num_instances() - self.correct()
    }

    /// Percentage of correct predictions (0 when nothing was evaluated)
    #[must_use]
    pub fn pct_correct(&self) -> f64 {
        ratio(self.correct(), self.num_instances()) * 100.0
    }

    /// Percentage of incorrect predictions
    #[must_use]
    pub fn pct_incorrect(&self) -> f64 {
        ratio(self.incorrect(), self.num_instances()) * 100.0
    }

    fn actual_count(&self, class: usize) -> f64 {
        self.confusion.get(class).map_or(0.0, |row| row.iter().sum())
    }

    fn predicted_count(&self, class: usize) -> f64 {
        self.confusion
            .iter()
            .map(|row| row.get(class).copied().unwrap_or(0.0))
            .sum()
    }

    fn hits(&self, class: usize) -> f64 {
        self.confusion
            .get(class)
            .and_then(|row| row.get(class))
            .copied()
            .unwrap_or(0.0)
    }

    /// Cohen's kappa against chance agreement
    #[must_use]
    pub fn kappa(&self) -> f64 {
        let n = self.num_instances();
        if n == 0.0 {
            return 0.0;
        }
        let observed = self.correct() / n;
        let chance: f64 = (0..self.labels.len())
            .map(|c| self.actual_count(c) * self.predicted_count(c))
            .sum::<f64>()
            / (n * n);
        if chance < 1.0 {
            (observed - chance) / (1.0 - chance)
        } else {
            1.0
        }
    }

    /// True positive rate (recall) of `class`
    #[must_use]
    pub fn true_positive_rate(&self, class: usize) -> f64 {
        ratio(self.hits(class), self.actual_count(class))
    }

    /// False positive rate of `class`
    #[must_use]
    pub fn false_positive_rate(&self, class: usize) -> f64 {
        let false_positives = self.predicted_count(class) - self.hits(class);
        let negatives = self.num_instances() - self.actual_count(class);
        ratio(false_positives, negatives)
    }

    /// Precision of `class`
    #[must_use]
    pub fn precision(&self, class: usize) -> f64 {
        ratio(self.hits(class), self.predicted_count(class))
    }

    /// Recall of `class`
    #[must_use]
    pub fn recall(&self, class: usize) -> f64 {
        self.true_positive_rate(class)
    }

    /// F1 score of `class`
    #[must_use]
    pub fn f_measure(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        ratio(2.0 * p * r, p + r)
    }

    fn weighted(&self, metric: impl Fn(usize) -> f64) -> f64 {
        let n = self.num_instances();
        if n == 0.0 {
            return 0.0;
        }
        (0..self.labels.len())
            .map(|c| self.actual_count(c) * metric(c))
            .sum::<f64>()
            / n
    }

    /// True positive rate averaged over classes, weighted by class size
    #[must_use]
    pub fn weighted_true_positive_rate(&self) -> f64 {
        self.weighted(|c| self.true_positive_rate(c))
    }

    /// Weighted false positive rate
    #[must_use]
    pub fn weighted_false_positive_rate(&self) -> f64 {
        self.weighted(|c| self.false_positive_rate(c))
    }

    /// Weighted precision
    #[must_use]
    pub fn weighted_precision(&self) -> f64 {
        self.weighted(|c| self.precision(c))
    }

    /// Weighted F1 score
    #[must_use]
    pub fn weighted_f_measure(&self) -> f64 {
        self.weighted(|c| self.f_measure(c))
    }

    /// Summary block: counts, percentages, kappa
    #[must_use]
    pub fn to_summary_string(&self) -> String {
        let mut out = String::from("\n=== Summary ===\n\n");
        out.push_str(&format!(
            "{:<40}{:>8}   {:>9.4} %\n",
            "Correctly Classified Instances",
            self.correct(),
            self.pct_correct()
        ));
        out.push_str(&format!(
            "{:<40}{:>8}   {:>9.4} %\n",
            "Incorrectly Classified Instances",
            self.incorrect(),
            self.pct_incorrect()
        ));
        out.push_str(&format!("{:<40}{:>8.4}\n", "Kappa statistic", self.kappa()));
        out.push_str(&format!(
            "{:<40}{:>8}\n",
            "Total Number of Instances",
            self.num_instances()
        ));
        out
    }

    /// Per-class rates followed by the weighted average
    #[must_use]
    pub fn to_class_details_string(&self) -> String {
        let mut out = String::from("\n=== Detailed Accuracy By Class ===\n\n");
        out.push_str(&format!(
            "{:<16} {:>8} {:>8} {:>10} {:>8} {:>10}  Class\n",
            "", "TP Rate", "FP Rate", "Precision", "Recall", "F-Measure"
        ));
        for (c, label) in self.labels.iter().enumerate() {
            out.push_str(&format!(
                "{:<16} {:>8.3} {:>8.3} {:>10.3} {:>8.3} {:>10.3}  {label}\n",
                "",
                self.true_positive_rate(c),
                self.false_positive_rate(c),
                self.precision(c),
                self.recall(c),
                self.f_measure(c)
            ));
        }
        out.push_str(&format!(
            "{:<16} {:>8.3} {:>8.3} {:>10.3} {:>8.3} {:>10.3}\n",
            "Weighted Avg.",
            self.weighted_true_positive_rate(),
            self.weighted_false_positive_rate(),
            self.weighted_precision(),
            self.weighted_true_positive_rate(),
            self.weighted_f_measure()
        ));
        out
    }

    /// Confusion matrix with lettered class codes
    #[must_use]
    pub fn to_matrix_string(&self) -> String {
        let codes: Vec<String> = (0..self.labels.len()).map(class_code).collect();
        let width = self
            .confusion
            .iter()
            .flatten()
            .map(|v| v.to_string().len())
            .chain(codes.iter().map(String::len))
            .max()
            .unwrap_or(1)
            + 1;

        let mut out = String::from("\n=== Confusion Matrix ===\n\n");
        for code in &codes {
            out.push_str(&format!("{code:>width$}"));
        }
        out.push_str("   <-- classified as\n");
        for ((row, code), label) in self.confusion.iter().zip(&codes).zip(&self.labels) {
            for v in row {
                out.push_str(&format!("{v:>width$}"));
            }
            out.push_str(&format!(" | {code} = {label}\n"));
        }
        out
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Letter code of class `index`: a..z, then aa, ab, ...
#[allow(clippy::cast_possible_truncation)]
fn class_code(mut index: usize) -> String {
    let mut code = Vec::new();
    loop {
        code.push(b'a' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    code.reverse();
    String::from_utf8_lossy(&code).into_owned()
}
