//! Text reports over stored results
//!
//! Pure formatting: nothing here touches experiment state. Every function
//! fails with [`Error::Reporting`] when handed a result that does not exist.

use crate::analyzer::Evaluation;
use crate::engine::InfoGainTable;
use crate::table::FeatureTable;
use crate::{Error, Result};

/// Ranked attribute listing, one `> name   gain` line per attribute
///
/// Stops at the first zero-gain entry unless `show_zeroes`; the ranking is
/// sorted descending, so nothing useful follows it.
///
/// # Errors
/// Returns error if either input is missing
pub fn readable_info_gain(
    info_gain: Option<&InfoGainTable>,
    table: Option<&FeatureTable>,
    show_zeroes: bool,
) -> Result<String> {
    let info_gain = info_gain
        .ok_or_else(|| Error::Reporting("info gain has not been calculated".to_string()))?;
    let table = table
        .ok_or_else(|| Error::Reporting("there is no training table to name attributes".to_string()))?;

    let mut out = String::from(">-----InfoGain information: \n\n");
    for entry in info_gain.entries() {
        if !show_zeroes && entry.gain == 0.0 {
            break;
        }
        let name = table
            .attribute(entry.attribute)
            .map_or("?", |a| a.name());
        out.push_str(&format!("> {name:<50}   {:.6}\n", entry.gain));
    }
    Ok(out)
}

fn require(evaluation: Option<&Evaluation>) -> Result<&Evaluation> {
    evaluation.ok_or_else(|| {
        Error::Reporting("no evaluation result is stored; run a cross-validation or train-test-known analysis first".to_string())
    })
}

/// Summary, per-class details, and confusion matrix
///
/// # Errors
/// Returns error if there is no evaluation
pub fn stat_string(evaluation: Option<&Evaluation>) -> Result<String> {
    let eval = require(evaluation)?;
    Ok(format!(
        "{}{}{}",
        eval.to_summary_string(),
        eval.to_class_details_string(),
        eval.to_matrix_string()
    ))
}

/// Weighted true positive rate as a percentage with four decimals
///
/// # Errors
/// Returns error if there is no evaluation
pub fn classification_accuracy(evaluation: Option<&Evaluation>) -> Result<String> {
    let eval = require(evaluation)?;
    Ok(format!("{:.4}", eval.weighted_true_positive_rate() * 100.0))
}
