//! Run tracking
//!
//! Every call to [`Experiment::run`](crate::Experiment::run) leaves a
//! [`RunRecord`] in the experiment's [`RunHistory`], together with the
//! [`MetricRecord`]s it produced.
//!
//! ```text
//! RunHistory ──< RunRecord (N)
//!                    └──< MetricRecord (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use stylo_lab::config::AnalysisMode;
//! use stylo_lab::tracking::{MetricRecord, RunHistory, RunRecord, ACCURACY};
//!
//! let mut history = RunHistory::new();
//! let mut run = RunRecord::new(history.next_run_id(), AnalysisMode::CrossValidation);
//! run.start();
//! history.add_metric(MetricRecord::new(run.run_id(), ACCURACY, 92.5));
//! run.succeed();
//! history.add_run(run);
//!
//! assert_eq!(history.metric("run-0001", ACCURACY), Some(92.5));
//! ```

mod history;
mod metric_record;
mod run_record;

pub use history::RunHistory;
pub use metric_record::{MetricRecord, ACCURACY, KAPPA, PREDICTIONS};
pub use run_record::{RunRecord, RunStatus};
