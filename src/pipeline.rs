//! Preparation pipeline
//!
//! Runs the five [`Stage`]s in order against an extraction engine and stops
//! at the first failure. The outcome is a [`PreparationReport`] naming the
//! stages that completed, so a caller can continue with whatever partial
//! progress was made.

use crate::engine::{ExtractionEngine, Stage};
use serde::Serialize;
use std::fmt;

/// A stage that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    /// Failing stage
    #[serde(serialize_with = "serialize_stage")]
    pub stage: Stage,
    /// Error message
    pub message: String,
}

fn serialize_stage<S: serde::Serializer>(stage: &Stage, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(stage.name())
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage '{}' failed: {}", self.stage, self.message)
    }
}

/// Outcome of one preparation call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparationReport {
    completed: Vec<Stage>,
    failure: Option<StageFailure>,
}

impl PreparationReport {
    /// Stages that completed, in order
    #[must_use]
    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    /// The stage that stopped the pipeline, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    /// True when every stage completed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.completed.len() == Stage::ALL.len()
    }

    /// Stages that were not attempted because an earlier one failed
    #[must_use]
    pub fn skipped(&self) -> Vec<Stage> {
        let attempted = self.completed.len() + usize::from(self.failure.is_some());
        Stage::ALL.iter().skip(attempted).copied().collect()
    }
}

/// Run every stage in order, stopping at the first failure
pub fn prepare(engine: &mut dyn ExtractionEngine) -> PreparationReport {
    let mut report = PreparationReport::default();
    for stage in Stage::ALL {
        match stage.run(engine) {
            Ok(()) => {
                tracing::debug!(stage = %stage, "Stage completed");
                report.completed.push(stage);
            }
            Err(e) => {
                tracing::error!(stage = %stage, error = %e, "Stage failed; skipping the rest");
                report.failure = Some(StageFailure {
                    stage,
                    message: e.to_string(),
                });
                break;
            }
        }
    }
    report
}
