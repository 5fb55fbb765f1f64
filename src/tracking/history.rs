//! Run History - in-memory log of an experiment's runs

use super::{MetricRecord, RunRecord};
use crate::Result;
use serde::Serialize;
use std::path::Path;

/// Runs of one experiment, oldest first, with their metrics.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunHistory {
    runs: Vec<RunRecord>,
    metrics: Vec<MetricRecord>,
}

impl RunHistory {
    /// Create a new empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no run has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Get the number of runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Get the number of metrics.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// Identifier the next run will get (`run-0001`, `run-0002`, ...).
    #[must_use]
    pub fn next_run_id(&self) -> String {
        format!("run-{:04}", self.runs.len() + 1)
    }

    /// Add a run, replacing any run with the same ID.
    pub fn add_run(&mut self, run: RunRecord) {
        if let Some(existing) = self.runs.iter_mut().find(|r| r.run_id() == run.run_id()) {
            *existing = run;
        } else {
            self.runs.push(run);
        }
    }

    /// All runs, oldest first.
    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.iter().find(|r| r.run_id() == run_id)
    }

    /// Most recent run.
    #[must_use]
    pub fn last_run(&self) -> Option<&RunRecord> {
        self.runs.last()
    }

    /// Add a metric.
    pub fn add_metric(&mut self, metric: MetricRecord) {
        self.metrics.push(metric);
    }

    /// Metrics recorded for `run_id`, in recording order.
    #[must_use]
    pub fn metrics_for_run(&self, run_id: &str) -> Vec<&MetricRecord> {
        self.metrics.iter().filter(|m| m.run_id() == run_id).collect()
    }

    /// Latest value of metric `key` for `run_id`.
    #[must_use]
    pub fn metric(&self, run_id: &str, key: &str) -> Option<f64> {
        self.metrics
            .iter()
            .rev()
            .find(|m| m.run_id() == run_id && m.key() == key)
            .map(MetricRecord::value)
    }

    /// Pretty-printed JSON of every run and metric.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write [`Self::to_json`] to `path`.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
