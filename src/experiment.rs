//! Experiment orchestrator
//!
//! An [`Experiment`] owns the frozen configuration, the extraction engine,
//! the active analyzer, and the last stored outcome. Intended use is
//! sequential:
//!
//! ```text
//! build → prepare_instances → [prepare_analyzer] → [calc/apply_info_gain] → run → reports
//! ```

use crate::analyzer::{Analyzer, Classifier, ClassifierRegistry, Evaluation, PredictionMap};
use crate::config::{AnalysisMode, ExperimentBuilder, ExperimentConfig};
use crate::corpus::{ProblemSet, UNKNOWN_AUTHOR};
use crate::engine::{ExtractionEngine, InfoGainTable};
use crate::pipeline::{prepare, PreparationReport};
use crate::report;
use crate::table::{self, FeatureTable};
use crate::tracking::{MetricRecord, RunHistory, RunRecord, ACCURACY, KAPPA, PREDICTIONS};
use crate::{Error, Result};
use std::path::Path;

/// Seed of the cross-validation fold shuffle
pub const CV_SEED: u64 = 0;

/// Result of the last successful [`Experiment::run`]
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// Cross-validation over the training table
    CrossValidated(Evaluation),
    /// Author scores for each test document
    Predicted(PredictionMap),
    /// Evaluation against test documents of known authorship
    TrainTestKnown(Evaluation),
}

impl EvaluationOutcome {
    /// Mode that produced this outcome
    #[must_use]
    pub const fn mode(&self) -> AnalysisMode {
        match self {
            Self::CrossValidated(_) => AnalysisMode::CrossValidation,
            Self::Predicted(_) => AnalysisMode::TrainTestUnknown,
            Self::TrainTestKnown(_) => AnalysisMode::TrainTestKnown,
        }
    }

    /// Evaluation, for the two evaluating modes
    #[must_use]
    pub const fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            Self::CrossValidated(eval) | Self::TrainTestKnown(eval) => Some(eval),
            Self::Predicted(_) => None,
        }
    }

    /// Predictions, for train-test-unknown
    #[must_use]
    pub const fn predictions(&self) -> Option<&PredictionMap> {
        match self {
            Self::Predicted(predictions) => Some(predictions),
            _ => None,
        }
    }
}

/// An authorship-attribution experiment
pub struct Experiment {
    config: ExperimentConfig,
    engine: Box<dyn ExtractionEngine>,
    registry: ClassifierRegistry,
    analyzer: Option<Box<dyn Analyzer>>,
    outcome: Option<EvaluationOutcome>,
    history: RunHistory,
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer.as_ref().map(|a| a.name()))
            .field("outcome", &self.outcome.as_ref().map(EvaluationOutcome::mode))
            .field("runs", &self.history.run_count())
            .finish_non_exhaustive()
    }
}

impl Experiment {
    /// Start configuring an experiment
    #[must_use]
    pub fn builder() -> ExperimentBuilder {
        ExperimentBuilder::new()
    }

    pub(crate) fn new(
        config: ExperimentConfig,
        engine: Box<dyn ExtractionEngine>,
        registry: ClassifierRegistry,
        analyzer: Option<Box<dyn Analyzer>>,
    ) -> Self {
        Self {
            config,
            engine,
            registry,
            analyzer,
            outcome: None,
            history: RunHistory::new(),
        }
    }

    /// Frozen configuration
    #[must_use]
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run the five preparation stages, stopping at the first failure
    ///
    /// Never fails outright: inspect the report (or the table accessors) to
    /// see how far preparation got.
    pub fn prepare_instances(&mut self) -> PreparationReport {
        let report = prepare(self.engine.as_mut());
        if report.is_complete() {
            tracing::info!(
                training = self.training_table().map_or(0, FeatureTable::num_instances),
                test = self.test_table().map_or(0, FeatureTable::num_instances),
                "Prepared instances"
            );
        }
        report
    }

    /// Resolve a classifier configured by name
    ///
    /// A classifier supplied directly needs no resolution; this is then a
    /// no-op. On failure the active analyzer is left unset.
    ///
    /// # Errors
    /// Returns [`Error::Resolution`] if the identifier cannot be resolved
    pub fn prepare_analyzer(&mut self) -> Result<()> {
        let Some(identifier) = self.config.classifier_name() else {
            return Ok(());
        };
        match self.registry.resolve(identifier) {
            Ok(resolved) => {
                let analyzer = resolved.into_analyzer();
                tracing::info!(classifier = identifier, analyzer = analyzer.name(), "Resolved classifier");
                self.analyzer = Some(analyzer);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(classifier = identifier, error = %e, "Classifier resolution failed");
                self.analyzer = None;
                Err(e)
            }
        }
    }

    /// Rank the training table's attributes by information gain
    ///
    /// # Errors
    /// Returns error if there is no training table
    pub fn calc_info_gain(&mut self) -> Result<()> {
        self.engine.calculate_info_gain()?;
        tracing::debug!(
            attributes = self.info_gain().map_or(0, InfoGainTable::len),
            "Calculated info gain"
        );
        Ok(())
    }

    /// Reduce both tables to the `n` best attributes by the cached ranking
    ///
    /// # Errors
    /// Returns error if `n` is zero or the ranking has not been calculated
    pub fn apply_info_gain(&mut self, n: usize) -> Result<()> {
        self.engine.apply_info_gain(n)
    }

    /// Run the configured evaluation protocol
    ///
    /// Any previous outcome is discarded first, so after a failed run no
    /// outcome is stored. Each call is recorded in [`Experiment::history`].
    ///
    /// # Errors
    /// Returns [`Error::Evaluation`] if no analyzer is active, a table the
    /// mode needs is missing, or the protocol itself fails
    pub fn run(&mut self) -> Result<&EvaluationOutcome> {
        let mode = self.config.analysis_mode();
        let mut record = RunRecord::new(self.history.next_run_id(), mode);
        if let Some(analyzer) = &self.analyzer {
            record = record.with_analyzer(analyzer.name());
        }
        record.start();
        self.outcome = None;

        let result = Self::evaluate(
            mode,
            self.config.num_folds(),
            self.engine.as_mut(),
            self.analyzer.as_mut(),
        );

        match result {
            Ok(outcome) => {
                let run_id = record.run_id().to_string();
                match &outcome {
                    EvaluationOutcome::CrossValidated(eval)
                    | EvaluationOutcome::TrainTestKnown(eval) => {
                        self.history
                            .add_metric(MetricRecord::new(&run_id, ACCURACY, eval.pct_correct()));
                        self.history
                            .add_metric(MetricRecord::new(&run_id, KAPPA, eval.kappa()));
                        tracing::info!(
                            mode = %mode,
                            accuracy = eval.pct_correct(),
                            kappa = eval.kappa(),
                            "Run finished"
                        );
                    }
                    EvaluationOutcome::Predicted(predictions) => {
                        #[allow(clippy::cast_precision_loss)]
                        let count = predictions.len() as f64;
                        self.history
                            .add_metric(MetricRecord::new(&run_id, PREDICTIONS, count));
                        tracing::info!(mode = %mode, documents = predictions.len(), "Run finished");
                    }
                }
                record.succeed();
                self.history.add_run(record);
                Ok(&*self.outcome.insert(outcome))
            }
            Err(e) => {
                tracing::error!(mode = %mode, error = %e, "Run failed");
                record.fail(e.to_string());
                self.history.add_run(record);
                Err(e)
            }
        }
    }

    fn evaluate(
        mode: AnalysisMode,
        folds: usize,
        engine: &mut dyn ExtractionEngine,
        analyzer: Option<&mut Box<dyn Analyzer>>,
    ) -> Result<EvaluationOutcome> {
        let analyzer = analyzer.ok_or_else(|| {
            Error::Evaluation(
                "no classifier is active; supply one or call prepare_analyzer".to_string(),
            )
        })?;
        if engine.training_table().is_none() {
            return Err(Error::Evaluation(
                "no training table; preparation did not complete".to_string(),
            ));
        }
        if mode.needs_test_table() && engine.test_table().is_none() {
            return Err(Error::Evaluation(format!(
                "{mode} needs a test table; preparation did not build one"
            )));
        }

        match mode {
            AnalysisMode::CrossValidation => {
                let training = engine
                    .training_table()
                    .ok_or_else(|| Error::Evaluation("no training table".to_string()))?;
                Ok(EvaluationOutcome::CrossValidated(
                    analyzer.cross_validate(training, folds, CV_SEED)?,
                ))
            }
            AnalysisMode::TrainTestUnknown => {
                let ids = engine
                    .problem_set()
                    .map(ProblemSet::test_titles)
                    .ok_or_else(|| Error::Evaluation("no problem set to name test documents".to_string()))?;
                let (Some(training), Some(test)) = (engine.training_table(), engine.test_table()) else {
                    return Err(Error::Evaluation("missing feature tables".to_string()));
                };
                Ok(EvaluationOutcome::Predicted(
                    analyzer.classify(training, test, &ids)?,
                ))
            }
            AnalysisMode::TrainTestKnown => {
                if let Some(problem_set) = engine.problem_set_mut() {
                    if problem_set.remove_author(UNKNOWN_AUTHOR) {
                        tracing::debug!("Removed the unknown-author label");
                    }
                }
                if let Some(table) = engine.training_table_mut() {
                    prepare_known_table(table)?;
                }
                if let Some(table) = engine.test_table_mut() {
                    prepare_known_table(table)?;
                }
                let (Some(training), Some(test)) = (engine.training_table(), engine.test_table()) else {
                    return Err(Error::Evaluation("missing feature tables".to_string()));
                };
                Ok(EvaluationOutcome::TrainTestKnown(
                    analyzer.train_test_eval(training, test)?,
                ))
            }
        }
    }

    /// Last stored outcome
    #[must_use]
    pub const fn outcome(&self) -> Option<&EvaluationOutcome> {
        self.outcome.as_ref()
    }

    /// Stored evaluation (cross-validation or train-test-known)
    #[must_use]
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.outcome.as_ref().and_then(EvaluationOutcome::evaluation)
    }

    /// Stored predictions (train-test-unknown)
    #[must_use]
    pub fn predictions(&self) -> Option<&PredictionMap> {
        self.outcome.as_ref().and_then(EvaluationOutcome::predictions)
    }

    /// Cached attribute ranking
    #[must_use]
    pub fn info_gain(&self) -> Option<&InfoGainTable> {
        self.engine.info_gain()
    }

    /// Current training table
    #[must_use]
    pub fn training_table(&self) -> Option<&FeatureTable> {
        self.engine.training_table()
    }

    /// Current test table
    #[must_use]
    pub fn test_table(&self) -> Option<&FeatureTable> {
        self.engine.test_table()
    }

    /// Replace the training table with a prebuilt one
    pub fn set_training_table(&mut self, table: FeatureTable) {
        self.engine.set_training_table(table);
    }

    /// Replace the test table with a prebuilt one
    pub fn set_test_table(&mut self, table: FeatureTable) {
        self.engine.set_test_table(table);
    }

    /// Current document collection
    #[must_use]
    pub fn problem_set(&self) -> Option<&ProblemSet> {
        self.engine.problem_set()
    }

    /// Underlying extraction engine
    #[must_use]
    pub fn engine(&self) -> &dyn ExtractionEngine {
        self.engine.as_ref()
    }

    /// Mutable extraction engine, for driving stages by hand
    pub fn engine_mut(&mut self) -> &mut dyn ExtractionEngine {
        self.engine.as_mut()
    }

    /// Active analyzer
    #[must_use]
    pub fn analyzer(&self) -> Option<&dyn Analyzer> {
        self.analyzer.as_deref()
    }

    /// Library classifier behind the active analyzer, if it wraps one
    #[must_use]
    pub fn underlying_classifier(&self) -> Option<&dyn Classifier> {
        self.analyzer.as_deref().and_then(|a| a.classifier())
    }

    /// Record of every run so far
    #[must_use]
    pub const fn history(&self) -> &RunHistory {
        &self.history
    }

    /// Ranked attribute listing (see [`report::readable_info_gain`])
    ///
    /// # Errors
    /// Returns [`Error::Reporting`] if info gain has not been calculated
    pub fn readable_info_gain(&self, show_zeroes: bool) -> Result<String> {
        report::readable_info_gain(self.info_gain(), self.training_table(), show_zeroes)
    }

    /// Full evaluation report
    ///
    /// # Errors
    /// Returns [`Error::Reporting`] if no evaluation is stored
    pub fn stat_string(&self) -> Result<String> {
        report::stat_string(self.evaluation())
    }

    /// Weighted true positive rate × 100, four decimals
    ///
    /// # Errors
    /// Returns [`Error::Reporting`] if no evaluation is stored
    pub fn classification_accuracy(&self) -> Result<String> {
        report::classification_accuracy(self.evaluation())
    }

    /// Export `table` as ARFF
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn write_arff<P: AsRef<Path>>(path: P, table: &FeatureTable) -> Result<()> {
        table::write_arff(path, table)
    }
}

fn set_last_class(table: &mut FeatureTable) -> Result<()> {
    let last = table
        .num_attributes()
        .checked_sub(1)
        .ok_or_else(|| Error::Evaluation(format!("Table '{}' has no attributes", table.relation())))?;
    table
        .set_class_index(last)
        .map_err(|e| Error::Evaluation(format!("cannot set class attribute: {e}")))
}

/// Use the last column as class and drop the unknown-author label
fn prepare_known_table(table: &mut FeatureTable) -> Result<()> {
    set_last_class(table)?;
    if table.drop_class_label(UNKNOWN_AUTHOR) {
        tracing::debug!(relation = table.relation(), "Dropped the unknown-author class");
    }
    Ok(())
}
