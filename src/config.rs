//! Experiment configuration
//!
//! [`ExperimentBuilder`] collects the three required inputs (document
//! collection, feature driver, classifier) and the six secondary settings,
//! then [`build`](ExperimentBuilder::build)s an [`Experiment`] whose
//! [`ExperimentConfig`] never changes afterwards.
//!
//! Each required input comes either as a value or from a path; the last
//! setter called for a pair wins. Path sources are loaded during `build()`.
//!
//! ## Experiment files
//!
//! ```toml
//! problem_set = "corpus/set.toml"      # relative to this file
//! feature_driver = "drivers/basic.toml"
//! classifier = "naive-bayes"
//! analysis_mode = "train-test-unknown"
//! num_folds = 5
//! info_gain = 50                       # keep the 50 most useful attributes
//! ```

use crate::analyzer::{Analyzer, Classifier, ClassifierAnalyzer, ClassifierRegistry};
use crate::corpus::ProblemSet;
use crate::driver::FeatureDriver;
use crate::engine::{ExtractionEngine, TableBuilder};
use crate::experiment::Experiment;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default worker thread count
pub const DEFAULT_NUM_THREADS: usize = 4;

/// Default cross-validation fold count
pub const DEFAULT_NUM_FOLDS: usize = 10;

/// Evaluation protocol run by [`Experiment::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// k-fold cross-validation over the training table
    #[default]
    CrossValidation,
    /// Predict authors of test documents whose author is withheld
    TrainTestUnknown,
    /// Evaluate against test documents whose authors are known
    TrainTestKnown,
}

impl AnalysisMode {
    /// Stable name used in files, logs and run records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CrossValidation => "cross-validation",
            Self::TrainTestUnknown => "train-test-unknown",
            Self::TrainTestKnown => "train-test-known",
        }
    }

    /// True for the modes that need a test table
    #[must_use]
    pub const fn needs_test_table(self) -> bool {
        !matches!(self, Self::CrossValidation)
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "cross-validation" => Ok(Self::CrossValidation),
            "train-test-unknown" => Ok(Self::TrainTestUnknown),
            "train-test-known" => Ok(Self::TrainTestKnown),
            other => Err(Error::Configuration(format!(
                "Unknown analysis mode '{other}'"
            ))),
        }
    }
}

/// A required input, given directly or as a definition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source<T> {
    /// Ready-made value
    FromValue(T),
    /// Path to a definition, loaded at build time
    FromPath(PathBuf),
}

impl<T> Source<T> {
    fn load(self, what: &str, loader: impl FnOnce(&Path) -> Result<T>) -> Option<T> {
        match self {
            Self::FromValue(value) => Some(value),
            Self::FromPath(path) => match loader(&path) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load {what}; it stays unset"
                    );
                    None
                }
            },
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Self::FromValue(_) => None,
            Self::FromPath(path) => Some(path),
        }
    }
}

/// Where the classifier comes from
enum ClassifierSource {
    /// Supplied directly, already wrapped
    Direct(Box<dyn Analyzer>),
    /// Resolved through the registry by `prepare_analyzer`
    Named(String),
}

/// Frozen settings of an [`Experiment`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentConfig {
    problem_set_path: Option<PathBuf>,
    feature_driver_path: Option<PathBuf>,
    classifier_name: Option<String>,
    num_threads: usize,
    num_folds: usize,
    analysis_mode: AnalysisMode,
    use_doc_titles: bool,
    sparse: bool,
    load_doc_contents: bool,
}

impl ExperimentConfig {
    /// Problem set definition file, when loaded from a path
    #[must_use]
    pub fn problem_set_path(&self) -> Option<&Path> {
        self.problem_set_path.as_deref()
    }

    /// Feature driver definition file, when loaded from a path
    #[must_use]
    pub fn feature_driver_path(&self) -> Option<&Path> {
        self.feature_driver_path.as_deref()
    }

    /// Registry identifier, when the classifier is resolved by name
    #[must_use]
    pub fn classifier_name(&self) -> Option<&str> {
        self.classifier_name.as_deref()
    }

    /// Worker threads handed to the extraction engine
    #[must_use]
    pub const fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Cross-validation folds
    #[must_use]
    pub const fn num_folds(&self) -> usize {
        self.num_folds
    }

    /// Evaluation protocol
    #[must_use]
    pub const fn analysis_mode(&self) -> AnalysisMode {
        self.analysis_mode
    }

    /// Document titles become a string attribute
    #[must_use]
    pub const fn use_doc_titles(&self) -> bool {
        self.use_doc_titles
    }

    /// Tables use sparse rows
    #[must_use]
    pub const fn sparse(&self) -> bool {
        self.sparse
    }

    /// Documents are read into memory before extraction
    #[must_use]
    pub const fn load_doc_contents(&self) -> bool {
        self.load_doc_contents
    }
}

/// Builder for [`Experiment`]
pub struct ExperimentBuilder {
    problem_set: Option<Source<ProblemSet>>,
    feature_driver: Option<Source<FeatureDriver>>,
    classifier: Option<ClassifierSource>,
    num_threads: usize,
    num_folds: usize,
    analysis_mode: AnalysisMode,
    use_doc_titles: bool,
    sparse: bool,
    load_doc_contents: bool,
    engine: Option<Box<dyn ExtractionEngine>>,
    registry: Option<ClassifierRegistry>,
}

impl fmt::Debug for ExperimentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentBuilder")
            .field("problem_set", &self.problem_set.is_some())
            .field("feature_driver", &self.feature_driver.is_some())
            .field("classifier", &self.classifier.is_some())
            .field("analysis_mode", &self.analysis_mode)
            .finish_non_exhaustive()
    }
}

impl Default for ExperimentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentBuilder {
    /// Builder with every setting at its default
    #[must_use]
    pub fn new() -> Self {
        Self {
            problem_set: None,
            feature_driver: None,
            classifier: None,
            num_threads: DEFAULT_NUM_THREADS,
            num_folds: DEFAULT_NUM_FOLDS,
            analysis_mode: AnalysisMode::default(),
            use_doc_titles: false,
            sparse: true,
            load_doc_contents: false,
            engine: None,
            registry: None,
        }
    }

    /// Use this document collection
    #[must_use]
    pub fn problem_set(mut self, problem_set: ProblemSet) -> Self {
        self.problem_set = Some(Source::FromValue(problem_set));
        self
    }

    /// Load the document collection from a TOML definition
    #[must_use]
    pub fn problem_set_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.problem_set = Some(Source::FromPath(path.into()));
        self
    }

    /// Use this feature driver
    #[must_use]
    pub fn feature_driver(mut self, driver: FeatureDriver) -> Self {
        self.feature_driver = Some(Source::FromValue(driver));
        self
    }

    /// Load the feature driver from a TOML definition
    #[must_use]
    pub fn feature_driver_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.feature_driver = Some(Source::FromPath(path.into()));
        self
    }

    /// Use this library classifier (wrapped immediately)
    #[must_use]
    pub fn classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(ClassifierSource::Direct(Box::new(ClassifierAnalyzer::new(
            classifier,
        ))));
        self
    }

    /// Use this specialized analyzer as-is
    #[must_use]
    pub fn analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Self {
        self.classifier = Some(ClassifierSource::Direct(analyzer));
        self
    }

    /// Resolve the classifier by registry identifier
    #[must_use]
    pub fn classifier_name(mut self, identifier: impl Into<String>) -> Self {
        self.classifier = Some(ClassifierSource::Named(identifier.into()));
        self
    }

    /// Worker threads for extraction (default 4)
    #[must_use]
    pub const fn num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Cross-validation folds (default 10)
    #[must_use]
    pub const fn num_folds(mut self, folds: usize) -> Self {
        self.num_folds = folds;
        self
    }

    /// Evaluation protocol (default cross-validation)
    #[must_use]
    pub const fn analysis_mode(mut self, mode: AnalysisMode) -> Self {
        self.analysis_mode = mode;
        self
    }

    /// Add document titles as a string attribute (default off)
    #[must_use]
    pub const fn use_doc_titles(mut self, use_doc_titles: bool) -> Self {
        self.use_doc_titles = use_doc_titles;
        self
    }

    /// Build sparse rows (default on)
    #[must_use]
    pub const fn sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    /// Read every document before extraction (default off)
    #[must_use]
    pub const fn load_doc_contents(mut self, load: bool) -> Self {
        self.load_doc_contents = load;
        self
    }

    /// Use a custom extraction engine instead of [`TableBuilder`]
    #[must_use]
    pub fn engine(mut self, engine: Box<dyn ExtractionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Resolve classifier names against a custom registry
    #[must_use]
    pub fn registry(mut self, registry: ClassifierRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validate, load path sources, and freeze the configuration
    ///
    /// A path source that fails to load is logged and left unset; the
    /// experiment then fails at its first preparation stage.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the document collection, the feature
    /// driver, or the classifier was never supplied
    pub fn build(self) -> Result<Experiment> {
        let missing: Vec<&str> = [
            ("document collection", self.problem_set.is_none()),
            ("feature driver", self.feature_driver.is_none()),
            ("classifier", self.classifier.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, unset)| unset.then_some(name))
        .collect();

        let (Some(problem_set), Some(feature_driver), Some(classifier)) =
            (self.problem_set, self.feature_driver, self.classifier)
        else {
            return Err(Error::Configuration(format!(
                "No {} supplied",
                missing.join(", no ")
            )));
        };

        let (analyzer, classifier_name) = match classifier {
            ClassifierSource::Direct(analyzer) => (Some(analyzer), None),
            ClassifierSource::Named(name) => (None, Some(name)),
        };

        let config = ExperimentConfig {
            problem_set_path: problem_set.path().map(Path::to_path_buf),
            feature_driver_path: feature_driver.path().map(Path::to_path_buf),
            classifier_name,
            num_threads: self.num_threads,
            num_folds: self.num_folds,
            analysis_mode: self.analysis_mode,
            use_doc_titles: self.use_doc_titles,
            sparse: self.sparse,
            load_doc_contents: self.load_doc_contents,
        };

        let load_contents = self.load_doc_contents;
        let problem_set = problem_set.load("problem set", |p| ProblemSet::from_path(p, load_contents));
        #[allow(clippy::redundant_closure)]
        let feature_driver = feature_driver.load("feature driver", |p| FeatureDriver::from_path(p));

        let mut engine = self
            .engine
            .unwrap_or_else(|| Box::new(TableBuilder::new()));
        if let Some(problem_set) = problem_set {
            engine.set_problem_set(problem_set);
        }
        if let Some(driver) = feature_driver {
            engine.set_feature_driver(driver);
        }
        engine.set_use_doc_titles(config.use_doc_titles);
        engine.set_load_doc_contents(config.load_doc_contents);
        engine.set_use_sparse(config.sparse);
        engine.set_num_threads(config.num_threads);

        tracing::debug!(
            mode = %config.analysis_mode,
            folds = config.num_folds,
            threads = config.num_threads,
            "Built experiment"
        );
        Ok(Experiment::new(
            config,
            engine,
            self.registry.unwrap_or_else(ClassifierRegistry::with_defaults),
            analyzer,
        ))
    }
}

/// Experiment described by a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentFile {
    /// Problem set definition
    pub problem_set: PathBuf,
    /// Feature driver definition
    pub feature_driver: PathBuf,
    /// Registry identifier of the classifier
    pub classifier: String,
    /// Worker threads
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    /// Cross-validation folds
    #[serde(default = "default_num_folds")]
    pub num_folds: usize,
    /// Evaluation protocol
    #[serde(default)]
    pub analysis_mode: AnalysisMode,
    /// Add document titles as a string attribute
    #[serde(default)]
    pub use_doc_titles: bool,
    /// Build sparse rows
    #[serde(default = "default_sparse")]
    pub sparse: bool,
    /// Read documents before extraction
    #[serde(default)]
    pub load_doc_contents: bool,
    /// Reduce both tables to this many attributes by information gain
    #[serde(default)]
    pub info_gain: Option<usize>,
}

const fn default_num_threads() -> usize {
    DEFAULT_NUM_THREADS
}

const fn default_num_folds() -> usize {
    DEFAULT_NUM_FOLDS
}

const fn default_sparse() -> bool {
    true
}

impl ExperimentFile {
    /// Parse an experiment file; relative paths resolve against its directory
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file: Self = toml::from_str(&std::fs::read_to_string(path)?)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        file.problem_set = base.join(&file.problem_set);
        file.feature_driver = base.join(&file.feature_driver);
        Ok(file)
    }

    /// Builder carrying every setting of this file
    #[must_use]
    pub fn into_builder(self) -> ExperimentBuilder {
        ExperimentBuilder::new()
            .problem_set_path(self.problem_set)
            .feature_driver_path(self.feature_driver)
            .classifier_name(self.classifier)
            .num_threads(self.num_threads)
            .num_folds(self.num_folds)
            .analysis_mode(self.analysis_mode)
            .use_doc_titles(self.use_doc_titles)
            .sparse(self.sparse)
            .load_doc_contents(self.load_doc_contents)
    }
}
