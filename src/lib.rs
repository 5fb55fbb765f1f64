//! # stylo-lab: Authorship-Attribution Experiments
//!
//! stylo-lab turns a document collection, a feature-extraction recipe, and a
//! classifier into one of three evaluation outcomes:
//!
//! - **cross-validation** over documents of known authorship,
//! - **train-test-unknown**: author scores for documents whose author is withheld,
//! - **train-test-known**: evaluation against test documents of known authorship.
//!
//! ## Architecture
//!
//! ```text
//! ExperimentBuilder ──build──▶ Experiment
//!                                │
//!        prepare_instances ──────┤  ExtractionEngine: 5 ordered stages → FeatureTables
//!        prepare_analyzer ───────┤  ClassifierRegistry: identifier → Analyzer
//!        calc/apply_info_gain ───┤  attribute ranking and pruning
//!        run ────────────────────┤  AnalysisMode dispatch → EvaluationOutcome
//!        reports ────────────────┘  info gain listing, stat string, accuracy
//! ```
//!
//! ## Example
//!
//! ```rust
//! use stylo_lab::config::AnalysisMode;
//! use stylo_lab::corpus::{Document, ProblemSet};
//! use stylo_lab::driver::{EventKind, FeatureDriver, FeatureSpec};
//! use stylo_lab::Experiment;
//!
//! let mut set = ProblemSet::new("demo");
//! for (i, text) in ["the cat sat", "the cat ran", "a cat sat"].iter().enumerate() {
//!     set.add_training(Document::new(format!("alice-{i}"), "alice", *text));
//! }
//! for (i, text) in ["a dog barked", "the dog ran", "a dog sat"].iter().enumerate() {
//!     set.add_training(Document::new(format!("bob-{i}"), "bob", *text));
//! }
//!
//! let driver = FeatureDriver::new("words", vec![FeatureSpec::new("Words", EventKind::Words)])?;
//! let mut experiment = Experiment::builder()
//!     .problem_set(set)
//!     .feature_driver(driver)
//!     .classifier_name("naive-bayes")
//!     .analysis_mode(AnalysisMode::CrossValidation)
//!     .num_folds(3)
//!     .build()?;
//!
//! assert!(experiment.prepare_instances().is_complete());
//! experiment.prepare_analyzer()?;
//! experiment.run()?;
//! println!("accuracy: {}%", experiment.classification_accuracy()?);
//! # Ok::<(), stylo_lab::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analyzer;
pub mod config;
pub mod corpus;
pub mod driver;
pub mod engine;
pub mod error;
pub mod experiment;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod tracking;

pub use config::{AnalysisMode, ExperimentBuilder, ExperimentConfig, ExperimentFile};
pub use error::{Error, Result};
pub use experiment::{EvaluationOutcome, Experiment};
