//! Feature extraction engine
//!
//! The engine turns a [`ProblemSet`] and a [`FeatureDriver`] into feature
//! tables through five ordered stages (see [`Stage`]). Each stage is exposed
//! separately so a caller can drive them one by one; a stage whose
//! prerequisite has not run fails with [`Error::Stage`](crate::Error::Stage).
//!
//! [`TableBuilder`] is the bundled implementation. Anything implementing
//! [`ExtractionEngine`] can be plugged into an experiment instead.

mod builder;
mod info_gain;

pub use builder::TableBuilder;
pub use info_gain::{compute_info_gain, InfoGainEntry, InfoGainTable, DISCRETIZATION_BINS};

use crate::corpus::ProblemSet;
use crate::driver::FeatureDriver;
use crate::table::FeatureTable;
use crate::Result;
use std::fmt;

/// Preparation stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Extract raw events from every document
    ExtractEvents,
    /// Choose which events to track across the collection
    SelectRelevantEvents,
    /// Build the attribute vocabulary
    InitializeAttributes,
    /// Materialize the training table
    BuildTrainingTable,
    /// Materialize the test table, if there are test documents
    BuildTestTable,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Self; 5] = [
        Self::ExtractEvents,
        Self::SelectRelevantEvents,
        Self::InitializeAttributes,
        Self::BuildTrainingTable,
        Self::BuildTestTable,
    ];

    /// Stable stage name used in logs and errors
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExtractEvents => "extract-events",
            Self::SelectRelevantEvents => "select-relevant-events",
            Self::InitializeAttributes => "initialize-attributes",
            Self::BuildTrainingTable => "build-training-table",
            Self::BuildTestTable => "build-test-table",
        }
    }

    /// Run this stage on `engine`
    ///
    /// # Errors
    /// Propagates the engine's stage error
    pub fn run(self, engine: &mut dyn ExtractionEngine) -> Result<()> {
        match self {
            Self::ExtractEvents => engine.extract_events(),
            Self::SelectRelevantEvents => engine.select_relevant_events(),
            Self::InitializeAttributes => engine.initialize_attributes(),
            Self::BuildTrainingTable => engine.build_training_table(),
            Self::BuildTestTable => engine.build_test_table(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations the orchestrator needs from a feature extraction engine
pub trait ExtractionEngine: Send {
    /// Replace the document collection (clears derived state)
    fn set_problem_set(&mut self, problem_set: ProblemSet);

    /// Replace the feature driver (clears derived state)
    fn set_feature_driver(&mut self, driver: FeatureDriver);

    /// Prepend a string attribute holding each document's title
    fn set_use_doc_titles(&mut self, use_doc_titles: bool);

    /// Read every document into memory before extraction
    fn set_load_doc_contents(&mut self, load: bool);

    /// Build sparse rather than dense rows
    fn set_use_sparse(&mut self, sparse: bool);

    /// Worker threads for extraction and table construction
    fn set_num_threads(&mut self, threads: usize);

    /// Stage 1: extract raw events per document
    ///
    /// # Errors
    /// Fails if no problem set or driver is set, or a document cannot be read
    fn extract_events(&mut self) -> Result<()>;

    /// Stage 2: select the events to track
    ///
    /// # Errors
    /// Fails if events have not been extracted
    fn select_relevant_events(&mut self) -> Result<()>;

    /// Stage 3: build the attribute vocabulary
    ///
    /// # Errors
    /// Fails if relevant events have not been selected
    fn initialize_attributes(&mut self) -> Result<()>;

    /// Stage 4: materialize the training table
    ///
    /// # Errors
    /// Fails if attributes have not been initialized
    fn build_training_table(&mut self) -> Result<()>;

    /// Stage 5: materialize the test table when test documents exist
    ///
    /// # Errors
    /// Fails if attributes have not been initialized
    fn build_test_table(&mut self) -> Result<()>;

    /// Rank attributes of the training table by information gain
    ///
    /// # Errors
    /// Fails if there is no training table
    fn calculate_info_gain(&mut self) -> Result<()>;

    /// Reduce both tables to the `n` highest-ranked attributes
    ///
    /// # Errors
    /// Fails if `n` is zero or info gain has not been calculated
    fn apply_info_gain(&mut self, n: usize) -> Result<()>;

    /// Cached attribute ranking
    fn info_gain(&self) -> Option<&InfoGainTable>;

    /// Current training table
    fn training_table(&self) -> Option<&FeatureTable>;

    /// Current test table
    fn test_table(&self) -> Option<&FeatureTable>;

    /// Mutable training table
    fn training_table_mut(&mut self) -> Option<&mut FeatureTable>;

    /// Mutable test table
    fn test_table_mut(&mut self) -> Option<&mut FeatureTable>;

    /// Replace the training table
    fn set_training_table(&mut self, table: FeatureTable);

    /// Replace the test table
    fn set_test_table(&mut self, table: FeatureTable);

    /// Current document collection
    fn problem_set(&self) -> Option<&ProblemSet>;

    /// Mutable document collection
    fn problem_set_mut(&mut self) -> Option<&mut ProblemSet>;
}
