//! Error types for stylo-lab
//!
//! Each variant names the phase that failed so a caller can tell a bad
//! configuration apart from a stage that could not complete.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// stylo-lab error types
#[derive(Error, Debug)]
pub enum Error {
    /// A required input is missing or an input could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A preparation stage failed; later stages were not attempted
    #[error("Stage '{stage}' failed: {message}")]
    Stage {
        /// Name of the failing stage
        stage: String,
        /// What went wrong
        message: String,
    },

    /// The classifier identifier could not be turned into an analyzer
    #[error("Classifier resolution failed: {0}")]
    Resolution(String),

    /// Training, cross-validation, or scoring failed
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// A report was requested for a result that does not exist
    #[error("Reporting error: {0}")]
    Reporting(String),

    /// Malformed ARFF input
    #[error("ARFF parse error at line {line}: {message}")]
    ArffParse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML definition could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Arrow conversion error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Stage`] for the given stage name.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
