//! Feature drivers
//!
//! A [`FeatureDriver`] is the recipe for which stylometric events to pull out
//! of each document. Each [`FeatureSpec`] names one event family; the
//! extraction engine turns the events it selects into attributes named
//! `Feature{event}`.
//!
//! ## File format
//!
//! ```toml
//! name = "basic"
//!
//! [[features]]
//! name = "Words"
//! events = { kind = "words" }
//! top = 50
//!
//! [[features]]
//! name = "Bigrams"
//! events = { kind = "char-ngrams", n = 2 }
//! normalize = true
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Family of raw events extracted from a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EventKind {
    /// Lower-cased word tokens
    Words,
    /// Individual characters (whitespace excluded)
    Characters,
    /// Overlapping character n-grams
    CharNgrams {
        /// Gram length
        n: usize,
    },
    /// Overlapping lower-cased word n-grams, space-joined
    WordNgrams {
        /// Gram length
        n: usize,
    },
    /// Word lengths, one event per word
    WordLengths,
    /// Punctuation marks
    Punctuation,
}

impl EventKind {
    /// Raw events of `text`, in document order
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<String> {
        match self {
            Self::CharNgrams { n: 0 } | Self::WordNgrams { n: 0 } => Vec::new(),
            Self::Words => words(text).collect(),
            Self::Characters => text
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect(),
            Self::CharNgrams { n } => {
                let chars: Vec<char> = text.chars().collect();
                chars.windows(*n).map(|w| w.iter().collect()).collect()
            }
            Self::WordNgrams { n } => {
                let tokens: Vec<String> = words(text).collect();
                tokens.windows(*n).map(|w| w.join(" ")).collect()
            }
            Self::WordLengths => words(text).map(|w| w.chars().count().to_string()).collect(),
            Self::Punctuation => text
                .chars()
                .filter(char::is_ascii_punctuation)
                .map(String::from)
                .collect(),
        }
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// One event family and how to aggregate it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSpec {
    /// Attribute name prefix
    pub name: String,
    /// Which events to extract
    pub events: EventKind,
    /// Keep only the `top` most frequent events across the training documents
    #[serde(default)]
    pub top: Option<usize>,
    /// Divide counts by the document's event total
    #[serde(default)]
    pub normalize: bool,
}

impl FeatureSpec {
    /// Feature over `events` with raw counts and no culling
    #[must_use]
    pub fn new(name: impl Into<String>, events: EventKind) -> Self {
        Self {
            name: name.into(),
            events,
            top: None,
            normalize: false,
        }
    }

    /// Keep only the `top` most frequent events
    #[must_use]
    pub const fn with_top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    /// Use relative frequencies instead of counts
    #[must_use]
    pub const fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }
}

/// Recipe of stylometric features to extract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureDriver {
    /// Driver name
    pub name: String,
    /// Event families, in attribute order
    pub features: Vec<FeatureSpec>,
}

impl FeatureDriver {
    /// Build and validate a driver
    ///
    /// # Errors
    /// Returns error if the driver is invalid (see [`FeatureDriver::validate`])
    pub fn new(name: impl Into<String>, features: Vec<FeatureSpec>) -> Result<Self> {
        let driver = Self {
            name: name.into(),
            features,
        };
        driver.validate()?;
        Ok(driver)
    }

    /// Load a driver definition from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let driver: Self = toml::from_str(&std::fs::read_to_string(path.as_ref())?)?;
        driver.validate()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            features = driver.features.len(),
            "Loaded feature driver"
        );
        Ok(driver)
    }

    /// Check the driver is usable
    ///
    /// # Errors
    /// Returns error if there are no features, a name is repeated, or an
    /// n-gram length is zero
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(Error::Configuration(format!(
                "Feature driver '{}' defines no features",
                self.name
            )));
        }
        for (i, spec) in self.features.iter().enumerate() {
            if self.features[..i].iter().any(|s| s.name == spec.name) {
                return Err(Error::Configuration(format!(
                    "Feature '{}' is defined twice",
                    spec.name
                )));
            }
            if let EventKind::CharNgrams { n: 0 } | EventKind::WordNgrams { n: 0 } = spec.events {
                return Err(Error::Configuration(format!(
                    "Feature '{}' has an n-gram length of zero",
                    spec.name
                )));
            }
        }
        Ok(())
    }
}
