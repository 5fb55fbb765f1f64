//! Classifier registry
//!
//! Maps stable identifiers to factories. A factory declares up front which
//! capability it produces, so resolving a name never needs to inspect the
//! resulting value.

use super::{
    Analyzer, AuthorProfileAnalyzer, Classifier, ClassifierAnalyzer, NaiveBayes,
    NearestCentroid, ZeroR,
};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Output of a registry factory
pub enum ResolvedClassifier {
    /// Library classifier; the experiment wraps it in a [`ClassifierAnalyzer`]
    Library(Box<dyn Classifier>),
    /// Specialized analyzer, used as-is
    Specialized(Box<dyn Analyzer>),
}

impl std::fmt::Debug for ResolvedClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library(c) => f.debug_tuple("Library").field(&c.name()).finish(),
            Self::Specialized(a) => f.debug_tuple("Specialized").field(&a.name()).finish(),
        }
    }
}

impl ResolvedClassifier {
    /// Analyzer ready to run the evaluation protocols
    #[must_use]
    pub fn into_analyzer(self) -> Box<dyn Analyzer> {
        match self {
            Self::Library(classifier) => Box::new(ClassifierAnalyzer::new(classifier)),
            Self::Specialized(analyzer) => analyzer,
        }
    }
}

/// Constructor registered under an identifier
pub type ClassifierFactory = Arc<dyn Fn() -> Result<ResolvedClassifier> + Send + Sync>;

/// Identifier → factory table
#[derive(Clone, Default)]
pub struct ClassifierRegistry {
    factories: BTreeMap<String, ClassifierFactory>,
}

impl std::fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

impl ClassifierRegistry {
    /// Registry with no entries
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in classifiers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("zero-r", || {
            Ok(ResolvedClassifier::Library(Box::new(ZeroR::new())))
        });
        registry.register("naive-bayes", || {
            Ok(ResolvedClassifier::Library(Box::new(NaiveBayes::new())))
        });
        registry.register("nearest-centroid", || {
            Ok(ResolvedClassifier::Library(Box::new(NearestCentroid::new())))
        });
        registry.register("author-profile", || {
            Ok(ResolvedClassifier::Specialized(Box::new(
                AuthorProfileAnalyzer::new(),
            )))
        });
        registry
    }

    /// Register (or replace) a factory
    pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<ResolvedClassifier> + Send + Sync + 'static,
    {
        self.factories.insert(identifier.into(), Arc::new(factory));
    }

    /// Registered identifiers, sorted
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// True if `identifier` is registered
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Instantiate the classifier registered under `identifier`
    ///
    /// # Errors
    /// Returns [`Error::Resolution`] if the identifier is unknown or its
    /// factory fails
    pub fn resolve(&self, identifier: &str) -> Result<ResolvedClassifier> {
        let factory = self.factories.get(identifier).ok_or_else(|| {
            Error::Resolution(format!(
                "Unknown classifier '{identifier}' (known: {})",
                self.identifiers().join(", ")
            ))
        })?;
        factory().map_err(|e| match e {
            Error::Resolution(_) => e,
            other => Error::Resolution(format!("Cannot instantiate '{identifier}': {other}")),
        })
    }
}
