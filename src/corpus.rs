//! Document collections (problem sets)
//!
//! A [`ProblemSet`] holds the training documents, grouped by author, and the
//! test documents of one attribution problem. Test documents whose author is
//! withheld carry the sentinel label [`UNKNOWN_AUTHOR`].
//!
//! ## File format
//!
//! ```toml
//! name = "enron"
//!
//! [[training]]
//! author = "alice"
//! path = "alice/01.txt"      # relative to this file
//!
//! [[training]]
//! author = "bob"
//! title = "bob-02"
//! text = "inline contents are fine too"
//!
//! [[test]]
//! path = "unknown/01.txt"    # no author: withheld
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Reserved author label for documents of unknown authorship
pub const UNKNOWN_AUTHOR: &str = "_Unknown_";

/// A single authored (or unattributed) document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    title: String,
    author: String,
    text: Option<String>,
    path: Option<PathBuf>,
}

impl Document {
    /// Document with inline contents
    #[must_use]
    pub fn new(title: impl Into<String>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            text: Some(text.into()),
            path: None,
        }
    }

    /// Document whose contents live on disk and are read on demand
    #[must_use]
    pub fn from_file(
        title: impl Into<String>,
        author: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            text: None,
            path: Some(path.into()),
        }
    }

    /// Document title, used as its identifier in prediction results
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author label
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// True when the author is withheld
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.author == UNKNOWN_AUTHOR
    }

    /// Source path, for file-backed documents
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True once the contents are held in memory
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.text.is_some()
    }

    /// Document contents, reading the backing file if not yet loaded
    ///
    /// # Errors
    /// Returns error if the document has neither contents nor a readable path
    pub fn contents(&self) -> Result<Cow<'_, str>> {
        if let Some(text) = &self.text {
            return Ok(Cow::Borrowed(text));
        }
        match &self.path {
            Some(path) => Ok(Cow::Owned(std::fs::read_to_string(path)?)),
            None => Err(Error::Configuration(format!(
                "Document '{}' has no contents",
                self.title
            ))),
        }
    }

    /// Read the backing file into memory
    ///
    /// # Errors
    /// Returns error if the file cannot be read
    pub fn load(&mut self) -> Result<()> {
        if self.text.is_none() {
            let text = self.contents()?.into_owned();
            self.text = Some(text);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    name: Option<String>,
    #[serde(default)]
    training: Vec<DocumentEntry>,
    #[serde(default)]
    test: Vec<DocumentEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentEntry {
    title: Option<String>,
    author: Option<String>,
    text: Option<String>,
    path: Option<PathBuf>,
}

impl DocumentEntry {
    fn into_document(self, base: &Path, default_author: Option<&str>, ordinal: usize) -> Result<Document> {
        let author = self
            .author
            .or_else(|| default_author.map(str::to_string))
            .ok_or_else(|| {
                Error::Configuration(format!("Training document #{ordinal} has no author"))
            })?;
        let title = self
            .title
            .or_else(|| {
                self.path
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| format!("doc-{ordinal}"));

        match (self.text, self.path) {
            (Some(text), None) => Ok(Document::new(title, author, text)),
            (None, Some(path)) => Ok(Document::from_file(title, author, base.join(path))),
            _ => Err(Error::Configuration(format!(
                "Document '{title}' must set exactly one of 'text' or 'path'"
            ))),
        }
    }
}

/// A collection of training and test documents for one attribution problem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSet {
    name: String,
    training: BTreeMap<String, Vec<Document>>,
    test: Vec<Document>,
}

impl ProblemSet {
    /// Create an empty problem set
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a problem set definition from a TOML file
    ///
    /// Relative document paths resolve against the file's directory. With
    /// `load_contents`, every file-backed document is read immediately.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or (with
    /// `load_contents`) a document file cannot be read
    pub fn from_path<P: AsRef<Path>>(path: P, load_contents: bool) -> Result<Self> {
        let path = path.as_ref();
        let manifest: Manifest = toml::from_str(&std::fs::read_to_string(path)?)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let name = manifest.name.unwrap_or_else(|| {
            path.file_stem()
                .map_or_else(|| "problem-set".to_string(), |s| s.to_string_lossy().into_owned())
        });
        let mut set = Self::new(name);
        for (i, entry) in manifest.training.into_iter().enumerate() {
            set.add_training(entry.into_document(base, None, i)?);
        }
        for (i, entry) in manifest.test.into_iter().enumerate() {
            set.add_test(entry.into_document(base, Some(UNKNOWN_AUTHOR), i)?);
        }
        if load_contents {
            set.load_all()?;
        }

        tracing::debug!(
            path = %path.display(),
            authors = set.training.len(),
            training = set.num_training_documents(),
            test = set.test.len(),
            "Loaded problem set"
        );
        Ok(set)
    }

    /// Problem set name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a training document under its author
    pub fn add_training(&mut self, document: Document) {
        self.training
            .entry(document.author().to_string())
            .or_default()
            .push(document);
    }

    /// Add a test document
    pub fn add_test(&mut self, document: Document) {
        self.test.push(document);
    }

    /// Author labels of the training documents, in sorted order
    #[must_use]
    pub fn authors(&self) -> Vec<&str> {
        self.training.keys().map(String::as_str).collect()
    }

    /// Training documents grouped by author, in author order
    pub fn training_documents(&self) -> impl Iterator<Item = &Document> {
        self.training.values().flatten()
    }

    /// Number of training documents
    #[must_use]
    pub fn num_training_documents(&self) -> usize {
        self.training.values().map(Vec::len).sum()
    }

    /// Test documents in insertion order
    #[must_use]
    pub fn test_documents(&self) -> &[Document] {
        &self.test
    }

    /// True if the set has test documents
    #[must_use]
    pub fn has_test_documents(&self) -> bool {
        !self.test.is_empty()
    }

    /// Identifiers (titles) of the test documents, in table row order
    #[must_use]
    pub fn test_titles(&self) -> Vec<String> {
        self.test.iter().map(|d| d.title().to_string()).collect()
    }

    /// Remove an author label and its training documents
    ///
    /// Returns `false` when the label was not present.
    pub fn remove_author(&mut self, label: &str) -> bool {
        self.training.remove(label).is_some()
    }

    /// Read every file-backed document into memory
    ///
    /// # Errors
    /// Returns error on the first document that cannot be read
    pub fn load_all(&mut self) -> Result<()> {
        for doc in self.training.values_mut().flatten().chain(self.test.iter_mut()) {
            doc.load()?;
        }
        Ok(())
    }
}
