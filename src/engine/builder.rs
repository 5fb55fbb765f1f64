//! Bundled extraction engine
//!
//! Stages 1, 4 and 5 fan out over documents on a dedicated rayon pool sized
//! by [`ExtractionEngine::set_num_threads`]. Stages 2 and 3 are cheap
//! aggregations and run on the calling thread.

use super::{compute_info_gain, ExtractionEngine, InfoGainTable, Stage};
use crate::corpus::{Document, ProblemSet};
use crate::driver::FeatureDriver;
use crate::table::{Attribute, AttributeKind, FeatureTable, Row};
use crate::{Error, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Name of the trailing class attribute
pub const CLASS_ATTRIBUTE: &str = "author";

/// Name of the optional leading title attribute
pub const TITLE_ATTRIBUTE: &str = "title";

type EventCounts = FxHashMap<String, usize>;

/// Events of one document, per feature
#[derive(Debug, Clone)]
struct DocumentEvents {
    title: String,
    author: String,
    counts: Vec<EventCounts>,
    totals: Vec<usize>,
}

/// Default [`ExtractionEngine`]
#[derive(Debug)]
pub struct TableBuilder {
    problem_set: Option<ProblemSet>,
    driver: Option<FeatureDriver>,
    use_doc_titles: bool,
    load_doc_contents: bool,
    use_sparse: bool,
    num_threads: usize,
    training_events: Option<Vec<DocumentEvents>>,
    test_events: Option<Vec<DocumentEvents>>,
    relevant_events: Option<Vec<Vec<String>>>,
    attributes: Option<Vec<Attribute>>,
    training: Option<FeatureTable>,
    test: Option<FeatureTable>,
    info_gain: Option<InfoGainTable>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Engine with no inputs, sparse rows, and 4 threads
    #[must_use]
    pub const fn new() -> Self {
        Self {
            problem_set: None,
            driver: None,
            use_doc_titles: false,
            load_doc_contents: false,
            use_sparse: true,
            num_threads: 4,
            training_events: None,
            test_events: None,
            relevant_events: None,
            attributes: None,
            training: None,
            test: None,
            info_gain: None,
        }
    }

    /// Events selected per feature by stage 2
    #[must_use]
    pub fn relevant_events(&self) -> Option<&[Vec<String>]> {
        self.relevant_events.as_deref()
    }

    /// Attribute vocabulary built by stage 3
    #[must_use]
    pub fn attributes(&self) -> Option<&[Attribute]> {
        self.attributes.as_deref()
    }

    fn clear_derived(&mut self) {
        self.training_events = None;
        self.test_events = None;
        self.relevant_events = None;
        self.attributes = None;
        self.training = None;
        self.test = None;
        self.info_gain = None;
    }

    fn pool(&self, stage: Stage) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads.max(1))
            .build()
            .map_err(|e| Error::stage(stage.name(), format!("cannot start worker pool: {e}")))
    }

    fn extract_all(
        pool: &rayon::ThreadPool,
        driver: &FeatureDriver,
        documents: &[&Document],
    ) -> Result<Vec<DocumentEvents>> {
        pool.install(|| {
            documents
                .par_iter()
                .map(|doc| extract_document(driver, doc))
                .collect()
        })
    }

    fn build_table(&self, stage: Stage, events: &[DocumentEvents]) -> Result<FeatureTable> {
        let (Some(attributes), Some(relevant), Some(driver), Some(problem_set)) = (
            self.attributes.as_ref(),
            self.relevant_events.as_ref(),
            self.driver.as_ref(),
            self.problem_set.as_ref(),
        ) else {
            return Err(Error::stage(
                stage.name(),
                "attributes have not been initialized",
            ));
        };

        let mut table = FeatureTable::new(problem_set.name(), attributes.clone());
        let class_index = attributes.len() - 1;
        let class_attr = &attributes[class_index];

        let pool = self.pool(stage)?;
        let numeric: Vec<Vec<f64>> = pool.install(|| {
            events
                .par_iter()
                .map(|doc| feature_values(driver, relevant, doc))
                .collect()
        });

        for (doc, values) in events.iter().zip(numeric) {
            let mut row = Vec::with_capacity(attributes.len());
            if self.use_doc_titles {
                row.push(table.intern_string(doc.title.clone()));
            }
            row.extend(values);
            #[allow(clippy::cast_precision_loss)]
            row.push(
                class_attr
                    .label_index(&doc.author)
                    .map_or(f64::NAN, |i| i as f64),
            );
            debug_assert_eq!(row.len(), attributes.len());

            let row = if self.use_sparse {
                Row::sparse_from_dense(&row)
            } else {
                Row::Dense(row)
            };
            table
                .push_row(row)
                .map_err(|e| Error::stage(stage.name(), e.to_string()))?;
        }
        table
            .set_class_index(class_index)
            .map_err(|e| Error::stage(stage.name(), e.to_string()))?;
        Ok(table)
    }
}

fn extract_document(driver: &FeatureDriver, doc: &Document) -> Result<DocumentEvents> {
    let text = doc.contents().map_err(|e| {
        Error::stage(
            Stage::ExtractEvents.name(),
            format!("cannot read document '{}': {e}", doc.title()),
        )
    })?;
    let mut counts = Vec::with_capacity(driver.features.len());
    let mut totals = Vec::with_capacity(driver.features.len());
    for spec in &driver.features {
        let events = spec.events.extract(&text);
        totals.push(events.len());
        let mut map = EventCounts::default();
        for event in events {
            *map.entry(event).or_insert(0) += 1;
        }
        counts.push(map);
    }
    Ok(DocumentEvents {
        title: doc.title().to_string(),
        author: doc.author().to_string(),
        counts,
        totals,
    })
}

#[allow(clippy::cast_precision_loss)]
fn feature_values(driver: &FeatureDriver, relevant: &[Vec<String>], doc: &DocumentEvents) -> Vec<f64> {
    driver
        .features
        .iter()
        .zip(relevant)
        .enumerate()
        .flat_map(|(f, (spec, events))| {
            let total = doc.totals[f];
            events.iter().map(move |event| {
                let count = doc.counts[f].get(event).copied().unwrap_or(0) as f64;
                if spec.normalize && total > 0 {
                    count / total as f64
                } else {
                    count
                }
            })
        })
        .collect()
}

impl ExtractionEngine for TableBuilder {
    fn set_problem_set(&mut self, problem_set: ProblemSet) {
        self.problem_set = Some(problem_set);
        self.clear_derived();
    }

    fn set_feature_driver(&mut self, driver: FeatureDriver) {
        self.driver = Some(driver);
        self.clear_derived();
    }

    fn set_use_doc_titles(&mut self, use_doc_titles: bool) {
        self.use_doc_titles = use_doc_titles;
    }

    fn set_load_doc_contents(&mut self, load: bool) {
        self.load_doc_contents = load;
    }

    fn set_use_sparse(&mut self, sparse: bool) {
        self.use_sparse = sparse;
    }

    fn set_num_threads(&mut self, threads: usize) {
        self.num_threads = threads.max(1);
    }

    fn extract_events(&mut self) -> Result<()> {
        let stage = Stage::ExtractEvents;
        let load = self.load_doc_contents;
        let problem_set = self
            .problem_set
            .as_mut()
            .ok_or_else(|| Error::stage(stage.name(), "no problem set is configured"))?;
        if load {
            problem_set
                .load_all()
                .map_err(|e| Error::stage(stage.name(), e.to_string()))?;
        }
        let (Some(driver), Some(problem_set)) = (self.driver.as_ref(), self.problem_set.as_ref())
        else {
            return Err(Error::stage(stage.name(), "no feature driver is configured"));
        };

        let pool = self.pool(stage)?;
        let training_docs: Vec<&Document> = problem_set.training_documents().collect();
        let test_docs: Vec<&Document> = problem_set.test_documents().iter().collect();
        let training = Self::extract_all(&pool, driver, &training_docs)?;
        let test = Self::extract_all(&pool, driver, &test_docs)?;

        tracing::debug!(
            training = training.len(),
            test = test.len(),
            threads = self.num_threads,
            "Extracted events"
        );
        self.training_events = Some(training);
        self.test_events = Some(test);
        self.relevant_events = None;
        self.attributes = None;
        Ok(())
    }

    fn select_relevant_events(&mut self) -> Result<()> {
        let stage = Stage::SelectRelevantEvents;
        let (Some(events), Some(driver)) = (self.training_events.as_ref(), self.driver.as_ref())
        else {
            return Err(Error::stage(stage.name(), "events have not been extracted"));
        };
        if events.is_empty() {
            return Err(Error::stage(stage.name(), "problem set has no training documents"));
        }

        let relevant = driver
            .features
            .iter()
            .enumerate()
            .map(|(f, spec)| {
                let mut totals = EventCounts::default();
                for doc in events {
                    for (event, count) in &doc.counts[f] {
                        *totals.entry(event.clone()).or_insert(0) += count;
                    }
                }
                let mut ranked: Vec<(String, usize)> = totals.into_iter().collect();
                ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                if let Some(top) = spec.top {
                    ranked.truncate(top);
                }
                ranked.into_iter().map(|(event, _)| event).collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            events = relevant.iter().map(Vec::len).sum::<usize>(),
            "Selected relevant events"
        );
        self.relevant_events = Some(relevant);
        self.attributes = None;
        Ok(())
    }

    fn initialize_attributes(&mut self) -> Result<()> {
        let stage = Stage::InitializeAttributes;
        let (Some(relevant), Some(driver), Some(problem_set)) = (
            self.relevant_events.as_ref(),
            self.driver.as_ref(),
            self.problem_set.as_ref(),
        ) else {
            return Err(Error::stage(stage.name(), "relevant events have not been selected"));
        };

        let labels: Vec<String> = problem_set.authors().into_iter().map(str::to_string).collect();
        if labels.is_empty() {
            return Err(Error::stage(stage.name(), "no author labels to classify"));
        }

        let mut attributes = Vec::new();
        if self.use_doc_titles {
            attributes.push(Attribute::string(TITLE_ATTRIBUTE));
        }
        for (spec, events) in driver.features.iter().zip(relevant) {
            attributes.extend(
                events
                    .iter()
                    .map(|event| Attribute::numeric(format!("{}{{{event}}}", spec.name))),
            );
        }
        attributes.push(Attribute::nominal(CLASS_ATTRIBUTE, labels));

        tracing::debug!(attributes = attributes.len(), "Initialized attributes");
        self.attributes = Some(attributes);
        Ok(())
    }

    fn build_training_table(&mut self) -> Result<()> {
        let stage = Stage::BuildTrainingTable;
        let events = self
            .training_events
            .as_ref()
            .ok_or_else(|| Error::stage(stage.name(), "events have not been extracted"))?;
        let table = self.build_table(stage, events)?;
        tracing::debug!(
            instances = table.num_instances(),
            attributes = table.num_attributes(),
            "Built training table"
        );
        self.training = Some(table);
        self.info_gain = None;
        Ok(())
    }

    fn build_test_table(&mut self) -> Result<()> {
        let stage = Stage::BuildTestTable;
        let events = self
            .test_events
            .as_ref()
            .ok_or_else(|| Error::stage(stage.name(), "events have not been extracted"))?;
        if events.is_empty() {
            self.test = None;
            return Ok(());
        }
        let table = self.build_table(stage, events)?;
        tracing::debug!(instances = table.num_instances(), "Built test table");
        self.test = Some(table);
        Ok(())
    }

    fn calculate_info_gain(&mut self) -> Result<()> {
        let training = self
            .training
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("no training table to rank".to_string()))?;
        self.info_gain = Some(compute_info_gain(training)?);
        Ok(())
    }

    fn apply_info_gain(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(Error::InvalidInput(
                "number of attributes to keep must be greater than 0".to_string(),
            ));
        }
        let (Some(gains), Some(training)) = (self.info_gain.as_ref(), self.training.as_ref())
        else {
            return Err(Error::InvalidInput(
                "info gain has not been calculated".to_string(),
            ));
        };

        // Non-numeric columns (title, class) always survive
        let mut keep = gains.top(n);
        keep.extend(
            training
                .attributes()
                .iter()
                .enumerate()
                .filter(|(_, a)| !matches!(a.kind(), AttributeKind::Numeric))
                .map(|(i, _)| i),
        );
        keep.sort_unstable();
        keep.dedup();

        let reduced_training = training.select_attributes(&keep)?;
        let reduced_test = self
            .test
            .as_ref()
            .map(|t| t.select_attributes(&keep))
            .transpose()?;
        let reindexed = gains.reindex(|old| keep.binary_search(&old).ok());

        tracing::info!(
            kept = reduced_training.num_attributes(),
            requested = n,
            "Applied info gain"
        );
        self.training = Some(reduced_training);
        self.test = reduced_test;
        self.info_gain = Some(reindexed);
        Ok(())
    }

    fn info_gain(&self) -> Option<&InfoGainTable> {
        self.info_gain.as_ref()
    }

    fn training_table(&self) -> Option<&FeatureTable> {
        self.training.as_ref()
    }

    fn test_table(&self) -> Option<&FeatureTable> {
        self.test.as_ref()
    }

    fn training_table_mut(&mut self) -> Option<&mut FeatureTable> {
        self.training.as_mut()
    }

    fn test_table_mut(&mut self) -> Option<&mut FeatureTable> {
        self.test.as_mut()
    }

    fn set_training_table(&mut self, table: FeatureTable) {
        self.training = Some(table);
        self.info_gain = None;
    }

    fn set_test_table(&mut self, table: FeatureTable) {
        self.test = Some(table);
    }

    fn problem_set(&self) -> Option<&ProblemSet> {
        self.problem_set.as_ref()
    }

    fn problem_set_mut(&mut self) -> Option<&mut ProblemSet> {
        self.problem_set.as_mut()
    }
}
