//! End-to-end experiment scenarios
//!
//! Each test builds an experiment from in-memory documents (or files in a
//! temporary directory), prepares it, runs one analysis mode, and checks the
//! stored outcome and reports.

use stylo_lab::analyzer::{Classifier, ClassifierRegistry, ResolvedClassifier};
use stylo_lab::corpus::{Document, ProblemSet, UNKNOWN_AUTHOR};
use stylo_lab::driver::{EventKind, FeatureDriver, FeatureSpec};
use stylo_lab::engine::{ExtractionEngine, InfoGainTable, Stage};
use stylo_lab::table::FeatureTable;
use stylo_lab::{AnalysisMode, Error, EvaluationOutcome, Experiment, ExperimentFile, Result};

// ============================================================================
// Fixtures
// ============================================================================

const ALICE: [&str; 3] = [
    "the cat sat on the mat and the cat slept",
    "the cat chased the mouse round the mat",
    "a cat and the cat sat by the door",
];

const BOB: [&str; 3] = [
    "my dog barked at every bird in sight",
    "every dog in town barked at my bird",
    "a bird sang while my dog barked loudly",
];

fn training_set() -> ProblemSet {
    let mut set = ProblemSet::new("scenario");
    for (i, text) in ALICE.iter().enumerate() {
        set.add_training(Document::new(format!("alice-{i}"), "alice", *text));
    }
    for (i, text) in BOB.iter().enumerate() {
        set.add_training(Document::new(format!("bob-{i}"), "bob", *text));
    }
    set
}

fn words() -> FeatureDriver {
    FeatureDriver::new("words", vec![FeatureSpec::new("Words", EventKind::Words)]).unwrap()
}

/// Always predicts the first class label
#[derive(Debug, Default)]
struct FirstLabel {
    classes: Option<usize>,
}

impl Classifier for FirstLabel {
    fn name(&self) -> &str {
        "first-label"
    }

    fn fit(&mut self, table: &FeatureTable) -> Result<()> {
        let labels = table
            .class_labels()
            .ok_or_else(|| Error::Evaluation("no class attribute".to_string()))?;
        self.classes = Some(labels.len());
        Ok(())
    }

    fn distribution(&self, _table: &FeatureTable, _row: usize) -> Result<Vec<f64>> {
        let classes = self
            .classes
            .ok_or_else(|| Error::Evaluation("not fitted".to_string()))?;
        let mut dist = vec![0.0; classes];
        dist[0] = 1.0;
        Ok(dist)
    }

    fn fresh(&self) -> Box<dyn Classifier> {
        Box::new(Self::default())
    }
}

/// Engine whose second stage always fails
struct BrokenEngine;

impl ExtractionEngine for BrokenEngine {
    fn set_problem_set(&mut self, _problem_set: ProblemSet) {}
    fn set_feature_driver(&mut self, _driver: FeatureDriver) {}
    fn set_use_doc_titles(&mut self, _use_doc_titles: bool) {}
    fn set_load_doc_contents(&mut self, _load: bool) {}
    fn set_use_sparse(&mut self, _sparse: bool) {}
    fn set_num_threads(&mut self, _threads: usize) {}

    fn extract_events(&mut self) -> Result<()> {
        Ok(())
    }

    fn select_relevant_events(&mut self) -> Result<()> {
        Err(Error::stage(
            Stage::SelectRelevantEvents.name(),
            "vocabulary is empty",
        ))
    }

    fn initialize_attributes(&mut self) -> Result<()> {
        panic!("stage must not run after a failure");
    }

    fn build_training_table(&mut self) -> Result<()> {
        panic!("stage must not run after a failure");
    }

    fn build_test_table(&mut self) -> Result<()> {
        panic!("stage must not run after a failure");
    }

    fn calculate_info_gain(&mut self) -> Result<()> {
        Err(Error::InvalidInput("no training table".to_string()))
    }

    fn apply_info_gain(&mut self, _n: usize) -> Result<()> {
        Err(Error::InvalidInput("no ranking".to_string()))
    }

    fn info_gain(&self) -> Option<&InfoGainTable> {
        None
    }
    fn training_table(&self) -> Option<&FeatureTable> {
        None
    }
    fn test_table(&self) -> Option<&FeatureTable> {
        None
    }
    fn training_table_mut(&mut self) -> Option<&mut FeatureTable> {
        None
    }
    fn test_table_mut(&mut self) -> Option<&mut FeatureTable> {
        None
    }
    fn set_training_table(&mut self, _table: FeatureTable) {}
    fn set_test_table(&mut self, _table: FeatureTable) {}
    fn problem_set(&self) -> Option<&ProblemSet> {
        None
    }
    fn problem_set_mut(&mut self) -> Option<&mut ProblemSet> {
        None
    }
}

// ============================================================================
// Cross-validation
// ============================================================================

#[test]
fn test_cross_validation_with_constant_classifier() {
    let mut experiment = Experiment::builder()
        .problem_set(training_set())
        .feature_driver(words())
        .classifier(Box::new(FirstLabel::default()))
        .analysis_mode(AnalysisMode::CrossValidation)
        .num_folds(3)
        .build()
        .unwrap();

    let report = experiment.prepare_instances();
    assert!(report.is_complete());
    assert_eq!(report.completed(), &Stage::ALL);
    assert!(experiment.test_table().is_none());

    let outcome = experiment.run().unwrap();
    let EvaluationOutcome::CrossValidated(eval) = outcome else {
        panic!("expected a cross-validation outcome, got {outcome:?}");
    };
    assert_eq!(eval.labels(), ["alice".to_string(), "bob".to_string()]);
    assert_eq!(eval.confusion_matrix(), [vec![3.0, 0.0], vec![3.0, 0.0]]);

    let accuracy: f64 = experiment.classification_accuracy().unwrap().parse().unwrap();
    assert!((0.0..=100.0).contains(&accuracy));
    assert_eq!(experiment.classification_accuracy().unwrap(), "50.0000");

    let stats = experiment.stat_string().unwrap();
    assert!(stats.contains("=== Confusion Matrix ==="));
    assert!(stats.contains("a = alice"));
}

#[test]
fn test_cross_validation_by_name_separates_authors() {
    let mut experiment = Experiment::builder()
        .problem_set(training_set())
        .feature_driver(words())
        .classifier_name("nearest-centroid")
        .num_folds(3)
        .build()
        .unwrap();

    assert!(experiment.prepare_instances().is_complete());
    assert!(matches!(experiment.run(), Err(Error::Evaluation(_))));

    experiment.prepare_analyzer().unwrap();
    experiment.run().unwrap();
    assert_eq!(experiment.classification_accuracy().unwrap(), "100.0000");
    assert!(experiment.predictions().is_none());
}

#[test]
fn test_repeated_runs_are_deterministic() {
    let mut experiment = Experiment::builder()
        .problem_set(training_set())
        .feature_driver(words())
        .classifier_name("naive-bayes")
        .num_folds(3)
        .build()
        .unwrap();
    experiment.prepare_instances();
    experiment.prepare_analyzer().unwrap();

    let first = experiment.run().unwrap().clone();
    let second = experiment.run().unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(experiment.history().run_count(), 2);
}

// ============================================================================
// Train-test-unknown
// ============================================================================

#[test]
fn test_unknown_document_scores_every_author() {
    let mut set = training_set();
    set.add_test(Document::new("mystery", UNKNOWN_AUTHOR, "the cat sat on my mat"));

    let mut experiment = Experiment::builder()
        .problem_set(set)
        .feature_driver(words())
        .classifier_name("naive-bayes")
        .analysis_mode(AnalysisMode::TrainTestUnknown)
        .build()
        .unwrap();
    assert!(experiment.prepare_instances().is_complete());
    experiment.prepare_analyzer().unwrap();
    experiment.run().unwrap();

    let predictions = experiment.predictions().unwrap();
    assert_eq!(predictions.len(), 1);
    let scores = &predictions["mystery"];
    assert_eq!(scores.keys().collect::<Vec<_>>(), ["alice", "bob"]);
    assert!(scores["alice"] > scores["bob"]);

    // Predictions carry no evaluation
    assert!(experiment.evaluation().is_none());
    assert!(matches!(experiment.stat_string(), Err(Error::Reporting(_))));
    assert!(experiment.classification_accuracy().is_err());
}

#[test]
fn test_author_profile_analyzer_predictions() {
    let mut set = training_set();
    set.add_test(Document::new("q1", UNKNOWN_AUTHOR, "every bird and my dog"));
    set.add_test(Document::new("q2", UNKNOWN_AUTHOR, "the cat on the mat"));

    let mut experiment = Experiment::builder()
        .problem_set(set)
        .feature_driver(words())
        .classifier_name("author-profile")
        .analysis_mode(AnalysisMode::TrainTestUnknown)
        .build()
        .unwrap();
    experiment.prepare_instances();
    experiment.prepare_analyzer().unwrap();
    assert!(experiment.underlying_classifier().is_none());

    let predictions = experiment.run().unwrap().predictions().unwrap();
    assert!(predictions["q1"]["bob"] > predictions["q1"]["alice"]);
    assert!(predictions["q2"]["alice"] > predictions["q2"]["bob"]);
}

#[test]
fn test_duplicate_test_titles_are_rejected() {
    let mut set = training_set();
    set.add_test(Document::new("01.txt", UNKNOWN_AUTHOR, "the cat on the mat"));
    set.add_test(Document::new("01.txt", UNKNOWN_AUTHOR, "my dog and a bird"));

    let mut experiment = Experiment::builder()
        .problem_set(set)
        .feature_driver(words())
        .classifier_name("naive-bayes")
        .analysis_mode(AnalysisMode::TrainTestUnknown)
        .build()
        .unwrap();
    assert!(experiment.prepare_instances().is_complete());
    experiment.prepare_analyzer().unwrap();

    let err = experiment.run().unwrap_err();
    assert!(matches!(err, Error::Evaluation(ref m) if m.contains("01.txt")));
    assert!(experiment.predictions().is_none());
}

// ============================================================================
// Train-test-known
// ============================================================================

#[test]
fn test_train_test_known_removes_sentinel_and_reruns() {
    let mut set = training_set();
    set.add_training(Document::new("stray", UNKNOWN_AUTHOR, "nothing much here"));
    set.add_test(Document::new("alice-test", "alice", "the cat slept on the mat"));
    set.add_test(Document::new("bob-test", "bob", "my dog barked at a bird"));

    let mut experiment = Experiment::builder()
        .problem_set(set)
        .feature_driver(words())
        .classifier_name("nearest-centroid")
        .analysis_mode(AnalysisMode::TrainTestKnown)
        .build()
        .unwrap();
    assert!(experiment
        .problem_set()
        .unwrap()
        .authors()
        .contains(&UNKNOWN_AUTHOR));
    assert!(experiment.prepare_instances().is_complete());
    experiment.prepare_analyzer().unwrap();

    let outcome = experiment.run().unwrap();
    assert_eq!(outcome.mode(), AnalysisMode::TrainTestKnown);
    let eval = outcome.evaluation().unwrap();
    assert_eq!(eval.num_instances(), 2.0);
    assert_eq!(eval.labels(), ["alice".to_string(), "bob".to_string()]);
    assert!(!eval.labels().contains(&UNKNOWN_AUTHOR.to_string()));
    assert_eq!(eval.pct_correct(), 100.0);
    let training = experiment.training_table().unwrap();
    assert_eq!(training.num_instances(), 6);
    assert_eq!(training.class_labels().unwrap().len(), 2);
    assert!(!experiment
        .problem_set()
        .unwrap()
        .authors()
        .contains(&UNKNOWN_AUTHOR));

    // The label is already gone the second time round
    experiment.run().unwrap();
    assert!(experiment.evaluation().is_some());
    assert!(experiment.predictions().is_none());
    assert_eq!(experiment.history().run_count(), 2);
}

// ============================================================================
// Preparation failures
// ============================================================================

#[test]
fn test_failing_stage_stops_preparation() {
    let mut experiment = Experiment::builder()
        .problem_set(training_set())
        .feature_driver(words())
        .classifier(Box::new(FirstLabel::default()))
        .engine(Box::new(BrokenEngine))
        .build()
        .unwrap();

    let report = experiment.prepare_instances();
    assert!(!report.is_complete());
    assert_eq!(report.completed(), &[Stage::ExtractEvents]);
    let failure = report.failure().unwrap();
    assert_eq!(failure.stage, Stage::SelectRelevantEvents);
    assert!(failure.message.contains("vocabulary is empty"));
    assert_eq!(report.skipped().len(), 3);

    assert!(experiment.training_table().is_none());
    assert!(matches!(experiment.run(), Err(Error::Evaluation(_))));
    assert!(experiment.outcome().is_none());
}

#[test]
fn test_unreadable_problem_set_fails_first_stage() {
    let mut experiment = Experiment::builder()
        .problem_set_path("/nonexistent/problem-set.toml")
        .feature_driver(words())
        .classifier_name("zero-r")
        .build()
        .unwrap();

    let report = experiment.prepare_instances();
    assert!(report.completed().is_empty());
    assert_eq!(report.failure().unwrap().stage, Stage::ExtractEvents);
}

#[test]
fn test_unknown_classifier_leaves_analyzer_unset() {
    let mut experiment = Experiment::builder()
        .problem_set(training_set())
        .feature_driver(words())
        .classifier_name("support-vector-machine")
        .build()
        .unwrap();
    experiment.prepare_instances();

    assert!(matches!(
        experiment.prepare_analyzer(),
        Err(Error::Resolution(_))
    ));
    assert!(experiment.analyzer().is_none());
    assert!(experiment.run().is_err());
}

// ============================================================================
// Registry and info gain
// ============================================================================

#[test]
fn test_custom_registry_entry() {
    let mut registry = ClassifierRegistry::empty();
    registry.register("first-label", || {
        Ok(ResolvedClassifier::Library(Box::new(FirstLabel::default())))
    });

    let mut experiment = Experiment::builder()
        .problem_set(training_set())
        .feature_driver(words())
        .classifier_name("first-label")
        .num_folds(2)
        .registry(registry)
        .build()
        .unwrap();
    experiment.prepare_instances();
    experiment.prepare_analyzer().unwrap();
    assert_eq!(experiment.underlying_classifier().unwrap().name(), "first-label");

    experiment.run().unwrap();
    assert_eq!(experiment.evaluation().unwrap().correct(), 3.0);
}

#[test]
fn test_info_gain_reduces_both_tables() {
    let mut set = training_set();
    set.add_test(Document::new("mystery", UNKNOWN_AUTHOR, "the dog sat"));

    let mut experiment = Experiment::builder()
        .problem_set(set)
        .feature_driver(words())
        .classifier_name("naive-bayes")
        .analysis_mode(AnalysisMode::TrainTestUnknown)
        .use_doc_titles(true)
        .build()
        .unwrap();
    experiment.prepare_instances();
    assert!(matches!(
        experiment.readable_info_gain(false),
        Err(Error::Reporting(_))
    ));

    experiment.calc_info_gain().unwrap();
    let full = experiment.readable_info_gain(true).unwrap();
    let short = experiment.readable_info_gain(false).unwrap();
    assert!(short.lines().count() <= full.lines().count());
    assert!(full.starts_with(">-----InfoGain information: \n\n"));

    experiment.apply_info_gain(3).unwrap();
    let training = experiment.training_table().unwrap();
    let test = experiment.test_table().unwrap();
    // title, three words, author
    assert_eq!(training.num_attributes(), 5);
    assert_eq!(test.attributes(), training.attributes());
    assert_eq!(training.attribute(0).unwrap().name(), "title");
    assert_eq!(training.class_index(), Some(4));

    experiment.prepare_analyzer().unwrap();
    experiment.run().unwrap();
    assert_eq!(experiment.predictions().unwrap().len(), 1);
}

#[test]
fn test_apply_info_gain_requires_ranking() {
    let mut experiment = Experiment::builder()
        .problem_set(training_set())
        .feature_driver(words())
        .classifier_name("zero-r")
        .build()
        .unwrap();
    experiment.prepare_instances();
    assert!(experiment.apply_info_gain(2).is_err());
    experiment.calc_info_gain().unwrap();
    assert!(experiment.apply_info_gain(0).is_err());
}

// ============================================================================
// File-based experiments
// ============================================================================

#[test]
fn test_experiment_from_files() {
    let dir = tempfile::tempdir().unwrap();
    for (i, text) in ALICE.iter().enumerate() {
        std::fs::write(dir.path().join(format!("alice-{i}.txt")), text).unwrap();
    }
    for (i, text) in BOB.iter().enumerate() {
        std::fs::write(dir.path().join(format!("bob-{i}.txt")), text).unwrap();
    }
    std::fs::write(dir.path().join("unknown.txt"), "my dog and every bird").unwrap();

    let mut manifest = String::from("name = \"files\"\n");
    for i in 0..3 {
        manifest.push_str(&format!(
            "\n[[training]]\nauthor = \"alice\"\npath = \"alice-{i}.txt\"\n"
        ));
        manifest.push_str(&format!(
            "\n[[training]]\nauthor = \"bob\"\npath = \"bob-{i}.txt\"\n"
        ));
    }
    manifest.push_str("\n[[test]]\npath = \"unknown.txt\"\n");
    std::fs::write(dir.path().join("set.toml"), manifest).unwrap();
    std::fs::write(
        dir.path().join("driver.toml"),
        "name = \"words\"\n\n[[features]]\nname = \"Words\"\nevents = { kind = \"words\" }\n",
    )
    .unwrap();
    let experiment_path = dir.path().join("experiment.toml");
    std::fs::write(
        &experiment_path,
        "problem_set = \"set.toml\"\nfeature_driver = \"driver.toml\"\n\
         classifier = \"naive-bayes\"\nanalysis_mode = \"train-test-unknown\"\n\
         load_doc_contents = true\nnum_threads = 2\n",
    )
    .unwrap();

    let file = ExperimentFile::from_path(&experiment_path).unwrap();
    let mut experiment = file.into_builder().build().unwrap();
    assert_eq!(experiment.config().num_threads(), 2);
    assert_eq!(
        experiment.config().problem_set_path(),
        Some(dir.path().join("set.toml").as_path())
    );

    assert!(experiment.prepare_instances().is_complete());
    experiment.prepare_analyzer().unwrap();
    experiment.run().unwrap();

    let predictions = experiment.predictions().unwrap();
    let scores = &predictions["unknown.txt"];
    assert!(scores["bob"] > scores["alice"]);

    let arff = dir.path().join("training.arff");
    Experiment::write_arff(&arff, experiment.training_table().unwrap()).unwrap();
    let reloaded = stylo_lab::table::read_arff(&arff).unwrap();
    assert_eq!(reloaded.num_instances(), 6);

    let json = experiment.history().to_json().unwrap();
    assert!(json.contains("run-0001"));
}

#[test]
fn test_failed_run_history_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut experiment = Experiment::builder()
        .problem_set(training_set())
        .feature_driver(words())
        .classifier_name("naive-bayes")
        .analysis_mode(AnalysisMode::TrainTestUnknown)
        .build()
        .unwrap();
    assert!(experiment.prepare_instances().is_complete());
    experiment.prepare_analyzer().unwrap();
    assert!(experiment.run().is_err());

    let path = dir.path().join("history.json");
    experiment.history().write_json(&path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let runs = value["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(
        runs[0]["status"],
        serde_json::to_value(stylo_lab::tracking::RunStatus::Failed).unwrap()
    );
    assert!(runs[0]["error"].as_str().unwrap().contains("test table"));
}
