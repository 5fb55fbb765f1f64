//! Property-based tests for stylo-lab
//!
//! - Builder validation: `build` fails exactly when a required input is unset
//! - ARFF export preserves every value
//! - Info gain ranking and its listing stay consistent
//! - Run with `ProptestConfig::with_cases(100)` (the ARFF string property uses quickcheck)

use proptest::prelude::*;
use quickcheck::{QuickCheck, TestResult};
use stylo_lab::analyzer::NaiveBayes;
use stylo_lab::corpus::{Document, ProblemSet};
use stylo_lab::driver::{EventKind, FeatureDriver, FeatureSpec};
use stylo_lab::engine::compute_info_gain;
use stylo_lab::report::readable_info_gain;
use stylo_lab::table::{parse_arff, Attribute, FeatureTable, Row};
use stylo_lab::{Error, Experiment};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

const AUTHORS: [&str; 3] = ["alice", "bob", "carol"];

fn labels() -> Vec<String> {
    AUTHORS.iter().map(ToString::to_string).collect()
}

/// Numeric table with a nominal class in the last column
fn arb_table(max_rows: usize) -> impl Strategy<Value = FeatureTable> {
    (1usize..6, 1..=max_rows, any::<bool>()).prop_flat_map(|(columns, rows, sparse)| {
        proptest::collection::vec(
            (
                proptest::collection::vec(
                    prop_oneof![Just(0.0), -1.0e6f64..1.0e6, (0u32..20).prop_map(f64::from)],
                    columns,
                ),
                0usize..AUTHORS.len(),
            ),
            rows,
        )
        .prop_map(move |data| {
            let mut attributes: Vec<Attribute> = (0..columns)
                .map(|c| Attribute::numeric(format!("Words{{w{c}}}")))
                .collect();
            attributes.push(Attribute::nominal("author", labels()));
            let mut table = FeatureTable::new("generated", attributes);
            for (mut values, class) in data {
                #[allow(clippy::cast_precision_loss)]
                values.push(class as f64);
                let row = if sparse {
                    Row::sparse_from_dense(&values)
                } else {
                    Row::Dense(values)
                };
                table.push_row(row).unwrap();
            }
            table.set_class_index(columns).unwrap();
            table
        })
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: build fails iff a required input is missing, and the
    /// message names every missing one
    #[test]
    fn prop_build_fails_iff_input_missing(
        has_problem_set in any::<bool>(),
        has_driver in any::<bool>(),
        has_classifier in any::<bool>(),
    ) {
        let mut builder = Experiment::builder();
        if has_problem_set {
            let mut set = ProblemSet::new("p");
            set.add_training(Document::new("d", "alice", "text"));
            builder = builder.problem_set(set);
        }
        if has_driver {
            let driver = FeatureDriver::new("w", vec![FeatureSpec::new("Words", EventKind::Words)])
                .unwrap();
            builder = builder.feature_driver(driver);
        }
        if has_classifier {
            builder = builder.classifier(Box::new(NaiveBayes::new()));
        }

        match builder.build() {
            Ok(_) => prop_assert!(has_problem_set && has_driver && has_classifier),
            Err(Error::Configuration(message)) => {
                prop_assert!(!(has_problem_set && has_driver && has_classifier));
                prop_assert_eq!(message.contains("document collection"), !has_problem_set);
                prop_assert_eq!(message.contains("feature driver"), !has_driver);
                prop_assert_eq!(message.contains("classifier"), !has_classifier);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Property: exporting then parsing keeps every cell and the header
    #[test]
    fn prop_arff_export_preserves_values(table in arb_table(20)) {
        let reparsed = parse_arff(&table.to_arff_string()).unwrap();

        prop_assert_eq!(reparsed.relation(), table.relation());
        prop_assert_eq!(reparsed.attributes(), table.attributes());
        prop_assert_eq!(reparsed.num_instances(), table.num_instances());
        for row in 0..table.num_instances() {
            for col in 0..table.num_attributes() {
                prop_assert_eq!(reparsed.value(row, col), table.value(row, col));
            }
        }
    }

    /// Property: the ranking covers every numeric attribute, sorted by
    /// descending non-negative gain
    #[test]
    fn prop_info_gain_sorted_and_complete(table in arb_table(30)) {
        let gains = compute_info_gain(&table).unwrap();
        prop_assert_eq!(gains.len(), table.numeric_attribute_indices().len());
        for pair in gains.entries().windows(2) {
            prop_assert!(pair[0].gain >= pair[1].gain);
        }
        prop_assert!(gains.entries().iter().all(|e| e.gain >= 0.0));
    }

    /// Property: the short listing is a prefix of the full one holding
    /// exactly the leading non-zero entries
    #[test]
    fn prop_short_listing_is_prefix(table in arb_table(30)) {
        let gains = compute_info_gain(&table).unwrap();
        let short = readable_info_gain(Some(&gains), Some(&table), false).unwrap();
        let full = readable_info_gain(Some(&gains), Some(&table), true).unwrap();

        prop_assert!(full.starts_with(&short));
        let listed = short.lines().filter(|l| l.starts_with("> ")).count();
        let nonzero = gains.entries().iter().take_while(|e| e.gain != 0.0).count();
        prop_assert_eq!(listed, nonzero);
        prop_assert_eq!(full.lines().filter(|l| l.starts_with("> ")).count(), gains.len());
    }
}

// ============================================================================
// QuickCheck: string cells
// ============================================================================

#[allow(clippy::needless_pass_by_value)]
fn string_cell_survives_export(title: String, count: u16) -> TestResult {
    let mut table = FeatureTable::new(
        "titles",
        vec![Attribute::string("title"), Attribute::numeric("Words{x}")],
    );
    let pooled = table.intern_string(title.clone());
    if table.push_row(Row::Dense(vec![pooled, f64::from(count)])).is_err() {
        return TestResult::discard();
    }

    match parse_arff(&table.to_arff_string()) {
        Ok(reparsed) => TestResult::from_bool(
            reparsed.string_value(0, 0) == Some(title.as_str())
                && reparsed.value(0, 1) == f64::from(count),
        ),
        Err(e) => TestResult::error(e.to_string()),
    }
}

#[test]
fn qc_string_cells_survive_export() {
    QuickCheck::new()
        .tests(200)
        .quickcheck(string_cell_survives_export as fn(String, u16) -> TestResult);
}
