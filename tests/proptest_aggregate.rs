//! Property-based tests for the aggregator.
//!
//! Uses proptest to verify that:
//! - Snapshot totals equal the sum of the input suites
//! - Every index sums back to the totals
//! - Any permutation of the input serializes to byte-identical JSON
//! - Sharded aggregation merged together equals a single pass

use proptest::prelude::*;
use qa_pulse::aggregate::{AggregateSnapshot, Aggregator, IndexEntry, aggregate};
use qa_pulse::model::{
    Browser, CaseResult, CaseStatus, Environment, Labels, Origin, SuiteResult, Totals,
};
use qa_pulse::util::canonical_digest;
use std::collections::BTreeMap;

fn labeled_suite() -> impl Strategy<Value = (SuiteResult, Labels)> {
    (
        0u64..50,
        0u64..10,
        0u64..5,
        0u64..5_000,
        prop::sample::select(Environment::ALL.to_vec()),
        prop::sample::select(Browser::ALL.to_vec()),
        prop::sample::select(vec![Origin::Browser, Origin::Http]),
        "[a-z]{1,8}",
    )
        .prop_map(
            |(passed, failed, skipped, duration, environment, browser, origin, name)| {
                let suite = SuiteResult::leaf(
                    name.clone(),
                    Totals::new(passed, failed, skipped, duration),
                );
                let labels = Labels {
                    environment,
                    browser,
                    origin,
                    source: format!("{name}/results.json"),
                };
                (suite, labels)
            },
        )
}

/// A suite of cases, some tagged with a browser from their project name.
fn tagged_suite() -> impl Strategy<Value = (SuiteResult, Labels)> {
    let case = (
        prop::sample::select(vec![CaseStatus::Passed, CaseStatus::Failed, CaseStatus::Skipped]),
        prop::option::of(prop::sample::select(Browser::ALL.to_vec())),
        0u64..2_000,
    );
    (
        prop::collection::vec(case, 0..6),
        prop::sample::select(Environment::ALL.to_vec()),
        prop::sample::select(Browser::ALL.to_vec()),
        "[a-c]{1,2}",
    )
        .prop_map(|(cases, environment, browser, name)| {
            let mut suite = SuiteResult::new(name.clone());
            for (i, (status, tagged, duration)) in cases.into_iter().enumerate() {
                let mut case = CaseResult::new(format!("case {i}"), Some(status), duration);
                case.browser = tagged;
                suite.push_case(case);
            }
            let labels = Labels {
                environment,
                browser,
                origin: Origin::Browser,
                source: format!("{}/{name}-results.json", environment.as_str()),
            };
            (suite, labels)
        })
}

fn any_suite() -> impl Strategy<Value = (SuiteResult, Labels)> {
    prop_oneof![labeled_suite(), tagged_suite()]
}

fn fold(inputs: &[(SuiteResult, Labels)]) -> AggregateSnapshot {
    aggregate(inputs.iter().map(|(s, l)| (s, l)))
}

fn index_sum<K>(index: &BTreeMap<K, IndexEntry>) -> Totals {
    index.values().fold(Totals::default(), |mut acc, entry| {
        acc.absorb(&entry.totals);
        acc
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn totals_are_the_sum_of_suites(inputs in prop::collection::vec(labeled_suite(), 0..12)) {
        let snapshot = fold(&inputs);
        let expected = inputs.iter().fold(Totals::default(), |mut acc, (suite, _)| {
            acc.absorb(&suite.totals);
            acc
        });
        prop_assert_eq!(snapshot.totals, expected);
        prop_assert_eq!(snapshot.totals.total,
            snapshot.totals.passed + snapshot.totals.failed + snapshot.totals.skipped);
    }

    #[test]
    fn every_index_sums_to_totals(inputs in prop::collection::vec(any_suite(), 0..12)) {
        let snapshot = fold(&inputs);
        prop_assert_eq!(index_sum(&snapshot.by_environment), snapshot.totals);
        prop_assert_eq!(index_sum(&snapshot.by_browser), snapshot.totals);
        prop_assert_eq!(index_sum(&snapshot.by_suite), snapshot.totals);
        prop_assert_eq!(index_sum(&snapshot.by_category), snapshot.totals);
    }

    #[test]
    fn any_permutation_serializes_identically(
        (inputs, shuffled) in prop::collection::vec(any_suite(), 0..12).prop_flat_map(|inputs| {
            let shuffled = Just(inputs.clone()).prop_shuffle();
            (Just(inputs), shuffled)
        }),
    ) {
        let forward = fold(&inputs);
        let permuted = fold(&shuffled);
        prop_assert_eq!(
            serde_json::to_string(&permuted).unwrap(),
            serde_json::to_string(&forward).unwrap()
        );
        prop_assert_eq!(
            canonical_digest(&permuted).unwrap(),
            canonical_digest(&forward).unwrap()
        );
    }

    #[test]
    fn sharded_merge_matches_single_pass(
        inputs in prop::collection::vec(labeled_suite(), 0..12),
        split in 0usize..12,
    ) {
        let split = split.min(inputs.len());
        let (left, right) = inputs.split_at(split);
        let shard = |part: &[(SuiteResult, Labels)]| {
            let mut aggregator = Aggregator::new();
            for (suite, labels) in part {
                aggregator.add(suite, labels);
            }
            aggregator
        };
        let merged = shard(left).merge(shard(right)).finish();
        prop_assert_eq!(merged, fold(&inputs));
    }
}
