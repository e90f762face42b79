//! Aggregator: folds suite trees into the snapshot indexes.
//!
//! Each top-level suite increments `byEnvironment`, `byBrowser`, `bySuite`
//! and `byCategory`. Folding is associative and commutative: independent
//! aggregators can each take a shard of the suites and be `merge`d, and
//! `finish` sorts every sequence so the result does not depend on input
//! order.

mod snapshot;

pub use snapshot::{
    AggregateSnapshot, CoverageSample, FailedCase, IndexEntry, LoadSample, Signals, SuiteRecord,
};

use crate::model::{
    CaseStatus, CategoryMetrics, CoverageSummary, Diagnostic, Ingested, Labels,
    LintSummary, SuiteResult, Totals,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    snapshot: AggregateSnapshot,
}

impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one adapter result.
    pub fn ingest(&mut self, ingested: &Ingested, labels: &Labels) {
        match ingested {
            Ingested::Suite(suite) => self.add(suite, labels),
            Ingested::Coverage(summary) => self.add_coverage(summary, &labels.source),
            Ingested::Lint(summary) => self.add_lint(summary),
        }
    }

    /// Fold one top-level suite.
    pub fn add(&mut self, suite: &SuiteResult, labels: &Labels) {
        let snap = &mut self.snapshot;
        snap.totals.absorb(&suite.totals);

        // Cases tagged with their own browser go there; the rest stays
        // with the path browser, so byBrowser still sums to the totals.
        let mut split = suite.browser_split();
        let tagged = split.values().fold(Totals::default(), |mut acc, t| {
            acc.absorb(t);
            acc
        });
        let remainder = suite.totals.remainder(&tagged);
        if !remainder.is_empty() || split.is_empty() {
            split.entry(labels.browser).or_default().absorb(&remainder);
        }

        let env = snap.by_environment.entry(labels.environment).or_default();
        for (browser, totals) in &split {
            env.add(browser.as_str(), totals);
        }
        for (browser, totals) in &split {
            snap.by_browser
                .entry(*browser)
                .or_default()
                .add(labels.environment.as_str(), totals);
        }

        let by_suite = snap.by_suite.entry(suite.name.clone()).or_default();
        by_suite.totals.absorb(&suite.totals);
        for child in &suite.children {
            by_suite
                .breakdown
                .entry(child.name.clone())
                .or_default()
                .absorb(&child.totals);
        }

        if let Some(category) = labels.origin.category() {
            snap.by_category
                .entry(category)
                .or_default()
                .add(&suite.name, &suite.totals);
        }

        snap.suites.push(SuiteRecord {
            source: labels.source.clone(),
            name: suite.name.clone(),
            origin: labels.origin,
            environment: labels.environment,
            browser: labels.browser,
            totals: suite.totals,
        });

        collect(suite, labels, &mut snap.failures, &mut snap.signals);
    }

    pub fn add_coverage(&mut self, summary: &CoverageSummary, source: &str) {
        self.snapshot.signals.coverage.push(CoverageSample {
            source: source.to_string(),
            summary: summary.clone(),
        });
    }

    pub fn add_lint(&mut self, summary: &LintSummary) {
        self.snapshot.signals.add_lint(summary);
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.snapshot.errors.push(diagnostic);
    }

    /// Combine two partial aggregations.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        let theirs = other.snapshot;
        let ours = &mut self.snapshot;
        ours.totals.absorb(&theirs.totals);
        merge_index(&mut ours.by_environment, theirs.by_environment);
        merge_index(&mut ours.by_browser, theirs.by_browser);
        merge_index(&mut ours.by_suite, theirs.by_suite);
        merge_index(&mut ours.by_category, theirs.by_category);
        ours.suites.extend(theirs.suites);
        ours.failures.extend(theirs.failures);
        ours.signals.absorb(theirs.signals);
        ours.errors.extend(theirs.errors);
        self
    }

    /// Seal the snapshot with every sequence in canonical order.
    #[must_use]
    pub fn finish(mut self) -> AggregateSnapshot {
        let snap = &mut self.snapshot;
        snap.suites.sort();
        snap.failures.sort();
        snap.signals.sort();
        snap.errors.sort();
        self.snapshot
    }
}

/// Fold a batch of labeled suites in one go.
#[must_use]
pub fn aggregate<'a, I>(inputs: I) -> AggregateSnapshot
where
    I: IntoIterator<Item = (&'a SuiteResult, &'a Labels)>,
{
    let mut aggregator = Aggregator::new();
    for (suite, labels) in inputs {
        aggregator.add(suite, labels);
    }
    aggregator.finish()
}

fn merge_index<K: Ord>(ours: &mut BTreeMap<K, IndexEntry>, theirs: BTreeMap<K, IndexEntry>) {
    for (key, entry) in theirs {
        ours.entry(key).or_default().absorb(&entry);
    }
}

/// Walk a suite tree for failed cases and category metrics.
fn collect(
    suite: &SuiteResult,
    labels: &Labels,
    failures: &mut Vec<FailedCase>,
    signals: &mut Signals,
) {
    match &suite.metrics {
        Some(CategoryMetrics::Performance(metrics)) => signals.performance.push(LoadSample {
            source: labels.source.clone(),
            metrics: metrics.clone(),
        }),
        Some(CategoryMetrics::Accessibility(metrics)) => signals.add_accessibility(metrics),
        Some(CategoryMetrics::Security(metrics)) => signals.add_security(metrics),
        Some(CategoryMetrics::Api(metrics)) => signals.add_api(metrics),
        None => {}
    }

    for case in &suite.cases {
        if case.status == Some(CaseStatus::Failed) {
            failures.push(FailedCase {
                source: labels.source.clone(),
                suite: suite.name.clone(),
                case: case.name.clone(),
                environment: labels.environment,
                browser: case.browser.unwrap_or(labels.browser),
                attempts: case.attempt_count,
                media: case.media.clone(),
            });
        }
    }
    for child in &suite.children {
        collect(child, labels, failures, signals);
    }
}
