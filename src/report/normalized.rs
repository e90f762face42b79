//! `test-results.json` and `metrics/latest-metrics.json`.

use super::ReportInput;
use crate::aggregate::{FailedCase, IndexEntry, Signals, SuiteRecord};
use crate::config::RuntimeEnv;
use crate::history::Trend;
use crate::metrics::DerivedMetrics;
use crate::model::{Browser, Category, Diagnostic, Environment, MediaTable};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata<'a> {
    pub generator: String,
    pub digest: &'a str,
    pub artifacts: usize,
    pub runtime: &'a RuntimeEnv,
    pub media: &'a MediaTable,
}

/// The normalized snapshot plus run metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReport<'a> {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub duration: u64,
    pub environments: &'a BTreeMap<Environment, IndexEntry>,
    pub browsers: &'a BTreeMap<Browser, IndexEntry>,
    pub suites: &'a BTreeMap<String, IndexEntry>,
    pub categories: &'a BTreeMap<Category, IndexEntry>,
    pub suite_records: &'a [SuiteRecord],
    pub failures: &'a [FailedCase],
    pub signals: &'a Signals,
    pub errors: &'a [Diagnostic],
    pub metadata: ReportMetadata<'a>,
    pub generated_at: String,
    pub pass_rate: f64,
}

impl<'a> NormalizedReport<'a> {
    #[must_use]
    pub fn build(input: &'a ReportInput<'a>) -> Self {
        let snap = input.snapshot;
        Self {
            total: snap.totals.total,
            passed: snap.totals.passed,
            failed: snap.totals.failed,
            skipped: snap.totals.skipped,
            duration: snap.totals.duration_ms,
            environments: &snap.by_environment,
            browsers: &snap.by_browser,
            suites: &snap.by_suite,
            categories: &snap.by_category,
            suite_records: &snap.suites,
            failures: &snap.failures,
            signals: &snap.signals,
            errors: &snap.errors,
            metadata: ReportMetadata {
                generator: format!("qa_pulse {}", env!("CARGO_PKG_VERSION")),
                digest: input.digest,
                artifacts: input.artifact_count,
                runtime: input.runtime,
                media: input.media,
            },
            generated_at: input.generated_at(),
            pass_rate: snap.pass_rate(),
        }
    }
}

/// Derived metrics as persisted for dashboards and CI.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestMetrics<'a> {
    pub generated_at: String,
    pub digest: &'a str,
    #[serde(flatten)]
    pub metrics: &'a DerivedMetrics,
    pub trend: &'a Trend,
    pub history_length: usize,
    pub diagnostics: usize,
}

impl<'a> LatestMetrics<'a> {
    #[must_use]
    pub fn build(input: &'a ReportInput<'a>) -> Self {
        Self {
            generated_at: input.generated_at(),
            digest: input.digest,
            metrics: input.metrics,
            trend: input.trend,
            history_length: input.history.len(),
            diagnostics: input.snapshot.errors.len(),
        }
    }
}
