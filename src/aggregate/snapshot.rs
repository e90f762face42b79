//! The aggregate snapshot: one run's indexes, pooled signals and diagnostics.

use crate::model::{
    AccessibilityMetrics, ApiMetrics, Browser, Category, CoverageSummary, Diagnostic,
    Environment, LintSummary, LoadMetrics, Origin, SecurityMetrics, Totals,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Totals for one index key plus its nested breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, Totals>,
}

impl IndexEntry {
    /// Count `totals` here and under `key` in the breakdown.
    pub fn add(&mut self, key: &str, totals: &Totals) {
        self.totals.absorb(totals);
        self.breakdown
            .entry(key.to_string())
            .or_default()
            .absorb(totals);
    }

    pub fn absorb(&mut self, other: &Self) {
        self.totals.absorb(&other.totals);
        for (key, totals) in &other.breakdown {
            self.breakdown.entry(key.clone()).or_default().absorb(totals);
        }
    }
}

/// One top-level suite and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteRecord {
    pub source: String,
    pub name: String,
    pub origin: Origin,
    pub environment: Environment,
    pub browser: Browser,
    #[serde(flatten)]
    pub totals: Totals,
}

/// A failed case, kept for report drill-down.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedCase {
    pub source: String,
    pub suite: String,
    pub case: String,
    pub environment: Environment,
    pub browser: Browser,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSample {
    pub source: String,
    #[serde(flatten)]
    pub metrics: LoadMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSample {
    pub source: String,
    #[serde(flatten)]
    pub summary: CoverageSummary,
}

/// Category extras pooled across artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Signals {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub performance: Vec<LoadSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<AccessibilityMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiMetrics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coverage: Vec<CoverageSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintSummary>,
}

impl Signals {
    pub fn add_accessibility(&mut self, metrics: &AccessibilityMetrics) {
        let pooled = self.accessibility.get_or_insert_with(Default::default);
        pooled.scans = pooled.scans.saturating_add(metrics.scans);
        pooled.violations.absorb(&metrics.violations);
    }

    pub fn add_security(&mut self, metrics: &SecurityMetrics) {
        let pooled = self.security.get_or_insert_with(Default::default);
        pooled.checks = pooled.checks.saturating_add(metrics.checks);
        pooled.vulnerable = pooled.vulnerable.saturating_add(metrics.vulnerable);
        pooled.findings.absorb(&metrics.findings);
    }

    pub fn add_api(&mut self, metrics: &ApiMetrics) {
        self.api.get_or_insert_with(Default::default).absorb(metrics);
    }

    pub fn add_lint(&mut self, summary: &LintSummary) {
        self.lint.get_or_insert_with(Default::default).absorb(summary);
    }

    pub(crate) fn absorb(&mut self, other: Self) {
        self.performance.extend(other.performance);
        self.coverage.extend(other.coverage);
        if let Some(m) = &other.accessibility {
            self.add_accessibility(m);
        }
        if let Some(m) = &other.security {
            self.add_security(m);
        }
        if let Some(m) = &other.api {
            self.add_api(m);
        }
        if let Some(m) = &other.lint {
            self.add_lint(m);
        }
    }

    pub(crate) fn sort(&mut self) {
        self.performance
            .sort_by(|a, b| (&a.source, &a.metrics.scenario).cmp(&(&b.source, &b.metrics.scenario)));
        self.coverage.sort_by(|a, b| a.source.cmp(&b.source));
    }

    /// Mean `lines.pct` over all coverage summaries.
    #[must_use]
    pub fn line_coverage(&self) -> Option<f64> {
        if self.coverage.is_empty() {
            return None;
        }
        let sum: f64 = self.coverage.iter().map(|c| c.summary.lines.pct).sum();
        Some(sum / self.coverage.len() as f64)
    }
}

/// One run's aggregated state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    pub totals: Totals,
    pub by_environment: BTreeMap<Environment, IndexEntry>,
    pub by_browser: BTreeMap<Browser, IndexEntry>,
    pub by_suite: BTreeMap<String, IndexEntry>,
    pub by_category: BTreeMap<Category, IndexEntry>,
    pub suites: Vec<SuiteRecord>,
    pub failures: Vec<FailedCase>,
    pub signals: Signals,
    pub errors: Vec<Diagnostic>,
}

impl AggregateSnapshot {
    #[must_use]
    pub fn category(&self, category: Category) -> Option<&Totals> {
        self.by_category.get(&category).map(|entry| &entry.totals)
    }

    /// Browser plus HTTP suites: the tests pass-rate and duration gates use.
    #[must_use]
    pub fn functional_totals(&self) -> Totals {
        let mut totals = Totals::default();
        for category in [Category::Ui, Category::Api] {
            if let Some(t) = self.category(category) {
                totals.absorb(t);
            }
        }
        totals
    }

    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        self.totals.pass_rate()
    }
}
