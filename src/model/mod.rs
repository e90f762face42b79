//! Core data types for `qa_pulse`.
//!
//! This module defines the uniform result model every adapter produces:
//! - `Artifact` - A discovered result file and its path-derived labels
//! - `SuiteResult` / `CaseResult` - The recursive test-result tree
//! - `Totals` - Counters shared by suites, indexes and history
//! - `CategoryMetrics` - Per-category extras (load percentiles, severities)
//! - `Diagnostic` - Non-fatal per-artifact problems

mod media;

pub use media::{MediaItem, MediaKind, MediaTable};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Round to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Split a path segment or label into lowercase alphanumeric tokens.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Deployment environment a result was produced against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Staging,
    Production,
    Test,
    #[default]
    Unknown,
}

impl Environment {
    pub const ALL: [Self; 5] = [
        Self::Development,
        Self::Staging,
        Self::Production,
        Self::Test,
        Self::Unknown,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Test => "test",
            Self::Unknown => "unknown",
        }
    }

    /// Match one path segment against the environment set.
    ///
    /// `test` only matches a whole segment so that names like
    /// `api-tests` or `test-results` do not become environments.
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        let lower = segment.to_ascii_lowercase();
        if lower == "test" {
            return Some(Self::Test);
        }
        tokens(segment).find_map(|token| match token.as_str() {
            "development" | "dev" => Some(Self::Development),
            "staging" | "stage" | "stg" => Some(Self::Staging),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser engine a result was produced with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    Chromium,
    Firefox,
    Webkit,
    Chrome,
    Safari,
    Edge,
    #[default]
    Unknown,
}

impl Browser {
    pub const ALL: [Self; 7] = [
        Self::Chromium,
        Self::Firefox,
        Self::Webkit,
        Self::Chrome,
        Self::Safari,
        Self::Edge,
        Self::Unknown,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
            Self::Chrome => "chrome",
            Self::Safari => "safari",
            Self::Edge => "edge",
            Self::Unknown => "unknown",
        }
    }

    /// Case-insensitive token match against the browser set.
    ///
    /// Works for path segments (`chromium`) and for runner project
    /// names (`Mobile Safari`, `Microsoft Edge`).
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        tokens(text).find_map(|token| match token.as_str() {
            "chromium" => Some(Self::Chromium),
            "firefox" => Some(Self::Firefox),
            "webkit" => Some(Self::Webkit),
            "chrome" => Some(Self::Chrome),
            "safari" => Some(Self::Safari),
            "edge" | "msedge" => Some(Self::Edge),
            _ => None,
        })
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality subdomain a suite contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ui,
    Api,
    Performance,
    Accessibility,
    Security,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Ui,
        Self::Api,
        Self::Performance,
        Self::Accessibility,
        Self::Security,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ui => "ui",
            Self::Api => "api",
            Self::Performance => "performance",
            Self::Accessibility => "accessibility",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool family that produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Browser,
    Http,
    Load,
    Accessibility,
    Security,
    Coverage,
    Lint,
}

impl Origin {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Http => "http",
            Self::Load => "load",
            Self::Accessibility => "accessibility",
            Self::Security => "security",
            Self::Coverage => "coverage",
            Self::Lint => "lint",
        }
    }

    /// Category fed by this origin. Coverage and lint feed no category.
    #[must_use]
    pub const fn category(&self) -> Option<Category> {
        match self {
            Self::Browser => Some(Category::Ui),
            Self::Http => Some(Category::Api),
            Self::Load => Some(Category::Performance),
            Self::Accessibility => Some(Category::Accessibility),
            Self::Security => Some(Category::Security),
            Self::Coverage | Self::Lint => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered result file. Immutable after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    /// Path relative to the results root, `/`-separated.
    pub relative: String,
    pub origin: Origin,
    pub environment: Environment,
    pub browser: Browser,
    pub mtime: Option<DateTime<Utc>>,
    pub size: u64,
}

impl Artifact {
    #[must_use]
    pub fn labels(&self) -> Labels {
        Labels {
            environment: self.environment,
            browser: self.browser,
            origin: self.origin,
            source: self.relative.clone(),
        }
    }
}

/// Aggregation keys for one top-level suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub environment: Environment,
    pub browser: Browser,
    pub origin: Origin,
    /// Relative path of the source artifact; orders pooled samples.
    pub source: String,
}

/// Pass/fail/skip counters plus wall time in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Totals {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

impl Totals {
    #[must_use]
    pub const fn new(passed: u64, failed: u64, skipped: u64, duration_ms: u64) -> Self {
        Self {
            total: passed.saturating_add(failed).saturating_add(skipped),
            passed,
            failed,
            skipped,
            duration_ms,
        }
    }

    /// Build totals from untrusted counters.
    ///
    /// Negative values are clamped to zero and reported. A declared total
    /// above the sum becomes skipped; below the sum it is raised.
    #[must_use]
    pub fn normalized(
        total: i64,
        passed: i64,
        failed: i64,
        skipped: i64,
        duration_ms: i64,
    ) -> (Self, Vec<String>) {
        let mut notes = Vec::new();
        let mut clamp = |name: &str, value: i64| -> u64 {
            u64::try_from(value).unwrap_or_else(|_| {
                notes.push(format!("negative counter {name}={value} treated as 0"));
                0
            })
        };
        let total = clamp("total", total);
        let passed = clamp("passed", passed);
        let failed = clamp("failed", failed);
        let mut skipped = clamp("skipped", skipped);
        let duration_ms = clamp("duration", duration_ms);

        let sum = passed.saturating_add(failed).saturating_add(skipped);
        if total > sum {
            skipped += total - sum;
        }
        (Self::new(passed, failed, skipped, duration_ms), notes)
    }

    pub fn absorb(&mut self, other: &Self) {
        self.total = self.total.saturating_add(other.total);
        self.passed = self.passed.saturating_add(other.passed);
        self.failed = self.failed.saturating_add(other.failed);
        self.skipped = self.skipped.saturating_add(other.skipped);
        self.duration_ms = self.duration_ms.saturating_add(other.duration_ms);
    }

    /// Field-wise saturating difference, used to find the unattributed remainder.
    #[must_use]
    pub fn remainder(&self, other: &Self) -> Self {
        Self::new(
            self.passed.saturating_sub(other.passed),
            self.failed.saturating_sub(other.failed),
            self.skipped.saturating_sub(other.skipped),
            self.duration_ms.saturating_sub(other.duration_ms),
        )
    }

    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.total == self.passed + self.failed + self.skipped
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total == 0 && self.duration_ms == 0
    }

    /// `passed / total * 100`, one decimal; 0 when there are no tests.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            round1(self.passed as f64 / self.total as f64 * 100.0)
        }
    }

    #[must_use]
    pub fn fail_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            round1(self.failed as f64 / self.total as f64 * 100.0)
        }
    }
}

/// Outcome of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

impl CaseStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// A single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    /// `None` when the source carried no status; such a case counts as nothing.
    pub status: Option<CaseStatus>,
    pub duration_ms: u64,
    pub attempt_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<Browser>,
    /// Raw attachment paths, resolved into `media` when media is linked.
    #[serde(skip)]
    pub attachments: Vec<String>,
    /// Indexes into the run's `MediaTable`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<usize>,
}

impl CaseResult {
    #[must_use]
    pub fn new(name: impl Into<String>, status: Option<CaseStatus>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status,
            duration_ms,
            attempt_count: 1,
            browser: None,
            attachments: Vec::new(),
            media: Vec::new(),
        }
    }

    /// What this case adds to its suite's totals.
    #[must_use]
    pub const fn contribution(&self) -> Totals {
        match self.status {
            Some(CaseStatus::Passed) => Totals::new(1, 0, 0, self.duration_ms),
            Some(CaseStatus::Failed) => Totals::new(0, 1, 0, self.duration_ms),
            Some(CaseStatus::Skipped) => Totals::new(0, 0, 1, self.duration_ms),
            None => Totals::new(0, 0, 0, 0),
        }
    }
}

/// Recursive suite tree. `totals` always covers children and cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub name: String,
    pub totals: Totals,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SuiteResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cases: Vec<CaseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CategoryMetrics>,
}

impl SuiteResult {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut name = name.into().trim().to_string();
        if name.is_empty() {
            name = "unnamed".to_string();
        }
        Self {
            name,
            totals: Totals::default(),
            children: Vec::new(),
            cases: Vec::new(),
            metrics: None,
        }
    }

    /// A suite known only by its counters.
    #[must_use]
    pub fn leaf(name: impl Into<String>, totals: Totals) -> Self {
        let mut suite = Self::new(name);
        suite.totals = totals;
        suite
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: CategoryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn push_case(&mut self, case: CaseResult) {
        self.totals.absorb(&case.contribution());
        self.cases.push(case);
    }

    pub fn push_child(&mut self, child: Self) {
        self.totals.absorb(&child.totals);
        self.children.push(child);
    }

    /// Check `total = passed + failed + skipped` on every node, and that
    /// interior nodes equal the sum of their children and cases.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if !self.totals.is_consistent() {
            return false;
        }
        if !self.children.is_empty() || !self.cases.is_empty() {
            let mut sum = Totals::default();
            for child in &self.children {
                sum.absorb(&child.totals);
            }
            for case in &self.cases {
                sum.absorb(&case.contribution());
            }
            if sum != self.totals {
                return false;
            }
        }
        self.children.iter().all(Self::is_consistent)
    }

    /// Totals of cases whose browser was inferred from their project name.
    #[must_use]
    pub fn browser_split(&self) -> BTreeMap<Browser, Totals> {
        let mut split = BTreeMap::new();
        self.collect_browser_split(&mut split);
        split
    }

    fn collect_browser_split(&self, split: &mut BTreeMap<Browser, Totals>) {
        for case in &self.cases {
            if let Some(browser) = case.browser {
                split
                    .entry(browser)
                    .or_insert_with(Totals::default)
                    .absorb(&case.contribution());
            }
        }
        for child in &self.children {
            child.collect_browser_split(split);
        }
    }

    /// Visit every case in the tree.
    pub fn for_each_case_mut(&mut self, f: &mut impl FnMut(&mut CaseResult)) {
        for case in &mut self.cases {
            f(case);
        }
        for child in &mut self.children {
            child.for_each_case_mut(f);
        }
    }

    #[must_use]
    pub fn case_count(&self) -> usize {
        self.cases.len() + self.children.iter().map(Self::case_count).sum::<usize>()
    }
}

/// Per-severity finding counts. `high`/`medium`/`low` are accepted aliases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityCounts {
    pub critical: u64,
    #[serde(alias = "high")]
    pub serious: u64,
    #[serde(alias = "medium")]
    pub moderate: u64,
    #[serde(alias = "low")]
    pub minor: u64,
}

impl SeverityCounts {
    pub fn absorb(&mut self, other: &Self) {
        self.critical = self.critical.saturating_add(other.critical);
        self.serious = self.serious.saturating_add(other.serious);
        self.moderate = self.moderate.saturating_add(other.moderate);
        self.minor = self.minor.saturating_add(other.minor);
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.critical
            .saturating_add(self.serious)
            .saturating_add(self.moderate)
            .saturating_add(self.minor)
    }

    /// Record one finding by severity name. Unknown names count as minor.
    pub fn record(&mut self, severity: &str) {
        self.add(severity, 1);
    }

    /// Add `count` findings of one severity. Unknown names count as minor.
    pub fn add(&mut self, severity: &str, count: u64) {
        let slot = match severity.trim().to_ascii_lowercase().as_str() {
            "critical" => &mut self.critical,
            "serious" | "high" => &mut self.serious,
            "moderate" | "medium" => &mut self.moderate,
            _ => &mut self.minor,
        };
        *slot = slot.saturating_add(count);
    }

    /// `max(0, 100 - sum(weight * count))`.
    #[must_use]
    pub fn score(&self, weights: &SeverityWeights) -> f64 {
        let penalty = weights.critical * self.critical as f64
            + weights.serious * self.serious as f64
            + weights.moderate * self.moderate as f64
            + weights.minor * self.minor as f64;
        round1((100.0 - penalty).clamp(0.0, 100.0))
    }
}

/// Penalty per finding, by severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct SeverityWeights {
    pub critical: f64,
    #[serde(alias = "high")]
    pub serious: f64,
    #[serde(alias = "medium")]
    pub moderate: f64,
    #[serde(alias = "low")]
    pub minor: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 10.0,
            serious: 7.0,
            moderate: 4.0,
            minor: 1.0,
        }
    }
}

/// Extra measurements a suite carries besides case counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryMetrics {
    Performance(LoadMetrics),
    Accessibility(AccessibilityMetrics),
    Security(SecurityMetrics),
    Api(ApiMetrics),
}

/// Load-generator summary. Percentiles stay `None` when the tool did not
/// report that exact percentile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadMetrics {
    pub scenario: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_ms: Option<f64>,
    pub p50_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub throughput: Option<f64>,
    /// Percent, 0-100.
    pub error_rate_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityMetrics {
    pub scans: u64,
    pub violations: SeverityCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityMetrics {
    pub checks: u64,
    pub vulnerable: u64,
    pub findings: SeverityCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMetrics {
    pub assertions_total: u64,
    pub assertions_failed: u64,
    pub requests_total: u64,
    pub requests_failed: u64,
}

impl ApiMetrics {
    pub fn absorb(&mut self, other: &Self) {
        self.assertions_total = self.assertions_total.saturating_add(other.assertions_total);
        self.assertions_failed = self.assertions_failed.saturating_add(other.assertions_failed);
        self.requests_total = self.requests_total.saturating_add(other.requests_total);
        self.requests_failed = self.requests_failed.saturating_add(other.requests_failed);
    }
}

/// One metric of a coverage summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetric {
    pub total: u64,
    pub covered: u64,
    pub pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub statements: CoverageMetric,
    pub branches: CoverageMetric,
    pub functions: CoverageMetric,
    pub lines: CoverageMetric,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintSummary {
    pub files: u64,
    pub error_count: u64,
    pub warning_count: u64,
}

impl LintSummary {
    pub fn absorb(&mut self, other: &Self) {
        self.files = self.files.saturating_add(other.files);
        self.error_count = self.error_count.saturating_add(other.error_count);
        self.warning_count = self.warning_count.saturating_add(other.warning_count);
    }
}

/// What an adapter extracted from one artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    Suite(SuiteResult),
    Coverage(CoverageSummary),
    Lint(LintSummary),
}

/// Machine tag of a non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    DiscoveryError,
    ParseError,
    HistoryCorrupt,
    AdapterTimeout,
}

impl DiagnosticKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DiscoveryError => "discovery_error",
            Self::ParseError => "parse_error",
            Self::HistoryCorrupt => "history_corrupt",
            Self::AdapterTimeout => "adapter_timeout",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal problem, surfaced in every report family.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, path: Option<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn discovery(path: Option<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::DiscoveryError, path, message)
    }

    #[must_use]
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::ParseError, Some(path.into()), message)
    }

    /// Emit this diagnostic as a tracing warning.
    pub fn log(&self) {
        tracing::warn!(
            kind = self.kind.as_str(),
            path = self.path.as_deref().unwrap_or(""),
            "{}",
            self.message
        );
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_segments() {
        assert_eq!(
            Environment::from_segment("staging"),
            Some(Environment::Staging)
        );
        assert_eq!(
            Environment::from_segment("prod-eu"),
            Some(Environment::Production)
        );
        assert_eq!(Environment::from_segment("test"), Some(Environment::Test));
        assert_eq!(Environment::from_segment("api-tests"), None);
        assert_eq!(Environment::from_segment("test-results"), None);
    }

    #[test]
    fn browser_tokens() {
        assert_eq!(Browser::detect("Mobile Safari"), Some(Browser::Safari));
        assert_eq!(Browser::detect("chromium"), Some(Browser::Chromium));
        assert_eq!(Browser::detect("Microsoft Edge"), Some(Browser::Edge));
        assert_eq!(Browser::detect("knowledge-base"), None);
    }

    #[test]
    fn normalized_totals_fill_skipped() {
        let (totals, notes) = Totals::normalized(10, 6, 2, 0, 100);
        assert_eq!(totals, Totals::new(6, 2, 2, 100));
        assert!(notes.is_empty());
    }

    #[test]
    fn normalized_totals_raise_total() {
        let (totals, _) = Totals::normalized(3, 4, 1, 0, 0);
        assert_eq!(totals.total, 5);
        assert!(totals.is_consistent());
    }

    #[test]
    fn normalized_totals_clamp_negative() {
        let (totals, notes) = Totals::normalized(5, -1, 5, 0, 0);
        assert_eq!(totals.passed, 0);
        assert_eq!(totals.failed, 5);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("passed=-1"));
    }

    #[test]
    fn pass_rate_rounds_to_one_decimal() {
        assert!((Totals::new(2, 1, 0, 0).pass_rate() - 66.7).abs() < f64::EPSILON);
        assert!(Totals::default().pass_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn case_without_status_contributes_nothing() {
        let case = CaseResult::new("x", None, 500);
        assert_eq!(case.contribution(), Totals::default());
    }

    #[test]
    fn suite_tree_stays_consistent() {
        let mut child = SuiteResult::new("child");
        child.push_case(CaseResult::new("a", Some(CaseStatus::Passed), 10));
        child.push_case(CaseResult::new("b", Some(CaseStatus::Failed), 20));
        let mut root = SuiteResult::new("root");
        root.push_child(child);
        root.push_case(CaseResult::new("c", Some(CaseStatus::Skipped), 0));

        assert_eq!(root.totals, Totals::new(1, 1, 1, 30));
        assert!(root.is_consistent());

        root.totals.passed += 1;
        assert!(!root.is_consistent());
    }

    #[test]
    fn browser_split_only_counts_tagged_cases() {
        let mut suite = SuiteResult::new("s");
        let mut a = CaseResult::new("a", Some(CaseStatus::Passed), 0);
        a.browser = Some(Browser::Firefox);
        suite.push_case(a);
        suite.push_case(CaseResult::new("b", Some(CaseStatus::Passed), 0));

        let split = suite.browser_split();
        assert_eq!(split.len(), 1);
        assert_eq!(split[&Browser::Firefox].passed, 1);
    }

    #[test]
    fn severity_score_matches_weights() {
        let counts = SeverityCounts {
            critical: 1,
            moderate: 2,
            ..SeverityCounts::default()
        };
        let score = counts.score(&SeverityWeights::default());
        assert!((score - 82.0).abs() < f64::EPSILON);

        let heavy = SeverityCounts {
            critical: 20,
            ..SeverityCounts::default()
        };
        assert!(heavy.score(&SeverityWeights::default()).abs() < f64::EPSILON);
    }

    #[test]
    fn severity_counts_saturate() {
        let mut counts = SeverityCounts {
            minor: u64::MAX - 1,
            ..SeverityCounts::default()
        };
        counts.absorb(&SeverityCounts {
            minor: 5,
            serious: 1,
            ..SeverityCounts::default()
        });
        counts.add("low", 10);
        counts.add("HIGH", 2);
        assert_eq!(counts.minor, u64::MAX);
        assert_eq!(counts.serious, 3);
        assert_eq!(counts.total(), u64::MAX);
    }

    #[test]
    fn severity_aliases_deserialize() {
        let counts: SeverityCounts =
            serde_json::from_str(r#"{"critical":0,"high":2,"medium":1,"low":3}"#).unwrap();
        assert_eq!(counts.serious, 2);
        assert_eq!(counts.moderate, 1);
        assert_eq!(counts.minor, 3);
    }

    #[test]
    fn diagnostic_display_carries_tag() {
        let diag = Diagnostic::parse("api/x.json", "unrecognized shape in api/x.json");
        assert_eq!(
            diag.to_string(),
            "parse_error: unrecognized shape in api/x.json"
        );
    }
}
