//! Metric derivation: pure functions from a snapshot to scores and gates.

pub mod gates;

pub use gates::{Comparison, GateInputs, GateResult, Health, Severity, Verdict};

use crate::aggregate::{AggregateSnapshot, LoadSample};
use crate::config::QaConfig;
use crate::model::{Category, LintSummary, round1};
use serde::Serialize;
use std::collections::BTreeMap;

/// Pooled load-generator figures. Each percentile is the worst value seen
/// for that exact percentile; families are never mixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub scenarios: usize,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub error_rate_percent: f64,
    pub average_ms: Option<f64>,
    pub p50_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub throughput: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub pass_rate: f64,
    pub fail_rate: Option<f64>,
    /// Pass rate over ui + api tests only.
    pub functional_pass_rate: Option<f64>,
    pub average_duration_ms: Option<f64>,
    pub subdomains: BTreeMap<Category, f64>,
    pub quality_score: Option<f64>,
    pub coverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceSummary>,
    pub gates: Vec<GateResult>,
    pub overall_health: Health,
}

impl DerivedMetrics {
    #[must_use]
    pub fn subdomain(&self, category: Category) -> Option<f64> {
        self.subdomains.get(&category).copied()
    }

    #[must_use]
    pub fn failing_gates(&self) -> impl Iterator<Item = &GateResult> {
        self.gates.iter().filter(|gate| gate.failed())
    }
}

/// Derive every metric the reports and gates need.
#[must_use]
pub fn derive(snapshot: &AggregateSnapshot, config: &QaConfig) -> DerivedMetrics {
    let functional = snapshot.functional_totals();
    let functional_pass_rate = (functional.total > 0).then(|| functional.pass_rate());
    let average_duration_ms = (functional.total > 0)
        .then(|| round1(functional.duration_ms as f64 / functional.total as f64));
    let fail_rate = (snapshot.totals.total > 0).then(|| snapshot.totals.fail_rate());

    let performance = performance_summary(&snapshot.signals.performance);
    let subdomains = subdomain_scores(snapshot, performance.as_ref(), config);
    let quality_score = quality_score(&subdomains, config);
    let coverage = snapshot.signals.line_coverage().map(round1);

    let gates = gates::evaluate(
        &config.gates,
        &GateInputs {
            pass_rate: functional_pass_rate,
            quality_score,
            average_duration_ms,
            coverage,
            fail_rate,
        },
    );
    let overall_health = gates::overall_health(&gates);

    DerivedMetrics {
        pass_rate: snapshot.pass_rate(),
        fail_rate,
        functional_pass_rate,
        average_duration_ms,
        subdomains,
        quality_score,
        coverage,
        lint: snapshot.signals.lint,
        performance,
        gates,
        overall_health,
    }
}

/// `max(0, 100 - errorRatePercent * 10)`.
#[must_use]
pub fn performance_score(error_rate_percent: f64) -> f64 {
    round1((100.0 - error_rate_percent * 10.0).clamp(0.0, 100.0))
}

fn subdomain_scores(
    snapshot: &AggregateSnapshot,
    performance: Option<&PerformanceSummary>,
    config: &QaConfig,
) -> BTreeMap<Category, f64> {
    let mut scores = BTreeMap::new();
    for category in [Category::Ui, Category::Api] {
        if let Some(totals) = snapshot.category(category).filter(|t| t.total > 0) {
            scores.insert(category, totals.pass_rate());
        }
    }
    if let Some(perf) = performance {
        scores.insert(Category::Performance, performance_score(perf.error_rate_percent));
    }
    if let Some(a11y) = &snapshot.signals.accessibility {
        scores.insert(
            Category::Accessibility,
            a11y.violations.score(&config.severity_weights),
        );
    }
    if let Some(security) = &snapshot.signals.security {
        scores.insert(
            Category::Security,
            security.findings.score(&config.severity_weights),
        );
    }
    scores
}

/// Weighted mean over present subdomains, renormalized over their weights.
/// `None` when nothing present carries weight.
#[must_use]
pub fn quality_score(subdomains: &BTreeMap<Category, f64>, config: &QaConfig) -> Option<f64> {
    let (weighted, weight) = subdomains.iter().fold((0.0, 0.0), |(sum, w), (c, score)| {
        let weight = config.quality_weights.weight(*c);
        (sum + weight * score, w + weight)
    });
    (weight > 0.0).then(|| round1((weighted / weight).clamp(0.0, 100.0)))
}

/// Pool load samples. The error rate is request-weighted; when no sample
/// reports a request count it is the plain mean.
#[must_use]
pub fn performance_summary(samples: &[LoadSample]) -> Option<PerformanceSummary> {
    if samples.is_empty() {
        return None;
    }
    let total_requests: u64 = samples.iter().map(|s| s.metrics.total_requests).sum();
    let failed_requests: u64 = samples.iter().map(|s| s.metrics.failed_requests).sum();

    let error_rate_percent = if total_requests > 0 {
        samples
            .iter()
            .map(|s| s.metrics.error_rate_percent * s.metrics.total_requests as f64)
            .sum::<f64>()
            / total_requests as f64
    } else {
        samples.iter().map(|s| s.metrics.error_rate_percent).sum::<f64>() / samples.len() as f64
    };

    let worst = |pick: fn(&LoadSample) -> Option<f64>| {
        samples.iter().filter_map(pick).reduce(f64::max)
    };
    let average_ms = weighted_average(samples);
    let throughput = samples
        .iter()
        .filter_map(|s| s.metrics.throughput)
        .reduce(|a, b| a + b);

    Some(PerformanceSummary {
        scenarios: samples.len(),
        total_requests,
        failed_requests,
        error_rate_percent: round1(error_rate_percent),
        average_ms,
        p50_ms: worst(|s| s.metrics.p50_ms),
        p90_ms: worst(|s| s.metrics.p90_ms),
        p95_ms: worst(|s| s.metrics.p95_ms),
        p99_ms: worst(|s| s.metrics.p99_ms),
        throughput: throughput.map(round1),
    })
}

fn weighted_average(samples: &[LoadSample]) -> Option<f64> {
    let with_avg: Vec<(f64, u64)> = samples
        .iter()
        .filter_map(|s| s.metrics.average_ms.map(|avg| (avg, s.metrics.total_requests)))
        .collect();
    if with_avg.is_empty() {
        return None;
    }
    let requests: u64 = with_avg.iter().map(|(_, n)| n).sum();
    let mean = if requests > 0 {
        with_avg.iter().map(|(avg, n)| avg * *n as f64).sum::<f64>() / requests as f64
    } else {
        with_avg.iter().map(|(avg, _)| avg).sum::<f64>() / with_avg.len() as f64
    };
    Some(round1(mean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregator, CoverageSample};
    use crate::model::{
        AccessibilityMetrics, Browser, CategoryMetrics, CoverageMetric, CoverageSummary,
        Environment, Labels, LoadMetrics, Origin, SeverityCounts, SuiteResult, Totals,
    };

    fn labels(env: Environment, origin: Origin) -> Labels {
        Labels {
            environment: env,
            browser: Browser::Unknown,
            origin,
            source: format!("{}.json", origin.as_str()),
        }
    }

    fn snapshot(suites: &[(SuiteResult, Labels)]) -> AggregateSnapshot {
        let mut aggregator = Aggregator::new();
        for (suite, labels) in suites {
            aggregator.add(suite, labels);
        }
        aggregator.finish()
    }

    #[test]
    fn empty_run_is_good_with_every_gate_skipped() {
        let metrics = derive(&AggregateSnapshot::default(), &QaConfig::default());
        assert_eq!(metrics.pass_rate, 0.0);
        assert_eq!(metrics.quality_score, None);
        assert!(metrics.gates.iter().all(|g| g.verdict == Verdict::Skipped));
        assert_eq!(metrics.overall_health, Health::Good);
    }

    #[test]
    fn ninety_percent_pass_rate_warns() {
        let snap = snapshot(&[(
            SuiteResult::leaf("ui", Totals::new(9, 1, 0, 12345)),
            labels(Environment::Staging, Origin::Browser),
        )]);
        let metrics = derive(&snap, &QaConfig::default());
        assert_eq!(metrics.pass_rate, 90.0);
        assert_eq!(metrics.subdomain(Category::Ui), Some(90.0));
        assert_eq!(metrics.quality_score, Some(90.0));
        assert_eq!(metrics.overall_health, Health::Warning);
        let pass_gate = &metrics.gates[0];
        assert_eq!(pass_gate.name, "pass_rate");
        assert_eq!(pass_gate.severity, Some(Severity::Warning));
    }

    #[test]
    fn all_passing_is_good() {
        let snap = snapshot(&[
            (
                SuiteResult::leaf("dev", Totals::new(5, 0, 0, 100)),
                labels(Environment::Development, Origin::Browser),
            ),
            (
                SuiteResult::leaf("prod", Totals::new(5, 0, 0, 100)),
                labels(Environment::Production, Origin::Browser),
            ),
        ]);
        let metrics = derive(&snap, &QaConfig::default());
        assert_eq!(metrics.pass_rate, 100.0);
        assert_eq!(metrics.average_duration_ms, Some(20.0));
        assert_eq!(metrics.gates[0].verdict, Verdict::Pass);
        assert_eq!(metrics.overall_health, Health::Good);
    }

    #[test]
    fn accessibility_violations_score_and_warn() {
        let metrics = AccessibilityMetrics {
            scans: 1,
            violations: SeverityCounts {
                critical: 1,
                moderate: 2,
                ..SeverityCounts::default()
            },
        };
        let snap = snapshot(&[(
            SuiteResult::leaf("a11y", Totals::new(0, 1, 0, 0))
                .with_metrics(CategoryMetrics::Accessibility(metrics)),
            labels(Environment::Unknown, Origin::Accessibility),
        )]);
        let derived = derive(&snap, &QaConfig::default());
        assert_eq!(derived.subdomain(Category::Accessibility), Some(82.0));
        assert_eq!(derived.quality_score, Some(82.0));
        assert_eq!(derived.overall_health, Health::Warning);
    }

    #[test]
    fn quality_renormalizes_over_present_subdomains() {
        let config = QaConfig::default();
        let scores = BTreeMap::from([(Category::Ui, 100.0), (Category::Security, 60.0)]);
        // (0.25 * 100 + 0.15 * 60) / 0.40
        assert_eq!(quality_score(&scores, &config), Some(85.0));
        assert_eq!(quality_score(&BTreeMap::new(), &config), None);
    }

    #[test]
    fn performance_pools_error_rate_and_keeps_percentiles_apart() {
        let sample = |source: &str, total: u64, rate: f64, p95: Option<f64>| LoadSample {
            source: source.to_string(),
            metrics: LoadMetrics {
                scenario: source.to_string(),
                total_requests: total,
                failed_requests: (total as f64 * rate / 100.0) as u64,
                p95_ms: p95,
                error_rate_percent: rate,
                ..LoadMetrics::default()
            },
        };
        let summary = performance_summary(&[
            sample("a", 100, 1.0, Some(300.0)),
            sample("b", 300, 3.0, None),
        ])
        .unwrap();
        assert_eq!(summary.error_rate_percent, 2.5);
        assert_eq!(summary.p95_ms, Some(300.0));
        assert_eq!(summary.p90_ms, None);
        assert_eq!(performance_score(summary.error_rate_percent), 75.0);
        assert_eq!(performance_score(12.0), 0.0);
    }

    #[test]
    fn coverage_gate_uses_mean_line_coverage() {
        let mut snap = AggregateSnapshot::default();
        let lines = |pct: f64| CoverageSummary {
            lines: CoverageMetric {
                total: 100,
                covered: pct as u64,
                pct,
            },
            ..CoverageSummary::default()
        };
        snap.signals.coverage = vec![
            CoverageSample {
                source: "a".into(),
                summary: lines(70.0),
            },
            CoverageSample {
                source: "b".into(),
                summary: lines(80.0),
            },
        ];
        let metrics = derive(&snap, &QaConfig::default());
        assert_eq!(metrics.coverage, Some(75.0));
        let gate = metrics.gates.iter().find(|g| g.name == "coverage").unwrap();
        assert!(gate.failed());
        assert_eq!(metrics.overall_health, Health::Warning);
    }
}
