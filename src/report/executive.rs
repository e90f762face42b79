//! Executive summary: overview, findings, risks, recommendations, next steps.
//!
//! Findings and risks come from fixed rules over the snapshot and derived
//! metrics, so the same run always produces the same summary.

use super::ReportInput;
use super::html::{Block, Cell, Page, Row, Section, Stat, Table, health_class};
use crate::history::TrendDirection;
use crate::metrics::{Health, Verdict};
use crate::model::Category;
use crate::util::format_duration_ms;
use serde::Serialize;

/// Scores below this are a high risk.
const HIGH_RISK_BELOW: f64 = 70.0;
/// Scores below this are a medium risk.
const MEDIUM_RISK_BELOW: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingLevel {
    Positive,
    Info,
    Warning,
    Critical,
}

impl FindingLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    const fn class(self) -> &'static str {
        match self {
            Self::Positive => "pass",
            Self::Info => "skipped",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    const fn class(self) -> &'static str {
        match self {
            Self::Low => "pass",
            Self::Medium => "warning",
            Self::High => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub area: String,
    pub level: FindingLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Risk {
    pub area: String,
    pub level: RiskLevel,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_tests: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub pass_rate: f64,
    pub quality_score: Option<f64>,
    pub quality_gate: Health,
    pub trend: TrendDirection,
    pub duration: String,
    pub environments: Vec<String>,
    pub browsers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub generated_at: String,
    pub overview: Overview,
    pub key_findings: Vec<Finding>,
    pub risk_assessment: Vec<Risk>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

impl ExecutiveSummary {
    #[must_use]
    pub fn build(input: &ReportInput<'_>) -> Self {
        let snap = input.snapshot;
        let metrics = input.metrics;
        let overview = Overview {
            total_tests: snap.totals.total,
            passed: snap.totals.passed,
            failed: snap.totals.failed,
            skipped: snap.totals.skipped,
            pass_rate: snap.pass_rate(),
            quality_score: metrics.quality_score,
            quality_gate: metrics.overall_health,
            trend: input.trend.direction,
            duration: format_duration_ms(snap.totals.duration_ms),
            environments: snap.by_environment.keys().map(|e| e.as_str().to_string()).collect(),
            browsers: snap.by_browser.keys().map(|b| b.as_str().to_string()).collect(),
        };
        let key_findings = findings(input);
        let risk_assessment = risks(input);
        let recommendations = recommendations(&risk_assessment);
        let next_steps = next_steps(input);
        Self {
            generated_at: input.generated_at(),
            overview,
            key_findings,
            risk_assessment,
            recommendations,
            next_steps,
        }
    }

    #[must_use]
    pub fn to_html(&self) -> String {
        let o = &self.overview;
        let mut page = Page::new(
            "Executive Summary",
            format!("Generated {}", self.generated_at),
            o.quality_gate,
        );

        page.push(
            Section::new("overview", "Overview").with(Block::Stats(vec![
                Stat::new("Total tests", o.total_tests.to_string()),
                Stat::new("Passed", o.passed.to_string()).class("pass"),
                Stat::new("Failed", o.failed.to_string()).class(if o.failed > 0 {
                    "fail"
                } else {
                    ""
                }),
                Stat::new("Pass rate", format!("{:.1}%", o.pass_rate)),
                Stat::new(
                    "Quality score",
                    o.quality_score.map_or_else(|| "n/a".to_string(), |q| format!("{q:.1}")),
                ),
                Stat::new("Quality gate", o.quality_gate.as_str())
                    .class(health_class(o.quality_gate)),
                Stat::new("Trend", o.trend.as_str()),
                Stat::new("Duration", o.duration.clone()),
            ])),
        );

        let mut findings = Table::new(vec!["Area", "Level", "Finding"]);
        for f in &self.key_findings {
            findings.push(Row::new(vec![
                Cell::text(&f.area),
                Cell::badge(f.level.class(), f.level.as_str()),
                Cell::text(&f.message),
            ]));
        }
        page.push(Section::new("findings", "Key findings").with(Block::Table(findings)));

        let mut risks = Table::new(vec!["Area", "Risk", "Description"]);
        for r in &self.risk_assessment {
            risks.push(Row::new(vec![
                Cell::text(&r.area),
                Cell::badge(r.level.class(), r.level.as_str()),
                Cell::text(&r.description),
            ]));
        }
        page.push(Section::new("risks", "Risk assessment").with(Block::Table(risks)));

        page.push(
            Section::new("recommendations", "Recommendations")
                .with(Block::List(self.recommendations.clone())),
        );
        page.push(Section::new("next-steps", "Next steps").with(Block::List(self.next_steps.clone())));
        page.render()
    }
}

fn findings(input: &ReportInput<'_>) -> Vec<Finding> {
    let snap = input.snapshot;
    let metrics = input.metrics;
    let gates = &input.config.gates;
    let mut out = Vec::new();
    let mut push = |area: &str, level: FindingLevel, message: String| {
        out.push(Finding {
            area: area.to_string(),
            level,
            message,
        });
    };

    if snap.totals.total == 0 {
        push("results", FindingLevel::Warning, "No test results were found".to_string());
    } else if snap.totals.failed == 0 {
        push(
            "results",
            FindingLevel::Positive,
            format!("All {} executed tests passed", snap.totals.total - snap.totals.skipped),
        );
    } else {
        let suites: std::collections::BTreeSet<&str> =
            snap.failures.iter().map(|f| f.suite.as_str()).collect();
        let level = if metrics.pass_rate < gates.pass_rate.critical_below {
            FindingLevel::Critical
        } else {
            FindingLevel::Warning
        };
        push(
            "results",
            level,
            format!(
                "{} of {} tests failed ({:.1}% pass rate) across {} suite(s)",
                snap.totals.failed,
                snap.totals.total,
                metrics.pass_rate,
                suites.len().max(1)
            ),
        );
    }

    for category in Category::ALL {
        let Some(score) = metrics.subdomain(category) else {
            continue;
        };
        let level = if score < HIGH_RISK_BELOW {
            FindingLevel::Critical
        } else if score < MEDIUM_RISK_BELOW {
            FindingLevel::Warning
        } else {
            FindingLevel::Positive
        };
        push(
            category.as_str(),
            level,
            format!("{} score is {score:.1}", category.as_str()),
        );
    }

    if let Some(a11y) = &snap.signals.accessibility {
        if a11y.violations.critical > 0 {
            push(
                "accessibility",
                FindingLevel::Critical,
                format!("{} critical accessibility violation(s)", a11y.violations.critical),
            );
        }
    }
    if let Some(security) = &snap.signals.security {
        if security.vulnerable > 0 {
            push(
                "security",
                FindingLevel::Critical,
                format!("{} of {} security checks found a vulnerability", security.vulnerable, security.checks),
            );
        }
    }
    if let Some(coverage) = metrics.coverage {
        let level = if coverage < gates.coverage.min {
            FindingLevel::Warning
        } else {
            FindingLevel::Positive
        };
        push("coverage", level, format!("Line coverage is {coverage:.1}%"));
    }
    if let Some(lint) = &metrics.lint {
        if lint.error_count > 0 {
            push(
                "lint",
                FindingLevel::Warning,
                format!("{} lint error(s) in {} file(s)", lint.error_count, lint.files),
            );
        }
    }
    match input.trend.direction {
        TrendDirection::Improving | TrendDirection::Declining => {
            let level = if input.trend.direction == TrendDirection::Improving {
                FindingLevel::Positive
            } else {
                FindingLevel::Warning
            };
            push(
                "trend",
                level,
                format!(
                    "Pass rate is {} ({:+.1} points)",
                    input.trend.direction,
                    input.trend.delta.unwrap_or_default()
                ),
            );
        }
        TrendDirection::Stable | TrendDirection::InsufficientData => {}
    }
    if !snap.errors.is_empty() {
        push(
            "ingestion",
            FindingLevel::Info,
            format!("{} diagnostic(s) were recorded while ingesting artifacts", snap.errors.len()),
        );
    }
    out
}

fn risks(input: &ReportInput<'_>) -> Vec<Risk> {
    let metrics = input.metrics;
    let snap = input.snapshot;
    let mut out = Vec::new();
    let mut push = |area: &str, level: RiskLevel, description: String| {
        out.push(Risk {
            area: area.to_string(),
            level,
            description,
        });
    };
    let band = |score: f64| {
        if score < HIGH_RISK_BELOW {
            Some(RiskLevel::High)
        } else if score < MEDIUM_RISK_BELOW {
            Some(RiskLevel::Medium)
        } else {
            None
        }
    };

    if let Some(level) = metrics.quality_score.and_then(band) {
        push(
            "quality",
            level,
            format!(
                "Overall quality score {:.1} is below {MEDIUM_RISK_BELOW}",
                metrics.quality_score.unwrap_or_default()
            ),
        );
    }
    if let Some(rate) = metrics.functional_pass_rate {
        if let Some(level) = band(rate) {
            push("stability", level, format!("Functional pass rate {rate:.1}% puts releases at risk"));
        }
    }
    if let Some(perf) = &metrics.performance {
        if let Some(level) = metrics.subdomain(Category::Performance).and_then(band) {
            push(
                "performance",
                level,
                format!("Load tests report a {:.1}% error rate", perf.error_rate_percent),
            );
        }
    }
    if let Some(security) = &snap.signals.security {
        let f = &security.findings;
        if f.critical + f.serious > 0 || security.vulnerable > 0 {
            push(
                "security",
                RiskLevel::High,
                format!("{} critical and {} high severity finding(s)", f.critical, f.serious),
            );
        } else if f.total() > 0 {
            push("security", RiskLevel::Medium, format!("{} lower severity finding(s)", f.total()));
        }
    }
    if let Some(a11y) = &snap.signals.accessibility {
        let v = &a11y.violations;
        if v.critical > 0 {
            push("accessibility", RiskLevel::High, format!("{} critical violation(s) block assistive technology", v.critical));
        } else if v.total() > 0 {
            push("accessibility", RiskLevel::Medium, format!("{} accessibility violation(s)", v.total()));
        }
    }
    if input.trend.direction == TrendDirection::Declining {
        push("trend", RiskLevel::Medium, "Pass rate is declining across recent runs".to_string());
    }
    if metrics
        .gates
        .iter()
        .any(|g| g.name == "coverage" && g.verdict == Verdict::Fail)
    {
        push(
            "coverage",
            RiskLevel::Low,
            format!("Line coverage is below {:.0}%", input.config.gates.coverage.min),
        );
    }
    out.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.area.cmp(&b.area)));
    out
}

fn recommendations(risks: &[Risk]) -> Vec<String> {
    let mut out: Vec<String> = risks
        .iter()
        .map(|risk| {
            match risk.area.as_str() {
                "quality" => "Address the lowest subdomain scores before the next release",
                "stability" => "Fix failing functional tests and quarantine flaky ones",
                "performance" => "Profile the failing load scenarios and reduce the error rate",
                "security" => "Remediate high severity security findings before deployment",
                "accessibility" => "Fix critical accessibility violations first, then serious ones",
                "trend" => "Review recent changes that correlate with the pass-rate decline",
                "coverage" => "Add tests for uncovered code paths",
                _ => "Review the reported risk",
            }
            .to_string()
        })
        .collect();
    out.dedup();
    if out.is_empty() {
        out.push("Maintain current practices; all tracked risks are low".to_string());
    }
    out
}

fn next_steps(input: &ReportInput<'_>) -> Vec<String> {
    let snap = input.snapshot;
    let mut out = Vec::new();
    if let Some(first) = snap.failures.first() {
        out.push(format!(
            "Triage {} failing test(s), starting with '{}' in suite '{}'",
            snap.failures.len(),
            first.case,
            first.suite
        ));
    } else if snap.totals.failed > 0 {
        out.push(format!("Triage {} failing test(s)", snap.totals.failed));
    }
    if !snap.errors.is_empty() {
        out.push(format!(
            "Fix or remove {} artifact(s) that could not be ingested",
            snap.errors.len()
        ));
    }
    for gate in input.metrics.failing_gates() {
        out.push(format!(
            "Bring {} to {} {}",
            gate.name,
            gate.comparison.symbol(),
            gate.threshold
        ));
    }
    out.push("Re-run aggregation after fixes to update the trend".to_string());
    out
}
