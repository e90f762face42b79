//! Accessibility scan results.
//!
//! Accepts a list of scans, `{ results: [...] }`, `{ scans: [...] }` or a
//! single scan. Each scan carries `violations[]` with an `impact`, or a
//! `violations` map of counts by severity. One case per scan: passed
//! without violations, failed otherwise.

use super::{Adapter, AdapterOutput, ParseFailure, array, int_at, parse_json, str_at};
use crate::discovery::{Candidate, suite_name};
use crate::model::{
    AccessibilityMetrics, Artifact, CaseResult, CaseStatus, CategoryMetrics, Ingested, Origin,
    SeverityCounts, SuiteResult,
};
use serde_json::Value;

const HINTS: [&str; 5] = ["accessibility", "a11y", "axe", "pa11y", "wcag"];
const SEVERITIES: [&str; 7] = [
    "critical", "serious", "high", "moderate", "medium", "minor", "low",
];

pub struct AccessibilityAdapter;

impl Adapter for AccessibilityAdapter {
    fn origin(&self) -> Origin {
        Origin::Accessibility
    }

    fn detect(&self, candidate: &Candidate) -> bool {
        candidate.is_json() && candidate.mentions(&HINTS)
    }

    fn parse(&self, artifact: &Artifact, bytes: &[u8]) -> Result<AdapterOutput, ParseFailure> {
        let json = parse_json(artifact, bytes)?;
        let scans: Vec<&Value> = match &json {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) if json.get("violations").is_some() => vec![&json],
            Value::Object(_) => ["results", "scans"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_array))
                .ok_or_else(|| ParseFailure::unrecognized(artifact))?
                .iter()
                .collect(),
            _ => return Err(ParseFailure::unrecognized(artifact)),
        };
        if scans.iter().any(|scan| !scan.is_object()) {
            return Err(ParseFailure::unrecognized(artifact));
        }

        let mut suite = SuiteResult::new(suite_name(&artifact.relative, Origin::Accessibility));
        let mut pooled = SeverityCounts::default();
        for (index, scan) in scans.iter().enumerate() {
            let counts = scan_counts(scan);
            pooled.absorb(&counts);
            let name = str_at(scan, &["url"])
                .or_else(|| str_at(scan, &["name"]))
                .or_else(|| str_at(scan, &["page"]))
                .map_or_else(|| format!("scan {}", index + 1), str::to_string);
            let status = if counts.total() == 0 {
                CaseStatus::Passed
            } else {
                CaseStatus::Failed
            };
            suite.push_case(CaseResult::new(name, Some(status), 0));
        }

        let metrics = AccessibilityMetrics {
            scans: scans.len() as u64,
            violations: pooled,
        };
        Ok(AdapterOutput::new(Ingested::Suite(
            suite.with_metrics(CategoryMetrics::Accessibility(metrics)),
        )))
    }
}

fn scan_counts(scan: &Value) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    match scan.get("violations") {
        Some(Value::Object(_)) => {
            let violations = &scan["violations"];
            for severity in SEVERITIES {
                let n = int_at(violations, &[severity]).unwrap_or(0).max(0);
                counts.add(severity, n.unsigned_abs());
            }
        }
        _ => {
            for violation in array(scan, "violations") {
                counts.record(str_at(violation, &["impact"]).unwrap_or("minor"));
            }
        }
    }
    counts
}
