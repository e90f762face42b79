//! Security check results.
//!
//! Per-check records `{ vulnerable, risk }` (a list, or under `results` /
//! `tests` / `checks`) become one case each. Findings are counted from a
//! `vulnerabilities_by_severity` map when present, otherwise from the risk
//! of each vulnerable record.

use super::{Adapter, AdapterOutput, ParseFailure, field, str_at};
use crate::discovery::{Candidate, suite_name};
use crate::model::{
    Artifact, CaseResult, CaseStatus, CategoryMetrics, Ingested, Origin, SecurityMetrics,
    SeverityCounts, SuiteResult,
};
use serde::Deserialize;
use serde_json::Value;

const HINTS: [&str; 5] = ["security", "zap", "owasp", "vulnerability", "vulnerabilities"];
const RECORD_KEYS: [&str; 3] = ["results", "tests", "checks"];

pub struct SecurityAdapter;

impl Adapter for SecurityAdapter {
    fn origin(&self) -> Origin {
        Origin::Security
    }

    fn detect(&self, candidate: &Candidate) -> bool {
        candidate.is_json() && candidate.mentions(&HINTS)
    }

    fn parse(&self, artifact: &Artifact, bytes: &[u8]) -> Result<AdapterOutput, ParseFailure> {
        let json = super::parse_json(artifact, bytes)?;

        let records: Option<&Vec<Value>> = json.as_array().or_else(|| {
            RECORD_KEYS
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_array))
        });
        let severity_map = field(&json, &["vulnerabilities_by_severity"])
            .or_else(|| field(&json, &["summary", "vulnerabilities_by_severity"]));
        if records.is_none() && severity_map.is_none() {
            return Err(ParseFailure::unrecognized(artifact));
        }

        let mut suite = SuiteResult::new(suite_name(&artifact.relative, Origin::Security));
        let mut from_records = SeverityCounts::default();
        let mut vulnerable = 0;
        let records = records.map(Vec::as_slice).unwrap_or_default();
        for (index, record) in records.iter().enumerate() {
            let Some(flag) = record.get("vulnerable").and_then(Value::as_bool) else {
                return Err(ParseFailure::unrecognized(artifact));
            };
            let name = str_at(record, &["test"])
                .or_else(|| str_at(record, &["name"]))
                .or_else(|| str_at(record, &["title"]))
                .map_or_else(|| format!("check {}", index + 1), str::to_string);
            if flag {
                vulnerable += 1;
                let risk = str_at(record, &["risk"]).unwrap_or("low");
                if !matches!(
                    risk.to_ascii_lowercase().as_str(),
                    "info" | "informational" | "none"
                ) {
                    from_records.record(risk);
                }
            }
            let status = if flag {
                CaseStatus::Failed
            } else {
                CaseStatus::Passed
            };
            suite.push_case(CaseResult::new(name, Some(status), 0));
        }

        let findings = match severity_map {
            Some(map) => SeverityCounts::deserialize(map)
                .map_err(|_| ParseFailure::unrecognized(artifact))?,
            None => from_records,
        };
        let metrics = SecurityMetrics {
            checks: records.len() as u64,
            vulnerable,
            findings,
        };
        Ok(AdapterOutput::new(Ingested::Suite(
            suite.with_metrics(CategoryMetrics::Security(metrics)),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::artifact;
    use crate::model::Totals;
    use serde_json::json;

    fn parse(value: &Value) -> Result<(SuiteResult, SecurityMetrics), ParseFailure> {
        let out = SecurityAdapter.parse(
            &artifact("security/scan-results.json", Origin::Security),
            &serde_json::to_vec(value).unwrap(),
        )?;
        let Ingested::Suite(suite) = out.ingested else {
            panic!("expected suite");
        };
        let Some(CategoryMetrics::Security(metrics)) = suite.metrics else {
            panic!("expected security metrics");
        };
        Ok((suite, metrics))
    }

    #[test]
    fn records_with_risk() {
        let (suite, m) = parse(&json!({"results": [
            {"test": "sql injection", "vulnerable": true, "risk": "HIGH"},
            {"test": "xss", "vulnerable": false, "risk": "MEDIUM"},
            {"test": "headers", "vulnerable": true, "risk": "LOW"}
        ]}))
        .unwrap();
        assert_eq!(suite.name, "scan");
        assert_eq!(suite.totals, Totals::new(1, 2, 0, 0));
        assert_eq!(m.vulnerable, 2);
        assert_eq!(m.findings.serious, 1);
        assert_eq!(m.findings.minor, 1);
    }

    #[test]
    fn severity_map_wins_over_records() {
        let (_, m) = parse(&json!({
            "tests": [{"test": "a", "vulnerable": true, "risk": "HIGH"}],
            "summary": {"vulnerabilities_by_severity": {"critical": 0, "high": 3, "medium": 1, "low": 0}}
        }))
        .unwrap();
        assert_eq!(m.findings.serious, 3);
        assert_eq!(m.findings.moderate, 1);
        assert_eq!(m.checks, 1);
    }

    #[test]
    fn record_without_flag_is_unrecognized() {
        assert!(parse(&json!([{"test": "a"}])).is_err());
        assert!(parse(&json!({})).is_err());
    }
}
