//! Coverage summaries (`coverage-summary.json` with a `total` block).

use super::{Adapter, AdapterOutput, ParseFailure, float_at, int_at, parse_json};
use crate::discovery::Candidate;
use crate::model::{Artifact, CoverageMetric, CoverageSummary, Ingested, Origin, round1};
use serde_json::Value;

pub struct CoverageAdapter;

impl Adapter for CoverageAdapter {
    fn origin(&self) -> Origin {
        Origin::Coverage
    }

    fn detect(&self, candidate: &Candidate) -> bool {
        candidate.file_name == "coverage-summary.json"
    }

    fn parse(&self, artifact: &Artifact, bytes: &[u8]) -> Result<AdapterOutput, ParseFailure> {
        let json = parse_json(artifact, bytes)?;
        let total = json
            .get("total")
            .filter(|t| t.is_object())
            .ok_or_else(|| ParseFailure::unrecognized(artifact))?;

        let metric = |name: &str| total.get(name).map(coverage_metric);
        let (Some(statements), Some(branches), Some(functions), Some(lines)) = (
            metric("statements"),
            metric("branches"),
            metric("functions"),
            metric("lines"),
        ) else {
            return Err(ParseFailure::unrecognized(artifact));
        };

        Ok(AdapterOutput::new(Ingested::Coverage(CoverageSummary {
            statements,
            branches,
            functions,
            lines,
        })))
    }
}

/// `pct` may be a string such as `"Unknown"` when nothing was instrumented;
/// it is then derived from the counters.
fn coverage_metric(value: &Value) -> CoverageMetric {
    let total = int_at(value, &["total"]).and_then(|v| u64::try_from(v).ok()).unwrap_or(0);
    let covered = int_at(value, &["covered"])
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or(0)
        .min(total);
    let pct = float_at(value, &["pct"]).unwrap_or_else(|| {
        if total == 0 {
            0.0
        } else {
            covered as f64 / total as f64 * 100.0
        }
    });
    CoverageMetric {
        total,
        covered,
        pct: round1(pct.clamp(0.0, 100.0)),
    }
}
