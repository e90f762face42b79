//! Load-generator results.
//!
//! Two families reduce to one `LoadMetrics`:
//! - summary reports `{ scenario, summary: { totalRequests, ..., errorRate } }`
//!   where `errorRate` is already a percentage;
//! - k6 exports with `http_req_duration` / `http_req_failed` / `http_reqs`
//!   under `stats` or `metrics` (optionally nested in `values`), where the
//!   failure rate is a fraction.
//!
//! Percentiles are carried verbatim: a missing p90 stays missing even when
//! p95 is present.

use super::{Adapter, AdapterOutput, ParseFailure, float_at, int_at, millis, parse_json, str_at};
use crate::discovery::{Candidate, suite_name};
use crate::model::{
    Artifact, CategoryMetrics, Ingested, LoadMetrics, Origin, SuiteResult, Totals, round1,
};
use serde_json::Value;

const HINTS: [&str; 7] = ["performance", "perf", "load", "k6", "artillery", "stress", "soak"];

pub struct LoadAdapter;

impl Adapter for LoadAdapter {
    fn origin(&self) -> Origin {
        Origin::Load
    }

    fn detect(&self, candidate: &Candidate) -> bool {
        candidate.is_json() && candidate.mentions(&HINTS)
    }

    fn parse(&self, artifact: &Artifact, bytes: &[u8]) -> Result<AdapterOutput, ParseFailure> {
        let json = parse_json(artifact, bytes)?;
        let scenario = str_at(&json, &["scenario"])
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| suite_name(&artifact.relative, Origin::Load), str::to_string);

        let (metrics, duration) = if let Some(summary) = json.get("summary").filter(|s| s.is_object())
        {
            (from_summary(summary, scenario), int_at(summary, &["duration"]).unwrap_or(0))
        } else if let Some(k6) = k6_metrics(&json) {
            (
                from_k6(&k6, scenario),
                float_at(&json, &["state", "testRunDurationMs"]).map_or(0, |ms| {
                    i64::try_from(millis(ms)).unwrap_or(i64::MAX)
                }),
            )
        } else {
            return Err(ParseFailure::unrecognized(artifact));
        };

        let total = metrics.total_requests as i64;
        let (totals, notes) = Totals::normalized(
            total,
            metrics.successful_requests as i64,
            metrics.failed_requests as i64,
            0,
            duration,
        );
        let suite = SuiteResult::leaf(metrics.scenario.clone(), totals)
            .with_metrics(CategoryMetrics::Performance(metrics));
        Ok(AdapterOutput::new(Ingested::Suite(suite)).with_warnings(notes))
    }
}

fn count(value: &Value, key: &str) -> u64 {
    int_at(value, &[key]).and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

fn from_summary(summary: &Value, scenario: String) -> LoadMetrics {
    let total = count(summary, "totalRequests");
    let failed = count(summary, "failedRequests");
    let successful = int_at(summary, &["successfulRequests"])
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or_else(|| total.saturating_sub(failed));
    let error_rate = float_at(summary, &["errorRate"]).unwrap_or_else(|| percent(failed, total));

    LoadMetrics {
        scenario,
        total_requests: total,
        successful_requests: successful,
        failed_requests: failed,
        average_ms: float_at(summary, &["averageResponseTime"]),
        p50_ms: float_at(summary, &["p50ResponseTime"])
            .or_else(|| float_at(summary, &["medianResponseTime"])),
        p90_ms: float_at(summary, &["p90ResponseTime"]),
        p95_ms: float_at(summary, &["p95ResponseTime"]),
        p99_ms: float_at(summary, &["p99ResponseTime"]),
        throughput: float_at(summary, &["throughput"]),
        error_rate_percent: round1(error_rate.clamp(0.0, 100.0)),
    }
}

/// The three k6 metric blocks, whichever container they live in.
struct K6<'a> {
    duration: Option<&'a Value>,
    failed: Option<&'a Value>,
    requests: Option<&'a Value>,
}

fn k6_metrics(json: &Value) -> Option<K6<'_>> {
    let lookup = |name: &str| {
        ["stats", "metrics"]
            .iter()
            .find_map(|container| json.get(*container)?.get(name))
            .map(|block| block.get("values").unwrap_or(block))
    };
    let k6 = K6 {
        duration: lookup("http_req_duration"),
        failed: lookup("http_req_failed"),
        requests: lookup("http_reqs"),
    };
    (k6.duration.is_some() || k6.failed.is_some() || k6.requests.is_some()).then_some(k6)
}

fn from_k6(k6: &K6<'_>, scenario: String) -> LoadMetrics {
    let pick = |keys: &[&str]| {
        k6.duration
            .and_then(|block| keys.iter().find_map(|key| float_at(block, &[*key])))
    };

    let total = k6.requests.map_or(0, |block| count(block, "count"));
    let fraction = k6
        .failed
        .and_then(|block| float_at(block, &["rate"]).or_else(|| float_at(block, &["value"])));
    let error_rate = fraction.map_or(0.0, |f| f * 100.0);
    let failed = ((total as f64) * error_rate / 100.0).round() as u64;

    LoadMetrics {
        scenario,
        total_requests: total,
        successful_requests: total.saturating_sub(failed),
        failed_requests: failed.min(total),
        average_ms: pick(&["avg", "mean"]),
        p50_ms: pick(&["p50", "med", "p(50)"]),
        p90_ms: pick(&["p90", "p(90)"]),
        p95_ms: pick(&["p95", "p(95)"]),
        p99_ms: pick(&["p99", "p(99)"]),
        throughput: k6.requests.and_then(|block| float_at(block, &["rate"])),
        error_rate_percent: round1(error_rate.clamp(0.0, 100.0)),
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
