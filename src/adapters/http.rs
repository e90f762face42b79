//! HTTP-collection runner results (Newman-style `run` reports).

use super::{Adapter, AdapterOutput, ParseFailure, millis, parse_json};
use crate::discovery::{Candidate, suite_name};
use crate::model::{ApiMetrics, Artifact, CategoryMetrics, Ingested, Origin, SuiteResult, Totals};
use serde::Deserialize;

const HINTS: [&str; 3] = ["api", "newman", "postman"];

pub struct HttpAdapter;

#[derive(Debug, Deserialize)]
struct Run {
    #[serde(default)]
    collection: Option<Collection>,
    stats: Stats,
    #[serde(default)]
    timings: Option<Timings>,
}

#[derive(Debug, Deserialize)]
struct Collection {
    #[serde(default)]
    info: Option<CollectionInfo>,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Stats {
    tests: Counter,
    assertions: Counter,
    requests: Counter,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Counter {
    total: i64,
    failed: i64,
    pending: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Timings {
    started: Option<f64>,
    completed: Option<f64>,
}

impl Timings {
    /// Wall time. With `started` both are epoch millis; alone,
    /// `completed` is already a duration.
    fn duration(&self) -> f64 {
        match (self.started, self.completed) {
            (Some(started), Some(completed)) => completed - started,
            (None, Some(completed)) => completed,
            _ => 0.0,
        }
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl Adapter for HttpAdapter {
    fn origin(&self) -> Origin {
        Origin::Http
    }

    fn detect(&self, candidate: &Candidate) -> bool {
        candidate.is_json() && candidate.mentions(&HINTS)
    }

    fn parse(&self, artifact: &Artifact, bytes: &[u8]) -> Result<AdapterOutput, ParseFailure> {
        let json = parse_json(artifact, bytes)?;
        let run = json
            .get("run")
            .filter(|run| run.get("stats").is_some())
            .ok_or_else(|| ParseFailure::unrecognized(artifact))?;
        let run = Run::deserialize(run).map_err(|_| ParseFailure::unrecognized(artifact))?;

        let tests = &run.stats.tests;
        let (totals, notes) = Totals::normalized(
            tests.total,
            tests.total - tests.failed - tests.pending,
            tests.failed,
            tests.pending,
            run.timings
                .as_ref()
                .map_or(0, |t| i64::try_from(millis(t.duration())).unwrap_or(i64::MAX)),
        );

        let metrics = ApiMetrics {
            assertions_total: non_negative(run.stats.assertions.total),
            assertions_failed: non_negative(run.stats.assertions.failed),
            requests_total: non_negative(run.stats.requests.total),
            requests_failed: non_negative(run.stats.requests.failed),
        };

        let name = run
            .collection
            .and_then(|c| c.info)
            .and_then(|info| info.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| suite_name(&artifact.relative, Origin::Http));

        let suite = SuiteResult::leaf(name, totals).with_metrics(CategoryMetrics::Api(metrics));
        Ok(AdapterOutput::new(Ingested::Suite(suite)).with_warnings(notes))
    }
}
