//! Report emitter.
//!
//! Every family is a pure function of [`ReportInput`] rendered to bytes and
//! then written atomically: files via a temp sibling and rename, the
//! dashboard and comprehensive directories via a staged directory swap.
//! The clock is read once by the caller and passed in as `generated_at`.

pub mod executive;
pub mod html;
pub mod junit;
pub mod normalized;
pub mod pages;

pub use executive::ExecutiveSummary;
pub use normalized::{LatestMetrics, NormalizedReport};

use crate::aggregate::AggregateSnapshot;
use crate::config::{QaConfig, RuntimeEnv};
use crate::error::{QaError, Result};
use crate::history::{HistoryEntry, Trend};
use crate::metrics::DerivedMetrics;
use crate::model::MediaTable;
use crate::util::{canonical_digest, format_timestamp, replace_dir_atomic, write_atomic};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const NORMALIZED_JSON: &str = "test-results.json";
pub const SIMPLE_HTML: &str = "test-report.html";
pub const COMPREHENSIVE_DIR: &str = "comprehensive";
pub const DASHBOARD_DIR: &str = "dashboard";
pub const EXECUTIVE_JSON: &str = "executive-summary.json";
pub const EXECUTIVE_HTML: &str = "executive-summary.html";
pub const JUNIT_XML: &str = "junit-results.xml";
pub const LATEST_METRICS: &str = "metrics/latest-metrics.json";

/// Everything the templates may read.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub config: &'a QaConfig,
    pub snapshot: &'a AggregateSnapshot,
    pub metrics: &'a DerivedMetrics,
    pub trend: &'a Trend,
    pub history: &'a [HistoryEntry],
    pub media: &'a MediaTable,
    pub runtime: &'a RuntimeEnv,
    pub artifact_count: usize,
    pub digest: &'a str,
    pub generated_at: DateTime<Utc>,
    pub results_root: &'a Path,
}

impl ReportInput<'_> {
    #[must_use]
    pub fn generated_at(&self) -> String {
        format_timestamp(&self.generated_at)
    }
}

/// SHA-256 of the canonical snapshot JSON. Independent of discovery order.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be serialized.
pub fn snapshot_digest(snapshot: &AggregateSnapshot) -> Result<String> {
    Ok(canonical_digest(snapshot)?)
}

/// Render and write every report family under `report_root`.
///
/// # Errors
///
/// Returns `QaError::ReportEmit` naming the first family that could not be
/// written.
pub fn emit(report_root: &Path, input: &ReportInput<'_>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let normalized = to_json(&NormalizedReport::build(input))?;
    written.push(write_family("normalized", &report_root.join(NORMALIZED_JSON), &normalized)?);

    let simple = pages::simple(input);
    written.push(write_family("simple html", &report_root.join(SIMPLE_HTML), simple.as_bytes())?);

    let comprehensive_dir = report_root.join(COMPREHENSIVE_DIR);
    let comprehensive = pages::comprehensive(input, &comprehensive_dir);
    written.push(write_dir_family("comprehensive", &comprehensive_dir, &comprehensive)?);

    let dashboard_dir = report_root.join(DASHBOARD_DIR);
    let dashboard = pages::dashboard(input, &dashboard_dir);
    written.push(write_dir_family("dashboard", &dashboard_dir, &dashboard)?);

    let summary = ExecutiveSummary::build(input);
    written.push(write_family(
        "executive summary",
        &report_root.join(EXECUTIVE_JSON),
        &to_json(&summary)?,
    )?);
    written.push(write_family(
        "executive summary",
        &report_root.join(EXECUTIVE_HTML),
        summary.to_html().as_bytes(),
    )?);

    let junit = junit::to_junit(input.snapshot);
    written.push(write_family("junit", &report_root.join(JUNIT_XML), junit.as_bytes())?);

    let latest = to_json(&LatestMetrics::build(input))?;
    written.push(write_family("metrics", &report_root.join(LATEST_METRICS), &latest)?);

    info!(root = %report_root.display(), files = written.len(), "Reports written");
    Ok(written)
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_family(family: &'static str, path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    write_atomic(path, bytes).map_err(|source| QaError::ReportEmit {
        family,
        path: path.to_path_buf(),
        source,
    })?;
    debug!(family, path = %path.display(), "Wrote report");
    Ok(path.to_path_buf())
}

fn write_dir_family(family: &'static str, dir: &Path, index_html: &str) -> Result<PathBuf> {
    let index = dir.join("index.html");
    replace_dir_atomic(dir, |staging| fs::write(staging.join("index.html"), index_html))
        .map_err(|source| QaError::ReportEmit {
            family,
            path: dir.to_path_buf(),
            source,
        })?;
    debug!(family, path = %index.display(), "Wrote report");
    Ok(index)
}


#[cfg(test)]
mod tests {
    use super::test_support::Fixture;
    use super::*;
    use crate::model::{Origin, SuiteResult, Totals};
    use tempfile::TempDir;

    #[test]
    fn emit_writes_every_family() {
        let temp = TempDir::new().unwrap();
        let fixture = Fixture::new(vec![(
            SuiteResult::leaf("ui", Totals::new(9, 1, 0, 12345)),
            Origin::Browser,
        )]);
        let written = emit(temp.path(), &fixture.input()).unwrap();
        assert_eq!(written.len(), 8);
        for name in [
            NORMALIZED_JSON,
            SIMPLE_HTML,
            "comprehensive/index.html",
            "dashboard/index.html",
            EXECUTIVE_JSON,
            EXECUTIVE_HTML,
            JUNIT_XML,
            LATEST_METRICS,
        ] {
            assert!(temp.path().join(name).is_file(), "missing {name}");
        }

        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(temp.path().join(NORMALIZED_JSON)).unwrap()).unwrap();
        assert_eq!(json["total"], 10);
        assert_eq!(json["passRate"], 90.0);
        assert_eq!(json["environments"]["staging"]["total"], 10);
        assert_eq!(json["generatedAt"], "2025-06-01T12:00:00.000Z");
    }

    #[test]
    fn emit_is_deterministic() {
        let fixture = Fixture::new(vec![(
            SuiteResult::leaf("api", Totals::new(3, 0, 1, 50)),
            Origin::Http,
        )]);
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        emit(a.path(), &fixture.input()).unwrap();
        emit(b.path(), &fixture.input()).unwrap();
        for name in [NORMALIZED_JSON, EXECUTIVE_JSON, JUNIT_XML, LATEST_METRICS] {
            assert_eq!(
                fs::read(a.path().join(name)).unwrap(),
                fs::read(b.path().join(name)).unwrap()
            );
        }
    }

    #[test]
    fn digest_tracks_content() {
        let a = Fixture::new(vec![(SuiteResult::leaf("x", Totals::new(1, 0, 0, 1)), Origin::Browser)]);
        let b = Fixture::new(vec![(SuiteResult::leaf("x", Totals::new(1, 1, 0, 1)), Origin::Browser)]);
        assert_ne!(
            snapshot_digest(&a.snapshot).unwrap(),
            snapshot_digest(&b.snapshot).unwrap()
        );
        assert_eq!(
            snapshot_digest(&a.snapshot).unwrap(),
            snapshot_digest(&a.snapshot.clone()).unwrap()
        );
    }
}
