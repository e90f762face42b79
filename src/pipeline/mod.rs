//! The aggregation run.
//!
//! Steps, in order: ensure output directories, take the history lock and
//! load history, locate artifacts, ingest them, link media, aggregate,
//! derive metrics, emit reports, save history. Cancellation and the global
//! budget are checked between artifacts; a stopped run emits nothing.

mod media;

pub use media::link_media;

use crate::adapters::Registry;
use crate::aggregate::{AggregateSnapshot, Aggregator};
use crate::config::{QaConfig, RuntimeEnv};
use crate::discovery::locate;
use crate::error::{QaError, Result};
use crate::history::{self, EntryMetadata, HistoryEntry, HistoryLock, HistoryStore, Trend};
use crate::metrics::{DerivedMetrics, derive};
use crate::model::{Diagnostic, Ingested, Labels};
use crate::monitor::StatusMonitor;
use crate::report::{self, ReportInput};
use crate::util::progress::ProgressTracker;
use crate::util::Clock;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snapshot: AggregateSnapshot,
    pub metrics: DerivedMetrics,
    pub trend: Trend,
    pub digest: String,
    pub generated_at: DateTime<Utc>,
    pub artifacts: usize,
    pub media: usize,
    pub reports: Vec<PathBuf>,
    pub history_saved: bool,
}

impl RunOutcome {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.snapshot.totals.failed > 0
    }
}

/// Create the report root and its `metrics/` directory.
///
/// # Errors
///
/// Returns an error if a directory cannot be created.
pub fn ensure_directories(config: &QaConfig) -> Result<()> {
    let metrics_dir = config.report_root.join("metrics");
    fs::create_dir_all(&metrics_dir).map_err(|source| QaError::ReportEmit {
        family: "directories",
        path: metrics_dir,
        source,
    })?;
    Ok(())
}

pub struct Pipeline<'a> {
    config: &'a QaConfig,
    clock: &'a dyn Clock,
    runtime: RuntimeEnv,
    registry: Registry,
    cancel: Arc<AtomicBool>,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(config: &'a QaConfig, clock: &'a dyn Clock) -> Self {
        Self {
            config,
            clock,
            runtime: RuntimeEnv::default(),
            registry: Registry::standard(),
            cancel: Arc::new(AtomicBool::new(false)),
            show_progress: false,
        }
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeEnv) -> Self {
        self.runtime = runtime;
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run once. A cancelled or over-budget run marks an initialised status
    /// monitor `failed` before returning the error.
    ///
    /// # Errors
    ///
    /// Returns `QaError::Cancelled`, `QaError::BudgetExceeded`,
    /// `QaError::HistoryLocked`, or a report emission error.
    pub fn run(&self) -> Result<RunOutcome> {
        let result = self.run_inner();
        if let Err(err @ (QaError::Cancelled | QaError::BudgetExceeded { .. })) = &result {
            let monitor = StatusMonitor::new(&self.config.status_file, self.clock);
            if let Err(mark_err) = monitor.fail_if_initialised(&err.to_string()) {
                tracing::warn!(error = %mark_err, "Could not mark status monitor failed");
            }
        }
        result
    }

    fn run_inner(&self) -> Result<RunOutcome> {
        let started = Instant::now();
        let config = self.config;
        ensure_directories(config)?;

        let history_path = history::history_path(&config.report_root);
        let _lock = HistoryLock::acquire(&history_path)?;
        let (mut store, history_diagnostic) = HistoryStore::load(&history_path);

        let discovery = locate(&config.results_root, &self.registry);
        let artifact_count = discovery.artifacts.len();
        info!(
            root = %config.results_root.display(),
            artifacts = artifact_count,
            media = discovery.media.len(),
            "Located artifacts"
        );

        let mut diagnostics = discovery.diagnostics;
        diagnostics.extend(history_diagnostic);

        let timeout = Duration::from_secs(config.adapter_timeout_secs);
        let progress = ProgressTracker::new(artifact_count as u64, "Ingesting", self.show_progress);
        let mut ingested: Vec<(Ingested, Labels)> = Vec::with_capacity(artifact_count);
        for artifact in &discovery.artifacts {
            self.check_continue(started)?;
            progress.set_message(artifact.relative.clone());
            match self.registry.ingest(artifact, timeout) {
                Ok(output) => {
                    for warning in output.warnings {
                        let diagnostic = Diagnostic::parse(artifact.relative.clone(), warning);
                        diagnostic.log();
                        diagnostics.push(diagnostic);
                    }
                    ingested.push((output.ingested, artifact.labels()));
                }
                Err(diagnostic) => {
                    diagnostic.log();
                    diagnostics.push(diagnostic);
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
        self.check_continue(started)?;

        let media = link_media(
            &config.results_root,
            &discovery.artifacts,
            &mut ingested,
            discovery.media,
        );

        let mut aggregator = Aggregator::new();
        for (item, labels) in &ingested {
            aggregator.ingest(item, labels);
        }
        for diagnostic in diagnostics {
            aggregator.add_diagnostic(diagnostic);
        }
        let snapshot = aggregator.finish();
        let metrics = derive(&snapshot, config);
        let digest = report::snapshot_digest(&snapshot)?;
        debug!(%digest, "Snapshot sealed");

        let generated_at = self.clock.now();
        let entry = HistoryEntry::from_run(generated_at, &snapshot.totals, &metrics);
        let metadata = EntryMetadata {
            digest: Some(digest.clone()),
            test_env: self.runtime.test_env.clone(),
            ..entry.metadata.clone()
        };
        store.append(entry.with_metadata(metadata));
        store.trim(config.history_max_len);
        let trend = history::trend(store.entries(), config.trend_window);

        let input = ReportInput {
            config,
            snapshot: &snapshot,
            metrics: &metrics,
            trend: &trend,
            history: store.entries(),
            media: &media,
            runtime: &self.runtime,
            artifact_count,
            digest: &digest,
            generated_at,
            results_root: &config.results_root,
        };
        let reports = report::emit(&config.report_root, &input)?;
        let history_saved = store.save()?;

        info!(
            total = snapshot.totals.total,
            failed = snapshot.totals.failed,
            health = %metrics.overall_health,
            trend = %trend.direction,
            "Run complete"
        );
        Ok(RunOutcome {
            media: media.len(),
            snapshot,
            metrics,
            trend,
            digest,
            generated_at,
            artifacts: artifact_count,
            reports,
            history_saved,
        })
    }

    fn check_continue(&self, started: Instant) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(QaError::Cancelled);
        }
        if let Some(budget_secs) = self.config.run_budget_secs {
            if started.elapsed() > Duration::from_secs(budget_secs) {
                return Err(QaError::BudgetExceeded { budget_secs });
            }
        }
        Ok(())
    }
}

/// Run with the standard registry and no cancellation.
///
/// # Errors
///
/// See [`Pipeline::run`].
pub fn run(config: &QaConfig, clock: &dyn Clock, runtime: RuntimeEnv) -> Result<RunOutcome> {
    Pipeline::new(config, clock).with_runtime(runtime).run()
}

/// Paths the run writes to, for display.
#[must_use]
pub fn output_paths(config: &QaConfig) -> Vec<PathBuf> {
    let root: &Path = &config.report_root;
    vec![
        root.join(report::NORMALIZED_JSON),
        root.join(report::SIMPLE_HTML),
        root.join(report::COMPREHENSIVE_DIR).join("index.html"),
        root.join(report::DASHBOARD_DIR).join("index.html"),
        root.join(report::EXECUTIVE_JSON),
        root.join(report::EXECUTIVE_HTML),
        root.join(report::JUNIT_XML),
        root.join(report::LATEST_METRICS),
        history::history_path(root),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Health;
    use crate::model::DiagnosticKind;
    use crate::util::FixedClock;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> QaConfig {
        QaConfig {
            results_root: temp.path().join("test-results"),
            report_root: temp.path().join("reports"),
            status_file: temp.path().join("test-status.json"),
            ..QaConfig::default()
        }
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap())
    }

    fn write(path: &Path, value: &serde_json::Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
    }

    #[test]
    fn missing_root_is_an_empty_good_run() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        let clock = clock();
        let outcome = run(&config, &clock, RuntimeEnv::default()).unwrap();
        assert_eq!(outcome.snapshot.totals.total, 0);
        assert_eq!(outcome.metrics.overall_health, Health::Good);
        assert_eq!(outcome.snapshot.errors.len(), 1);
        assert_eq!(outcome.snapshot.errors[0].kind, DiagnosticKind::DiscoveryError);
        assert!(outcome.history_saved);
        for path in output_paths(&config) {
            assert!(path.is_file(), "missing {}", path.display());
        }
    }

    #[test]
    fn counts_stats_and_records_history() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        write(
            &config.results_root.join("staging/firefox/results.json"),
            &json!({"stats": {"total": 10, "passed": 9, "failed": 1, "skipped": 0, "duration": 12345}}),
        );
        let clock = clock();
        let first = run(&config, &clock, RuntimeEnv::default()).unwrap();
        assert_eq!(first.snapshot.totals.failed, 1);
        assert!(first.has_failures());

        let second = run(&config, &clock, RuntimeEnv::default()).unwrap();
        assert_eq!(second.digest, first.digest);
        let (store, _) = HistoryStore::load(&history::history_path(&config.report_root));
        assert_eq!(store.entries().len(), 2);
        assert_eq!(second.trend.delta, Some(0.0));
    }

    #[test]
    fn cancelled_run_emits_nothing_and_fails_monitor() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        write(
            &config.results_root.join("api/newman.json"),
            &json!({"run": {"stats": {"tests": {"total": 1, "failed": 0}}}}),
        );
        let clock = clock();
        StatusMonitor::new(&config.status_file, &clock).init().unwrap();

        let cancel = Arc::new(AtomicBool::new(true));
        let err = Pipeline::new(&config, &clock)
            .with_cancel_flag(cancel)
            .run()
            .unwrap_err();
        assert!(matches!(err, QaError::Cancelled));
        assert!(!config.report_root.join(report::NORMALIZED_JSON).exists());
        let status = crate::monitor::read_status(&config.status_file).unwrap();
        assert_eq!(status.overall, crate::monitor::OverallStatus::Failed);
    }

    #[test]
    fn corrupt_history_is_diagnosed_and_kept() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        let history_file = history::history_path(&config.report_root);
        fs::create_dir_all(history_file.parent().unwrap()).unwrap();
        fs::write(&history_file, "[{").unwrap();

        let clock = clock();
        let outcome = run(&config, &clock, RuntimeEnv::default()).unwrap();
        assert!(!outcome.history_saved);
        assert!(
            outcome
                .snapshot
                .errors
                .iter()
                .any(|d| d.kind == DiagnosticKind::HistoryCorrupt)
        );
        assert_eq!(fs::read_to_string(&history_file).unwrap(), "[{");
    }
}
