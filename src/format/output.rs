//! JSON payloads printed by the CLI under `--json`.

use crate::history::{HistoryEntry, Trend};
use crate::metrics::{GateResult, Health};
use crate::pipeline::RunOutcome;
use serde::Serialize;
use std::path::Path;

/// One aggregation run, as printed by `aggregate` and `run`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub duration_ms: u64,
    pub pass_rate: f64,
    pub quality_score: Option<f64>,
    pub overall_health: Health,
    pub trend: Trend,
    pub gates: Vec<GateResult>,
    pub digest: String,
    pub generated_at: String,
    pub artifacts: usize,
    pub media: usize,
    pub diagnostics: usize,
    pub history_saved: bool,
    pub reports: Vec<String>,
}

impl RunSummary {
    #[must_use]
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let totals = &outcome.snapshot.totals;
        Self {
            total: totals.total,
            passed: totals.passed,
            failed: totals.failed,
            skipped: totals.skipped,
            duration_ms: totals.duration_ms,
            pass_rate: outcome.metrics.pass_rate,
            quality_score: outcome.metrics.quality_score,
            overall_health: outcome.metrics.overall_health,
            trend: outcome.trend.clone(),
            gates: outcome.metrics.gates.clone(),
            digest: outcome.digest.clone(),
            generated_at: crate::util::format_timestamp(&outcome.generated_at),
            artifacts: outcome.artifacts,
            media: outcome.media,
            diagnostics: outcome.snapshot.errors.len(),
            history_saved: outcome.history_saved,
            reports: outcome
                .reports
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        }
    }
}

/// How one external tool run by `qap run` ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRun {
    pub name: String,
    pub program: String,
    pub launched: bool,
    /// `None` when the tool was killed by a signal or never started.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolRun {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.launched && self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCommandOutput {
    pub tools: Vec<ToolRun>,
    pub summary: RunSummary,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryListing<'a> {
    pub path: String,
    pub corrupt: bool,
    pub entries: &'a [HistoryEntry],
}

impl<'a> HistoryListing<'a> {
    #[must_use]
    pub fn new(path: &Path, corrupt: bool, entries: &'a [HistoryEntry]) -> Self {
        Self {
            path: path.display().to_string(),
            corrupt,
            entries,
        }
    }
}
