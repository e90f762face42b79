//! Status monitor: a file-backed run-state record a supervisor can tail.
//!
//! Every operation rewrites the whole file through a temp sibling and a
//! rename, so readers never see a torn write. Reads tolerate a missing or
//! partial file. `cleanup` is the only operation that deletes anything.

use crate::error::{QaError, Result};
use crate::util::{Clock, write_atomic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Running,
    Passed,
    Failed,
    Completed,
}

impl OverallStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl SuiteStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteState {
    pub status: SuiteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    pub warning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub overall: OverallStatus,
    #[serde(default)]
    pub suites: BTreeMap<String, SuiteState>,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub warnings: Vec<WarningRecord>,
    pub start_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl StatusRecord {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            overall: OverallStatus::Running,
            suites: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            start_time: now,
            last_update: now,
            end_time: None,
        }
    }
}

/// Fields of one `update` call. Unset counters keep their previous value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteUpdate {
    pub suite: String,
    pub status: SuiteStatus,
    pub duration: Option<u64>,
    pub tests: Option<u64>,
    pub passed: Option<u64>,
    pub failed: Option<u64>,
}

impl SuiteUpdate {
    pub fn new(suite: impl Into<String>, status: SuiteStatus) -> Self {
        Self {
            suite: suite.into(),
            status,
            duration: None,
            tests: None,
            passed: None,
            failed: None,
        }
    }
}

/// Roll-up printed by `qap monitor summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub overall: OverallStatus,
    pub suites: usize,
    pub by_status: BTreeMap<SuiteStatus, usize>,
    pub tests: u64,
    pub passed: u64,
    pub failed: u64,
    pub errors: usize,
    pub warnings: usize,
    pub elapsed_ms: u64,
}

/// Read the record, tolerating a missing or partial file.
#[must_use]
pub fn read_status(path: &Path) -> Option<StatusRecord> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "Status file unreadable");
            }
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Status file is partial or invalid");
            None
        }
    }
}

pub struct StatusMonitor<'c> {
    path: PathBuf,
    clock: &'c dyn Clock,
}

impl<'c> StatusMonitor<'c> {
    pub fn new(path: impl Into<PathBuf>, clock: &'c dyn Clock) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn read(&self) -> Option<StatusRecord> {
        read_status(&self.path)
    }

    /// Start a fresh record, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn init(&self) -> Result<StatusRecord> {
        let record = StatusRecord::new(self.clock.now());
        self.write(&record)?;
        Ok(record)
    }

    /// Record a suite's state. Starts a record if none is readable.
    ///
    /// # Errors
    ///
    /// Returns `QaError::Monitor` for an empty suite name, or an error if
    /// the file cannot be written.
    pub fn update(&self, update: SuiteUpdate) -> Result<StatusRecord> {
        if update.suite.trim().is_empty() {
            return Err(QaError::Monitor("suite name must not be empty".to_string()));
        }
        self.modify(|record, now| {
            let previous = record.suites.remove(&update.suite);
            let keep = |new: Option<u64>, old: Option<u64>| new.or(old);
            let state = SuiteState {
                status: update.status,
                duration: keep(update.duration, previous.as_ref().and_then(|p| p.duration)),
                tests: keep(update.tests, previous.as_ref().and_then(|p| p.tests)),
                passed: keep(update.passed, previous.as_ref().and_then(|p| p.passed)),
                failed: keep(update.failed, previous.as_ref().and_then(|p| p.failed)),
                last_update: now,
            };
            record.suites.insert(update.suite, state);
        })
    }

    /// # Errors
    ///
    /// Returns `QaError::Monitor` for an empty message, or an error if the
    /// file cannot be written.
    pub fn error(
        &self,
        suite: Option<String>,
        message: &str,
        stack: Option<String>,
    ) -> Result<StatusRecord> {
        if message.trim().is_empty() {
            return Err(QaError::Monitor("error message must not be empty".to_string()));
        }
        self.modify(|record, now| {
            record.errors.push(ErrorRecord {
                timestamp: now,
                suite,
                error: message.to_string(),
                stack,
            });
        })
    }

    /// # Errors
    ///
    /// Returns `QaError::Monitor` for an empty message, or an error if the
    /// file cannot be written.
    pub fn warning(&self, suite: Option<String>, message: &str) -> Result<StatusRecord> {
        if message.trim().is_empty() {
            return Err(QaError::Monitor("warning message must not be empty".to_string()));
        }
        self.modify(|record, now| {
            record.warnings.push(WarningRecord {
                timestamp: now,
                suite,
                warning: message.to_string(),
            });
        })
    }

    /// Close the run with a final status.
    ///
    /// # Errors
    ///
    /// Returns `QaError::Monitor` if `overall` is `running`, or an error if
    /// the file cannot be written.
    pub fn finish(&self, overall: OverallStatus) -> Result<StatusRecord> {
        if overall == OverallStatus::Running {
            return Err(QaError::Monitor("a run cannot finish as running".to_string()));
        }
        self.modify(|record, now| {
            record.overall = overall;
            record.end_time = Some(now);
        })
    }

    /// Mark an initialised run failed with a reason. A missing record is
    /// left alone; returns whether the file was touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn fail_if_initialised(&self, reason: &str) -> Result<bool> {
        let Some(mut record) = self.read() else {
            return Ok(false);
        };
        let now = self.clock.now();
        record.overall = OverallStatus::Failed;
        record.end_time = Some(now);
        record.last_update = now;
        record.errors.push(ErrorRecord {
            timestamp: now,
            suite: None,
            error: reason.to_string(),
            stack: None,
        });
        self.write(&record)?;
        Ok(true)
    }

    #[must_use]
    pub fn summary(&self) -> Option<StatusSummary> {
        self.read().map(|record| summarize(&record, self.clock.now()))
    }

    /// Delete the status file. Missing is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn cleanup(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn modify<F>(&self, change: F) -> Result<StatusRecord>
    where
        F: FnOnce(&mut StatusRecord, DateTime<Utc>),
    {
        let now = self.clock.now();
        let mut record = self.read().unwrap_or_else(|| StatusRecord::new(now));
        change(&mut record, now);
        record.last_update = now;
        self.write(&record)?;
        Ok(record)
    }

    fn write(&self, record: &StatusRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.path, &json)?;
        debug!(path = %self.path.display(), overall = %record.overall, "Status written");
        Ok(())
    }
}

#[must_use]
pub fn summarize(record: &StatusRecord, now: DateTime<Utc>) -> StatusSummary {
    let mut by_status = BTreeMap::new();
    let (mut tests, mut passed, mut failed) = (0, 0, 0);
    for state in record.suites.values() {
        *by_status.entry(state.status).or_insert(0) += 1;
        tests += state.tests.unwrap_or(0);
        passed += state.passed.unwrap_or(0);
        failed += state.failed.unwrap_or(0);
    }
    let end = record.end_time.unwrap_or(now);
    let elapsed_ms = u64::try_from((end - record.start_time).num_milliseconds()).unwrap_or(0);
    StatusSummary {
        overall: record.overall,
        suites: record.suites.len(),
        by_status,
        tests,
        passed,
        failed,
        errors: record.errors.len(),
        warnings: record.warnings.len(),
        elapsed_ms,
    }
}
