//! History store: a bounded JSON log of compact run projections.
//!
//! The log lives at `<report_root>/metrics/historical-data.json` as an array
//! in ascending timestamp order. A run holds an advisory lock on the sibling
//! `.lock` file for its whole load-append-save round trip.
//!
//! A file that cannot be parsed is treated as empty and left untouched on
//! disk: the store remembers that it was corrupt and refuses to save over it.

mod trend;

pub use trend::{Trend, TrendDirection, trend};

use crate::error::{QaError, Result};
use crate::metrics::{DerivedMetrics, Health};
use crate::model::{Diagnostic, DiagnosticKind, Totals};
use crate::util::write_atomic;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// History file path relative to the report root.
pub const HISTORY_FILE: &str = "metrics/historical-data.json";

#[must_use]
pub fn history_path(report_root: &Path) -> PathBuf {
    report_root.join(HISTORY_FILE)
}

/// Run-level extras kept alongside the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntryMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_health: Option<Health>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_env: Option<String>,
}

/// Compact projection of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub pass_rate: f64,
    #[serde(default)]
    pub metadata: EntryMetadata,
}

impl HistoryEntry {
    #[must_use]
    pub fn from_run(timestamp: DateTime<Utc>, totals: &Totals, metrics: &DerivedMetrics) -> Self {
        Self {
            timestamp,
            total: totals.total,
            passed: totals.passed,
            failed: totals.failed,
            skipped: totals.skipped,
            pass_rate: metrics.pass_rate,
            metadata: EntryMetadata {
                duration: totals.duration_ms,
                quality_score: metrics.quality_score,
                overall_health: Some(metrics.overall_health),
                ..EntryMetadata::default()
            },
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// In-memory view of the history file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
    corrupt: bool,
}

impl HistoryStore {
    /// Empty store bound to `path`, without touching the disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            corrupt: false,
        }
    }

    /// Read the history file.
    ///
    /// A missing file is an empty history. An unreadable or unparsable file
    /// is an empty history plus a `history_corrupt` diagnostic.
    #[must_use]
    pub fn load(path: &Path) -> (Self, Option<Diagnostic>) {
        let mut store = Self::new(path);
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return (store, None),
            Err(err) => return store.mark_corrupt(format!("unreadable history: {err}")),
        };
        match serde_json::from_slice::<Vec<HistoryEntry>>(&bytes) {
            Ok(mut entries) => {
                entries.sort_by_key(|entry| entry.timestamp);
                debug!(path = %path.display(), entries = entries.len(), "Loaded history");
                store.entries = entries;
                (store, None)
            }
            Err(err) => store.mark_corrupt(format!("invalid history JSON: {err}")),
        }
    }

    fn mark_corrupt(mut self, message: String) -> (Self, Option<Diagnostic>) {
        self.corrupt = true;
        let diagnostic = Diagnostic::new(
            DiagnosticKind::HistoryCorrupt,
            Some(self.path.display().to_string()),
            message,
        );
        diagnostic.log();
        (self, Some(diagnostic))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    /// Insert keeping ascending timestamp order; equal timestamps keep
    /// arrival order.
    pub fn append(&mut self, entry: HistoryEntry) {
        let at = self
            .entries
            .partition_point(|existing| existing.timestamp <= entry.timestamp);
        self.entries.insert(at, entry);
    }

    /// Evict the oldest entries beyond `max_len`.
    pub fn trim(&mut self, max_len: usize) {
        if self.entries.len() > max_len {
            let excess = self.entries.len() - max_len;
            self.entries.drain(..excess);
            debug!(evicted = excess, "Trimmed history");
        }
    }

    /// Persist atomically. A store loaded from a corrupt file is never
    /// written, so the operator can inspect the original.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub fn save(&self) -> Result<bool> {
        if self.corrupt {
            warn!(path = %self.path.display(), "History file is corrupt; leaving it untouched");
            return Ok(false);
        }
        let json = serde_json::to_vec_pretty(&self.entries)?;
        write_atomic(&self.path, &json).map_err(|source| QaError::ReportEmit {
            family: "history",
            path: self.path.clone(),
            source,
        })?;
        Ok(true)
    }
}

/// Advisory exclusive lock on `<history>.lock`, released on drop.
#[derive(Debug)]
pub struct HistoryLock {
    _file: File,
    path: PathBuf,
}

impl HistoryLock {
    /// Take the lock without waiting.
    ///
    /// # Errors
    ///
    /// Returns `QaError::HistoryLocked` when another run holds it, or an
    /// I/O error if the lock file cannot be created.
    pub fn acquire(history: &Path) -> Result<Self> {
        let path = lock_path(history);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "Acquired history lock");
                Ok(Self { _file: file, path })
            }
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
            {
                Err(QaError::HistoryLocked { path })
            }
            Err(err) => Err(QaError::Io(err)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[must_use]
pub fn lock_path(history: &Path) -> PathBuf {
    let mut name = history
        .file_name()
        .map_or_else(|| "history".into(), std::ffi::OsStr::to_os_string);
    name.push(".lock");
    history.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(day: u32, pass_rate: f64) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap(),
            total: 10,
            passed: (pass_rate / 10.0) as u64,
            failed: 10 - (pass_rate / 10.0) as u64,
            skipped: 0,
            pass_rate,
            metadata: EntryMetadata::default(),
        }
    }

    #[test]
    fn missing_file_is_empty_history() {
        let temp = TempDir::new().unwrap();
        let (store, diagnostic) = HistoryStore::load(&history_path(temp.path()));
        assert!(store.entries().is_empty());
        assert!(diagnostic.is_none());
        assert!(!store.is_corrupt());
    }

    #[test]
    fn append_keeps_order_and_trim_evicts_head() {
        let mut store = HistoryStore::new("unused.json");
        store.append(entry(3, 90.0));
        store.append(entry(1, 70.0));
        store.append(entry(2, 80.0));
        let days: Vec<f64> = store.entries().iter().map(|e| e.pass_rate).collect();
        assert_eq!(days, vec![70.0, 80.0, 90.0]);

        store.trim(2);
        let days: Vec<f64> = store.entries().iter().map(|e| e.pass_rate).collect();
        assert_eq!(days, vec![80.0, 90.0]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = history_path(temp.path());
        let mut store = HistoryStore::new(&path);
        store.append(entry(1, 100.0));
        assert!(store.save().unwrap());

        let (loaded, diagnostic) = HistoryStore::load(&path);
        assert!(diagnostic.is_none());
        assert_eq!(loaded.entries(), store.entries());
    }

    #[test]
    fn corrupt_file_is_reported_and_preserved() {
        let temp = TempDir::new().unwrap();
        let path = history_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        let (mut store, diagnostic) = HistoryStore::load(&path);
        let diagnostic = diagnostic.unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::HistoryCorrupt);
        assert!(store.entries().is_empty());

        store.append(entry(1, 100.0));
        assert!(!store.save().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn second_lock_is_refused() {
        let temp = TempDir::new().unwrap();
        let path = history_path(temp.path());
        let held = HistoryLock::acquire(&path).unwrap();
        assert!(held.path().ends_with("historical-data.json.lock"));

        let err = HistoryLock::acquire(&path).unwrap_err();
        assert!(matches!(err, QaError::HistoryLocked { .. }));

        drop(held);
        assert!(HistoryLock::acquire(&path).is_ok());
    }
}
