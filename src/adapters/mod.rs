//! Adapters: one parser per tool family.
//!
//! Every adapter exposes two operations:
//! - `detect` decides from the path alone whether it owns a file. The
//!   locator consults only `detect`, so detection failure is never an error.
//! - `parse` turns file bytes into the uniform model, or a `ParseFailure`
//!   that becomes a `parse_error` diagnostic. It never panics on bad input.
//!
//! The `Registry` holds adapters in priority order; the first adapter whose
//! `detect` matches owns the file.

mod accessibility;
mod browser;
mod coverage;
mod http;
mod lint;
mod load;
mod security;

pub use accessibility::AccessibilityAdapter;
pub use browser::BrowserAdapter;
pub use coverage::CoverageAdapter;
pub use http::HttpAdapter;
pub use lint::LintAdapter;
pub use load::LoadAdapter;
pub use security::SecurityAdapter;

use crate::discovery::Candidate;
use crate::model::{Artifact, Diagnostic, DiagnosticKind, Ingested, Origin};
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why an adapter could not use an artifact.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("unrecognized shape in {path}")]
    UnrecognizedShape { path: String },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ParseFailure {
    #[must_use]
    pub fn unrecognized(artifact: &Artifact) -> Self {
        Self::UnrecognizedShape {
            path: artifact.relative.clone(),
        }
    }
}

/// Successful parse: the model plus non-fatal notes about the input.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterOutput {
    pub ingested: Ingested,
    /// Each note becomes a `parse_error` diagnostic; the result still counts.
    pub warnings: Vec<String>,
}

impl AdapterOutput {
    #[must_use]
    pub const fn new(ingested: Ingested) -> Self {
        Self {
            ingested,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

/// A parser for one tool family.
pub trait Adapter: Send + Sync {
    fn origin(&self) -> Origin;

    /// Claim a file by path. Must not read the file.
    fn detect(&self, candidate: &Candidate) -> bool;

    /// Parse a claimed file.
    ///
    /// # Errors
    ///
    /// Returns `ParseFailure` when the bytes are not a shape this adapter knows.
    fn parse(&self, artifact: &Artifact, bytes: &[u8]) -> Result<AdapterOutput, ParseFailure>;
}

/// Adapters in detection priority order.
#[derive(Clone)]
pub struct Registry {
    adapters: Vec<Arc<dyn Adapter>>,
}

impl Registry {
    /// The built-in adapter set.
    ///
    /// Fixed file names win over directory hints, and directory hints win
    /// over the generic browser result names.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            adapters: vec![
                Arc::new(CoverageAdapter),
                Arc::new(LintAdapter),
                Arc::new(SecurityAdapter),
                Arc::new(AccessibilityAdapter),
                Arc::new(LoadAdapter),
                Arc::new(HttpAdapter),
                Arc::new(BrowserAdapter),
            ],
        }
    }

    #[must_use]
    pub fn detect(&self, candidate: &Candidate) -> Option<Origin> {
        self.adapters
            .iter()
            .find(|adapter| adapter.detect(candidate))
            .map(|adapter| adapter.origin())
    }

    #[must_use]
    pub fn adapter_for(&self, origin: Origin) -> Option<Arc<dyn Adapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.origin() == origin)
            .cloned()
    }

    /// Read and parse one artifact under a wall-clock budget.
    ///
    /// Every failure is returned as a diagnostic: unreadable file
    /// (`discovery_error`), unknown shape (`parse_error`) or budget
    /// exhausted (`adapter_timeout`).
    pub fn ingest(
        &self,
        artifact: &Artifact,
        timeout: Duration,
    ) -> Result<AdapterOutput, Diagnostic> {
        let Some(adapter) = self.adapter_for(artifact.origin) else {
            return Err(Diagnostic::parse(
                artifact.relative.clone(),
                format!("no adapter for origin {}", artifact.origin),
            ));
        };
        let bytes = fs::read(&artifact.path).map_err(|err| {
            Diagnostic::discovery(
                Some(artifact.relative.clone()),
                format!("cannot read file: {err}"),
            )
        })?;
        debug!(path = %artifact.relative, bytes = bytes.len(), "Parsing artifact");
        run_with_timeout(adapter, artifact.clone(), bytes, timeout)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run `parse` on a worker thread and give up after `timeout`.
///
/// A timed-out worker is detached; its result is dropped when it finishes.
pub fn run_with_timeout(
    adapter: Arc<dyn Adapter>,
    artifact: Artifact,
    bytes: Vec<u8>,
    timeout: Duration,
) -> Result<AdapterOutput, Diagnostic> {
    let path = artifact.relative.clone();
    let (tx, rx) = mpsc::channel();
    let worker = thread::Builder::new()
        .name(format!("adapter-{}", adapter.origin()))
        .spawn(move || {
            let _ = tx.send(adapter.parse(&artifact, &bytes));
        });
    if let Err(err) = worker {
        return Err(Diagnostic::parse(path, format!("cannot start adapter: {err}")));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(failure)) => Err(Diagnostic::parse(path, failure.to_string())),
        Err(RecvTimeoutError::Timeout) => Err(Diagnostic::new(
            DiagnosticKind::AdapterTimeout,
            Some(path),
            format!("adapter exceeded its {}s budget", timeout.as_secs_f64()),
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Err(Diagnostic::parse(path, "adapter stopped without a result"))
        }
    }
}

// JSON access helpers shared by the adapters. Numbers may arrive as
// integers or floats; strings are never coerced.

pub(crate) fn parse_json(artifact: &Artifact, bytes: &[u8]) -> Result<Value, ParseFailure> {
    serde_json::from_slice(bytes).map_err(|source| ParseFailure::InvalidJson {
        path: artifact.relative.clone(),
        source,
    })
}

pub(crate) fn field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

pub(crate) fn float_at(value: &Value, path: &[&str]) -> Option<f64> {
    field(value, path).and_then(Value::as_f64).filter(|f| f.is_finite())
}

pub(crate) fn int_at(value: &Value, path: &[&str]) -> Option<i64> {
    let v = field(value, path)?;
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

/// Array under `key`, or an empty slice.
pub(crate) fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub(crate) fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    field(value, path).and_then(Value::as_str)
}

/// Milliseconds from a non-negative float, saturating.
pub(crate) fn millis(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SuiteResult, Totals};
    use std::time::Instant;
    use test_support::artifact;

    struct SlowAdapter;

    impl Adapter for SlowAdapter {
        fn origin(&self) -> Origin {
            Origin::Http
        }

        fn detect(&self, _: &Candidate) -> bool {
            true
        }

        fn parse(&self, _: &Artifact, _: &[u8]) -> Result<AdapterOutput, ParseFailure> {
            thread::sleep(Duration::from_millis(500));
            Ok(AdapterOutput::new(Ingested::Suite(SuiteResult::leaf(
                "slow",
                Totals::default(),
            ))))
        }
    }

    #[test]
    fn timeout_yields_adapter_timeout() {
        let started = Instant::now();
        let result = run_with_timeout(
            Arc::new(SlowAdapter),
            artifact("api/slow.json", Origin::Http),
            Vec::new(),
            Duration::from_millis(20),
        );
        let diag = result.unwrap_err();
        assert_eq!(diag.kind, DiagnosticKind::AdapterTimeout);
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn registry_priority() {
        let registry = Registry::standard();
        let cases = [
            ("coverage/coverage-summary.json", Some(Origin::Coverage)),
            ("lint/eslint-report.json", Some(Origin::Lint)),
            ("security/zap-results.json", Some(Origin::Security)),
            ("accessibility/results.json", Some(Origin::Accessibility)),
            ("performance/load-test.json", Some(Origin::Load)),
            ("api/collection.json", Some(Origin::Http)),
            ("staging/chromium/results.json", Some(Origin::Browser)),
            ("staging/chromium/data.json", None),
            ("notes.md", None),
        ];
        for (rel, expected) in cases {
            assert_eq!(
                registry.detect(&Candidate::new(rel, false)),
                expected,
                "{rel}"
            );
        }
    }

    #[test]
    fn numeric_helpers_accept_floats() {
        let value: Value = serde_json::json!({"a": {"b": 3.6, "c": 2, "d": "x"}});
        assert_eq!(int_at(&value, &["a", "b"]), Some(4));
        assert_eq!(int_at(&value, &["a", "c"]), Some(2));
        assert_eq!(int_at(&value, &["a", "d"]), None);
        assert_eq!(str_at(&value, &["a", "d"]), Some("x"));
        assert_eq!(millis(-5.0), 0);
    }
}
