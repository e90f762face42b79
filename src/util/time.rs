//! Time parsing, formatting and the clock abstraction.

use crate::error::{QaError, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Single source of "now" for a run, so reports are reproducible in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen clock, configured with `clock: <RFC3339>`.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parse a timestamp for config and CLI input.
///
/// Supports:
/// - RFC3339: `2025-01-15T12:00:00Z`, `2025-01-15T12:00:00+02:00`
/// - Simple date: `2025-01-15` (midnight UTC)
///
/// # Errors
///
/// Returns `QaError::ConfigInvalid` naming `field_name` when the input
/// matches neither form.
pub fn parse_timestamp(s: &str, field_name: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(QaError::invalid(
        field_name,
        format!("invalid timestamp '{s}' (use RFC3339 or YYYY-MM-DD)"),
    ))
}

/// Canonical report timestamp: UTC, millisecond precision, `Z` suffix.
#[must_use]
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Human duration for tables: `850ms`, `12.35s`, `3m 05s`.
#[must_use]
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let secs = ms / 1000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
