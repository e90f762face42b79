//! CSV export of run history (`qap history list --format csv`).
//!
//! Fields containing commas, quotes, or newlines are quoted.

use crate::history::HistoryEntry;
use crate::util::format_timestamp;
use std::io::{self, Write};

pub const DEFAULT_FIELDS: &[&str] = &[
    "timestamp",
    "total",
    "passed",
    "failed",
    "skipped",
    "pass_rate",
    "overall_health",
];

pub const ALL_FIELDS: &[&str] = &[
    "timestamp",
    "total",
    "passed",
    "failed",
    "skipped",
    "pass_rate",
    "duration",
    "quality_score",
    "overall_health",
    "test_env",
    "digest",
];

/// Escape a CSV field value.
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
/// Doubles any existing quotes within the value.
#[must_use]
pub fn escape_field(value: &str) -> String {
    let needs_quoting = value.contains(',')
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');

    if needs_quoting {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

#[must_use]
pub fn get_field_value(entry: &HistoryEntry, field: &str) -> String {
    let meta = &entry.metadata;
    match field {
        "timestamp" => format_timestamp(&entry.timestamp),
        "total" => entry.total.to_string(),
        "passed" => entry.passed.to_string(),
        "failed" => entry.failed.to_string(),
        "skipped" => entry.skipped.to_string(),
        "pass_rate" => format!("{:.1}", entry.pass_rate),
        "duration" => meta.duration.to_string(),
        "quality_score" => meta
            .quality_score
            .map_or_else(String::new, |q| format!("{q:.1}")),
        "overall_health" => meta
            .overall_health
            .map_or_else(String::new, |h| h.as_str().to_string()),
        "test_env" => meta.test_env.clone().unwrap_or_default(),
        "digest" => meta.digest.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Parse a comma-separated list of field names; unknown names are dropped.
///
/// Returns the default fields if the input is empty.
#[must_use]
pub fn parse_fields(fields_arg: Option<&str>) -> Vec<&'static str> {
    match fields_arg {
        Some(arg) if !arg.is_empty() => arg
            .split(',')
            .map(str::trim)
            .filter_map(|f| ALL_FIELDS.iter().find(|&&af| af == f).copied())
            .collect(),
        _ => DEFAULT_FIELDS.to_vec(),
    }
}

#[must_use]
pub fn format_row(entry: &HistoryEntry, fields: &[&str]) -> String {
    fields
        .iter()
        .map(|&field| escape_field(&get_field_value(entry, field)))
        .collect::<Vec<_>>()
        .join(",")
}

/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv<W: Write>(writer: &mut W, entries: &[HistoryEntry], fields: &[&str]) -> io::Result<()> {
    writeln!(writer, "{}", fields.join(","))?;
    for entry in entries {
        writeln!(writer, "{}", format_row(entry, fields))?;
    }
    Ok(())
}
