//! Plain text (non-ANSI) formatting for terminal output:
//! - Health and verdict icons (● ◐ ○, ✓ ✗ –)
//! - Percentages and scores with a fixed precision
//! - Width-aware truncation of suite and case names

use crate::history::{Trend, TrendDirection};
use crate::metrics::{GateResult, Health, Verdict};
use crate::model::Totals;
use crate::util::format_duration_ms;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub mod icons {
    pub const GOOD: &str = "●";
    pub const WARNING: &str = "◐";
    pub const CRITICAL: &str = "○";
    pub const PASS: &str = "✓";
    pub const FAIL: &str = "✗";
    pub const SKIPPED: &str = "–";
    pub const UP: &str = "↑";
    pub const DOWN: &str = "↓";
    pub const FLAT: &str = "→";
    pub const UNKNOWN: &str = "?";
}

#[must_use]
pub const fn health_icon(health: Health) -> &'static str {
    match health {
        Health::Good => icons::GOOD,
        Health::Warning => icons::WARNING,
        Health::Critical => icons::CRITICAL,
    }
}

#[must_use]
pub const fn verdict_icon(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Pass => icons::PASS,
        Verdict::Fail => icons::FAIL,
        Verdict::Skipped => icons::SKIPPED,
    }
}

#[must_use]
pub const fn trend_arrow(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Improving => icons::UP,
        TrendDirection::Declining => icons::DOWN,
        TrendDirection::Stable => icons::FLAT,
        TrendDirection::InsufficientData => icons::UNKNOWN,
    }
}

/// One decimal and a percent sign, or `n/a`.
#[must_use]
pub fn format_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}%"))
}

/// One decimal without a unit, or `n/a`.
#[must_use]
pub fn format_score(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
}

/// `"↑ improving (+6.0)"`, or just the direction when there is no delta.
#[must_use]
pub fn format_trend(trend: &Trend) -> String {
    let arrow = trend_arrow(trend.direction);
    match trend.delta {
        Some(delta) => format!("{arrow} {} ({delta:+.1})", trend.direction),
        None => format!("{arrow} {}", trend.direction),
    }
}

/// `"9/10 passed, 1 failed, 0 skipped in 12.34s"`.
#[must_use]
pub fn format_totals(totals: &Totals) -> String {
    format!(
        "{}/{} passed, {} failed, {} skipped in {}",
        totals.passed,
        totals.total,
        totals.failed,
        totals.skipped,
        format_duration_ms(totals.duration_ms)
    )
}

/// `"✓ pass_rate 97.0 >= 95.0"`; skipped gates show `n/a`.
#[must_use]
pub fn format_gate_line(gate: &GateResult) -> String {
    let mut line = format!(
        "{} {} {} {} {}",
        verdict_icon(gate.verdict),
        gate.name,
        format_score(gate.actual),
        gate.comparison.symbol(),
        format_score(Some(gate.threshold)),
    );
    if let Some(severity) = gate.severity {
        line.push_str(&format!(" [{}]", severity.as_str()));
    }
    line
}

/// Determine terminal width from environment (falls back to 80).
#[must_use]
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|columns| columns.trim().parse::<usize>().ok())
        .filter(|&value| value > 0)
        .unwrap_or(80)
}

/// Truncate a name to fit within `max_len` visible columns.
///
/// Wide characters (emoji, CJK) count by display width.
#[must_use]
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(name) <= max_len {
        return name.to_string();
    }

    let (budget, ellipsis) = if max_len <= 3 {
        (max_len, "")
    } else {
        (max_len - 3, "...")
    };
    let mut width = 0;
    let mut out = String::new();
    for c in name.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > budget {
            break;
        }
        width += cw;
        out.push(c);
    }
    out.push_str(ellipsis);
    out
}
