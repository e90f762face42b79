//! Output formatting for `qa_pulse`.
//!
//! Human-readable text helpers, the JSON payloads printed under `--json`,
//! and CSV export of run history. Robot mode sends clean JSON to stdout
//! with diagnostics on stderr.

pub mod csv;
mod output;
mod text;

pub use output::{HistoryListing, RunCommandOutput, RunSummary, ToolRun};
pub use text::{
    format_gate_line, format_percent, format_score, format_totals, format_trend, health_icon,
    terminal_width, trend_arrow, truncate_name, verdict_icon,
};
