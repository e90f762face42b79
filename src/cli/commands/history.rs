//! `qap history`: read-only views of the history store.

use crate::cli::{HistoryCommands, HistoryFormat};
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::format::csv;
use crate::format::{HistoryListing, format_percent, format_score, format_trend, health_icon};
use crate::history::{self, HistoryStore, trend};
use crate::output::{HistoryTable, OutputContext};
use std::io;
use tracing::debug;

/// Execute a history subcommand.
///
/// # Errors
///
/// Returns an error if config loading fails or output cannot be written.
pub fn execute(command: &HistoryCommands, overrides: &CliOverrides, ctx: &OutputContext) -> Result<()> {
    let config = config::load_config(overrides)?;
    let path = history::history_path(&config.report_root);
    let (store, diagnostic) = HistoryStore::load(&path);
    if let Some(diagnostic) = &diagnostic {
        ctx.warning(&diagnostic.message);
    }
    debug!(path = %path.display(), entries = store.entries().len(), "Loaded history");

    match command {
        HistoryCommands::List {
            format,
            fields,
            limit,
        } => {
            let entries = store.entries();
            let shown = limit.map_or(entries, |n| &entries[entries.len().saturating_sub(n)..]);
            if *format == HistoryFormat::Csv {
                let fields = csv::parse_fields(fields.as_deref());
                csv::write_csv(&mut io::stdout().lock(), shown, &fields)?;
            } else if ctx.is_json() {
                ctx.json(&HistoryListing::new(&path, store.is_corrupt(), shown))?;
            } else if shown.is_empty() {
                ctx.info(&format!("No history at {}", path.display()));
            } else if ctx.is_rich() {
                ctx.render(&HistoryTable::new(shown, ctx.theme()).build());
            } else {
                for entry in shown {
                    let meta = &entry.metadata;
                    ctx.line(&format!(
                        "{} {} {}/{} {} quality {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M"),
                        meta.overall_health.map_or("-", health_icon),
                        entry.passed,
                        entry.total,
                        format_percent(Some(entry.pass_rate)),
                        format_score(meta.quality_score),
                    ));
                }
            }
        }
        HistoryCommands::Trend { window } => {
            let window = window.unwrap_or(config.trend_window).max(1);
            let result = trend(store.entries(), window);
            if ctx.is_json() {
                ctx.json(&result)?;
            } else {
                ctx.line(&format_trend(&result));
                ctx.line(&format!(
                    "recent {} over {} run(s), previous {} over {} run(s)",
                    format_percent(result.recent_mean),
                    result.recent_count,
                    format_percent(result.previous_mean),
                    result.previous_count,
                ));
            }
        }
    }
    Ok(())
}
