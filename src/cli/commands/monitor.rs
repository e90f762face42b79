//! `qap monitor`: operate on the status file from shell scripts.

use crate::cli::MonitorCommands;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::format::{terminal_width, truncate_name};
use crate::monitor::{OverallStatus, StatusMonitor, StatusSummary, SuiteStatus, SuiteUpdate};
use crate::output::{OutputContext, StatusTable};
use crate::util::format_duration_ms;
use serde_json::json;

/// Execute a monitor subcommand and return the process exit code.
///
/// `finish failed` exits 1; everything else exits 0 on success.
///
/// # Errors
///
/// Returns an error for invalid arguments (`QaError::Monitor`) or when the
/// status file cannot be written.
pub fn execute(command: &MonitorCommands, overrides: &CliOverrides, ctx: &OutputContext) -> Result<i32> {
    let config = config::load_config(overrides)?;
    let clock = config.clock.clock();
    let monitor = StatusMonitor::new(&config.status_file, clock.as_ref());
    let path = monitor.path().display().to_string();

    match command {
        MonitorCommands::Init => {
            let record = monitor.init()?;
            ctx.json(&record)?;
            ctx.success(&format!("Status initialised at {path}"));
        }
        MonitorCommands::Update {
            suite,
            status,
            duration_ms,
            tests,
            passed,
            failed,
        } => {
            let status: SuiteStatus = (*status).into();
            let mut update = SuiteUpdate::new(suite, status);
            update.duration = *duration_ms;
            update.tests = *tests;
            update.passed = *passed;
            update.failed = *failed;
            let record = monitor.update(update)?;
            ctx.json(&record)?;
            ctx.success(&format!("{suite}: {}", status.as_str()));
        }
        MonitorCommands::Error {
            message,
            suite,
            stack,
        } => {
            let record = monitor.error(suite.clone(), message, stack.clone())?;
            ctx.json(&record)?;
            ctx.info(&format!("Recorded error ({} total)", record.errors.len()));
        }
        MonitorCommands::Warning { message, suite } => {
            let record = monitor.warning(suite.clone(), message)?;
            ctx.json(&record)?;
            ctx.info(&format!("Recorded warning ({} total)", record.warnings.len()));
        }
        MonitorCommands::Finish { status } => {
            let overall: OverallStatus = (*status).into();
            let record = monitor.finish(overall)?;
            ctx.json(&record)?;
            ctx.success(&format!("Run finished: {overall}"));
            if overall == OverallStatus::Failed {
                return Ok(1);
            }
        }
        MonitorCommands::Summary => match monitor.read().zip(monitor.summary()) {
            Some((record, summary)) => {
                if ctx.is_json() {
                    ctx.json(&summary)?;
                } else if ctx.is_rich() {
                    ctx.render(&StatusTable::new(&record, ctx.theme()).build());
                    ctx.line(&summary_line(&summary));
                } else {
                    let width = terminal_width().saturating_sub(12).max(16);
                    for (name, state) in &record.suites {
                        ctx.line(&format!(
                            "{}: {}",
                            truncate_name(name, width),
                            state.status.as_str()
                        ));
                    }
                    ctx.line(&summary_line(&summary));
                }
            }
            None => {
                ctx.json(&json!({ "status": null, "path": path }))?;
                ctx.info(&format!("No status record at {path}"));
            }
        },
        MonitorCommands::Cleanup => {
            let removed = monitor.cleanup()?;
            ctx.json(&json!({ "removed": removed, "path": path }))?;
            if removed {
                ctx.success(&format!("Removed {path}"));
            } else {
                ctx.info(&format!("Nothing to remove at {path}"));
            }
        }
    }
    Ok(0)
}

fn summary_line(summary: &StatusSummary) -> String {
    format!(
        "{}: {} suite(s), {} test(s), {} passed, {} failed, {} error(s), {} warning(s), {} elapsed",
        summary.overall,
        summary.suites,
        summary.tests,
        summary.passed,
        summary.failed,
        summary.errors,
        summary.warnings,
        format_duration_ms(summary.elapsed_ms)
    )
}
