//! `qap run`: execute the configured tools in order, then aggregate.
//!
//! Each tool is recorded in the status monitor as a suite. A tool that
//! cannot be started is recorded and the remaining tools still run.

use super::aggregate::{render_outcome, run_pipeline};
use crate::cli::RunArgs;
use crate::config::{self, CliOverrides, RunCommand, RuntimeEnv};
use crate::error::{QaError, Result};
use crate::format::{RunCommandOutput, RunSummary, ToolRun, verdict_icon};
use crate::metrics::Verdict;
use crate::monitor::{OverallStatus, StatusMonitor, SuiteStatus, SuiteUpdate};
use crate::output::OutputContext;
use std::io;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Execute the run command and return the process exit code.
///
/// # Errors
///
/// Returns an error if config loading fails, the status file cannot be
/// written, or the aggregation is stopped or cannot write its reports.
pub fn execute(
    args: &RunArgs,
    overrides: &CliOverrides,
    ctx: &OutputContext,
    cancel: Arc<AtomicBool>,
) -> Result<i32> {
    let config = config::load_config(overrides)?;
    let clock = config.clock.clock();
    let monitor = StatusMonitor::new(&config.status_file, clock.as_ref());
    let runtime = RuntimeEnv::from_process();

    let commands: Vec<&RunCommand> = config
        .run
        .commands
        .iter()
        .filter(|c| args.only.is_empty() || args.only.contains(&c.name))
        .collect();
    if commands.is_empty() {
        warn!("No run.commands selected; aggregating existing results only");
    }

    monitor.init()?;
    for command in &commands {
        monitor.update(SuiteUpdate::new(&command.name, SuiteStatus::Pending))?;
    }

    let mut tools = Vec::with_capacity(commands.len());
    for command in commands {
        if cancel.load(Ordering::Relaxed) {
            monitor.fail_if_initialised(&QaError::Cancelled.to_string())?;
            return Err(QaError::Cancelled);
        }
        let tool = run_tool(command, &runtime, &monitor, ctx.is_json())?;
        if !ctx.is_json() {
            let verdict = if tool.succeeded() { Verdict::Pass } else { Verdict::Fail };
            let detail = tool.error.clone().unwrap_or_else(|| {
                tool.exit_code
                    .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit {c}"))
            });
            ctx.line(&format!("{} {} ({detail})", verdict_icon(verdict), tool.name));
        }
        tools.push(tool);
    }

    let outcome = match run_pipeline(&config, ctx, cancel, !args.no_progress) {
        Ok(outcome) => outcome,
        Err(err) => {
            // Cancellation and budget overruns are already recorded by the pipeline.
            if !matches!(err, QaError::Cancelled | QaError::BudgetExceeded { .. }) {
                if let Err(mark_err) = monitor.fail_if_initialised(&err.to_string()) {
                    warn!(error = %mark_err, "Could not mark status monitor failed");
                }
            }
            return Err(err);
        }
    };
    let launch_failed = tools.iter().any(|t| !t.launched);
    let exit_code = i32::from(launch_failed || outcome.has_failures());
    let overall = if exit_code == 0 {
        OverallStatus::Passed
    } else {
        OverallStatus::Failed
    };
    monitor.finish(overall)?;
    info!(tools = tools.len(), %overall, exit_code, "Run finished");

    if ctx.is_json() {
        ctx.json(&RunCommandOutput {
            tools,
            summary: RunSummary::from_outcome(&outcome),
            exit_code,
        })?;
    } else {
        render_outcome(&outcome, &config, ctx);
    }
    Ok(exit_code)
}

/// Start one tool, wait for it, and record the result as a suite.
///
/// With `stdout_to_stderr` the tool's stdout is sent to stderr so it cannot
/// interleave with JSON output.
fn run_tool(
    command: &RunCommand,
    runtime: &RuntimeEnv,
    monitor: &StatusMonitor<'_>,
    stdout_to_stderr: bool,
) -> Result<ToolRun> {
    monitor.update(SuiteUpdate::new(&command.name, SuiteStatus::Running))?;
    info!(tool = %command.name, program = %command.program, "Starting tool");

    let started = Instant::now();
    let status = Command::new(&command.program)
        .args(&command.args)
        .envs(runtime.forwarded())
        .envs(&command.env)
        .stdout(if stdout_to_stderr {
            Stdio::from(io::stderr())
        } else {
            Stdio::inherit()
        })
        .status();
    let duration_ms = started.elapsed().as_millis() as u64;

    let mut tool = ToolRun {
        name: command.name.clone(),
        program: command.program.clone(),
        launched: true,
        exit_code: None,
        duration_ms,
        error: None,
    };
    let mut update = SuiteUpdate::new(&command.name, SuiteStatus::Failed);
    update.duration = Some(duration_ms);

    match status {
        Ok(status) => {
            tool.exit_code = status.code();
            if status.success() {
                update.status = SuiteStatus::Passed;
            } else {
                warn!(tool = %command.name, code = ?status.code(), "Tool exited unsuccessfully");
            }
        }
        Err(source) => {
            let err = QaError::ToolLaunch {
                name: command.name.clone(),
                source,
            };
            warn!(error = %err, "Tool did not start");
            monitor.error(Some(command.name.clone()), &err.to_string(), None)?;
            tool.launched = false;
            tool.error = Some(err.to_string());
        }
    }
    monitor.update(update)?;
    Ok(tool)
}
