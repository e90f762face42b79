//! `qap aggregate`: one pipeline run over the results directory.

use crate::cli::AggregateArgs;
use crate::config::{self, CliOverrides, QaConfig, RuntimeEnv};
use crate::error::Result;
use crate::format::{RunSummary, format_gate_line};
use crate::output::{BreakdownTable, GateTable, OutputContext, RunPanel};
use crate::pipeline::{Pipeline, RunOutcome};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::info;

/// Diagnostics listed individually before the rest are summarized.
const DIAGNOSTICS_SHOWN: usize = 10;

/// Execute the aggregate command. Test failures do not change the exit code.
///
/// # Errors
///
/// Returns an error if config loading fails or the run is stopped or
/// cannot write its reports.
pub fn execute(
    args: &AggregateArgs,
    overrides: &CliOverrides,
    ctx: &OutputContext,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    let config = config::load_config(overrides)?;
    let outcome = run_pipeline(&config, ctx, cancel, !args.no_progress)?;
    if ctx.is_json() {
        ctx.json(&RunSummary::from_outcome(&outcome))?;
    } else {
        render_outcome(&outcome, &config, ctx);
    }
    Ok(())
}

/// Run the pipeline with the configured clock and the process environment.
///
/// # Errors
///
/// See [`Pipeline::run`].
pub fn run_pipeline(
    config: &QaConfig,
    ctx: &OutputContext,
    cancel: Arc<AtomicBool>,
    progress: bool,
) -> Result<RunOutcome> {
    let clock = config.clock.clock();
    let runtime = RuntimeEnv::from_process();
    info!(
        results = %config.results_root.display(),
        reports = %config.report_root.display(),
        clock = %config.clock,
        "Starting aggregation"
    );
    Pipeline::new(config, clock.as_ref())
        .with_runtime(runtime)
        .with_cancel_flag(cancel)
        .with_progress(progress && !ctx.is_json() && !ctx.is_quiet())
        .run()
}

/// Human rendering of a finished run: rich panel and tables, or plain lines.
pub fn render_outcome(outcome: &RunOutcome, config: &QaConfig, ctx: &OutputContext) {
    if ctx.is_quiet() || ctx.is_json() {
        return;
    }
    let theme = ctx.theme();
    let panel = RunPanel::new(outcome, &config.report_root, theme);

    if ctx.is_rich() {
        panel.print(ctx);
        ctx.section("Quality gates");
        ctx.render(&GateTable::new(&outcome.metrics.gates, theme).build());
        let snapshot = &outcome.snapshot;
        if !snapshot.by_environment.is_empty() {
            let mut table = BreakdownTable::new("By environment", theme);
            for (env, entry) in &snapshot.by_environment {
                table.add(env.as_str(), &entry.totals);
            }
            ctx.render(&table.build());
        }
        if !snapshot.by_category.is_empty() {
            let mut table = BreakdownTable::new("By category", theme);
            for (category, entry) in &snapshot.by_category {
                table.add(category.as_str(), &entry.totals);
            }
            ctx.render(&table.build());
        }
    } else {
        for line in panel.lines() {
            ctx.line(&line);
        }
        ctx.section("Quality gates");
        for gate in &outcome.metrics.gates {
            ctx.line(&format_gate_line(gate));
        }
    }

    render_diagnostics(outcome, ctx);
}

fn render_diagnostics(outcome: &RunOutcome, ctx: &OutputContext) {
    let errors = &outcome.snapshot.errors;
    if errors.is_empty() {
        return;
    }
    ctx.newline();
    for diagnostic in errors.iter().take(DIAGNOSTICS_SHOWN) {
        let path = diagnostic.path.as_deref().unwrap_or("-");
        let message = format!("{}: {} ({})", diagnostic.kind, diagnostic.message, path);
        ctx.warning(&message);
    }
    if errors.len() > DIAGNOSTICS_SHOWN {
        ctx.warning(&format!(
            "{} more diagnostic(s) in the reports",
            errors.len() - DIAGNOSTICS_SHOWN
        ));
    }
}
