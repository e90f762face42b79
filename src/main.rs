use clap::Parser;
use qa_pulse::cli::commands;
use qa_pulse::cli::{Cli, Commands};
use qa_pulse::logging::{LogFormat, init_logging};
use qa_pulse::output::OutputContext;
use qa_pulse::{QaError, StructuredError};
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::warn;

fn main() {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    if let Err(e) = init_logging(cli.verbose, cli.quiet, format) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let cancel = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&cancel)) {
            warn!(signal, error = %e, "Could not install signal handler");
        }
    }

    let overrides = cli.overrides();
    let ctx = OutputContext::from_args(&cli);

    let result = match &cli.command {
        Commands::Aggregate(args) => {
            commands::aggregate::execute(args, &overrides, &ctx, Arc::clone(&cancel)).map(|()| 0)
        }
        Commands::Run(args) => commands::run::execute(args, &overrides, &ctx, Arc::clone(&cancel)),
        Commands::Monitor { command } => commands::monitor::execute(command, &overrides, &ctx),
        Commands::History { command } => {
            commands::history::execute(command, &overrides, &ctx).map(|()| 0)
        }
        Commands::Config { command } => {
            commands::config::execute(command, &overrides, &ctx).map(|()| 0)
        }
        Commands::Completions(args) => commands::completions::execute(args).map(|()| 0),
        Commands::Version => commands::version::execute(&ctx).map(|()| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => handle_error(&e, cli.json, cli.command.single_failure_exit()),
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &QaError, json_mode: bool, single_failure_exit: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.exit_code(single_failure_exit);

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}
