//! Structured logging setup.
//!
//! All diagnostics go to stderr so stdout stays clean for `--json` output.
//! `RUST_LOG` always wins over the verbosity flags.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Filter directive for the CLI verbosity flags.
#[must_use]
pub const fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize the global subscriber once.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed by
/// someone else.
pub fn init_logging(verbose: u8, quiet: bool, format: LogFormat) -> anyhow::Result<()> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose, quiet)));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(false),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init()?,
    }

    let _ = LOGGING_INITIALIZED.set(());
    Ok(())
}

/// Install a test-writer subscriber for unit and integration tests.
pub fn init_test_logging() {
    if LOGGING_INITIALIZED.get().is_some() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer())
        .try_init();
    let _ = LOGGING_INITIALIZED.set(());
}
