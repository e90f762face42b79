//! CLI definitions and entry point.

use crate::config::CliOverrides;
use crate::monitor::{OverallStatus, SuiteStatus};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Aggregate QA tool results into reports, gates and history
#[derive(Parser, Debug)]
#[command(name = "qap", author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./qap.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding tool outputs
    #[arg(long, global = true)]
    pub results_root: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(long, global = true)]
    pub report_root: Option<PathBuf>,

    /// Status monitor file
    #[arg(long, global = true)]
    pub status_file: Option<PathBuf>,

    /// Number of runs kept in history
    #[arg(long, global = true)]
    pub history_max_len: Option<usize>,

    /// "system" or a fixed RFC 3339 timestamp
    #[arg(long, global = true)]
    pub clock: Option<String>,

    /// Abort a run that takes longer than this many seconds
    #[arg(long, global = true)]
    pub budget_secs: Option<u64>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config: self.config.clone(),
            results_root: self.results_root.clone(),
            report_root: self.report_root.clone(),
            status_file: self.status_file.clone(),
            history_max_len: self.history_max_len,
            clock: self.clock.clone(),
            run_budget_secs: self.budget_secs,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate the results directory and write every report
    Aggregate(AggregateArgs),

    /// Run the configured test tools, then aggregate
    Run(RunArgs),

    /// Read and write the run status file
    Monitor {
        #[command(subcommand)]
        command: MonitorCommands,
    },

    /// Inspect run history (read-only)
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Configuration inspection
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    Version,
}

impl Commands {
    /// `aggregate` and `run` exit 1 on every fatal error; the machine tag in
    /// the error output still names the cause.
    #[must_use]
    pub const fn single_failure_exit(&self) -> bool {
        matches!(self, Self::Aggregate(_) | Self::Run(_))
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct AggregateArgs {
    /// Never draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Never draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Only run the named commands (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MonitorCommands {
    /// Start a fresh status record
    Init,

    /// Record a suite's state
    Update {
        /// Suite name
        #[arg(long)]
        suite: String,

        #[arg(long, value_enum)]
        status: SuiteStatusArg,

        #[arg(long)]
        duration_ms: Option<u64>,

        #[arg(long)]
        tests: Option<u64>,

        #[arg(long)]
        passed: Option<u64>,

        #[arg(long)]
        failed: Option<u64>,
    },

    /// Append an error
    Error {
        message: String,

        #[arg(long)]
        suite: Option<String>,

        #[arg(long)]
        stack: Option<String>,
    },

    /// Append a warning
    Warning {
        message: String,

        #[arg(long)]
        suite: Option<String>,
    },

    /// Mark the run finished (exit 1 when finished as failed)
    Finish {
        #[arg(value_enum)]
        status: FinishStatus,
    },

    /// Print a roll-up of the record
    Summary,

    /// Delete the status file
    Cleanup,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteStatusArg {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl From<SuiteStatusArg> for SuiteStatus {
    fn from(value: SuiteStatusArg) -> Self {
        match value {
            SuiteStatusArg::Pending => Self::Pending,
            SuiteStatusArg::Running => Self::Running,
            SuiteStatusArg::Passed => Self::Passed,
            SuiteStatusArg::Failed => Self::Failed,
            SuiteStatusArg::Skipped => Self::Skipped,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishStatus {
    Passed,
    Failed,
    Completed,
}

impl From<FinishStatus> for OverallStatus {
    fn from(value: FinishStatus) -> Self {
        match value {
            FinishStatus::Passed => Self::Passed,
            FinishStatus::Failed => Self::Failed,
            FinishStatus::Completed => Self::Completed,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommands {
    /// List recorded runs, oldest first
    List {
        #[arg(long, value_enum, default_value_t = HistoryFormat::Table)]
        format: HistoryFormat,

        /// CSV fields, comma separated
        #[arg(long)]
        fields: Option<String>,

        /// Show only the most recent N runs
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the pass-rate trend
    Trend {
        /// Window size (default: trend_window from config)
        #[arg(long)]
        window: Option<usize>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFormat {
    #[default]
    Table,
    Csv,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective merged configuration
    Show,
    /// Print the JSON Schema of the config file
    Schema,
    /// Show config file paths and whether they exist
    Path,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_become_overrides() {
        let cli = Cli::parse_from([
            "qap",
            "aggregate",
            "--results-root",
            "out",
            "--clock",
            "2025-01-01T00:00:00Z",
            "--budget-secs",
            "60",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.results_root, Some(PathBuf::from("out")));
        assert_eq!(overrides.clock.as_deref(), Some("2025-01-01T00:00:00Z"));
        assert_eq!(overrides.run_budget_secs, Some(60));
    }

    #[test]
    fn monitor_update_parses() {
        let cli = Cli::parse_from([
            "qap", "monitor", "update", "--suite", "ui", "--status", "failed", "--failed", "2",
        ]);
        let Commands::Monitor {
            command: MonitorCommands::Update { suite, status, failed, .. },
        } = cli.command
        else {
            panic!("monitor update expected");
        };
        assert_eq!(suite, "ui");
        assert_eq!(SuiteStatus::from(status), SuiteStatus::Failed);
        assert_eq!(failed, Some(2));
    }
}
