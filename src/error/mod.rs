//! Error types and handling for `qa_pulse`.
//!
//! Only fatal conditions are errors. Problems confined to a single input
//! artifact are `Diagnostic` values collected into the snapshot instead.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for wrapped errors
//! - Provides recovery hints for user-facing errors
//! - Maps every variant to a stable machine code and exit code

mod context;
mod structured;

pub use context::ResultExt;
pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `qa_pulse` operations.
#[derive(Error, Debug)]
pub enum QaError {
    // === Configuration Errors ===
    /// Configuration file could not be parsed (includes unknown keys).
    #[error("Invalid config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A configuration value failed validation.
    #[error("Invalid config value for {field}: {reason}")]
    ConfigInvalid { field: String, reason: String },

    /// Generic configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === Run Control Errors ===
    /// Another run holds the history lock.
    #[error("History store is locked by another run: {path}")]
    HistoryLocked { path: PathBuf },

    /// The run was interrupted before emitting anything.
    #[error("Run cancelled; no reports were written")]
    Cancelled,

    /// The global run budget elapsed.
    #[error("Run exceeded its budget of {budget_secs}s; no reports were written")]
    BudgetExceeded { budget_secs: u64 },

    // === Emission Errors ===
    /// A report family could not be written.
    #[error("Failed to write {family} report at '{path}': {source}")]
    ReportEmit {
        family: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Status monitor misuse (bad arguments for the current record).
    #[error("Status monitor: {0}")]
    Monitor(String),

    /// An external tool launched by `qap run` could not be started.
    #[error("Failed to start '{name}': {source}")]
    ToolLaunch {
        name: String,
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Wrapped errors ===
    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QaError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigInvalid { .. }
                | Self::Config(_)
                | Self::HistoryLocked { .. }
                | Self::BudgetExceeded { .. }
                | Self::Monitor(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ConfigParse { .. } => {
                Some("Fix the YAML or remove unknown keys; see: qap config schema")
            }
            Self::ConfigInvalid { .. } => Some("Run 'qap config show' to inspect the merged config"),
            Self::HistoryLocked { .. } => {
                Some("Wait for the other run to finish, then retry")
            }
            Self::BudgetExceeded { .. } => Some("Raise run_budget_secs or reduce the result set"),
            Self::Cancelled => Some("Re-run the command to produce reports"),
            Self::ToolLaunch { .. } => Some("Check run.commands[].program is installed and on PATH"),
            _ => None,
        }
    }

    /// Create a validation error for a specific config field.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type using `QaError`.
pub type Result<T> = std::result::Result<T, QaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QaError::HistoryLocked {
            path: PathBuf::from("reports/metrics/historical-data.json"),
        };
        assert_eq!(
            err.to_string(),
            "History store is locked by another run: reports/metrics/historical-data.json"
        );
    }

    #[test]
    fn test_invalid_error() {
        let err = QaError::invalid("history_max_len", "must be between 1 and 1000");
        assert_eq!(
            err.to_string(),
            "Invalid config value for history_max_len: must be between 1 and 1000"
        );
    }

    #[test]
    fn test_user_recoverable() {
        assert!(QaError::Config("x".to_string()).is_user_recoverable());
        assert!(!QaError::Io(std::io::Error::other("disk")).is_user_recoverable());
    }

    #[test]
    fn test_suggestion() {
        assert!(QaError::Cancelled.suggestion().is_some());
        assert!(QaError::Json(serde_json::from_str::<u8>("x").unwrap_err())
            .suggestion()
            .is_none());
    }
}
