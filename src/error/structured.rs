//! Structured error output for scripts and CI.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::QaError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,
    /// Config parse error (bad YAML or unknown key)
    ConfigParseError,
    /// Config value out of range
    ConfigInvalid,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Run Control Errors (exit code 9) ===
    /// History store locked by another run
    HistoryLocked,
    /// Run cancelled by signal
    Cancelled,
    /// Global run budget exceeded
    BudgetExceeded,

    // === Internal Errors (exit code 1) ===
    /// Report emission failed
    ReportEmitFailed,
    /// Status monitor misuse
    MonitorError,
    /// External tool could not be started
    ToolLaunchFailed,
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            // Config
            Self::ConfigError => "CONFIG_ERROR",
            Self::ConfigParseError => "CONFIG_PARSE_ERROR",
            Self::ConfigInvalid => "CONFIG_INVALID",
            // I/O
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            // Run control
            Self::HistoryLocked => "HISTORY_LOCKED",
            Self::Cancelled => "CANCELLED",
            Self::BudgetExceeded => "BUDGET_EXCEEDED",
            // Internal
            Self::ReportEmitFailed => "REPORT_EMIT_FAILED",
            Self::MonitorError => "MONITOR_ERROR",
            Self::ToolLaunchFailed => "TOOL_LAUNCH_FAILED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Retryable means a caller might succeed if it waits and retries
    /// or fixes its input and retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HistoryLocked | Self::Cancelled | Self::ConfigInvalid | Self::ConfigParseError
        )
    }

    /// Get the exit code for this error category.
    ///
    /// Exit codes are grouped by error category:
    /// - 1: Internal/unknown errors (including report emission)
    /// - 7: Config errors
    /// - 8: I/O errors
    /// - 9: Run control (lock, cancellation, budget)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError | Self::ConfigParseError | Self::ConfigInvalid => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::HistoryLocked | Self::Cancelled | Self::BudgetExceeded => 9,
            Self::ReportEmitFailed
            | Self::MonitorError
            | Self::ToolLaunchFailed
            | Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `QaError`.
    #[must_use]
    pub fn from_error(err: &QaError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = err.suggestion().map(str::to_string);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Process exit code. Commands with a single failure exit report every
    /// fatal error as 1; the others use the per-category code.
    #[must_use]
    pub const fn exit_code(&self, single_failure_exit: bool) -> i32 {
        if single_failure_exit {
            1
        } else {
            self.code.exit_code()
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);
        output.push_str(" [");
        output.push_str(self.code.as_str());
        output.push(']');

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &QaError) -> (ErrorCode, Option<Value>) {
        match err {
            QaError::ConfigParse { path, .. } => (
                ErrorCode::ConfigParseError,
                Some(json!({"path": path.display().to_string()})),
            ),
            QaError::ConfigInvalid { field, reason } => (
                ErrorCode::ConfigInvalid,
                Some(json!({"field": field, "reason": reason})),
            ),
            QaError::Config(_) => (ErrorCode::ConfigError, None),
            QaError::HistoryLocked { path } => (
                ErrorCode::HistoryLocked,
                Some(json!({"path": path.display().to_string()})),
            ),
            QaError::Cancelled => (ErrorCode::Cancelled, None),
            QaError::BudgetExceeded { budget_secs } => (
                ErrorCode::BudgetExceeded,
                Some(json!({"budget_secs": budget_secs})),
            ),
            QaError::ReportEmit { family, path, .. } => (
                ErrorCode::ReportEmitFailed,
                Some(json!({"family": family, "path": path.display().to_string()})),
            ),
            QaError::Monitor(_) => (ErrorCode::MonitorError, None),
            QaError::ToolLaunch { name, .. } => {
                (ErrorCode::ToolLaunchFailed, Some(json!({"tool": name})))
            }
            QaError::Io(_) => (ErrorCode::IoError, None),
            QaError::Json(_) => (ErrorCode::JsonError, None),
            QaError::Yaml(_) => (ErrorCode::YamlError, None),
            QaError::WithContext { context, .. } => {
                (ErrorCode::InternalError, Some(json!({"context": context})))
            }
            QaError::Other(_) => (ErrorCode::InternalError, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::HistoryLocked.as_str(), "HISTORY_LOCKED");
        assert_eq!(ErrorCode::ConfigParseError.as_str(), "CONFIG_PARSE_ERROR");
        assert_eq!(ErrorCode::ReportEmitFailed.as_str(), "REPORT_EMIT_FAILED");
    }

    #[test]
    fn test_error_code_is_retryable() {
        assert!(ErrorCode::HistoryLocked.is_retryable());
        assert!(ErrorCode::ConfigInvalid.is_retryable());
        assert!(!ErrorCode::InternalError.is_retryable());
        assert!(!ErrorCode::ReportEmitFailed.is_retryable());
    }

    #[test]
    fn test_error_code_exit_codes() {
        assert_eq!(ErrorCode::InternalError.exit_code(), 1);
        assert_eq!(ErrorCode::ReportEmitFailed.exit_code(), 1);
        assert_eq!(ErrorCode::ConfigError.exit_code(), 7);
        assert_eq!(ErrorCode::IoError.exit_code(), 8);
        assert_eq!(ErrorCode::Cancelled.exit_code(), 9);
        assert_eq!(ErrorCode::BudgetExceeded.exit_code(), 9);
    }

    #[test]
    fn test_single_failure_exit_keeps_code() {
        let structured = StructuredError::from_error(&QaError::HistoryLocked {
            path: PathBuf::from("h.json"),
        });
        assert_eq!(structured.exit_code(true), 1);
        assert_eq!(structured.exit_code(false), 9);
        assert_eq!(structured.to_json()["error"]["code"], "HISTORY_LOCKED");

        let config = StructuredError::from_error(&QaError::invalid("trend_window", "must be >= 1"));
        assert_eq!(config.exit_code(true), 1);
        assert_eq!(config.exit_code(false), 7);
    }

    #[test]
    fn test_from_error_history_locked() {
        let err = QaError::HistoryLocked {
            path: PathBuf::from("h.json"),
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::HistoryLocked);
        assert!(structured.retryable);
        assert_eq!(structured.context.unwrap()["path"], "h.json");
        assert!(structured.hint.is_some());
    }

    #[test]
    fn test_structured_error_to_json() {
        let err = StructuredError::from_error(&QaError::invalid("trend_window", "must be >= 1"));
        let json = err.to_json();
        assert_eq!(json["error"]["code"], "CONFIG_INVALID");
        assert_eq!(json["error"]["context"]["field"], "trend_window");
        assert!(json["error"]["retryable"].as_bool().unwrap());
    }

    #[test]
    fn test_to_human_output() {
        let err = StructuredError::from_error(&QaError::Cancelled);

        let plain = err.to_human(false);
        assert!(plain.contains("Error: Run cancelled"));
        assert!(plain.contains("[CANCELLED]"));
        assert!(plain.contains("Hint: "));

        let colored = err.to_human(true);
        assert!(colored.contains("\x1b[31m"));
        assert!(colored.contains("\x1b[33m"));
    }
}
