//! `qa_pulse`: QA results aggregation and reporting.
//!
//! Collects the output of browser automation, HTTP collection, load,
//! accessibility, security, coverage and lint tools from a results
//! directory, folds it into one snapshot, derives quality metrics and
//! gates, keeps a bounded run history, and writes JSON, HTML and JUnit
//! reports.

#![forbid(unsafe_code)]

pub mod adapters;
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod format;
pub mod history;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod monitor;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod util;

pub use error::{ErrorCode, QaError, Result, StructuredError};
