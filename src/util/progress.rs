//! Progress indicators for artifact ingestion.
//!
//! Bars draw only when stderr is an interactive terminal; otherwise they
//! are hidden and every call is a no-op.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{IsTerminal, stderr};

/// Progress is shown only if stderr is an interactive terminal.
#[must_use]
pub fn should_show_progress() -> bool {
    stderr().is_terminal()
}

/// Create a determinate progress bar.
///
/// `show` should normally come from `should_show_progress()`.
#[must_use]
pub fn create_progress_bar(total: u64, message: &str, show: bool) -> ProgressBar {
    let pb = ProgressBar::new(total);

    if show {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("=>-"));
        pb.set_style(style);
        pb.set_message(message.to_string());
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    pb
}

/// Progress bar wrapper that remembers whether it is drawing.
pub struct ProgressTracker {
    bar: ProgressBar,
    showing: bool,
}

impl ProgressTracker {
    /// Create a tracker; `enabled = false` forces a hidden bar.
    #[must_use]
    pub fn new(total: u64, message: &str, enabled: bool) -> Self {
        let showing = enabled && should_show_progress();
        Self {
            bar: create_progress_bar(total, message, showing),
            showing,
        }
    }

    pub fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    /// Show the artifact currently being parsed.
    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    #[must_use]
    pub const fn is_showing(&self) -> bool {
        self.showing
    }
}
