//! Theme and color definitions for rich output.

use crate::history::TrendDirection;
use crate::metrics::{Health, Verdict};
use crate::monitor::{OverallStatus, SuiteStatus};
use rich_rust::r#box::ROUNDED;
use rich_rust::prelude::*;

/// A foreground style; unknown names fall back to the terminal default.
fn fg(name: &str) -> Style {
    Color::parse(name).map_or_else(|_| Style::new(), |c| Style::new().color(c))
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub info: Style,
    pub dimmed: Style,
    pub accent: Style,
    pub muted: Style,
    pub emphasis: Style,

    pub health_good: Style,
    pub health_warning: Style,
    pub health_critical: Style,

    pub verdict_pass: Style,
    pub verdict_fail: Style,
    pub verdict_skipped: Style,

    pub trend_up: Style,
    pub trend_down: Style,
    pub trend_flat: Style,

    pub suite_name: Style,
    pub count: Style,
    pub timestamp: Style,
    pub path: Style,

    pub table_header: Style,
    pub table_border: Style,
    pub panel_title: Style,
    pub panel_border: Style,
    pub section: Style,

    pub box_style: &'static BoxChars,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: fg("green").bold(),
            error: fg("red").bold(),
            warning: fg("yellow").bold(),
            info: fg("blue"),
            dimmed: Style::new().dim(),
            accent: fg("cyan"),
            muted: fg("bright_black"),
            emphasis: Style::new().bold(),

            health_good: fg("green").bold(),
            health_warning: fg("yellow").bold(),
            health_critical: fg("red").bold(),

            verdict_pass: fg("green"),
            verdict_fail: fg("red").bold(),
            verdict_skipped: fg("bright_black"),

            trend_up: fg("green"),
            trend_down: fg("red"),
            trend_flat: fg("blue").dim(),

            suite_name: Style::new().bold(),
            count: fg("cyan"),
            timestamp: fg("bright_black"),
            path: fg("cyan").dim(),

            table_header: Style::new().bold(),
            table_border: fg("bright_black"),
            panel_title: Style::new().bold(),
            panel_border: fg("bright_black"),
            section: fg("cyan").bold(),

            box_style: &ROUNDED,
        }
    }
}

impl Theme {
    #[must_use]
    pub fn health_style(&self, health: Health) -> Style {
        match health {
            Health::Good => self.health_good.clone(),
            Health::Warning => self.health_warning.clone(),
            Health::Critical => self.health_critical.clone(),
        }
    }

    #[must_use]
    pub fn verdict_style(&self, verdict: Verdict) -> Style {
        match verdict {
            Verdict::Pass => self.verdict_pass.clone(),
            Verdict::Fail => self.verdict_fail.clone(),
            Verdict::Skipped => self.verdict_skipped.clone(),
        }
    }

    #[must_use]
    pub fn trend_style(&self, direction: TrendDirection) -> Style {
        match direction {
            TrendDirection::Improving => self.trend_up.clone(),
            TrendDirection::Declining => self.trend_down.clone(),
            TrendDirection::Stable | TrendDirection::InsufficientData => self.trend_flat.clone(),
        }
    }

    #[must_use]
    pub fn suite_status_style(&self, status: SuiteStatus) -> Style {
        match status {
            SuiteStatus::Passed => self.verdict_pass.clone(),
            SuiteStatus::Failed => self.verdict_fail.clone(),
            SuiteStatus::Running => self.warning.clone(),
            SuiteStatus::Pending | SuiteStatus::Skipped => self.muted.clone(),
        }
    }

    #[must_use]
    pub fn overall_status_style(&self, status: OverallStatus) -> Style {
        match status {
            OverallStatus::Passed | OverallStatus::Completed => self.success.clone(),
            OverallStatus::Failed => self.error.clone(),
            OverallStatus::Running => self.warning.clone(),
        }
    }
}
