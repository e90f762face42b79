//! Gates: threshold predicates with a verdict and an alert severity.
//!
//! A gate's verdict is a pure function of its threshold and actual value.
//! Gates whose input is absent are `skipped` and never alert.

use crate::config::{GateConfig, ScoreGate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Skipped,
}

impl Verdict {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Run health: the worst alert raised by any failing gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    #[default]
    Good,
    Warning,
    Critical,
}

impl Health {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
}

impl Comparison {
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateResult {
    pub name: String,
    pub comparison: Comparison,
    pub threshold: f64,
    pub actual: Option<f64>,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl GateResult {
    fn skipped(name: &str, comparison: Comparison, threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            comparison,
            threshold,
            actual: None,
            verdict: Verdict::Skipped,
            severity: None,
        }
    }

    /// `actual >= min`; critical alert below `critical_below`.
    #[must_use]
    pub fn score(name: &str, gate: &ScoreGate, actual: Option<f64>) -> Self {
        let Some(actual) = actual else {
            return Self::skipped(name, Comparison::AtLeast, gate.min);
        };
        let (verdict, severity) = if actual >= gate.min {
            (Verdict::Pass, None)
        } else if actual < gate.critical_below {
            (Verdict::Fail, Some(Severity::Critical))
        } else {
            (Verdict::Fail, Some(Severity::Warning))
        };
        Self {
            name: name.to_string(),
            comparison: Comparison::AtLeast,
            threshold: gate.min,
            actual: Some(actual),
            verdict,
            severity,
        }
    }

    /// Single-threshold gate; failure raises a warning.
    #[must_use]
    pub fn bound(name: &str, comparison: Comparison, threshold: f64, actual: Option<f64>) -> Self {
        let Some(actual) = actual else {
            return Self::skipped(name, comparison, threshold);
        };
        let passed = match comparison {
            Comparison::AtLeast => actual >= threshold,
            Comparison::AtMost => actual <= threshold,
        };
        Self {
            name: name.to_string(),
            comparison,
            threshold,
            actual: Some(actual),
            verdict: if passed { Verdict::Pass } else { Verdict::Fail },
            severity: (!passed).then_some(Severity::Warning),
        }
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.verdict == Verdict::Fail
    }
}

/// Inputs for the gate set; `None` means the input is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GateInputs {
    pub pass_rate: Option<f64>,
    pub quality_score: Option<f64>,
    pub average_duration_ms: Option<f64>,
    pub coverage: Option<f64>,
    pub fail_rate: Option<f64>,
}

/// Evaluate the configured gate set in a fixed order.
#[must_use]
pub fn evaluate(config: &GateConfig, inputs: &GateInputs) -> Vec<GateResult> {
    vec![
        GateResult::score("pass_rate", &config.pass_rate, inputs.pass_rate),
        GateResult::score("quality_score", &config.quality_score, inputs.quality_score),
        GateResult::bound(
            "average_duration",
            Comparison::AtMost,
            config.average_duration.max_ms,
            inputs.average_duration_ms,
        ),
        GateResult::bound(
            "coverage",
            Comparison::AtLeast,
            config.coverage.min,
            inputs.coverage,
        ),
        GateResult::bound(
            "fail_rate",
            Comparison::AtMost,
            config.fail_rate.max,
            inputs.fail_rate,
        ),
    ]
}

/// Worst alert among failing gates.
#[must_use]
pub fn overall_health(gates: &[GateResult]) -> Health {
    gates
        .iter()
        .filter(|gate| gate.failed())
        .filter_map(|gate| gate.severity)
        .max()
        .map_or(Health::Good, |severity| match severity {
            Severity::Warning => Health::Warning,
            Severity::Critical => Health::Critical,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_gate_severity_bands() {
        let gate = ScoreGate::default();
        assert_eq!(GateResult::score("p", &gate, Some(96.0)).verdict, Verdict::Pass);
        assert_eq!(
            GateResult::score("p", &gate, Some(90.0)).severity,
            Some(Severity::Warning)
        );
        assert_eq!(
            GateResult::score("p", &gate, Some(69.9)).severity,
            Some(Severity::Critical)
        );
        assert_eq!(GateResult::score("p", &gate, None).verdict, Verdict::Skipped);
    }

    #[test]
    fn bound_gate_directions() {
        assert!(GateResult::bound("d", Comparison::AtMost, 2000.0, Some(2500.0)).failed());
        assert!(!GateResult::bound("c", Comparison::AtLeast, 80.0, Some(80.0)).failed());
        assert!(!GateResult::bound("f", Comparison::AtMost, 0.0, Some(0.0)).failed());
    }

    #[test]
    fn all_inputs_absent_is_good() {
        let gates = evaluate(&GateConfig::default(), &GateInputs::default());
        assert!(gates.iter().all(|g| g.verdict == Verdict::Skipped));
        assert_eq!(overall_health(&gates), Health::Good);
    }

    #[test]
    fn worst_alert_wins() {
        let inputs = GateInputs {
            pass_rate: Some(50.0),
            coverage: Some(10.0),
            ..GateInputs::default()
        };
        let gates = evaluate(&GateConfig::default(), &inputs);
        assert_eq!(overall_health(&gates), Health::Critical);
    }
}
