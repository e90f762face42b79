//! Configuration management for `qa_pulse`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`QAP_*`)
//! 3. Project config (`./qap.yaml` or `--config PATH`)
//! 4. User config (`~/.config/qap/config.yaml`)
//! 5. Defaults
//!
//! Every layer is a YAML mapping. Layers are deep-merged (mappings merge,
//! everything else replaces) and the result is deserialized once into the
//! versioned `QaConfig` schema, which rejects unknown keys.

use crate::error::{QaError, Result, ResultExt};
use crate::model::{Category, SeverityWeights};
use crate::util::time::parse_timestamp;
use crate::util::{Clock, FixedClock, SystemClock};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Only schema version understood by this build.
pub const CONFIG_VERSION: u32 = 1;
/// Project config filename, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "qap.yaml";

/// Effective configuration for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QaConfig {
    /// Schema version; must be 1.
    pub version: u32,
    /// Directory scanned for result artifacts.
    pub results_root: PathBuf,
    /// Directory reports are written to.
    pub report_root: PathBuf,
    /// Status monitor file.
    pub status_file: PathBuf,
    /// Maximum number of history entries kept (FIFO eviction).
    pub history_max_len: usize,
    /// Window size K for trend derivation.
    pub trend_window: usize,
    /// Wall-clock budget per artifact parse.
    pub adapter_timeout_secs: u64,
    /// Optional wall-clock budget for the whole run.
    pub run_budget_secs: Option<u64>,
    /// `system`, or an RFC3339 timestamp to freeze time.
    #[schemars(with = "String")]
    pub clock: ClockSource,
    pub severity_weights: SeverityWeights,
    pub quality_weights: QualityWeights,
    pub gates: GateConfig,
    pub run: RunConfig,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            results_root: PathBuf::from("test-results"),
            report_root: PathBuf::from("reports"),
            status_file: PathBuf::from("test-status.json"),
            history_max_len: 50,
            trend_window: 5,
            adapter_timeout_secs: 30,
            run_budget_secs: None,
            clock: ClockSource::System,
            severity_weights: SeverityWeights::default(),
            quality_weights: QualityWeights::default(),
            gates: GateConfig::default(),
            run: RunConfig::default(),
        }
    }
}

/// Where "now" comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClockSource {
    System,
    Fixed(DateTime<Utc>),
}

impl ClockSource {
    #[must_use]
    pub fn clock(self) -> Box<dyn Clock> {
        match self {
            Self::System => Box::new(SystemClock),
            Self::Fixed(at) => Box::new(FixedClock(at)),
        }
    }
}

impl TryFrom<String> for ClockSource {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value.trim().eq_ignore_ascii_case("system") {
            return Ok(Self::System);
        }
        parse_timestamp(&value, "clock")
            .map(Self::Fixed)
            .map_err(|e| e.to_string())
    }
}

impl From<ClockSource> for String {
    fn from(value: ClockSource) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Fixed(dt) => f.write_str(&crate::util::format_timestamp(dt)),
        }
    }
}

/// Subdomain weights for the overall quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct QualityWeights {
    pub ui: f64,
    pub api: f64,
    pub performance: f64,
    pub accessibility: f64,
    pub security: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            ui: 0.25,
            api: 0.25,
            performance: 0.20,
            accessibility: 0.15,
            security: 0.15,
        }
    }
}

impl QualityWeights {
    #[must_use]
    pub const fn weight(&self, category: Category) -> f64 {
        match category {
            Category::Ui => self.ui,
            Category::Api => self.api,
            Category::Performance => self.performance,
            Category::Accessibility => self.accessibility,
            Category::Security => self.security,
        }
    }
}

/// `actual >= min`; critical alert below `critical_below`, warning otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ScoreGate {
    pub min: f64,
    pub critical_below: f64,
}

impl Default for ScoreGate {
    fn default() -> Self {
        Self {
            min: 95.0,
            critical_below: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DurationGate {
    pub max_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MinGate {
    pub min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MaxGate {
    pub max: f64,
}

/// Gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub pass_rate: ScoreGate,
    pub quality_score: ScoreGate,
    pub average_duration: DurationGate,
    pub coverage: MinGate,
    pub fail_rate: MaxGate,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            pass_rate: ScoreGate::default(),
            quality_score: ScoreGate::default(),
            average_duration: DurationGate { max_ms: 2000.0 },
            coverage: MinGate { min: 80.0 },
            fail_rate: MaxGate { max: 0.0 },
        }
    }
}

/// External tools `qap run` launches before aggregating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub commands: Vec<RunCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RunCommand {
    /// Suite name recorded in the status monitor.
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Ambient variables captured once and recorded in report metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEnv {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_env: Option<String>,
    pub ci: bool,
}

impl RuntimeEnv {
    /// Names forwarded to external tools by `qap run`.
    pub const VARIABLES: [&'static str; 4] = ["BASE_URL", "API_BASE_URL", "TEST_ENV", "CI"];

    #[must_use]
    pub fn from_process() -> Self {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            base_url: non_empty("BASE_URL"),
            api_base_url: non_empty("API_BASE_URL"),
            test_env: non_empty("TEST_ENV"),
            ci: non_empty("CI").and_then(|v| parse_bool(&v)).unwrap_or(false),
        }
    }

    /// `(name, value)` pairs for the variables that are set.
    #[must_use]
    pub fn forwarded(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(v) = &self.base_url {
            out.push(("BASE_URL", v.clone()));
        }
        if let Some(v) = &self.api_base_url {
            out.push(("API_BASE_URL", v.clone()));
        }
        if let Some(v) = &self.test_env {
            out.push(("TEST_ENV", v.clone()));
        }
        if self.ci {
            out.push(("CI", "true".to_string()));
        }
        out
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub results_root: Option<PathBuf>,
    pub report_root: Option<PathBuf>,
    pub status_file: Option<PathBuf>,
    pub history_max_len: Option<usize>,
    pub clock: Option<String>,
    pub run_budget_secs: Option<u64>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> Value {
        let mut layer = Mapping::new();
        if let Some(path) = &self.results_root {
            insert_path(&mut layer, "results_root", path);
        }
        if let Some(path) = &self.report_root {
            insert_path(&mut layer, "report_root", path);
        }
        if let Some(path) = &self.status_file {
            insert_path(&mut layer, "status_file", path);
        }
        if let Some(len) = self.history_max_len {
            layer.insert("history_max_len".into(), Value::from(len as u64));
        }
        if let Some(clock) = &self.clock {
            layer.insert("clock".into(), Value::from(clock.clone()));
        }
        if let Some(secs) = self.run_budget_secs {
            layer.insert("run_budget_secs".into(), Value::from(secs));
        }
        Value::Mapping(layer)
    }
}

fn insert_path(layer: &mut Mapping, key: &str, path: &Path) {
    layer.insert(
        key.into(),
        Value::from(path.to_string_lossy().into_owned()),
    );
}

/// Read a YAML layer. Missing files yield an empty layer.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or
/// if it names keys the schema does not know.
pub fn load_yaml_layer(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Null);
    }
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&contents).map_err(|source| QaError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    // Check the layer on its own so errors point at the right file.
    let mut probe = defaults_layer()?;
    merge_values(&mut probe, value.clone());
    serde_yaml::from_value::<QaConfig>(probe).map_err(|source| QaError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "Loaded config layer");
    Ok(value)
}

/// Build a layer from `QAP_*` variables.
///
/// # Errors
///
/// Returns an error if `QAP_HISTORY_MAX_LEN` is not a number.
pub fn env_layer(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Value> {
    let mut layer = Mapping::new();
    for (var, key) in [
        ("QAP_RESULTS_ROOT", "results_root"),
        ("QAP_REPORT_ROOT", "report_root"),
        ("QAP_STATUS_FILE", "status_file"),
        ("QAP_CLOCK", "clock"),
    ] {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            layer.insert(key.into(), Value::from(value));
        }
    }
    if let Some(raw) = lookup("QAP_HISTORY_MAX_LEN").filter(|v| !v.trim().is_empty()) {
        let len = raw
            .trim()
            .parse::<u64>()
            .map_err(|_| QaError::invalid("QAP_HISTORY_MAX_LEN", format!("not a number: {raw}")))?;
        layer.insert("history_max_len".into(), Value::from(len));
    }
    Ok(Value::Mapping(layer))
}

/// Defaults rendered as a YAML layer.
///
/// # Errors
///
/// Returns an error only if the defaults fail to serialize.
pub fn defaults_layer() -> Result<Value> {
    Ok(serde_yaml::to_value(QaConfig::default())?)
}

/// Deep-merge `overlay` into `base`. Mappings merge, all else replaces.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// User config location (`~/.config/qap/config.yaml`).
#[must_use]
pub fn user_config_path(home: Option<&Path>) -> Option<PathBuf> {
    home.map(|home| home.join(".config").join("qap").join("config.yaml"))
}

/// Load configuration with the documented precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed, or the
/// merged result fails validation.
pub fn load_config(cli: &CliOverrides) -> Result<QaConfig> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let cwd = std::env::current_dir().context("resolving working directory")?;
    load_config_with(cli, &cwd, home.as_deref(), &|key| std::env::var(key).ok())
}

/// Like `load_config` with explicit working directory, home and environment.
///
/// # Errors
///
/// See `load_config`.
pub fn load_config_with(
    cli: &CliOverrides,
    cwd: &Path,
    home: Option<&Path>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<QaConfig> {
    let mut merged = defaults_layer()?;

    if let Some(path) = user_config_path(home) {
        merge_values(&mut merged, load_yaml_layer(&path)?);
    }

    let project_path = match &cli.config {
        Some(path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                cwd.join(path)
            };
            if !path.exists() {
                return Err(QaError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            path
        }
        None => cwd.join(PROJECT_CONFIG_FILE),
    };
    merge_values(&mut merged, load_yaml_layer(&project_path)?);
    merge_values(&mut merged, env_layer(lookup)?);
    merge_values(&mut merged, cli.as_layer());

    let config: QaConfig = serde_yaml::from_value(merged).map_err(|e| {
        QaError::Config(format!("invalid merged configuration: {e}"))
    })?;
    validate(&config)?;
    Ok(config)
}

/// Validate cross-field constraints once, after merging.
///
/// # Errors
///
/// Returns `QaError::ConfigInvalid` naming the first offending field.
pub fn validate(config: &QaConfig) -> Result<()> {
    if config.version != CONFIG_VERSION {
        return Err(QaError::invalid(
            "version",
            format!("unsupported version {} (expected {CONFIG_VERSION})", config.version),
        ));
    }
    if !(1..=1000).contains(&config.history_max_len) {
        return Err(QaError::invalid(
            "history_max_len",
            "must be between 1 and 1000",
        ));
    }
    if config.trend_window == 0 {
        return Err(QaError::invalid("trend_window", "must be at least 1"));
    }
    if config.adapter_timeout_secs == 0 {
        return Err(QaError::invalid("adapter_timeout_secs", "must be at least 1"));
    }

    let severity = [
        ("severity_weights.critical", config.severity_weights.critical),
        ("severity_weights.serious", config.severity_weights.serious),
        ("severity_weights.moderate", config.severity_weights.moderate),
        ("severity_weights.minor", config.severity_weights.minor),
    ];
    check_weights(&severity)?;

    let quality: Vec<(String, f64)> = Category::ALL
        .iter()
        .map(|c| (format!("quality_weights.{c}"), config.quality_weights.weight(*c)))
        .collect();
    let quality: Vec<(&str, f64)> = quality.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    check_weights(&quality)?;

    for (name, gate) in [
        ("gates.pass_rate", config.gates.pass_rate),
        ("gates.quality_score", config.gates.quality_score),
    ] {
        if gate.critical_below > gate.min {
            return Err(QaError::invalid(name, "critical_below must not exceed min"));
        }
    }

    for command in &config.run.commands {
        if command.name.trim().is_empty() || command.program.trim().is_empty() {
            return Err(QaError::invalid(
                "run.commands",
                "every command needs a name and a program",
            ));
        }
    }
    Ok(())
}

fn check_weights(weights: &[(&str, f64)]) -> Result<()> {
    for (name, value) in weights {
        if !value.is_finite() || *value < 0.0 {
            return Err(QaError::invalid(*name, "must be a non-negative number"));
        }
    }
    let sum: f64 = weights.iter().map(|(_, v)| v).sum();
    if sum <= 0.0 {
        let group = weights
            .first()
            .and_then(|(name, _)| name.split('.').next())
            .unwrap_or("weights");
        return Err(QaError::invalid(group, "weights must have a positive sum"));
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_are_valid() {
        let config = QaConfig::default();
        validate(&config).expect("defaults validate");
        assert_eq!(config.history_max_len, 50);
        assert_eq!(config.trend_window, 5);
        assert!((config.gates.pass_rate.min - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_without_files_yields_defaults() {
        let temp = TempDir::new().expect("tempdir");
        let config =
            load_config_with(&CliOverrides::default(), temp.path(), None, &no_env).expect("load");
        assert_eq!(config, QaConfig::default());
    }

    #[test]
    fn precedence_project_env_cli() {
        let temp = TempDir::new().expect("tempdir");
        let home = temp.path().join("home");
        let user_dir = home.join(".config").join("qap");
        fs::create_dir_all(&user_dir).unwrap();
        fs::write(
            user_dir.join("config.yaml"),
            "history_max_len: 10\ntrend_window: 3\ngates:\n  coverage:\n    min: 90\n",
        )
        .unwrap();
        fs::write(
            temp.path().join(PROJECT_CONFIG_FILE),
            "history_max_len: 20\nreport_root: out\ngates:\n  pass_rate:\n    min: 90\n    critical_below: 60\n",
        )
        .unwrap();

        let env: HashMap<&str, &str> = [("QAP_REPORT_ROOT", "env-out")].into_iter().collect();
        let lookup = |key: &str| env.get(key).map(|v| (*v).to_string());
        let cli = CliOverrides {
            history_max_len: Some(30),
            ..CliOverrides::default()
        };

        let config = load_config_with(&cli, temp.path(), Some(&home), &lookup).expect("load");
        assert_eq!(config.history_max_len, 30);
        assert_eq!(config.trend_window, 3);
        assert_eq!(config.report_root, PathBuf::from("env-out"));
        // Nested mappings merge across layers.
        assert!((config.gates.coverage.min - 90.0).abs() < f64::EPSILON);
        assert!((config.gates.pass_rate.min - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_key_is_rejected_with_path() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "histroy_max_len: 10\n").unwrap();

        let err = load_config_with(&CliOverrides::default(), temp.path(), None, &no_env)
            .unwrap_err();
        match err {
            QaError::ConfigParse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_range_history_is_invalid() {
        let config = QaConfig {
            history_max_len: 0,
            ..QaConfig::default()
        };
        assert!(matches!(
            validate(&config),
            Err(QaError::ConfigInvalid { field, .. }) if field == "history_max_len"
        ));
    }

    #[test]
    fn zero_quality_weights_are_invalid() {
        let config = QaConfig {
            quality_weights: QualityWeights {
                ui: 0.0,
                api: 0.0,
                performance: 0.0,
                accessibility: 0.0,
                security: 0.0,
            },
            ..QaConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn clock_source_round_trip() {
        let fixed = ClockSource::try_from("2025-01-01T00:00:00Z".to_string()).unwrap();
        assert_eq!(String::from(fixed), "2025-01-01T00:00:00.000Z");
        assert_eq!(
            ClockSource::try_from("System".to_string()).unwrap(),
            ClockSource::System
        );
        assert!(ClockSource::try_from("soon".to_string()).is_err());
    }

    #[test]
    fn bad_env_history_len() {
        let lookup = |key: &str| (key == "QAP_HISTORY_MAX_LEN").then(|| "lots".to_string());
        assert!(env_layer(&lookup).is_err());
    }

    #[test]
    fn runtime_env_capture() {
        let lookup = |key: &str| match key {
            "BASE_URL" => Some("http://localhost:3000".to_string()),
            "CI" => Some("true".to_string()),
            "TEST_ENV" => Some(String::new()),
            _ => None,
        };
        let env = RuntimeEnv::from_lookup(&lookup);
        assert_eq!(env.base_url.as_deref(), Some("http://localhost:3000"));
        assert!(env.ci);
        assert!(env.test_env.is_none());
        assert_eq!(env.forwarded().len(), 2);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let cli = CliOverrides {
            config: Some(PathBuf::from("nope.yaml")),
            ..CliOverrides::default()
        };
        assert!(load_config_with(&cli, temp.path(), None, &no_env).is_err());
    }
}
