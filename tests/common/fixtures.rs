//! Tool outputs in the shapes the adapters accept.

use super::cli::QapWorkspace;
use serde_json::{Value, json};

/// Browser-automation `stats` block, as the runner writes it.
pub fn browser_stats(total: u64, passed: u64, failed: u64, skipped: u64, duration: u64) -> Value {
    json!({
        "stats": {
            "total": total,
            "passed": passed,
            "failed": failed,
            "skipped": skipped,
            "duration": duration,
        }
    })
}

/// One accessibility scan with violation counts per impact.
pub fn a11y_scan(url: &str, critical: u64, serious: u64, moderate: u64, minor: u64) -> Value {
    json!({
        "url": url,
        "violations": {
            "critical": critical,
            "serious": serious,
            "moderate": moderate,
            "minor": minor,
        }
    })
}

/// Collection-runner output with `total` assertions of which `failed` fail.
pub fn newman_run(total: u64, failed: u64) -> Value {
    json!({
        "run": {
            "stats": {
                "tests": {"total": total, "failed": failed},
                "assertions": {"total": total, "failed": failed},
            },
            "timings": {"started": 0, "completed": 1500},
        }
    })
}

/// One history entry as persisted in `metrics/historical-data.json`.
pub fn history_entry(day: u32, pass_rate: f64) -> Value {
    json!({
        "timestamp": format!("2025-03-{day:02}T08:00:00Z"),
        "total": 100,
        "passed": pass_rate as u64,
        "failed": 100 - pass_rate as u64,
        "skipped": 0,
        "passRate": pass_rate,
        "metadata": {"duration": 1000},
    })
}

pub fn write_history(workspace: &QapWorkspace, pass_rates: &[f64]) {
    let entries: Vec<Value> = pass_rates
        .iter()
        .enumerate()
        .map(|(i, rate)| history_entry(i as u32 + 1, *rate))
        .collect();
    workspace.write_json("reports/metrics/historical-data.json", &Value::Array(entries));
}
