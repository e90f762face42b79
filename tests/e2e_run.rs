//! E2E tests for `qap run`.
//!
//! Test coverage:
//! - Configured tools run in order, then the results are aggregated
//! - Tools receive the forwarded runtime variables
//! - A tool that cannot start is recorded and fails the run
//! - `--only` narrows the command list
//! - A fatal aggregation error still closes the status file as failed

#![cfg(unix)]

mod common;

use common::cli::{QapWorkspace, error_code, run_qap, run_qap_with_env};
use std::fs;
use tracing::info;

/// A config whose single tool writes a browser result file.
fn writing_config(workspace: &QapWorkspace, failed: u64) {
    let passed = 4 - failed;
    workspace.write(
        "qap.yaml",
        &format!(
            r#"version: 1
run:
  commands:
    - name: ui
      program: sh
      args:
        - -c
        - mkdir -p test-results/staging/chrome && printf '{{"stats":{{"total":4,"passed":{passed},"failed":{failed},"skipped":0,"duration":400}}}}' > test-results/staging/chrome/results.json
"#
        ),
    );
}

#[test]
fn e2e_run_executes_tools_then_aggregates() {
    common::init_test_logging();
    info!("e2e_run_executes_tools_then_aggregates: start");
    let workspace = QapWorkspace::new();
    writing_config(&workspace, 0);

    let run = run_qap(&workspace, ["run", "--json", "--no-progress"], "run");
    assert_eq!(run.code(), Some(0), "run failed: {}", run.stderr);

    let output = run.json();
    assert_eq!(output["exitCode"], 0);
    assert_eq!(output["tools"][0]["name"], "ui");
    assert_eq!(output["tools"][0]["exitCode"], 0);
    assert_eq!(output["summary"]["total"], 4);

    let status = workspace.read_json("test-status.json");
    assert_eq!(status["overall"], "passed");
    assert_eq!(status["suites"]["ui"]["status"], "passed");
    assert!(workspace.exists("reports/test-results.json"));
}

#[test]
fn e2e_run_failed_tests_exit_one() {
    common::init_test_logging();
    let workspace = QapWorkspace::new();
    writing_config(&workspace, 1);

    let run = run_qap(&workspace, ["run", "--json"], "run");
    assert_eq!(run.code(), Some(1), "stderr: {}", run.stderr);
    assert_eq!(run.json()["summary"]["failed"], 1);
    assert_eq!(workspace.read_json("test-status.json")["overall"], "failed");
}

#[test]
fn e2e_run_missing_program_is_recorded() {
    common::init_test_logging();
    let workspace = QapWorkspace::new();
    workspace.write(
        "qap.yaml",
        "version: 1\nrun:\n  commands:\n    - name: ghost\n      program: qap-no-such-tool\n",
    );

    let run = run_qap(&workspace, ["run", "--json"], "run");
    assert_eq!(run.code(), Some(1), "stderr: {}", run.stderr);

    let output = run.json();
    assert_eq!(output["tools"][0]["launched"], false);
    assert!(output["tools"][0]["error"].is_string());

    let status = workspace.read_json("test-status.json");
    assert_eq!(status["suites"]["ghost"]["status"], "failed");
    assert_eq!(status["errors"][0]["suite"], "ghost");
    assert!(workspace.exists("reports/test-results.json"));
}

#[test]
fn e2e_run_forwards_runtime_environment() {
    common::init_test_logging();
    let workspace = QapWorkspace::new();
    workspace.write(
        "qap.yaml",
        "version: 1\nrun:\n  commands:\n    - name: env\n      program: sh\n      args: [\"-c\", \"printf '%s' \\\"$TEST_ENV/$EXTRA\\\" > seen.txt\"]\n      env:\n        EXTRA: extra\n",
    );

    let run = run_qap_with_env(&workspace, ["run", "--json"], [("TEST_ENV", "staging")], "run");
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);
    let seen = std::fs::read_to_string(workspace.root.join("seen.txt")).unwrap();
    assert_eq!(seen, "staging/extra");
}

#[test]
fn e2e_run_only_filters_commands() {
    common::init_test_logging();
    let workspace = QapWorkspace::new();
    workspace.write(
        "qap.yaml",
        "version: 1\nrun:\n  commands:\n    - name: first\n      program: \"true\"\n    - name: second\n      program: qap-no-such-tool\n",
    );

    let run = run_qap(&workspace, ["run", "--json", "--only", "first"], "run");
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);
    let tools = run.json()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "first");
}

#[test]
fn e2e_run_tool_nonzero_exit_marks_suite_failed() {
    common::init_test_logging();
    let workspace = QapWorkspace::new();
    workspace.write(
        "qap.yaml",
        "version: 1\nrun:\n  commands:\n    - name: lint\n      program: sh\n      args: [\"-c\", \"exit 3\"]\n",
    );

    let run = run_qap(&workspace, ["run", "--json"], "run");
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);
    assert_eq!(run.json()["tools"][0]["exitCode"], 3);
    let status = workspace.read_json("test-status.json");
    assert_eq!(status["suites"]["lint"]["status"], "failed");
}

#[test]
fn e2e_run_held_lock_marks_status_failed() {
    common::init_test_logging();
    let workspace = QapWorkspace::new();
    writing_config(&workspace, 0);
    let lock_path = workspace.root.join("reports/metrics/historical-data.json.lock");
    fs::create_dir_all(lock_path.parent().unwrap()).unwrap();
    let file = fs::File::create(&lock_path).unwrap();
    fs2::FileExt::try_lock_exclusive(&file).unwrap();

    let run = run_qap(&workspace, ["run", "--json", "--no-progress"], "run");
    assert_eq!(run.code(), Some(1), "stderr: {}", run.stderr);
    assert_eq!(error_code(&run).as_deref(), Some("HISTORY_LOCKED"));

    let status = workspace.read_json("test-status.json");
    assert_eq!(status["overall"], "failed");
    assert!(status["endTime"].is_string(), "status: {status}");
    let errors = status["errors"].as_array().unwrap();
    assert!(
        errors
            .iter()
            .any(|e| e["error"].as_str().unwrap_or_default().contains("locked")),
        "errors: {errors:?}"
    );
    fs2::FileExt::unlock(&file).unwrap();
}
