//! E2E tests for the `completions` command.
//!
//! Test coverage:
//! - Generate completions for each supported shell
//! - Verify completions contain subcommand and flag names
//! - Unknown shells are rejected by argument parsing

mod common;

use common::cli::{QapWorkspace, run_qap};
use predicates::prelude::*;
use tracing::info;

fn assert_contains_subcommands(output: &str, shell_name: &str) {
    for cmd in ["aggregate", "run", "monitor", "history", "config"] {
        assert!(
            output.contains(cmd),
            "{shell_name} completions should contain '{cmd}' subcommand"
        );
    }
}

fn assert_contains_flags(output: &str, shell_name: &str) {
    for flag in ["json", "verbose", "quiet", "results-root"] {
        // fish spells long flags as `-l name`
        let expected = if shell_name == "fish" {
            format!("-l {flag}")
        } else {
            format!("--{flag}")
        };
        assert!(
            output.contains(&expected),
            "{shell_name} completions should contain '{flag}' flag"
        );
    }
}

#[test]
fn e2e_completions_every_shell() {
    common::init_test_logging();
    info!("e2e_completions_every_shell: start");
    let workspace = QapWorkspace::new();

    for shell in ["bash", "zsh", "fish", "powershell", "elvish"] {
        let run = run_qap(&workspace, ["completions", shell], &format!("completions_{shell}"));
        assert!(run.status.success(), "{shell} completions failed: {}", run.stderr);
        assert!(!run.stdout.is_empty(), "{shell} completions are empty");
        assert_contains_subcommands(&run.stdout, shell);
        assert_contains_flags(&run.stdout, shell);
    }
}

#[test]
fn e2e_completions_output_file() {
    common::init_test_logging();
    let workspace = QapWorkspace::new();

    let run = run_qap(
        &workspace,
        ["completions", "zsh", "--output", "_qap"],
        "completions_file",
    );
    assert!(run.status.success(), "completions failed: {}", run.stderr);
    let script = std::fs::read_to_string(workspace.root.join("_qap")).unwrap();
    assert!(predicate::str::starts_with("#compdef qap").eval(&script));
}

#[test]
fn e2e_completions_unknown_shell() {
    common::init_test_logging();
    let workspace = QapWorkspace::new();

    let run = run_qap(&workspace, ["completions", "tcsh"], "completions_unknown");
    assert!(!run.status.success());
    assert!(
        predicate::str::contains("invalid value").eval(&run.stderr),
        "stderr: {}",
        run.stderr
    );
}
