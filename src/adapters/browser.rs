//! Browser-automation results.
//!
//! Accepted shapes, tried in order:
//! 1. Native report tree: `suites[]` with `tests[]` or `specs[].tests[]`,
//!    nested `suites[]`, per-attempt `results[]`.
//! 2. Jest-style `testResults[].assertionResults[]`.
//! 3. Counter summaries: `stats {total, passed, failed, skipped}`,
//!    `stats {expected, unexpected, flaky, skipped}`, or top-level
//!    `numTotalTests` / `numPassedTests` / `numFailedTests` / `numPendingTests`.
//! 4. HTML report with labeled counters (last resort).

use super::{
    Adapter, AdapterOutput, ParseFailure, array, float_at, int_at, millis, parse_json, str_at,
};
use crate::discovery::{Candidate, suite_name};
use crate::model::{Artifact, Browser, CaseResult, CaseStatus, Ingested, Origin, SuiteResult, Totals};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub struct BrowserAdapter;

impl Adapter for BrowserAdapter {
    fn origin(&self) -> Origin {
        Origin::Browser
    }

    fn detect(&self, candidate: &Candidate) -> bool {
        let name = candidate.file_name.as_str();
        matches!(name, "results.json" | "report.json")
            || name.ends_with("-results.json")
            || name.ends_with("-report.json")
            || (name == "index.html" && !candidate.json_sibling)
    }

    fn parse(&self, artifact: &Artifact, bytes: &[u8]) -> Result<AdapterOutput, ParseFailure> {
        let name = suite_name(&artifact.relative, Origin::Browser);
        if artifact.relative.to_ascii_lowercase().ends_with(".html") {
            return parse_html(artifact, &name, &String::from_utf8_lossy(bytes));
        }

        let json = parse_json(artifact, bytes)?;
        let mut warnings = Vec::new();

        if let Some(suite) = native_tree(&json, &name).filter(|s| s.case_count() > 0) {
            return Ok(AdapterOutput::new(Ingested::Suite(suite)));
        }
        if let Some(suite) = jest_tree(&json, &name).filter(|s| s.case_count() > 0) {
            return Ok(AdapterOutput::new(Ingested::Suite(suite)));
        }
        if let Some(totals) = counter_summary(&json, &mut warnings) {
            return Ok(
                AdapterOutput::new(Ingested::Suite(SuiteResult::leaf(name, totals)))
                    .with_warnings(warnings),
            );
        }
        // A tree with no cases at all is still a valid, empty run.
        if let Some(suite) = native_tree(&json, &name) {
            return Ok(AdapterOutput::new(Ingested::Suite(suite)));
        }
        Err(ParseFailure::unrecognized(artifact))
    }
}

fn native_tree(json: &Value, name: &str) -> Option<SuiteResult> {
    let suites = json.get("suites")?.as_array()?;
    if suites.is_empty() {
        return None;
    }
    let mut root = SuiteResult::new(name);
    for suite in suites {
        root.push_child(native_suite(suite));
    }
    Some(root)
}

fn native_suite(value: &Value) -> SuiteResult {
    let title = str_at(value, &["title"])
        .or_else(|| str_at(value, &["name"]))
        .unwrap_or_default();
    let mut suite = SuiteResult::new(title);

    for test in array(value, "tests") {
        let name = str_at(test, &["title"])
            .or_else(|| str_at(test, &["name"]))
            .unwrap_or("unnamed");
        suite.push_case(native_case(name, test));
    }
    for spec in array(value, "specs") {
        let name = str_at(spec, &["title"]).unwrap_or("unnamed");
        for test in array(spec, "tests") {
            suite.push_case(native_case(name, test));
        }
    }
    for child in array(value, "suites") {
        suite.push_child(native_suite(child));
    }
    suite
}

fn native_case(name: &str, test: &Value) -> CaseResult {
    let attempts = array(test, "results");
    let status = attempts
        .last()
        .and_then(|last| str_at(last, &["status"]))
        .and_then(attempt_status)
        .or_else(|| str_at(test, &["status"]).and_then(outcome_status));
    let duration: f64 = attempts
        .iter()
        .filter_map(|attempt| float_at(attempt, &["duration"]))
        .sum();

    let mut case = CaseResult::new(name, status, millis(duration));
    case.attempt_count = u32::try_from(attempts.len().max(1)).unwrap_or(u32::MAX);
    case.browser = str_at(test, &["projectName"]).and_then(Browser::detect);
    case.attachments = attempts
        .iter()
        .flat_map(|attempt| array(attempt, "attachments"))
        .filter_map(|attachment| str_at(attachment, &["path"]))
        .map(str::to_string)
        .collect();
    case
}

/// Status of a single attempt.
fn attempt_status(status: &str) -> Option<CaseStatus> {
    match status {
        "passed" => Some(CaseStatus::Passed),
        "failed" | "timedOut" | "interrupted" => Some(CaseStatus::Failed),
        "skipped" | "pending" => Some(CaseStatus::Skipped),
        _ => None,
    }
}

/// Overall test outcome, used when no attempts were recorded.
fn outcome_status(status: &str) -> Option<CaseStatus> {
    match status {
        "expected" | "flaky" => Some(CaseStatus::Passed),
        "unexpected" => Some(CaseStatus::Failed),
        other => attempt_status(other),
    }
}

fn jest_tree(json: &Value, name: &str) -> Option<SuiteResult> {
    let files = json.get("testResults")?.as_array()?;
    let mut root = SuiteResult::new(name);
    for file in files {
        let path = str_at(file, &["name"])
            .or_else(|| str_at(file, &["testFilePath"]))
            .unwrap_or_default();
        let title = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let mut suite = SuiteResult::new(title);
        for assertion in array(file, "assertionResults") {
            let case_name = str_at(assertion, &["fullName"])
                .or_else(|| str_at(assertion, &["title"]))
                .unwrap_or("unnamed");
            let status = str_at(assertion, &["status"]).and_then(|s| match s {
                "todo" => Some(CaseStatus::Skipped),
                other => attempt_status(other),
            });
            let duration = float_at(assertion, &["duration"]).unwrap_or(0.0);
            suite.push_case(CaseResult::new(case_name, status, millis(duration)));
        }
        root.push_child(suite);
    }
    Some(root)
}

fn counter_summary(json: &Value, warnings: &mut Vec<String>) -> Option<Totals> {
    let (total, passed, failed, skipped, duration) = if let Some(stats) = json.get("stats") {
        if stats.get("expected").is_some() || stats.get("unexpected").is_some() {
            let passed = int_at(stats, &["expected"]).unwrap_or(0)
                + int_at(stats, &["flaky"]).unwrap_or(0);
            let failed = int_at(stats, &["unexpected"]).unwrap_or(0);
            let skipped = int_at(stats, &["skipped"]).unwrap_or(0);
            (None, passed, failed, skipped, int_at(stats, &["duration"]))
        } else if stats.get("total").is_some() || stats.get("passed").is_some() {
            (
                int_at(stats, &["total"]),
                int_at(stats, &["passed"]).unwrap_or(0),
                int_at(stats, &["failed"]).unwrap_or(0),
                int_at(stats, &["skipped"]).unwrap_or(0)
                    + int_at(stats, &["pending"]).unwrap_or(0),
                int_at(stats, &["duration"]),
            )
        } else {
            return None;
        }
    } else if json.get("numTotalTests").is_some() {
        (
            int_at(json, &["numTotalTests"]),
            int_at(json, &["numPassedTests"]).unwrap_or(0),
            int_at(json, &["numFailedTests"]).unwrap_or(0),
            int_at(json, &["numPendingTests"]).unwrap_or(0)
                + int_at(json, &["numTodoTests"]).unwrap_or(0),
            None,
        )
    } else {
        return None;
    };

    let total = total.unwrap_or(passed + failed + skipped);
    let (totals, notes) =
        Totals::normalized(total, passed, failed, skipped, duration.unwrap_or(0));
    warnings.extend(notes);
    Some(totals)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Label {
    Total,
    Passed,
    Failed,
    Skipped,
}

/// Label-then-number and number-then-label patterns per counter.
static HTML_COUNTERS: LazyLock<Vec<(Label, Regex)>> = LazyLock::new(|| {
    let labels = [
        (Label::Total, r"(?:tests?\s+total|total\s+tests?|total)"),
        (Label::Passed, r"passed"),
        (Label::Failed, r"failed"),
        (Label::Skipped, r"skipped"),
    ];
    labels
        .iter()
        .flat_map(|(label, pattern)| {
            [
                format!(r"(?i)\b{pattern}\b\s*:?\s*(\d+)"),
                format!(r"(?i)(\d+)\s+{pattern}\b"),
            ]
            .into_iter()
            .filter_map(|source| Regex::new(&source).ok())
            .map(move |re| (*label, re))
        })
        .collect()
});

static HTML_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

fn parse_html(artifact: &Artifact, name: &str, html: &str) -> Result<AdapterOutput, ParseFailure> {
    let text = HTML_TAG
        .as_ref()
        .map_or_else(|| html.to_string(), |re| re.replace_all(html, " ").into_owned());
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let find = |wanted: Label| -> Option<i64> {
        HTML_COUNTERS
            .iter()
            .filter(|(label, _)| *label == wanted)
            .find_map(|(_, re)| re.captures(&text)?.get(1)?.as_str().parse().ok())
    };

    let passed = find(Label::Passed);
    let failed = find(Label::Failed);
    let skipped = find(Label::Skipped);
    let total = find(Label::Total);
    if passed.is_none() && failed.is_none() && total.is_none() {
        return Err(ParseFailure::unrecognized(artifact));
    }

    let (passed, failed, skipped) = (passed.unwrap_or(0), failed.unwrap_or(0), skipped.unwrap_or(0));
    let (totals, notes) = Totals::normalized(
        total.unwrap_or(passed + failed + skipped),
        passed,
        failed,
        skipped,
        0,
    );
    Ok(
        AdapterOutput::new(Ingested::Suite(SuiteResult::leaf(name, totals)))
            .with_warnings(notes),
    )
}
