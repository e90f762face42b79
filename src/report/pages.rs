//! Dashboard, comprehensive and simple HTML pages.

use super::ReportInput;
use super::html::{Block, Cell, Filters, Page, Row, Section, Stat, Table, health_class};
use crate::aggregate::IndexEntry;
use crate::metrics::{Health, Severity, Verdict};
use crate::model::{Category, MediaKind, Totals};
use crate::util::{format_duration_ms, format_timestamp, relative_href};
use std::path::Path;

/// `reports/dashboard/index.html`: every breakdown, media and filtering.
#[must_use]
pub fn dashboard(input: &ReportInput<'_>, page_dir: &Path) -> String {
    let snap = input.snapshot;
    let filters = Filters {
        environments: snap.by_environment.keys().map(|e| e.as_str().to_string()).collect(),
        browsers: snap.by_browser.keys().map(|b| b.as_str().to_string()).collect(),
    };
    let mut page = Page::new("QA Dashboard", subtitle(input), input.metrics.overall_health)
        .with_filters(filters);
    page.push(overview(input));
    page.push(scores(input));
    page.push(environments(input));
    page.push(browsers(input));
    page.push(suites(input));
    page.push(categories(input));
    page.push(failures(input, page_dir));
    page.push(media(input, page_dir));
    page.push(diagnostics(input));
    page.render()
}

/// `reports/comprehensive/index.html`: breakdowns plus history, gates and
/// category extras.
#[must_use]
pub fn comprehensive(input: &ReportInput<'_>, page_dir: &Path) -> String {
    let mut page = Page::new(
        "Comprehensive QA Report",
        subtitle(input),
        input.metrics.overall_health,
    );
    page.push(overview(input));
    page.push(gates(input));
    page.push(scores(input));
    page.push(environments(input));
    page.push(browsers(input));
    page.push(suites(input));
    page.push(categories(input));
    page.push(signals(input));
    page.push(failures(input, page_dir));
    page.push(history(input));
    page.push(diagnostics(input));
    page.render()
}

/// `reports/test-report.html`: overview, per-artifact suites, diagnostics.
#[must_use]
pub fn simple(input: &ReportInput<'_>) -> String {
    let mut page = Page::new("Test Report", subtitle(input), input.metrics.overall_health);
    page.push(overview(input));

    let mut table = Table::new(vec![
        "Suite", "Origin", "Environment", "Browser", "Total", "Passed", "Failed", "Skipped",
        "Duration", "Source",
    ]);
    for record in &input.snapshot.suites {
        let t = &record.totals;
        table.push(Row::new(vec![
            Cell::text(&record.name),
            Cell::text(record.origin.as_str()),
            Cell::text(record.environment.as_str()),
            Cell::text(record.browser.as_str()),
            Cell::Count(t.total),
            Cell::Count(t.passed),
            Cell::Count(t.failed),
            Cell::Count(t.skipped),
            Cell::text(format_duration_ms(t.duration_ms)),
            Cell::text(&record.source),
        ]));
    }
    page.push(Section::new("suites", "Suites").with(Block::Table(table)));
    page.push(diagnostics(input));
    page.render()
}

fn subtitle(input: &ReportInput<'_>) -> String {
    format!(
        "Generated {} from {} artifact(s)",
        input.generated_at(),
        input.artifact_count
    )
}

fn overview(input: &ReportInput<'_>) -> Section {
    let t = &input.snapshot.totals;
    let m = input.metrics;
    let health = m.overall_health;
    let quality = m
        .quality_score
        .map_or_else(|| "n/a".to_string(), |q| format!("{q:.1}"));
    Section::new("overview", "Overview").with(Block::Stats(vec![
        Stat::new("Total", t.total.to_string()),
        Stat::new("Passed", t.passed.to_string()).class("pass"),
        Stat::new("Failed", t.failed.to_string()).class(if t.failed > 0 { "fail" } else { "" }),
        Stat::new("Skipped", t.skipped.to_string()),
        Stat::new("Pass rate", format!("{:.1}%", m.pass_rate)),
        Stat::new("Quality score", quality),
        Stat::new("Health", health.as_str()).class(health_class(health)),
        Stat::new("Trend", input.trend.direction.as_str()),
        Stat::new("Duration", format_duration_ms(t.duration_ms)),
    ]))
}

fn totals_cells(t: &Totals) -> Vec<Cell> {
    vec![
        Cell::Count(t.total),
        Cell::Count(t.passed),
        Cell::Count(t.failed),
        Cell::Count(t.skipped),
        Cell::Percent((t.total > 0).then(|| t.pass_rate())),
        Cell::text(format_duration_ms(t.duration_ms)),
    ]
}

const TOTALS_HEADERS: [&str; 6] = ["Total", "Passed", "Failed", "Skipped", "Pass rate", "Duration"];

fn headers(leading: &[&'static str]) -> Vec<&'static str> {
    leading.iter().copied().chain(TOTALS_HEADERS).collect()
}

fn row(leading: Vec<Cell>, t: &Totals) -> Row {
    let mut cells = leading;
    cells.extend(totals_cells(t));
    Row::new(cells)
}

fn environments(input: &ReportInput<'_>) -> Section {
    let mut table = Table::new(headers(&["Environment", "Browser"])).filterable();
    for (env, entry) in &input.snapshot.by_environment {
        table.push(
            row(vec![Cell::text(env.as_str()), Cell::text("all")], &entry.totals)
                .tag("env", env.as_str()),
        );
        for (browser, t) in &entry.breakdown {
            table.push(
                row(vec![Cell::text(env.as_str()), Cell::text(browser)], t)
                    .tag("env", env.as_str())
                    .tag("browser", browser.as_str()),
            );
        }
    }
    Section::new("environments", "By environment").with(Block::Table(table))
}

fn browsers(input: &ReportInput<'_>) -> Section {
    let mut table = Table::new(headers(&["Browser", "Environment"])).filterable();
    for (browser, entry) in &input.snapshot.by_browser {
        table.push(
            row(vec![Cell::text(browser.as_str()), Cell::text("all")], &entry.totals)
                .tag("browser", browser.as_str()),
        );
        for (env, t) in &entry.breakdown {
            table.push(
                row(vec![Cell::text(browser.as_str()), Cell::text(env)], t)
                    .tag("browser", browser.as_str())
                    .tag("env", env.as_str()),
            );
        }
    }
    Section::new("browsers", "By browser").with(Block::Table(table))
}

fn nested_table(first: &'static str, index: impl Iterator<Item = (String, IndexEntry)>) -> Table {
    let mut table = Table::new(headers(&[first, "Breakdown"])).filterable();
    for (key, entry) in index {
        table.push(row(vec![Cell::text(&key), Cell::text("all")], &entry.totals));
        for (child, t) in &entry.breakdown {
            table.push(row(vec![Cell::text(&key), Cell::text(child)], t));
        }
    }
    table
}

fn suites(input: &ReportInput<'_>) -> Section {
    let index = input
        .snapshot
        .by_suite
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()));
    Section::new("suites", "By suite").with(Block::Table(nested_table("Suite", index)))
}

fn categories(input: &ReportInput<'_>) -> Section {
    let index = input
        .snapshot
        .by_category
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.clone()));
    Section::new("categories", "By category").with(Block::Table(nested_table("Category", index)))
}

fn scores(input: &ReportInput<'_>) -> Section {
    let mut table = Table::new(vec!["Subdomain", "Score", "Weight"]);
    for category in Category::ALL {
        let score = input.metrics.subdomain(category);
        table.push(Row::new(vec![
            Cell::text(category.as_str()),
            score.map_or_else(|| Cell::text("absent"), |s| Cell::Text(format!("{s:.1}"))),
            Cell::Text(format!("{:.2}", input.config.quality_weights.weight(category))),
        ]));
    }
    Section::new("scores", "Quality scores").with(Block::Table(table))
}

fn gates(input: &ReportInput<'_>) -> Section {
    let mut table = Table::new(vec!["Gate", "Threshold", "Actual", "Verdict", "Alert"]);
    for gate in &input.metrics.gates {
        let verdict_class = match gate.verdict {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Skipped => "skipped",
        };
        let alert = gate.severity.map_or_else(
            || Cell::text(""),
            |s| {
                let health = match s {
                    Severity::Warning => Health::Warning,
                    Severity::Critical => Health::Critical,
                };
                Cell::badge(health_class(health), health.as_str())
            },
        );
        table.push(Row::new(vec![
            Cell::text(&gate.name),
            Cell::Text(format!("{} {}", gate.comparison.symbol(), gate.threshold)),
            gate.actual
                .map_or_else(|| Cell::text("n/a"), |a| Cell::Text(format!("{a:.1}"))),
            Cell::badge(verdict_class, gate.verdict.as_str()),
            alert,
        ]));
    }
    Section::new("gates", "Gates").with(Block::Table(table))
}

fn signals(input: &ReportInput<'_>) -> Section {
    let signals = &input.snapshot.signals;
    let mut section = Section::new("signals", "Category details");

    let mut perf = Table::new(vec![
        "Scenario", "Requests", "Failed", "Error rate", "Avg ms", "p90 ms", "p95 ms", "p99 ms",
    ]);
    let ms = |v: Option<f64>| v.map_or_else(|| Cell::text("n/a"), |v| Cell::Text(format!("{v:.1}")));
    for sample in &signals.performance {
        let m = &sample.metrics;
        perf.push(Row::new(vec![
            Cell::text(&m.scenario),
            Cell::Count(m.total_requests),
            Cell::Count(m.failed_requests),
            Cell::Percent(Some(m.error_rate_percent)),
            ms(m.average_ms),
            ms(m.p90_ms),
            ms(m.p95_ms),
            ms(m.p99_ms),
        ]));
    }
    section = section
        .with(Block::Paragraph("Performance".to_string()))
        .with(Block::Table(perf));

    let mut severity = Table::new(vec!["Source", "Critical", "Serious", "Moderate", "Minor"]);
    if let Some(a11y) = &signals.accessibility {
        let v = &a11y.violations;
        severity.push(Row::new(vec![
            Cell::text(format!("accessibility ({} scans)", a11y.scans)),
            Cell::Count(v.critical),
            Cell::Count(v.serious),
            Cell::Count(v.moderate),
            Cell::Count(v.minor),
        ]));
    }
    if let Some(sec) = &signals.security {
        let f = &sec.findings;
        severity.push(Row::new(vec![
            Cell::text(format!("security ({} checks, {} vulnerable)", sec.checks, sec.vulnerable)),
            Cell::Count(f.critical),
            Cell::Count(f.serious),
            Cell::Count(f.moderate),
            Cell::Count(f.minor),
        ]));
    }
    section = section
        .with(Block::Paragraph("Findings by severity".to_string()))
        .with(Block::Table(severity));

    let mut coverage = Table::new(vec!["Source", "Statements", "Branches", "Functions", "Lines"]);
    for sample in &signals.coverage {
        let s = &sample.summary;
        coverage.push(Row::new(vec![
            Cell::text(&sample.source),
            Cell::Percent(Some(s.statements.pct)),
            Cell::Percent(Some(s.branches.pct)),
            Cell::Percent(Some(s.functions.pct)),
            Cell::Percent(Some(s.lines.pct)),
        ]));
    }
    section = section
        .with(Block::Paragraph("Coverage".to_string()))
        .with(Block::Table(coverage));

    let mut extras = Vec::new();
    if let Some(api) = &signals.api {
        extras.push(format!(
            "API: {}/{} assertions failed, {}/{} requests failed",
            api.assertions_failed, api.assertions_total, api.requests_failed, api.requests_total
        ));
    }
    if let Some(lint) = &signals.lint {
        extras.push(format!(
            "Lint: {} error(s), {} warning(s) in {} file(s)",
            lint.error_count, lint.warning_count, lint.files
        ));
    }
    if !extras.is_empty() {
        section = section.with(Block::List(extras));
    }
    section
}

fn failures(input: &ReportInput<'_>, page_dir: &Path) -> Section {
    let mut table = Table::new(vec![
        "Suite", "Case", "Environment", "Browser", "Attempts", "Media", "Source",
    ])
    .filterable();
    for failure in &input.snapshot.failures {
        let media = failure
            .media
            .iter()
            .filter_map(|i| input.media.get(*i))
            .map(|item| item.path.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let media_cell = match failure.media.first().and_then(|i| input.media.get(*i)) {
            Some(first) if failure.media.len() == 1 => Cell::Link {
                href: media_href(input, page_dir, &first.path),
                label: first.path.clone(),
            },
            _ => Cell::Text(media),
        };
        table.push(
            Row::new(vec![
                Cell::text(&failure.suite),
                Cell::text(&failure.case),
                Cell::text(failure.environment.as_str()),
                Cell::text(failure.browser.as_str()),
                Cell::Count(u64::from(failure.attempts)),
                media_cell,
                Cell::text(&failure.source),
            ])
            .tag("env", failure.environment.as_str())
            .tag("browser", failure.browser.as_str()),
        );
    }
    Section::new("failures", "Failed tests").with(Block::Table(table))
}

fn media_href(input: &ReportInput<'_>, page_dir: &Path, path: &str) -> String {
    relative_href(page_dir, &input.results_root.join(path))
}

fn media(input: &ReportInput<'_>, page_dir: &Path) -> Section {
    let mut section = Section::new("media", "Media");
    for (kind, title) in [
        (MediaKind::Screenshot, "Screenshots"),
        (MediaKind::Video, "Videos"),
        (MediaKind::Trace, "Traces"),
        (MediaKind::Attachment, "Attachments"),
    ] {
        let items: Vec<Cell> = input
            .media
            .of_kind(kind)
            .map(|item| Cell::Link {
                href: media_href(input, page_dir, &item.path),
                label: item.path.clone(),
            })
            .collect();
        section = section
            .with(Block::Paragraph(format!("{title} ({})", items.len())))
            .with(Block::Gallery(items));
    }
    section
}

fn history(input: &ReportInput<'_>) -> Section {
    let mut table = Table::new(vec![
        "Timestamp", "Total", "Passed", "Failed", "Skipped", "Pass rate", "Quality", "Health",
    ]);
    for entry in input.history.iter().rev() {
        let health = entry.metadata.overall_health;
        table.push(Row::new(vec![
            Cell::text(format_timestamp(&entry.timestamp)),
            Cell::Count(entry.total),
            Cell::Count(entry.passed),
            Cell::Count(entry.failed),
            Cell::Count(entry.skipped),
            Cell::Percent(Some(entry.pass_rate)),
            entry
                .metadata
                .quality_score
                .map_or_else(|| Cell::text("n/a"), |q| Cell::Text(format!("{q:.1}"))),
            health.map_or_else(
                || Cell::text(""),
                |h| Cell::badge(health_class(h), h.as_str()),
            ),
        ]));
    }
    let t = input.trend;
    let summary = match t.delta {
        Some(delta) => format!(
            "Trend: {} ({delta:+.1} points, last {} vs previous {} runs)",
            t.direction, t.recent_count, t.previous_count
        ),
        None => format!("Trend: {}", t.direction),
    };
    Section::new("history", "History")
        .with(Block::Paragraph(summary))
        .with(Block::Table(table))
}

fn diagnostics(input: &ReportInput<'_>) -> Section {
    let mut table = Table::new(vec!["Kind", "Path", "Message"]);
    for d in &input.snapshot.errors {
        table.push(Row::new(vec![
            Cell::text(d.kind.as_str()),
            Cell::text(d.path.clone().unwrap_or_default()),
            Cell::text(&d.message),
        ]));
    }
    Section::new("diagnostics", "Diagnostics").with(Block::Table(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Browser, CaseResult, CaseStatus, Environment, MediaItem, MediaTable, Origin, SuiteResult,
    };
    use crate::report::test_support::Fixture;

    fn fixture() -> Fixture {
        let mut suite = SuiteResult::new("checkout");
        suite.push_case(CaseResult::new("pays", Some(CaseStatus::Passed), 10));
        suite.push_case(CaseResult::new("refunds <fast>", Some(CaseStatus::Failed), 20));
        Fixture::new(vec![(suite, Origin::Browser)])
    }

    #[test]
    fn dashboard_has_every_breakdown_and_filters() {
        let fixture = fixture();
        let html = dashboard(&fixture.input(), Path::new("reports/dashboard"));
        for id in [
            "overview", "environments", "browsers", "suites", "categories", "failures", "media",
            "diagnostics",
        ] {
            assert!(html.contains(&format!("<section id=\"{id}\">")), "missing {id}");
        }
        assert!(html.contains("id=\"filter-env\""));
        assert!(html.contains("data-env=\"staging\""));
        assert!(html.contains("refunds &lt;fast&gt;"));
    }

    #[test]
    fn media_links_are_percent_encoded() {
        let mut fixture = fixture();
        fixture.media = MediaTable::from_items(vec![MediaItem {
            path: "staging/run #2/shot 1.png".to_string(),
            kind: MediaKind::Screenshot,
            environment: Environment::Staging,
            browser: Browser::Chromium,
        }]);
        let html = dashboard(&fixture.input(), Path::new("reports/dashboard"));
        assert!(
            html.contains("href=\"../../test-results/staging/run%20%232/shot%201.png\""),
            "media link not encoded"
        );
        assert!(html.contains("staging/run #2/shot 1.png"));
    }

    #[test]
    fn comprehensive_lists_gates_and_history() {
        let fixture = fixture();
        let html = comprehensive(&fixture.input(), Path::new("reports/comprehensive"));
        assert!(html.contains("<section id=\"gates\">"));
        assert!(html.contains("<section id=\"history\">"));
        assert!(html.contains("Trend: insufficient_data"));
        assert!(html.contains("pass_rate"));
    }

    #[test]
    fn simple_report_lists_suite_sources() {
        let fixture = fixture();
        let html = simple(&fixture.input());
        assert!(html.contains("staging/chromium/0-results.json"));
        assert!(!html.contains("<script>"));
    }
}
