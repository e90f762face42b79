// Aggregation and reporting performance benchmarks.
//
// Run with: cargo bench
//
// Performance Targets:
// | Operation            | Target    | Description                         |
// |----------------------|-----------|-------------------------------------|
// | Aggregate (1k)       | < 5ms     | Fold 1000 labeled suites            |
// | Aggregate (10k)      | < 50ms    | Fold 10000 labeled suites           |
// | Derive metrics       | < 1ms     | Gates and scores over a 10k snapshot|
// | Digest (10k)         | < 50ms    | Canonical digest of a 10k snapshot  |
// | JUnit (10k)          | < 50ms    | Render 10k suites as JUnit XML      |
// | Pipeline (200 files) | < 500ms   | Locate, parse, aggregate, emit      |

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use qa_pulse::aggregate::{AggregateSnapshot, aggregate};
use qa_pulse::config::{QaConfig, RuntimeEnv};
use qa_pulse::model::{Browser, Environment, Labels, Origin, SuiteResult, Totals};
use qa_pulse::util::FixedClock;
use std::fs;
use std::hint::black_box;
use std::sync::Once;
use std::time::Instant;
use tempfile::TempDir;
use tracing::info;

/// A labeled suite spread over environments, browsers and origins.
fn create_suite(i: usize) -> (SuiteResult, Labels) {
    let failed = u64::from(i % 7 == 0);
    let suite = SuiteResult::leaf(
        format!("suite-{}", i % 97),
        Totals::new(20 - failed, failed, (i % 3) as u64, 1_000 + i as u64),
    );
    let labels = Labels {
        environment: Environment::ALL[i % Environment::ALL.len()],
        browser: Browser::ALL[i % Browser::ALL.len()],
        origin: if i % 4 == 0 { Origin::Http } else { Origin::Browser },
        source: format!("run-{i:05}/results.json"),
    };
    (suite, labels)
}

fn create_suites(count: usize) -> Vec<(SuiteResult, Labels)> {
    (0..count).map(create_suite).collect()
}

fn fold(inputs: &[(SuiteResult, Labels)]) -> AggregateSnapshot {
    aggregate(inputs.iter().map(|(s, l)| (s, l)))
}

fn init_bench_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = qa_pulse::logging::init_logging(0, true, qa_pulse::logging::LogFormat::Pretty);
    });
}

fn log_group_start(name: &str) {
    info!("benchmark_group_start: name={name}");
}

fn log_group_end(name: &str) {
    info!("benchmark_group_end: name={name}");
}

fn log_bench_start(name: &str) -> Instant {
    info!("benchmark_start: {name}");
    Instant::now()
}

fn log_bench_end(name: &str, started_at: Instant) {
    info!("benchmark_end: {name} duration={:?}", started_at.elapsed());
}

/// Lay out `count` browser result files under `staging/<browser>/`.
fn setup_results(count: usize) -> (TempDir, QaConfig) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let results = dir.path().join("test-results");
    for i in 0..count {
        let browser = ["chrome", "firefox", "webkit"][i % 3];
        let path = results
            .join("staging")
            .join(browser)
            .join(format!("run-{i:04}-results.json"));
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create dir");
        let body = format!(
            r#"{{"stats":{{"total":10,"passed":{},"failed":{},"skipped":0,"duration":{}}}}}"#,
            10 - i % 2,
            i % 2,
            500 + i
        );
        fs::write(&path, body).expect("Failed to write result");
    }
    let config = QaConfig {
        results_root: results,
        report_root: dir.path().join("reports"),
        status_file: dir.path().join("test-status.json"),
        ..QaConfig::default()
    };
    (dir, config)
}

// =============================================================================
// In-memory Benchmarks
// =============================================================================

fn bench_aggregate(c: &mut Criterion) {
    init_bench_logging();
    let group_name = "aggregate/fold";
    log_group_start(group_name);
    let mut group = c.benchmark_group(group_name);

    for size in [1_000, 10_000] {
        let inputs = create_suites(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &inputs, |b, inputs| {
            let bench_name = format!("aggregate/fold/size={size}");
            let bench_start = log_bench_start(&bench_name);
            b.iter(|| fold(black_box(inputs)));
            log_bench_end(&bench_name, bench_start);
        });
    }

    group.finish();
    log_group_end(group_name);
}

fn bench_derive(c: &mut Criterion) {
    init_bench_logging();
    let group_name = "aggregate/derive";
    log_group_start(group_name);
    let snapshot = fold(&create_suites(10_000));
    let config = QaConfig::default();

    c.bench_function(group_name, |b| {
        b.iter(|| qa_pulse::metrics::derive(black_box(&snapshot), &config));
    });
    log_group_end(group_name);
}

fn bench_render(c: &mut Criterion) {
    init_bench_logging();
    let group_name = "report/render";
    log_group_start(group_name);
    let snapshot = fold(&create_suites(10_000));
    let mut group = c.benchmark_group(group_name);

    group.bench_function("digest", |b| {
        b.iter(|| qa_pulse::report::snapshot_digest(black_box(&snapshot)).unwrap());
    });
    group.bench_function("junit", |b| {
        b.iter(|| qa_pulse::report::junit::to_junit(black_box(&snapshot)));
    });

    group.finish();
    log_group_end(group_name);
}

// =============================================================================
// End-to-end Benchmarks
// =============================================================================

fn bench_pipeline(c: &mut Criterion) {
    init_bench_logging();
    let group_name = "pipeline/run";
    log_group_start(group_name);
    let mut group = c.benchmark_group(group_name);
    group.sample_size(10);
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap());

    for size in [20, 200] {
        let (_dir, config) = setup_results(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &config, |b, config| {
            let bench_name = format!("pipeline/run/files={size}");
            let bench_start = log_bench_start(&bench_name);
            b.iter(|| {
                qa_pulse::pipeline::run(black_box(config), &clock, RuntimeEnv::default()).unwrap()
            });
            log_bench_end(&bench_name, bench_start);
        });
    }

    group.finish();
    log_group_end(group_name);
}

criterion_group!(memory_benches, bench_aggregate, bench_derive, bench_render);
criterion_group!(pipeline_benches, bench_pipeline);
criterion_main!(memory_benches, pipeline_benches);
