use assert_cmd::Command;
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

/// Frozen "now" used by every workspace run unless a test overrides it.
pub const FIXED_CLOCK: &str = "2025-04-01T08:00:00Z";

#[derive(Debug)]
pub struct QapRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl QapRun {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn json(&self) -> Value {
        let payload = extract_json_payload(&self.stdout);
        serde_json::from_str(&payload)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", self.stdout))
    }
}

/// A temp directory laid out like a project: `test-results/`, `reports/`
/// and `test-status.json` all resolve relative to `root`.
pub struct QapWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl QapWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    pub fn results(&self) -> PathBuf {
        self.root.join("test-results")
    }

    pub fn reports(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn status_file(&self) -> PathBuf {
        self.root.join("test-status.json")
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn write_json(&self, relative: &str, value: &Value) -> PathBuf {
        self.write(relative, &serde_json::to_string_pretty(value).expect("json"))
    }

    pub fn read_json(&self, relative: &str) -> Value {
        let path = self.root.join(relative);
        let bytes = fs::read(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
        serde_json::from_slice(&bytes).expect("valid json")
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }
}

pub fn run_qap<I, S>(workspace: &QapWorkspace, args: I, label: &str) -> QapRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_qap_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_qap_with_env<I, S, E, K, V>(
    workspace: &QapWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> QapRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("qap"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    for var in ["BASE_URL", "API_BASE_URL", "TEST_ENV", "CI"] {
        cmd.env_remove(var);
    }
    for var in [
        "QAP_RESULTS_ROOT",
        "QAP_REPORT_ROOT",
        "QAP_STATUS_FILE",
        "QAP_HISTORY_MAX_LEN",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("QAP_CLOCK", FIXED_CLOCK);
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "qa_pulse=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run qap");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let timestamp = SystemTime::now();
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        timestamp,
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    QapRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

pub fn extract_json_payload(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    stdout.trim().to_string()
}

/// The structured error `handle_error` prints on stderr for non-TTY runs.
pub fn error_code(run: &QapRun) -> Option<String> {
    let payload = extract_json_payload(&run.stderr);
    let value: Value = serde_json::from_str(&payload).ok()?;
    value["error"]["code"].as_str().map(str::to_string)
}

pub fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
