//! Shared utilities for `qa_pulse`.
//!
//! Common functionality used across modules:
//! - Clock abstraction and timestamp formatting
//! - Content digests (SHA256)
//! - Atomic file and directory replacement
//! - Progress indicators (for ingestion)

mod hash;
pub mod progress;
pub mod time;

pub use hash::{canonical_digest, sha256_hex};
pub use time::{Clock, FixedClock, SystemClock, format_duration_ms, format_timestamp};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Sibling path used while a file or directory is being built.
fn staging_path(target: &Path, tag: &str) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "out".into(), |n| n.to_string_lossy().into_owned());
    target.with_file_name(format!(".{name}.{tag}-{}", std::process::id()))
}

/// Write `contents` to `path` via a sibling temp file and rename.
///
/// Readers never observe a partially written file.
///
/// # Errors
///
/// Returns an error if the temp file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = staging_path(path, "tmp");
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Rebuild directory `dir` by populating a sibling temp directory and
/// swapping it in. The old directory is removed only after `build` succeeds.
///
/// # Errors
///
/// Returns an error from `build`, or if the swap fails.
pub fn replace_dir_atomic<F>(dir: &Path, build: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let staging = staging_path(dir, "staging");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;
    if let Err(err) = build(&staging) {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }

    if dir.exists() {
        let retired = staging_path(dir, "old");
        fs::rename(dir, &retired)?;
        fs::rename(&staging, dir)?;
        fs::remove_dir_all(&retired)?;
    } else {
        fs::rename(&staging, dir)?;
    }
    Ok(())
}

/// Render `path` relative to `root` with `/` separators.
#[must_use]
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Absolute, lexically normalized components of `path`.
fn normal_components(path: &Path) -> Vec<String> {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut parts: Vec<String> = Vec::new();
    for component in absolute.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            _ => {}
        }
    }
    parts
}

/// Bytes escaped inside one path segment of an href.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// URL-style relative reference from directory `from_dir` to `target`, with
/// each segment percent-encoded.
#[must_use]
pub fn relative_href(from_dir: &Path, target: &Path) -> String {
    let from = normal_components(from_dir);
    let to = normal_components(target);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string()),
    );
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
