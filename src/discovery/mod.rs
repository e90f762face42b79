//! Artifact Locator.
//!
//! Walks the results root depth-first, in file-name order per directory,
//! and yields what it finds as a lazy sequence of `Found` events:
//! result artifacts (classified by the adapter registry's `detect`),
//! media files, and discovery diagnostics.
//!
//! Symlinks are followed; every directory and file is visited at most once
//! (keyed by device and inode), which also breaks cycles.

mod classify;

pub use classify::{classify, directory_segments, suite_name};

use crate::adapters::Registry;
use crate::model::{Artifact, Diagnostic, MediaItem, MediaKind, MediaTable};
use crate::util::relative_slash_path;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Everything an adapter's `detect` may look at. Built from the path
/// alone (plus a sibling check for HTML reports); contents are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Relative to the results root, `/`-separated.
    pub relative: String,
    /// Lowercased file name.
    pub file_name: String,
    /// Lowercased directory segments below the root.
    pub dirs: Vec<String>,
    /// A JSON file sits in the same directory.
    pub json_sibling: bool,
}

impl Candidate {
    #[must_use]
    pub fn new(relative: &str, json_sibling: bool) -> Self {
        let file_name = relative
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self {
            relative: relative.to_string(),
            file_name,
            dirs: directory_segments(relative),
            json_sibling,
        }
    }

    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, ext)| ext)
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.extension() == Some("json")
    }

    /// Any directory segment contains one of `hints` as a token.
    #[must_use]
    pub fn under(&self, hints: &[&str]) -> bool {
        self.dirs.iter().any(|dir| has_token(dir, hints))
    }

    /// Like `under`, but the file stem counts too.
    #[must_use]
    pub fn mentions(&self, hints: &[&str]) -> bool {
        let stem = self
            .file_name
            .rsplit_once('.')
            .map_or(self.file_name.as_str(), |(stem, _)| stem);
        self.under(hints) || has_token(stem, hints)
    }
}

/// One event from the locator.
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    Artifact(Artifact),
    Media(MediaItem),
    Diagnostic(Diagnostic),
}

/// Lazy, deterministic walk over a results root.
pub struct Locator<'r> {
    root: PathBuf,
    registry: &'r Registry,
    walker: Option<Box<dyn Iterator<Item = walkdir::Result<DirEntry>>>>,
    pending: Option<Found>,
}

impl<'r> Locator<'r> {
    /// Start a walk. A missing root yields one `discovery_error` and nothing else.
    #[must_use]
    pub fn new(root: &Path, registry: &'r Registry) -> Self {
        if !root.is_dir() {
            warn!(root = %root.display(), "Results root missing; nothing to ingest");
            return Self {
                root: root.to_path_buf(),
                registry,
                walker: None,
                pending: Some(Found::Diagnostic(Diagnostic::discovery(
                    Some(root.display().to_string()),
                    "root missing",
                ))),
            };
        }

        let mut visited = VisitedSet::default();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() > 0 && is_hidden(entry) {
                    return false;
                }
                visited.first_visit(entry)
            });

        Self {
            root: root.to_path_buf(),
            registry,
            walker: Some(Box::new(walker)),
            pending: None,
        }
    }

    fn handle_entry(&self, entry: &DirEntry) -> Option<Found> {
        if !entry.file_type().is_file() {
            return None;
        }
        let path = entry.path();
        let relative = relative_slash_path(&self.root, path);
        let (environment, browser) = classify(&relative);

        if let Some(kind) = MediaKind::from_path(path) {
            return Some(Found::Media(MediaItem {
                path: relative,
                kind,
                environment,
                browser,
            }));
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                return Some(Found::Diagnostic(Diagnostic::discovery(
                    Some(relative),
                    format!("cannot stat file: {err}"),
                )));
            }
        };

        let is_html = relative.to_ascii_lowercase().ends_with(".html");
        let json_sibling = is_html && path.parent().is_some_and(has_json_file);
        let candidate = Candidate::new(&relative, json_sibling);
        let Some(origin) = self.registry.detect(&candidate) else {
            debug!(path = %relative, "No adapter claims file");
            return None;
        };

        debug!(path = %relative, origin = origin.as_str(), "Discovered artifact");
        Some(Found::Artifact(Artifact {
            path: path.to_path_buf(),
            relative,
            origin,
            environment,
            browser,
            mtime: metadata.modified().ok().map(DateTime::<Utc>::from),
            size: metadata.len(),
        }))
    }
}

impl Iterator for Locator<'_> {
    type Item = Found;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(found) = self.pending.take() {
            return Some(found);
        }
        loop {
            let next = self.walker.as_mut()?.next();
            match next {
                None => {
                    self.walker = None;
                    return None;
                }
                Some(Ok(entry)) => {
                    if let Some(found) = self.handle_entry(&entry) {
                        return Some(found);
                    }
                }
                Some(Err(err)) => {
                    if err.loop_ancestor().is_some() {
                        debug!(error = %err, "Skipping symlink cycle");
                        continue;
                    }
                    let path = err
                        .path()
                        .map(|p| relative_slash_path(&self.root, p));
                    return Some(Found::Diagnostic(Diagnostic::discovery(
                        path,
                        format!("cannot read entry: {err}"),
                    )));
                }
            }
        }
    }
}

/// Collected result of a full walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    pub artifacts: Vec<Artifact>,
    pub media: MediaTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Drain a locator into artifacts, media and diagnostics.
#[must_use]
pub fn locate(root: &Path, registry: &Registry) -> Discovery {
    let mut artifacts = Vec::new();
    let mut media = Vec::new();
    let mut diagnostics = Vec::new();
    for found in Locator::new(root, registry) {
        match found {
            Found::Artifact(artifact) => artifacts.push(artifact),
            Found::Media(item) => media.push(item),
            Found::Diagnostic(diag) => {
                diag.log();
                diagnostics.push(diag);
            }
        }
    }
    Discovery {
        artifacts,
        media: MediaTable::from_items(media),
        diagnostics,
    }
}

fn has_token(text: &str, hints: &[&str]) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| hints.contains(&token))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn has_json_file(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|entries| {
        entries.filter_map(std::result::Result::ok).any(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
    })
}

/// Remembers `(device, inode)` of everything walked.
#[derive(Default)]
struct VisitedSet {
    #[cfg(unix)]
    seen: HashSet<(u64, u64)>,
    #[cfg(not(unix))]
    seen: HashSet<PathBuf>,
}

impl VisitedSet {
    #[cfg(unix)]
    fn first_visit(&mut self, entry: &DirEntry) -> bool {
        use std::os::unix::fs::MetadataExt;
        match entry.metadata() {
            Ok(metadata) => self.seen.insert((metadata.dev(), metadata.ino())),
            // Let the walker surface the error as a diagnostic.
            Err(_) => true,
        }
    }

    #[cfg(not(unix))]
    fn first_visit(&mut self, entry: &DirEntry) -> bool {
        let key = fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
        self.seen.insert(key)
    }
}
