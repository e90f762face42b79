//! Flat media table. Suites and cases refer to media by index, never by copy.

use super::{Browser, Environment};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Screenshot,
    Video,
    Trace,
    Attachment,
}

impl MediaKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::Video => "video",
            Self::Trace => "trace",
            Self::Attachment => "attachment",
        }
    }

    /// Classify a file by extension. `None` for non-media files.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" => Some(Self::Screenshot),
            "webm" | "mp4" => Some(Self::Video),
            "zip" => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                if name.contains("trace") {
                    Some(Self::Trace)
                } else {
                    Some(Self::Attachment)
                }
            }
            _ => None,
        }
    }

    /// Classify a file a test result explicitly attached.
    #[must_use]
    pub fn for_attachment(path: &Path) -> Self {
        Self::from_path(path).unwrap_or(Self::Attachment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Relative to the results root, `/`-separated.
    pub path: String,
    pub kind: MediaKind,
    pub environment: Environment,
    pub browser: Browser,
}

/// Media sorted and deduplicated by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MediaTable {
    items: Vec<MediaItem>,
}

impl MediaTable {
    #[must_use]
    pub fn from_items(mut items: Vec<MediaItem>) -> Self {
        items.sort_by(|a, b| a.path.cmp(&b.path));
        items.dedup_by(|a, b| a.path == b.path);
        Self { items }
    }

    #[must_use]
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.items
            .binary_search_by(|item| item.path.as_str().cmp(path))
            .ok()
    }

    #[must_use]
    pub fn into_items(self) -> Vec<MediaItem> {
        self.items
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: MediaKind) -> impl Iterator<Item = &MediaItem> {
        self.items.iter().filter(move |item| item.kind == kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, kind: MediaKind) -> MediaItem {
        MediaItem {
            path: path.to_string(),
            kind,
            environment: Environment::Unknown,
            browser: Browser::Unknown,
        }
    }

    #[test]
    fn kinds_by_extension() {
        assert_eq!(
            MediaKind::from_path(Path::new("a/shot.PNG")),
            Some(MediaKind::Screenshot)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("a/video.webm")),
            Some(MediaKind::Video)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("a/trace.zip")),
            Some(MediaKind::Trace)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("a/bundle.zip")),
            Some(MediaKind::Attachment)
        );
        assert_eq!(MediaKind::from_path(Path::new("a/results.json")), None);
        assert_eq!(
            MediaKind::for_attachment(Path::new("a/error-context.md")),
            MediaKind::Attachment
        );
    }

    #[test]
    fn table_is_sorted_and_deduplicated() {
        let table = MediaTable::from_items(vec![
            item("b.png", MediaKind::Screenshot),
            item("a.webm", MediaKind::Video),
            item("b.png", MediaKind::Screenshot),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.index_of("a.webm"), Some(0));
        assert_eq!(table.index_of("b.png"), Some(1));
        assert_eq!(table.index_of("c.png"), None);
        assert_eq!(table.of_kind(MediaKind::Video).count(), 1);
    }
}
