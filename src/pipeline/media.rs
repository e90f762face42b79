//! Case attachments to media table indices.

use crate::model::{Artifact, Ingested, Labels, MediaItem, MediaKind, MediaTable};
use crate::util::relative_slash_path;
use std::path::{Component, Path};

/// Build the media table from discovered files plus case attachments, and
/// point every case at its media by index.
///
/// Attachments are rewritten to `/`-separated paths relative to `root` when
/// they resolve under it; anything else is kept as written. `ingested` must
/// be parallel to `artifacts`.
pub fn link_media(
    root: &Path,
    artifacts: &[Artifact],
    ingested: &mut [(Ingested, Labels)],
    discovered: MediaTable,
) -> MediaTable {
    let mut items = discovered.into_items();

    for (item, labels) in ingested.iter_mut() {
        let Ingested::Suite(suite) = item else {
            continue;
        };
        let artifact_dir = artifacts
            .iter()
            .find(|a| a.relative == labels.source)
            .and_then(|a| a.path.parent().map(Path::to_path_buf));
        suite.for_each_case_mut(&mut |case| {
            for raw in &mut case.attachments {
                let normalized = normalize(root, artifact_dir.as_deref(), raw);
                items.push(MediaItem {
                    kind: MediaKind::for_attachment(Path::new(&normalized)),
                    environment: labels.environment,
                    browser: case.browser.unwrap_or(labels.browser),
                    path: normalized.clone(),
                });
                *raw = normalized;
            }
        });
    }

    let table = MediaTable::from_items(items);
    for (item, _) in ingested.iter_mut() {
        if let Ingested::Suite(suite) = item {
            suite.for_each_case_mut(&mut |case| {
                let mut indices: Vec<usize> = case
                    .attachments
                    .iter()
                    .filter_map(|path| table.index_of(path))
                    .collect();
                indices.sort_unstable();
                indices.dedup();
                case.media = indices;
            });
        }
    }
    table
}

fn normalize(root: &Path, artifact_dir: Option<&Path>, raw: &str) -> String {
    let path = Path::new(raw);
    let resolved = if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        artifact_dir.map(|dir| dir.join(path))
    };
    resolved
        .filter(|p| !p.components().any(|c| c == Component::ParentDir))
        .filter(|p| p.starts_with(root) && p.exists())
        .map_or_else(|| raw.replace('\\', "/"), |p| relative_slash_path(root, &p))
}
