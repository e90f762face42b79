//! Lint reports: an array of per-file `{ errorCount, warningCount }`.

use super::{Adapter, AdapterOutput, ParseFailure, int_at, parse_json};
use crate::discovery::Candidate;
use crate::model::{Artifact, Ingested, LintSummary, Origin};

const FILE_NAMES: [&str; 5] = [
    "eslint.json",
    "eslint-report.json",
    "eslint-results.json",
    "lint-report.json",
    "lint-results.json",
];

pub struct LintAdapter;

impl Adapter for LintAdapter {
    fn origin(&self) -> Origin {
        Origin::Lint
    }

    fn detect(&self, candidate: &Candidate) -> bool {
        FILE_NAMES.contains(&candidate.file_name.as_str())
            || (candidate.is_json() && candidate.under(&["lint", "eslint"]))
    }

    fn parse(&self, artifact: &Artifact, bytes: &[u8]) -> Result<AdapterOutput, ParseFailure> {
        let json = parse_json(artifact, bytes)?;
        let files = json
            .as_array()
            .ok_or_else(|| ParseFailure::unrecognized(artifact))?;

        let mut summary = LintSummary::default();
        for file in files {
            if file.get("errorCount").is_none() && file.get("warningCount").is_none() {
                return Err(ParseFailure::unrecognized(artifact));
            }
            let count = |key: &str| {
                int_at(file, &[key])
                    .and_then(|v| u64::try_from(v).ok())
                    .unwrap_or(0)
            };
            summary.absorb(&LintSummary {
                files: 1,
                error_count: count("errorCount"),
                warning_count: count("warningCount"),
            });
        }
        Ok(AdapterOutput::new(Ingested::Lint(summary)))
    }
}
