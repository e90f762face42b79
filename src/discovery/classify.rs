//! Path classification: environment and browser tags, suite naming.
//!
//! Everything here is a pure function of a `/`-separated path relative to
//! the results root. No I/O.

use crate::model::{Browser, Environment, Origin};

/// File stems that say nothing about the suite they hold.
const GENERIC_STEMS: [&str; 5] = ["results", "report", "index", "test-results", "test-report"];

/// Split a relative path into its directory segments and file name.
fn split(relative: &str) -> (Vec<&str>, &str) {
    let mut parts: Vec<&str> = relative.split('/').filter(|p| !p.is_empty()).collect();
    let file = parts.pop().unwrap_or_default();
    (parts, file)
}

fn stem(file: &str) -> &str {
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}

/// Derive `(environment, browser)` for a relative path.
///
/// Environment comes from directory segments, closest to the leaf.
/// Browser comes from directory segments then the file stem, closest to
/// the root. Layout `<env>/<browser>/...` classifies both.
#[must_use]
pub fn classify(relative: &str) -> (Environment, Browser) {
    let (dirs, file) = split(relative);

    let environment = dirs
        .iter()
        .rev()
        .find_map(|segment| Environment::from_segment(segment))
        .unwrap_or_default();

    let browser = dirs
        .iter()
        .copied()
        .chain(std::iter::once(stem(file)))
        .find_map(Browser::detect)
        .unwrap_or_default();

    (environment, browser)
}

/// Name for a suite whose artifact carries none.
///
/// The file stem minus a `-results`/`-report` suffix, unless generic;
/// otherwise the nearest directory that is not an environment or browser
/// tag; otherwise the origin's category.
#[must_use]
pub fn suite_name(relative: &str, origin: Origin) -> String {
    let (dirs, file) = split(relative);
    let stem = stem(file).to_ascii_lowercase();

    if !GENERIC_STEMS.contains(&stem.as_str()) {
        let trimmed = stem
            .strip_suffix("-results")
            .or_else(|| stem.strip_suffix("-report"))
            .unwrap_or(&stem);
        if !trimmed.is_empty() && !GENERIC_STEMS.contains(&trimmed) {
            return trimmed.to_string();
        }
    }

    dirs.iter()
        .rev()
        .find(|segment| {
            Environment::from_segment(segment).is_none() && Browser::detect(segment).is_none()
        })
        .map_or_else(
            || {
                origin
                    .category()
                    .map_or_else(|| origin.as_str().to_string(), |c| c.as_str().to_string())
            },
            |segment| (*segment).to_string(),
        )
}

/// Lowercased directory segments, for adapter directory hints.
#[must_use]
pub fn directory_segments(relative: &str) -> Vec<String> {
    split(relative)
        .0
        .into_iter()
        .map(str::to_ascii_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_then_browser_layout() {
        assert_eq!(
            classify("staging/firefox/results.json"),
            (Environment::Staging, Browser::Firefox)
        );
    }

    #[test]
    fn unknown_when_nothing_matches() {
        assert_eq!(
            classify("api/collection.json"),
            (Environment::Unknown, Browser::Unknown)
        );
    }

    #[test]
    fn environment_prefers_leaf_browser_prefers_root() {
        let (env, browser) = classify("production/chromium/staging/webkit/results.json");
        assert_eq!(env, Environment::Staging);
        assert_eq!(browser, Browser::Chromium);
    }

    #[test]
    fn browser_from_file_stem() {
        assert_eq!(
            classify("dev/webkit-results.json"),
            (Environment::Development, Browser::Webkit)
        );
    }

    #[test]
    fn file_stem_never_sets_environment() {
        assert_eq!(classify("prod-results.json").0, Environment::Unknown);
    }

    #[test]
    fn suite_name_from_stem() {
        assert_eq!(suite_name("api/smoke-results.json", Origin::Http), "smoke");
        assert_eq!(suite_name("load/checkout.json", Origin::Load), "checkout");
    }

    #[test]
    fn suite_name_falls_back_to_directory() {
        assert_eq!(
            suite_name("e2e/staging/firefox/results.json", Origin::Browser),
            "e2e"
        );
    }

    #[test]
    fn suite_name_falls_back_to_category() {
        assert_eq!(
            suite_name("staging/firefox/results.json", Origin::Browser),
            "ui"
        );
        assert_eq!(suite_name("test-results.json", Origin::Lint), "lint");
    }
}
