//! Trend direction from the pass rates of recent history.

use super::HistoryEntry;
use crate::model::round1;
use serde::Serialize;
use std::fmt;

/// Mean pass-rate change (in points) needed to call a trend.
const TREND_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::Stable => "stable",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub direction: TrendDirection,
    pub delta: Option<f64>,
    pub recent_mean: Option<f64>,
    pub previous_mean: Option<f64>,
    pub recent_count: usize,
    pub previous_count: usize,
}

impl Trend {
    const fn insufficient() -> Self {
        Self {
            direction: TrendDirection::InsufficientData,
            delta: None,
            recent_mean: None,
            previous_mean: None,
            recent_count: 0,
            previous_count: 0,
        }
    }
}

/// Compare the last `min(window, ceil(n/2))` entries against up to `window`
/// entries immediately before them.
#[must_use]
pub fn trend(entries: &[HistoryEntry], window: usize) -> Trend {
    let n = entries.len();
    if n < 2 {
        return Trend::insufficient();
    }
    let window = window.max(1);
    let recent_len = window.min(n.div_ceil(2));
    let split = n - recent_len;
    let previous_start = split.saturating_sub(window);

    let recent = &entries[split..];
    let previous = &entries[previous_start..split];
    let recent_mean = mean(recent);
    let previous_mean = mean(previous);
    let delta = round1(recent_mean - previous_mean);

    let direction = if delta > TREND_THRESHOLD {
        TrendDirection::Improving
    } else if delta < -TREND_THRESHOLD {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    Trend {
        direction,
        delta: Some(delta),
        recent_mean: Some(round1(recent_mean)),
        previous_mean: Some(round1(previous_mean)),
        recent_count: recent.len(),
        previous_count: previous.len(),
    }
}

fn mean(entries: &[HistoryEntry]) -> f64 {
    entries.iter().map(|e| e.pass_rate).sum::<f64>() / entries.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::EntryMetadata;
    use chrono::{TimeZone, Utc};

    fn series(rates: &[f64]) -> Vec<HistoryEntry> {
        rates
            .iter()
            .enumerate()
            .map(|(i, rate)| HistoryEntry {
                timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
                total: 100,
                passed: *rate as u64,
                failed: 100 - *rate as u64,
                skipped: 0,
                pass_rate: *rate,
                metadata: EntryMetadata::default(),
            })
            .collect()
    }

    #[test]
    fn fewer_than_two_entries_is_insufficient() {
        assert_eq!(trend(&[], 5).direction, TrendDirection::InsufficientData);
        assert_eq!(
            trend(&series(&[90.0]), 5).direction,
            TrendDirection::InsufficientData
        );
    }

    #[test]
    fn improving_by_six_points() {
        let entries = series(&[91.0, 91.0, 91.0, 91.0, 91.0, 97.0, 97.0, 97.0, 97.0, 97.0]);
        let t = trend(&entries, 5);
        assert_eq!(t.direction, TrendDirection::Improving);
        assert_eq!(t.delta, Some(6.0));
        assert_eq!(t.recent_count, 5);
        assert_eq!(t.previous_count, 5);
    }

    #[test]
    fn short_history_splits_in_half() {
        let t = trend(&series(&[100.0, 80.0, 70.0]), 5);
        // recent = last 2, previous = first 1
        assert_eq!(t.recent_count, 2);
        assert_eq!(t.previous_count, 1);
        assert_eq!(t.delta, Some(-25.0));
        assert_eq!(t.direction, TrendDirection::Declining);
    }

    #[test]
    fn exactly_five_points_is_stable() {
        let t = trend(&series(&[90.0, 95.0]), 5);
        assert_eq!(t.delta, Some(5.0));
        assert_eq!(t.direction, TrendDirection::Stable);
    }

    #[test]
    fn only_the_windows_count() {
        let mut rates = vec![0.0; 20];
        rates.extend([90.0; 4]);
        rates.extend([90.0; 4]);
        let t = trend(&series(&rates), 4);
        assert_eq!(t.previous_count, 4);
        assert_eq!(t.direction, TrendDirection::Stable);
    }
}
