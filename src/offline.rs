//! Offline-time accounting
//!
//! Intersects recorded outages with a report window. An outage still open at
//! capture time runs until `now` but never past the window's end.

use crate::types::OfflineInterval;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// Remark timestamps, in the report zone
const REMARK_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Clamped intersection of outages with one report window
#[derive(Debug, Clone, Copy)]
pub struct OfflineOverlapCalculator {
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    now: DateTime<Utc>,
}

impl OfflineOverlapCalculator {
    pub fn new(window_start: DateTime<Utc>, window_end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            window_start,
            window_end,
            now,
        }
    }

    /// Instant the interval stops counting
    ///
    /// A recovered interval without an end time is treated as ongoing.
    fn effective_end(&self, interval: &OfflineInterval) -> DateTime<Utc> {
        match (interval.recovered, interval.end) {
            (true, Some(end)) => end.min(self.window_end),
            _ => self.now.min(self.window_end),
        }
    }

    /// Overlap of one interval with the window, never negative
    pub fn overlap(&self, interval: &OfflineInterval) -> Duration {
        let start = interval.start.max(self.window_start);
        let end = self.effective_end(interval);
        if end > start {
            end - start
        } else {
            Duration::zero()
        }
    }

    /// Sum of per-interval overlaps
    ///
    /// Intervals are assumed not to overlap each other; nothing is merged.
    pub fn total_overlap(&self, intervals: &[OfflineInterval]) -> Duration {
        intervals
            .iter()
            .map(|interval| self.overlap(interval))
            .fold(Duration::zero(), |acc, d| acc + d)
    }

    /// Total overlap in fractional hours
    pub fn total_hours(&self, intervals: &[OfflineInterval]) -> f64 {
        self.total_overlap(intervals).num_seconds() as f64 / 3600.0
    }
}

/// Human-readable line describing one outage
pub fn remark(interval: &OfflineInterval, tz: &Tz) -> String {
    let start = interval.start.with_timezone(tz).format(REMARK_FORMAT);
    match (interval.recovered, interval.end) {
        (true, Some(end)) => format!(
            "{start} offline until {}",
            end.with_timezone(tz).format(REMARK_FORMAT)
        ),
        _ => format!("{start} offline, not recovered"),
    }
}
