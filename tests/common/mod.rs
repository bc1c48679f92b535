//! Common test utilities and helpers for tankrecon tests
//!
//! Builders for raw device rows and engine setup shared by the integration
//! tests.

use chrono::NaiveDate;
use std::path::Path;
use tankrecon::{
    engine::{EngineConfig, Reconciler},
    period::DateRange,
    timezone::TimezoneConfig,
    types::{Granularity, RawOfflineInterval, RawReading},
};

/// Builder for creating test RawReading rows
#[derive(Debug, Clone)]
pub struct ReadingBuilder {
    timestamp: Option<String>,
    dispensed_volume: Option<f64>,
    remaining_level: Option<f64>,
}

impl ReadingBuilder {
    /// Create a new builder at 2024-01-01 08:00:00 with no values
    pub fn new() -> Self {
        Self {
            timestamp: Some("2024-01-01 08:00:00".to_string()),
            dispensed_volume: None,
            remaining_level: None,
        }
    }

    pub fn at(mut self, ts: &str) -> Self {
        self.timestamp = Some(ts.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = None;
        self
    }

    pub fn dispensed(mut self, volume: f64) -> Self {
        self.dispensed_volume = Some(volume);
        self
    }

    pub fn level(mut self, level: f64) -> Self {
        self.remaining_level = Some(level);
        self
    }

    pub fn build(self) -> RawReading {
        RawReading {
            timestamp: self.timestamp,
            dispensed_volume: self.dispensed_volume,
            remaining_level: self.remaining_level,
        }
    }
}

impl Default for ReadingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a fully populated row
pub fn reading(ts: &str, dispensed: f64, level: f64) -> RawReading {
    ReadingBuilder::new()
        .at(ts)
        .dispensed(dispensed)
        .level(level)
        .build()
}

/// Offline record for `device`
#[allow(dead_code)]
pub fn offline(device: &str, start: &str, end: Option<&str>) -> RawOfflineInterval {
    RawOfflineInterval {
        device_code: device.to_string(),
        start: start.to_string(),
        end: end.map(str::to_string),
        recovered: None,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange::new(start, end).unwrap()
}

/// Reconciler working in UTC
pub fn reconciler(granularity: Granularity) -> Reconciler {
    Reconciler::new(EngineConfig::new(
        TimezoneConfig::fixed(chrono_tz::UTC),
        granularity,
    ))
    .unwrap()
}

/// Write `lines` as a JSONL file, creating parent directories
#[allow(dead_code)]
pub fn write_jsonl(path: &Path, lines: &[serde_json::Value]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let body: Vec<String> = lines.iter().map(|v| v.to_string()).collect();
    std::fs::write(path, body.join("\n")).unwrap();
}
