//! Reading sanitation and period bucketing
//!
//! Raw rows are filtered once into typed [`Reading`]s, then grouped into one
//! bucket per period key of the report. Rows whose timestamp cannot be parsed
//! are dropped and reported as [`SkippedReading`] diagnostics; they never fail
//! the run.

use crate::period::{DateRange, PeriodKeyer};
use crate::period_types::OpeningInventory;
use crate::types::{PeriodKey, RawReading, Reading, parse_timestamp};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why a raw row was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingTimestamp,
    MalformedTimestamp,
    NegativeValue(&'static str),
    NonFiniteValue(&'static str),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTimestamp => write!(f, "missing timestamp"),
            Self::MalformedTimestamp => write!(f, "malformed timestamp"),
            Self::NegativeValue(field) => write!(f, "negative {field}"),
            Self::NonFiniteValue(field) => write!(f, "non-finite {field}"),
        }
    }
}

/// Diagnostic for one dropped raw row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedReading {
    /// Position of the row in the source sequence
    pub index: usize,
    /// The row's timestamp as supplied, if any
    pub timestamp: Option<String>,
    pub reason: SkipReason,
}

/// Convert raw rows into readings sorted by timestamp
///
/// Missing numeric fields become zero. Rows with an absent or unparsable
/// timestamp, or with a negative or non-finite numeric field, are skipped.
/// Sorting is stable, so rows sharing a timestamp keep their source order.
pub fn sanitize(raw: &[RawReading], tz: &Tz) -> (Vec<Reading>, Vec<SkippedReading>) {
    let mut readings = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();

    for (index, row) in raw.iter().enumerate() {
        match sanitize_row(row, tz) {
            Ok(reading) => readings.push(reading),
            Err(reason) => skipped.push(SkippedReading {
                index,
                timestamp: row.timestamp.clone(),
                reason,
            }),
        }
    }

    readings.sort_by_key(|r| r.timestamp);
    (readings, skipped)
}

fn sanitize_row(row: &RawReading, tz: &Tz) -> Result<Reading, SkipReason> {
    let raw_ts = row
        .timestamp
        .as_deref()
        .ok_or(SkipReason::MissingTimestamp)?;
    let timestamp = parse_timestamp(raw_ts, tz).ok_or(SkipReason::MalformedTimestamp)?;
    let dispensed_volume = checked_value(row.dispensed_volume, "dispensed_volume")?;
    let remaining_level = checked_value(row.remaining_level, "remaining_level")?;
    Ok(Reading::new(timestamp, dispensed_volume, remaining_level))
}

fn checked_value(value: Option<f64>, field: &'static str) -> Result<f64, SkipReason> {
    let value = value.unwrap_or(0.0);
    if !value.is_finite() {
        return Err(SkipReason::NonFiniteValue(field));
    }
    if value < 0.0 {
        return Err(SkipReason::NegativeValue(field));
    }
    Ok(value)
}

/// Readings grouped by period, plus the look-back history
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    buckets: BTreeMap<PeriodKey, Vec<Reading>>,
    history: Vec<Reading>,
    after_window: usize,
}

impl Buckets {
    /// Buckets in ascending period order
    pub fn iter(&self) -> impl Iterator<Item = (&PeriodKey, &[Reading])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Readings of one period; `None` only for keys outside the report
    pub fn get(&self, key: &PeriodKey) -> Option<&[Reading]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Number of periods in the report
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Readings strictly before the report window, ascending
    pub fn history(&self) -> &[Reading] {
        &self.history
    }

    /// Count of readings after the report window (ignored)
    pub fn after_window(&self) -> usize {
        self.after_window
    }

    /// Inventory the first period starts from
    ///
    /// The latest history reading wins. Without history the earliest
    /// in-window reading is used, which understates the first period's
    /// consumption whenever product was drawn before that reading.
    pub fn opening_inventory(&self) -> OpeningInventory {
        if let Some(last) = self.history.last() {
            return OpeningInventory::History(last.remaining_level);
        }
        self.buckets
            .values()
            .find_map(|readings| readings.first())
            .map(|first| OpeningInventory::FirstInWindow(first.remaining_level))
            .unwrap_or(OpeningInventory::Empty)
    }
}

/// Groups readings into the periods of one report
pub struct BucketAggregator<'a> {
    keyer: &'a PeriodKeyer,
    range: DateRange,
}

impl<'a> BucketAggregator<'a> {
    pub fn new(keyer: &'a PeriodKeyer, range: DateRange) -> Self {
        Self { keyer, range }
    }

    /// Assign every in-range reading to exactly one bucket
    ///
    /// Every period of the range gets a bucket, empty or not. Readings
    /// dated before the range go to the history; readings after it are
    /// counted and dropped. Input need not be sorted.
    pub fn group(&self, readings: &[Reading]) -> Buckets {
        let mut buckets: BTreeMap<PeriodKey, Vec<Reading>> = self
            .keyer
            .enumerate(&self.range)
            .map(|key| (key, Vec::new()))
            .collect();
        let mut history = Vec::new();
        let mut after_window = 0usize;

        let mut sorted = readings.to_vec();
        sorted.sort_by_key(|r| r.timestamp);

        for reading in sorted {
            let date = self.keyer.local_date(&reading.timestamp);
            if date < self.range.start() {
                history.push(reading);
            } else if date > self.range.end() {
                after_window += 1;
            } else {
                let key = self.keyer.key_of_date(date);
                buckets.entry(key).or_default().push(reading);
            }
        }

        Buckets {
            buckets,
            history,
            after_window,
        }
    }
}
