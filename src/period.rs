//! Period keying
//!
//! Maps instants to reporting periods and enumerates the contiguous run of
//! periods covering a requested date range. Periods with no readings are
//! still enumerated; later stages give them zero-filled states.
//!
//! # Examples
//!
//! ```
//! use tankrecon::period::{DateRange, PeriodKeyer};
//! use tankrecon::types::Granularity;
//! use chrono::NaiveDate;
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
//! )
//! .unwrap();
//!
//! let keyer = PeriodKeyer::new(Granularity::Monthly, chrono_tz::UTC);
//! let keys: Vec<String> = keyer.enumerate(&range).map(|k| k.to_string()).collect();
//! assert_eq!(keys, vec!["2024-01", "2024-02", "2024-03"]);
//! ```

use crate::error::{Result, TankReconError};
use crate::types::{Granularity, ISOTimestamp, PeriodKey, YearMonth};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Inclusive calendar date range of a report
///
/// Construction rejects ranges that end before they start; such a request
/// is a caller error and is never swapped or clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(TankReconError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies inside the range, both ends inclusive
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the range (at least 1)
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Assigns instants to period keys for one granularity and zone
#[derive(Debug, Clone)]
pub struct PeriodKeyer {
    granularity: Granularity,
    tz: Tz,
}

impl PeriodKeyer {
    pub fn new(granularity: Granularity, tz: Tz) -> Self {
        Self { granularity, tz }
    }

    /// Calendar date of an instant in the keyer's zone
    pub fn local_date(&self, timestamp: &ISOTimestamp) -> NaiveDate {
        timestamp.local_date(&self.tz)
    }

    /// Period containing an instant
    pub fn key_of(&self, timestamp: &ISOTimestamp) -> PeriodKey {
        self.key_of_date(self.local_date(timestamp))
    }

    /// Period containing a calendar date
    pub fn key_of_date(&self, date: NaiveDate) -> PeriodKey {
        match self.granularity {
            Granularity::Daily => PeriodKey::Day(date),
            Granularity::Monthly => PeriodKey::Month(YearMonth::of(date)),
        }
    }

    /// Every period touching `range`, in ascending order
    ///
    /// The returned iterator is finite and can be cloned to restart it.
    pub fn enumerate(&self, range: &DateRange) -> PeriodRange {
        PeriodRange {
            next: Some(self.key_of_date(range.start())),
            last: self.key_of_date(range.end()),
        }
    }
}

/// Iterator over a contiguous, inclusive run of period keys
#[derive(Debug, Clone)]
pub struct PeriodRange {
    next: Option<PeriodKey>,
    last: PeriodKey,
}

impl Iterator for PeriodRange {
    type Item = PeriodKey;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if current > self.last {
            self.next = None;
            return None;
        }
        self.next = successor(current);
        Some(current)
    }
}

fn successor(key: PeriodKey) -> Option<PeriodKey> {
    match key {
        PeriodKey::Day(date) => date.succ_opt().map(PeriodKey::Day),
        PeriodKey::Month(ym) => Some(PeriodKey::Month(ym.next())),
    }
}
