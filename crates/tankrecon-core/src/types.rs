//! Core domain types for tankrecon
//!
//! This module contains the fundamental types shared by the engine, the
//! reading sources and the reporting layer: device codes, timestamps, period
//! keys, and the strongly-typed reading and offline-interval records.
//!
//! Source rows arrive as [`RawReading`] / [`RawOfflineInterval`] with loosely
//! typed fields. They are converted once into [`Reading`] / [`OfflineInterval`]
//! at the data boundary; the engine never looks at raw rows.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Strongly-typed device code wrapper
///
/// # Examples
/// ```
/// use tankrecon_core::types::DeviceCode;
///
/// let device = DeviceCode::new("ZR-0042");
/// assert_eq!(device.as_str(), "ZR-0042");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceCode(String);

impl DeviceCode {
    /// Create a new DeviceCode from any string-like type
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DeviceCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// ISO timestamp wrapper for UTC timestamps
///
/// # Examples
/// ```
/// use tankrecon_core::types::ISOTimestamp;
/// use chrono::{TimeZone, Utc};
///
/// let dt = Utc.with_ymd_and_hms(2024, 1, 15, 23, 30, 0).unwrap();
/// let timestamp = ISOTimestamp::new(dt);
///
/// assert_eq!(timestamp.local_date(&chrono_tz::UTC).to_string(), "2024-01-15");
/// assert_eq!(
///     timestamp.local_date(&chrono_tz::Asia::Shanghai).to_string(),
///     "2024-01-16"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ISOTimestamp(DateTime<Utc>);

impl ISOTimestamp {
    /// Create a new ISOTimestamp
    pub fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the inner DateTime
    pub fn inner(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Calendar date of this instant in the given timezone
    pub fn local_date(&self, tz: &Tz) -> NaiveDate {
        self.0.with_timezone(tz).date_naive()
    }
}

impl AsRef<DateTime<Utc>> for ISOTimestamp {
    fn as_ref(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for ISOTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Naive timestamp layouts accepted from source rows, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a source timestamp
///
/// RFC 3339 strings carry their own offset. Naive strings are interpreted as
/// wall-clock time in `tz`; an ambiguous wall-clock time (DST fold) resolves
/// to the earlier instant and a nonexistent one (DST gap) is rejected.
///
/// Returns `None` when the string matches no accepted layout.
pub fn parse_timestamp(input: &str, tz: &Tz) -> Option<ISOTimestamp> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(ISOTimestamp::new(dt.to_utc()));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(ISOTimestamp::new(dt.to_utc())),
        LocalResult::Ambiguous(earliest, _) => Some(ISOTimestamp::new(earliest.to_utc())),
        LocalResult::None => None,
    }
}

/// Reporting period size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One period per calendar date
    #[default]
    Daily,
    /// One period per calendar month
    Monthly,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "monthly" | "month" => Ok(Self::Monthly),
            _ => Err(format!("Invalid granularity: {s}")),
        }
    }
}

/// A calendar month
///
/// Ordering is chronological (year first, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a year-month pair; `None` when `month` is not in 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }

    /// The following month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Label of one reporting period
///
/// Keys of one report all share a granularity, so the derived ordering is
/// chronological within a report.
///
/// # Examples
/// ```
/// use tankrecon_core::types::{PeriodKey, YearMonth};
/// use chrono::NaiveDate;
///
/// let day = PeriodKey::Day(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
/// assert_eq!(day.to_string(), "2024-02-29");
///
/// let month = PeriodKey::Month(YearMonth::new(2024, 2).unwrap());
/// assert_eq!(month.to_string(), "2024-02");
/// assert_eq!("2024-02".parse::<PeriodKey>().unwrap(), month);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKey {
    Day(NaiveDate),
    Month(YearMonth),
}

impl PeriodKey {
    /// Granularity this key belongs to
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Day(_) => Granularity::Daily,
            Self::Month(_) => Granularity::Monthly,
        }
    }

    /// First calendar day covered by the period
    pub fn first_day(&self) -> NaiveDate {
        match self {
            Self::Day(date) => *date,
            Self::Month(ym) => ym.first_day(),
        }
    }

    /// Last calendar day covered by the period
    pub fn last_day(&self) -> NaiveDate {
        match self {
            Self::Day(date) => *date,
            Self::Month(ym) => ym.last_day(),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Month(ym) => write!(f, "{ym}"),
        }
    }
}

impl FromStr for PeriodKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::Day(date));
        }

        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid period key: {s}"))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("Invalid year in period key: {s}"))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| format!("Invalid month in period key: {s}"))?;
        YearMonth::new(year, month)
            .map(Self::Month)
            .ok_or_else(|| format!("Month must be between 1-12 in period key: {s}"))
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One telemetry/order event for a device
///
/// `dispensed_volume` is the metered amount billed for this event and
/// `remaining_level` the sensor-reported inventory at this instant. Both are
/// non-negative; absent source values have already been replaced by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: ISOTimestamp,
    pub dispensed_volume: f64,
    pub remaining_level: f64,
}

impl Reading {
    pub fn new(timestamp: ISOTimestamp, dispensed_volume: f64, remaining_level: f64) -> Self {
        Self {
            timestamp,
            dispensed_volume,
            remaining_level,
        }
    }
}

/// A reading row exactly as the storage collaborator hands it over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    /// Source timestamp, unparsed
    #[serde(default, alias = "order_time")]
    pub timestamp: Option<String>,
    /// Metered volume for this event
    #[serde(default, alias = "oil_val")]
    pub dispensed_volume: Option<f64>,
    /// Sensor-reported remaining inventory
    #[serde(default, alias = "avai_oil")]
    pub remaining_level: Option<f64>,
}

/// A span during which a device's telemetry was not received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineInterval {
    pub start: DateTime<Utc>,
    /// Recovery time; `None` while the outage is ongoing
    pub end: Option<DateTime<Utc>>,
    pub recovered: bool,
}

/// An offline record as stored, before timestamp parsing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOfflineInterval {
    #[serde(alias = "device")]
    pub device_code: String,
    #[serde(alias = "create_time")]
    pub start: String,
    #[serde(default, alias = "recovery_time")]
    pub end: Option<String>,
    #[serde(default)]
    pub recovered: Option<bool>,
}

impl RawOfflineInterval {
    /// Convert into a typed interval
    ///
    /// A record without an explicit `recovered` flag counts as recovered when
    /// it has a parseable end time. Returns `None` when the start time cannot
    /// be parsed.
    pub fn parse(&self, tz: &Tz) -> Option<OfflineInterval> {
        let start = parse_timestamp(&self.start, tz)?;
        let end = self
            .end
            .as_deref()
            .and_then(|s| parse_timestamp(s, tz))
            .map(|ts| *ts.inner());
        let recovered = self.recovered.unwrap_or(end.is_some());
        Some(OfflineInterval {
            start: *start.inner(),
            end,
            recovered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let ts = parse_timestamp("2024-03-01T08:00:00+08:00", &Tz::UTC).unwrap();
        assert_eq!(
            *ts.inner(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_naive_uses_timezone() {
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        let ts = parse_timestamp("2024/03/01 08:00:00", &tz).unwrap();
        assert_eq!(
            *ts.inner(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            ts.local_date(&tz),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("", &Tz::UTC).is_none());
        assert!(parse_timestamp("yesterday", &Tz::UTC).is_none());
        assert!(parse_timestamp("2024-13-01 00:00:00", &Tz::UTC).is_none());
    }

    #[test]
    fn test_parse_timestamp_dst_gap() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 02:30 does not exist on the spring-forward day
        assert!(parse_timestamp("2024-03-10 02:30:00", &tz).is_none());
    }

    #[test]
    fn test_year_month_boundaries() {
        let feb = YearMonth::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let dec = YearMonth::new(2023, 12).unwrap();
        assert_eq!(dec.next(), YearMonth::new(2024, 1).unwrap());
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(YearMonth::new(2024, 0).is_none());
        assert!(YearMonth::new(2024, 13).is_none());
    }

    #[test]
    fn test_period_key_ordering() {
        let jan = PeriodKey::Month(YearMonth::new(2024, 1).unwrap());
        let dec = PeriodKey::Month(YearMonth::new(2023, 12).unwrap());
        assert!(dec < jan);

        let d1 = PeriodKey::Day(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        let d2 = PeriodKey::Day(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert!(d1 < d2);
    }

    #[test]
    fn test_period_key_serde() {
        let key = PeriodKey::Day(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2024-05-06\"");
        let back: PeriodKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!("2024-00".parse::<PeriodKey>().is_err());
    }

    #[test]
    fn test_raw_reading_aliases() {
        let raw: RawReading =
            serde_json::from_str(r#"{"order_time":"2024-01-01 10:00:00","avai_oil":12.5}"#)
                .unwrap();
        assert_eq!(raw.timestamp.as_deref(), Some("2024-01-01 10:00:00"));
        assert_eq!(raw.remaining_level, Some(12.5));
        assert_eq!(raw.dispensed_volume, None);
    }

    #[test]
    fn test_raw_offline_interval_parse() {
        let raw = RawOfflineInterval {
            device_code: "D1".to_string(),
            start: "2024-01-01 00:00:00".to_string(),
            end: Some("2024-01-01 06:00:00".to_string()),
            recovered: None,
        };
        let interval = raw.parse(&Tz::UTC).unwrap();
        assert!(interval.recovered);
        assert_eq!(
            interval.end,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap())
        );

        let ongoing = RawOfflineInterval {
            end: None,
            ..raw.clone()
        };
        assert!(!ongoing.parse(&Tz::UTC).unwrap().recovered);

        let broken = RawOfflineInterval {
            start: "not a time".to_string(),
            ..raw
        };
        assert!(broken.parse(&Tz::UTC).is_none());
    }
}
