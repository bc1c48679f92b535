//! Timezone handling for period assignment
//!
//! Cabinets report wall-clock times and reporting periods are calendar days
//! or months in the operator's zone, so the zone decides both how naive
//! source timestamps are read and which period an instant belongs to.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Result, TankReconError};

/// Configuration for timezone handling
#[derive(Debug, Clone)]
pub struct TimezoneConfig {
    /// The timezone to use for date operations
    pub tz: Tz,
    /// Whether the timezone is UTC
    pub is_utc: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        let tz = get_local_timezone();
        Self {
            is_utc: tz == Tz::UTC,
            tz,
        }
    }
}

impl TimezoneConfig {
    /// Fixed zone, independent of the environment
    pub fn fixed(tz: Tz) -> Self {
        Self {
            is_utc: tz == Tz::UTC,
            tz,
        }
    }

    /// Create a new timezone configuration from CLI arguments
    pub fn from_cli(timezone_str: Option<&str>, use_utc: bool) -> Result<Self> {
        if use_utc {
            return Ok(Self::fixed(Tz::UTC));
        }

        match timezone_str {
            Some(tz_str) => {
                let tz = Tz::from_str(tz_str).map_err(|_| {
                    TankReconError::InvalidTimezone(format!(
                        "'{tz_str}'. Use format like 'Asia/Shanghai', 'Europe/Berlin', or 'UTC'"
                    ))
                })?;
                Ok(Self::fixed(tz))
            }
            None => Ok(Self::default()),
        }
    }

    /// Get the display name for the configured timezone
    pub fn display_name(&self) -> &str {
        if self.is_utc { "UTC" } else { self.tz.name() }
    }

    /// Instant at which `date` begins in this zone
    ///
    /// When local midnight is skipped by a DST change, the day begins at the
    /// end of the gap.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let mut naive = date.and_time(NaiveTime::MIN);
        let day_end = naive + Duration::days(1);
        while naive < day_end {
            if let Some(dt) = self.tz.from_local_datetime(&naive).earliest() {
                return dt.to_utc();
            }
            naive += Duration::minutes(15);
        }
        // The zone skipped this calendar day entirely
        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
    }

    /// Last whole second of `date` in this zone
    ///
    /// One second before the next day begins, which is 23:59:59 local unless
    /// a DST change moves the day boundary.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        match date.succ_opt() {
            Some(next) => self.start_of_day(next) - Duration::seconds(1),
            None => Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
        }
    }
}

/// Detect the system's local timezone
///
/// Checks `TZ` first, then asks the OS through `iana-time-zone`, and falls
/// back to UTC.
pub fn get_local_timezone() -> Tz {
    #[allow(clippy::collapsible_if)]
    if let Ok(tz_str) = std::env::var("TZ") {
        if let Ok(tz) = Tz::from_str(&tz_str) {
            debug!("Using timezone from TZ environment variable: {}", tz_str);
            return tz;
        }
    }

    match iana_time_zone::get_timezone() {
        Ok(tz_str) => match Tz::from_str(&tz_str) {
            Ok(tz) => {
                debug!("Using system timezone from iana-time-zone: {}", tz_str);
                tz
            }
            Err(_) => {
                debug!(
                    "Could not parse timezone from iana-time-zone: '{}', falling back to UTC",
                    tz_str
                );
                Tz::UTC
            }
        },
        Err(e) => {
            debug!(
                "Could not detect local timezone via iana-time-zone: {:?}, falling back to UTC",
                e
            );
            Tz::UTC
        }
    }
}
