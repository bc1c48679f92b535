//! CLI interface for tankrecon
//!
//! This module defines the command-line interface using clap. Every report
//! shares the same global flags for data location, date range, device
//! selection and barrel-count handling.
//!
//! # Example
//!
//! ```bash
//! # Daily reconciliation for January 2024
//! tankrecon daily --since 2024-01-01 --until 2024-01-31
//!
//! # Monthly report, searching for the barrel count of one device
//! tankrecon monthly --since 2024-01 --until 2024-06 --device ZR-0042 --calibrate
//!
//! # Cross-device summary with known multi-barrel devices
//! tankrecon summary --since 2024/3/1 --until 2024/3/31 --overrides barrels.csv --json
//! ```

use crate::calibration::DEFAULT_CANDIDATES;
use crate::engine::{BarrelPlan, DEFAULT_HIGH_ERROR_THRESHOLD, EngineConfig};
use crate::error::{Result, TankReconError};
use crate::overrides::BarrelOverrides;
use crate::period::DateRange;
use crate::timezone::TimezoneConfig;
use crate::types::{DeviceCode, Granularity, YearMonth};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reconcile fuel-cabinet inventory against billed orders
#[derive(Parser, Debug, Clone)]
#[command(name = "tankrecon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Only print warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding readings/<device>.jsonl and offline.jsonl
    #[arg(long, short = 'd', global = true, env = "TANKRECON_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// First day of the report (YYYY-MM-DD, YYYY/M/D or YYYY-MM)
    #[arg(long, global = true)]
    pub since: Option<String>,

    /// Last day of the report (YYYY-MM-DD, YYYY/M/D or YYYY-MM)
    #[arg(long, global = true)]
    pub until: Option<String>,

    /// Restrict the report to these devices (repeatable)
    #[arg(long = "device", short = 'D', global = true)]
    pub devices: Vec<String>,

    /// Barrel count applied to every device (overrides everything else)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub barrel_count: Option<u32>,

    /// Search for the barrel count of devices without a known one
    #[arg(long, global = true, conflicts_with = "barrel_count")]
    pub calibrate: bool,

    /// Largest barrel count tried by --calibrate
    #[arg(
        long,
        global = true,
        env = "TANKRECON_MAX_BARRELS",
        default_value_t = *DEFAULT_CANDIDATES.end(),
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_barrels: u32,

    /// Flag summary rows whose error rate exceeds this percentage
    #[arg(
        long,
        global = true,
        env = "TANKRECON_HIGH_ERROR_THRESHOLD",
        default_value_t = DEFAULT_HIGH_ERROR_THRESHOLD,
        value_parser = parse_threshold
    )]
    pub high_error_threshold: f64,

    /// CSV file with device_code,barrel_count[,customer_name] rows
    #[arg(long, global = true, env = "TANKRECON_OVERRIDES")]
    pub overrides: Option<PathBuf>,

    /// Timezone for date grouping (e.g. "Asia/Shanghai", "Europe/Berlin", "UTC")
    /// If not specified, uses the system's local timezone
    #[arg(long, short = 'z', global = true)]
    pub timezone: Option<String>,

    /// Use UTC for date grouping (overrides --timezone)
    #[arg(long, global = true)]
    pub utc: bool,

    /// Report to produce
    #[command(subcommand)]
    pub command: Command,
}

/// Available reports
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Per-day consumption and discrepancy for each device
    Daily,
    /// Per-month consumption and discrepancy for each device
    Monthly,
    /// One row of totals per device, with offline time
    Summary,
}

impl Command {
    /// Period size the report is computed on
    pub fn granularity(&self) -> Granularity {
        match self {
            Command::Monthly => Granularity::Monthly,
            Command::Daily | Command::Summary => Granularity::Daily,
        }
    }
}

impl Cli {
    /// Requested devices, or `None` for all devices
    pub fn device_filter(&self) -> Option<Vec<DeviceCode>> {
        if self.devices.is_empty() {
            None
        } else {
            Some(self.devices.iter().map(DeviceCode::new).collect())
        }
    }

    /// Report range from `--since`/`--until`
    ///
    /// Without `--until` the range ends `today`; without `--since` it starts
    /// on the first day of the end date's month.
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        let end = match &self.until {
            Some(until) => parse_until_filter(until)?,
            None => today,
        };
        let start = match &self.since {
            Some(since) => parse_date_filter(since)?,
            None => YearMonth::of(end).first_day(),
        };
        DateRange::new(start, end)
    }

    /// Engine settings for this invocation
    pub fn engine_config(&self, timezone: TimezoneConfig) -> EngineConfig {
        EngineConfig::new(timezone, self.command.granularity())
            .with_candidates(*DEFAULT_CANDIDATES.start()..=self.max_barrels)
            .with_high_error_threshold(self.high_error_threshold)
    }

    /// Multiplier plan for one device
    ///
    /// `--barrel-count` beats the overrides file, which beats `--calibrate`.
    pub fn barrel_plan(&self, overrides: &BarrelOverrides, device: &DeviceCode) -> BarrelPlan {
        if let Some(count) = self.barrel_count {
            BarrelPlan::Fixed(count)
        } else if let Some(count) = overrides.get(device) {
            BarrelPlan::Override(count)
        } else if self.calibrate {
            BarrelPlan::Calibrate
        } else {
            BarrelPlan::Default
        }
    }
}

/// Parse a date filter string
///
/// Accepts `YYYY-MM-DD`, `YYYY/M/D`, and `YYYY-MM` (first day of the month).
///
/// # Examples
///
/// ```
/// use tankrecon::cli::parse_date_filter;
/// use chrono::Datelike;
///
/// let date = parse_date_filter("2024-01-15").unwrap();
/// assert_eq!(date.year(), 2024);
/// assert_eq!(date.day(), 15);
///
/// let date = parse_date_filter("2024/3/7").unwrap();
/// assert_eq!(date.month(), 3);
/// assert_eq!(date.day(), 7);
///
/// let date = parse_date_filter("2024-01").unwrap();
/// assert_eq!(date.month(), 1);
/// assert_eq!(date.day(), 1);
/// ```
pub fn parse_date_filter(date_str: &str) -> Result<NaiveDate> {
    let date_str = date_str.trim();
    if let Some(date) = parse_full_date(date_str) {
        return Ok(date);
    }
    parse_month(date_str).map(|ym| ym.first_day())
}

/// Like [`parse_date_filter`], but `YYYY-MM` means the last day of the month
pub fn parse_until_filter(date_str: &str) -> Result<NaiveDate> {
    let date_str = date_str.trim();
    if let Some(date) = parse_full_date(date_str) {
        return Ok(date);
    }
    parse_month(date_str).map(|ym| ym.last_day())
}

fn parse_threshold(value: &str) -> std::result::Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(threshold)
    } else {
        Err(format!("threshold must be a non-negative percentage, got {value}"))
    }
}

fn parse_full_date(date_str: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_str, fmt).ok())
}

fn parse_month(date_str: &str) -> Result<YearMonth> {
    let Some((year, month)) = date_str.split_once('-') else {
        return Err(TankReconError::InvalidDate(format!(
            "Invalid date format '{date_str}', expected YYYY-MM-DD, YYYY/M/D or YYYY-MM"
        )));
    };
    let year = year
        .parse::<i32>()
        .map_err(|_| TankReconError::InvalidDate(format!("Invalid year in '{date_str}'")))?;
    let month = month
        .parse::<u32>()
        .map_err(|_| TankReconError::InvalidDate(format!("Invalid month in '{date_str}'")))?;

    YearMonth::new(year, month).ok_or_else(|| {
        TankReconError::InvalidDate(format!("Month must be between 1-12, got {month}"))
    })
}
