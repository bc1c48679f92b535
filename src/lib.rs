//! tankrecon - Reconcile fuel-cabinet inventory against billed orders
//!
//! This library provides functionality to:
//! - Bucket per-device telemetry readings into daily or monthly periods
//! - Compute mass-balance consumption with carry-over and refill inference
//! - Classify the gap between scaled consumption and billed volume
//! - Search for an unknown barrel count per device
//! - Summarize devices across a range, including offline time
//! - Generate reports in table and JSON formats
//!
//! # Examples
//!
//! ```
//! use tankrecon::engine::{BarrelPlan, DeviceRequest, EngineConfig, Reconciler};
//! use tankrecon::period::DateRange;
//! use tankrecon::timezone::TimezoneConfig;
//! use tankrecon::types::{DeviceCode, Granularity, RawReading};
//! use chrono::NaiveDate;
//!
//! fn main() -> tankrecon::Result<()> {
//!     let config = EngineConfig::new(TimezoneConfig::fixed(chrono_tz::UTC), Granularity::Daily);
//!     let reconciler = Reconciler::new(config)?;
//!
//!     let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!     let readings = vec![
//!         RawReading {
//!             timestamp: Some("2024-01-01 08:00:00".into()),
//!             dispensed_volume: Some(0.0),
//!             remaining_level: Some(1000.0),
//!         },
//!         RawReading {
//!             timestamp: Some("2024-01-01 18:00:00".into()),
//!             dispensed_volume: Some(80.0),
//!             remaining_level: Some(900.0),
//!         },
//!     ];
//!     let range = DateRange::new(day, day)?;
//!     let request = DeviceRequest::new(DeviceCode::new("ZR-1"), range, readings)
//!         .with_barrel(BarrelPlan::Calibrate);
//!
//!     let report = reconciler.reconcile(&request)?;
//!     assert_eq!(report.periods.len(), 1);
//!     assert_eq!(report.periods[0].consumption, 100.0);
//!     Ok(())
//! }
//! ```

pub mod bucket;
pub mod calibration;
pub mod classify;
pub mod cli;
pub mod consumption;
pub mod engine;
pub mod offline;
pub mod output;
pub mod overrides;
pub mod period;
pub mod summary;

pub use tankrecon_core::{error, period_types, provider, timezone, types};

// Re-export commonly used types
pub use error::{Result, TankReconError};
pub use types::{DeviceCode, Granularity, ISOTimestamp, PeriodKey, RawReading, Reading};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
