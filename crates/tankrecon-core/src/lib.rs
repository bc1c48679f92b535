//! Core types, traits, and utilities for tankrecon
//!
//! This crate provides the foundational types, error handling,
//! timezone configuration and the reading-source trait used
//! by all other tankrecon crates.

pub mod error;
pub mod period_types;
pub mod provider;
pub mod timezone;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TankReconError};
pub use period_types::{
    CalibrationResult, CandidateScore, Classification, DeviceSummary, OpeningInventory,
    PeriodState, Reconciliation, Totals,
};
pub use types::{
    DeviceCode, Granularity, ISOTimestamp, OfflineInterval, PeriodKey, RawOfflineInterval,
    RawReading, Reading, YearMonth,
};
