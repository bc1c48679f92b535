//! Error types for tankrecon
//!
//! This module defines the error types used throughout the tankrecon crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Problems with a single reading are never surfaced through this type; they
//! are reported as skipped-reading diagnostics instead. Everything here is a
//! request-shape or I/O failure that aborts the work for one device.
//!
//! # Example
//!
//! ```
//! use tankrecon_core::error::{TankReconError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to TankReconError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::DeviceCode;

/// Main error type for tankrecon operations
#[derive(Error, Debug)]
pub enum TankReconError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Requested range ends before it starts
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange {
        /// First day of the requested range
        start: NaiveDate,
        /// Last day of the requested range
        end: NaiveDate,
    },

    /// Barrel multiplier outside the accepted domain
    #[error("Invalid barrel multiplier: {0} (must be at least 1)")]
    InvalidMultiplier(u32),

    /// Calibration candidate range is empty or starts below 1
    #[error("Invalid calibration candidate range: {start}..={end}")]
    InvalidCandidateRange {
        /// Lowest candidate
        start: u32,
        /// Highest candidate
        end: u32,
    },

    /// Invalid timezone
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device has no data in the source
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceCode),
}

/// Convenience type alias for Results in tankrecon
pub type Result<T> = std::result::Result<T, TankReconError>;
