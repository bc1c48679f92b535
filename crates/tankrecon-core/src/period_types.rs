//! Computed reconciliation types for tankrecon
//!
//! Pure data structures produced by the engine and consumed by the reporting
//! layer. Values are full precision; display rounding belongs to the
//! formatters.

use crate::types::{DeviceCode, PeriodKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign of the discrepancy between scaled consumption and billed volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Computed consumption exceeds billed volume (operator-side loss)
    Shortage,
    /// Billed volume exceeds computed consumption (customer-side loss)
    Excess,
    /// Exact match
    Balanced,
}

impl Classification {
    /// Classify a signed error
    ///
    /// `NaN` never compares greater or less than zero and therefore lands
    /// on `Balanced`; finite inputs cannot produce it.
    pub fn of(error: f64) -> Self {
        if error > 0.0 {
            Self::Shortage
        } else if error < 0.0 {
            Self::Excess
        } else {
            Self::Balanced
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shortage => write!(f, "shortage"),
            Self::Excess => write!(f, "excess"),
            Self::Balanced => write!(f, "balanced"),
        }
    }
}

/// Multiplier-dependent part of a period's result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Barrel multiplier applied
    pub multiplier: u32,
    /// `consumption * multiplier`
    pub scaled_consumption: f64,
    /// `scaled_consumption - order_total`
    pub error: f64,
    pub classification: Classification,
}

impl Reconciliation {
    /// Volume lost on the operator side, zero unless this is a shortage
    pub fn shortage_volume(&self) -> f64 {
        match self.classification {
            Classification::Shortage => self.error,
            _ => 0.0,
        }
    }

    /// Volume lost on the customer side (reported as `|error|`), zero unless
    /// this is an excess
    pub fn excess_volume(&self) -> f64 {
        match self.classification {
            Classification::Excess => self.error.abs(),
            _ => 0.0,
        }
    }
}

/// Result for one reporting period
///
/// The consumption fields are filled by the consumption calculator;
/// `reconciliation` stays `None` until the period has been classified
/// against a multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodState {
    pub key: PeriodKey,
    /// Inventory carried over from the previous period
    pub start_inventory: f64,
    /// Remaining level of the period's last reading, or the start inventory
    /// when the period has no readings
    pub end_inventory: f64,
    /// Sum of inferred level rises within the period
    pub refill_volume: f64,
    /// Sum of metered dispensed volume within the period
    pub order_total: f64,
    /// `start_inventory - end_inventory + refill_volume`, unclamped
    pub consumption: f64,
    /// Number of readings that fell into the period
    pub reading_count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reconciliation: Option<Reconciliation>,
}

impl PeriodState {
    /// Scaled consumption, when classified
    pub fn scaled_consumption(&self) -> Option<f64> {
        self.reconciliation.map(|r| r.scaled_consumption)
    }

    /// Signed error, when classified
    pub fn error(&self) -> Option<f64> {
        self.reconciliation.map(|r| r.error)
    }

    /// Classification, when classified
    pub fn classification(&self) -> Option<Classification> {
        self.reconciliation.map(|r| r.classification)
    }

    /// Whether the period had no readings (zero-filled)
    pub fn is_gap(&self) -> bool {
        self.reading_count == 0
    }
}

/// Where the first period's starting inventory came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "level", rename_all = "snake_case")]
pub enum OpeningInventory {
    /// Latest reading strictly before the report window
    History(f64),
    /// No history: the earliest in-window reading's remaining level.
    /// This can understate the first period's consumption.
    FirstInWindow(f64),
    /// Neither history nor in-window readings exist
    Empty,
}

impl OpeningInventory {
    /// The inventory level the first period starts from
    pub fn level(&self) -> f64 {
        match self {
            Self::History(level) | Self::FirstInWindow(level) => *level,
            Self::Empty => 0.0,
        }
    }
}

/// Total absolute error achieved by one calibration candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub multiplier: u32,
    pub total_absolute_error: f64,
}

/// Outcome of a barrel-count calibration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Multiplier with the lowest total absolute error (smallest on ties)
    pub multiplier: u32,
    /// Sum of `|error|` over all periods at that multiplier
    pub total_absolute_error: f64,
    /// Classified period states that achieved the minimum
    pub periods: Vec<PeriodState>,
    /// Score of every candidate tried, in ascending multiplier order
    pub candidates: Vec<CandidateScore>,
}

/// Cross-device summary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_code: DeviceCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Multiplier used for the scaled figures
    pub barrel_count: u32,
    /// Sum of metered order volume across the range
    pub total_order_volume: f64,
    /// Sum of per-period consumption before scaling
    pub single_barrel_consumption: f64,
    /// `single_barrel_consumption * barrel_count`
    pub total_consumption: f64,
    /// `total_consumption - total_order_volume`
    pub total_error: f64,
    /// `total_error` spread over the days of the requested range
    pub average_daily_error: f64,
    /// `total_error / total_order_volume * 100`, zero without orders
    pub error_percentage: f64,
    /// Whether `|error_percentage|` exceeds the configured threshold
    pub high_error: bool,
    /// Offline time overlapping the report window, in hours
    pub offline_hours: f64,
    /// One human-readable line per offline interval
    pub remarks: Vec<String>,
}

/// Calculate totals from a period series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub order_total: f64,
    pub refill_volume: f64,
    pub consumption: f64,
    pub scaled_consumption: f64,
    pub shortage_volume: f64,
    pub excess_volume: f64,
    pub net_error: f64,
}

impl Totals {
    pub fn from_periods(periods: &[PeriodState]) -> Self {
        let mut totals = Self::default();
        for period in periods {
            totals.order_total += period.order_total;
            totals.refill_volume += period.refill_volume;
            totals.consumption += period.consumption;
            if let Some(rec) = &period.reconciliation {
                totals.scaled_consumption += rec.scaled_consumption;
                totals.shortage_volume += rec.shortage_volume();
                totals.excess_volume += rec.excess_volume();
                totals.net_error += rec.error;
            }
        }
        totals
    }

    pub fn from_summaries(summaries: &[DeviceSummary]) -> Self {
        let mut totals = Self::default();
        for summary in summaries {
            totals.order_total += summary.total_order_volume;
            totals.consumption += summary.single_barrel_consumption;
            totals.scaled_consumption += summary.total_consumption;
            totals.net_error += summary.total_error;
            if summary.total_error > 0.0 {
                totals.shortage_volume += summary.total_error;
            } else {
                totals.excess_volume += summary.total_error.abs();
            }
        }
        totals
    }
}
