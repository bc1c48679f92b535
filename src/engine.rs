//! Per-device reconciliation pipeline
//!
//! A [`Reconciler`] turns one device's raw rows into a [`DeviceReport`]:
//! sanitation, bucketing, consumption, then either a fixed multiplier or
//! calibration. Devices share nothing, so a batch is fanned out with rayon
//! and a failing device leaves its siblings untouched.

use crate::bucket::{BucketAggregator, SkippedReading, sanitize};
use crate::calibration::{BarrelCountCalibrator, DEFAULT_CANDIDATES};
use crate::classify::{ErrorClassifier, total_absolute_error};
use crate::consumption::ConsumptionCalculator;
use crate::error::Result;
use crate::period::{DateRange, PeriodKeyer};
use crate::period_types::{CandidateScore, DeviceSummary, OpeningInventory, PeriodState, Totals};
use crate::summary;
use crate::timezone::TimezoneConfig;
use crate::types::{DeviceCode, Granularity, OfflineInterval, RawOfflineInterval, RawReading};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

/// Default `|error %|` above which a summary row is flagged
pub const DEFAULT_HIGH_ERROR_THRESHOLD: f64 = 5.0;

/// Settings shared by every device of a run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub timezone: TimezoneConfig,
    pub granularity: Granularity,
    /// Multipliers tried when calibrating
    pub candidates: RangeInclusive<u32>,
    /// Percentage, e.g. `5.0` for 5 %
    pub high_error_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: TimezoneConfig::default(),
            granularity: Granularity::Daily,
            candidates: DEFAULT_CANDIDATES,
            high_error_threshold: DEFAULT_HIGH_ERROR_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn new(timezone: TimezoneConfig, granularity: Granularity) -> Self {
        Self {
            timezone,
            granularity,
            candidates: DEFAULT_CANDIDATES,
            high_error_threshold: DEFAULT_HIGH_ERROR_THRESHOLD,
        }
    }

    pub fn with_candidates(mut self, candidates: RangeInclusive<u32>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_high_error_threshold(mut self, threshold: f64) -> Self {
        self.high_error_threshold = threshold;
        self
    }
}

/// How a device's multiplier is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarrelPlan {
    /// Given on the command line
    Fixed(u32),
    /// Taken from the overrides file
    Override(u32),
    /// Searched by the calibrator
    Calibrate,
    /// Nothing known; single barrel
    #[default]
    Default,
}

/// Where a report's multiplier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierSource {
    Fixed,
    Override,
    Calibrated,
    Default,
}

impl fmt::Display for MultiplierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Override => write!(f, "override"),
            Self::Calibrated => write!(f, "calibrated"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Everything needed to reconcile one device
#[derive(Debug, Clone)]
pub struct DeviceRequest {
    pub device: DeviceCode,
    /// Customer the cabinet is installed for
    pub customer_name: Option<String>,
    pub range: DateRange,
    pub readings: Vec<RawReading>,
    pub offline: Vec<RawOfflineInterval>,
    pub barrel: BarrelPlan,
}

impl DeviceRequest {
    pub fn new(device: DeviceCode, range: DateRange, readings: Vec<RawReading>) -> Self {
        Self {
            device,
            customer_name: None,
            range,
            readings,
            offline: Vec::new(),
            barrel: BarrelPlan::Default,
        }
    }

    pub fn with_offline(mut self, offline: Vec<RawOfflineInterval>) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_barrel(mut self, barrel: BarrelPlan) -> Self {
        self.barrel = barrel;
        self
    }

    pub fn with_customer_name(mut self, customer_name: Option<String>) -> Self {
        self.customer_name = customer_name;
        self
    }
}

/// Reconciliation result for one device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub device_code: DeviceCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub granularity: Granularity,
    pub range: DateRange,
    pub multiplier: u32,
    pub multiplier_source: MultiplierSource,
    /// Sum of `|error|` over all periods at `multiplier`
    pub total_absolute_error: f64,
    /// Every candidate's score, when calibrated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<Vec<CandidateScore>>,
    pub opening_inventory: OpeningInventory,
    pub periods: Vec<PeriodState>,
    pub totals: Totals,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedReading>,
    /// Readings dated after the range, ignored
    pub ignored_after_range: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub offline: Vec<OfflineInterval>,
}

/// Runs the pipeline for one or many devices
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: EngineConfig,
    keyer: PeriodKeyer,
    calibrator: BarrelCountCalibrator,
}

impl Reconciler {
    /// Fails when the configured candidate range is invalid
    pub fn new(config: EngineConfig) -> Result<Self> {
        let calibrator = BarrelCountCalibrator::new(config.candidates.clone())?;
        let keyer = PeriodKeyer::new(config.granularity, config.timezone.tz);
        Ok(Self {
            config,
            keyer,
            calibrator,
        })
    }

    /// Reconcile a single device
    pub fn reconcile(&self, request: &DeviceRequest) -> Result<DeviceReport> {
        let tz = &self.config.timezone.tz;
        let (readings, skipped) = sanitize(&request.readings, tz);
        for skip in &skipped {
            warn!(
                device = %request.device,
                row = skip.index,
                timestamp = skip.timestamp.as_deref().unwrap_or(""),
                "Skipping reading: {}",
                skip.reason
            );
        }

        let buckets = BucketAggregator::new(&self.keyer, request.range).group(&readings);
        if buckets.after_window() > 0 {
            debug!(
                device = %request.device,
                count = buckets.after_window(),
                "Ignoring readings after range"
            );
        }
        let run = ConsumptionCalculator::calculate(&buckets);
        if let OpeningInventory::FirstInWindow(level) = run.opening {
            debug!(
                device = %request.device,
                level,
                "No reading before range; opening from first in-range reading"
            );
        }

        let (multiplier, multiplier_source, periods, calibration) = match request.barrel {
            BarrelPlan::Fixed(m) => (
                m,
                MultiplierSource::Fixed,
                ErrorClassifier::classify(&run.periods, m)?,
                None,
            ),
            BarrelPlan::Override(m) => (
                m,
                MultiplierSource::Override,
                ErrorClassifier::classify(&run.periods, m)?,
                None,
            ),
            BarrelPlan::Default => (
                1,
                MultiplierSource::Default,
                ErrorClassifier::classify(&run.periods, 1)?,
                None,
            ),
            BarrelPlan::Calibrate => {
                let result = self.calibrator.calibrate(&run.periods)?;
                info!(
                    device = %request.device,
                    multiplier = result.multiplier,
                    total_absolute_error = result.total_absolute_error,
                    "Calibrated barrel count"
                );
                (
                    result.multiplier,
                    MultiplierSource::Calibrated,
                    result.periods,
                    Some(result.candidates),
                )
            }
        };

        let offline = request
            .offline
            .iter()
            .filter_map(|raw| {
                let parsed = raw.parse(tz);
                if parsed.is_none() {
                    warn!(
                        device = %request.device,
                        start = %raw.start,
                        "Skipping offline record with bad start time"
                    );
                }
                parsed
            })
            .collect();

        let totals = Totals::from_periods(&periods);
        debug!(
            device = %request.device,
            periods = periods.len(),
            multiplier,
            "Reconciled device"
        );

        Ok(DeviceReport {
            device_code: request.device.clone(),
            customer_name: request.customer_name.clone(),
            granularity: self.config.granularity,
            range: request.range,
            multiplier,
            multiplier_source,
            total_absolute_error: total_absolute_error(&periods),
            calibration,
            opening_inventory: run.opening,
            periods,
            totals,
            skipped,
            ignored_after_range: buckets.after_window(),
            offline,
        })
    }

    /// Reconcile devices in parallel
    ///
    /// Results line up with `requests`.
    pub fn reconcile_batch(&self, requests: &[DeviceRequest]) -> Vec<Result<DeviceReport>> {
        info!("Reconciling {} devices", requests.len());
        requests
            .par_iter()
            .map(|request| self.reconcile(request))
            .collect()
    }

    /// Cross-device summary row for a finished report
    pub fn summarize(&self, report: &DeviceReport, now: DateTime<Utc>) -> DeviceSummary {
        summary::summarize(
            report,
            &self.config.timezone,
            self.config.high_error_threshold,
            now,
        )
    }
}
