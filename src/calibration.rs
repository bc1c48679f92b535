//! Barrel-count calibration
//!
//! When the number of physical barrels behind a sensor is unknown, every
//! candidate multiplier is tried against the whole period series and the one
//! with the lowest total absolute error wins. Candidates are tried in
//! ascending order and only a strictly better score replaces the current
//! best, so ties go to the smallest multiplier.

use crate::classify::{ErrorClassifier, total_absolute_error};
use crate::error::{Result, TankReconError};
use crate::period_types::{CalibrationResult, CandidateScore, PeriodState};
use std::ops::RangeInclusive;
use tracing::debug;

/// Candidate multipliers tried when none is configured
pub const DEFAULT_CANDIDATES: RangeInclusive<u32> = 1..=5;

/// Brute-force search over a fixed multiplier range
#[derive(Debug, Clone)]
pub struct BarrelCountCalibrator {
    candidates: RangeInclusive<u32>,
}

impl Default for BarrelCountCalibrator {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES,
        }
    }
}

impl BarrelCountCalibrator {
    /// Calibrator over `candidates`
    ///
    /// The range must be non-empty and start at 1 or above.
    pub fn new(candidates: RangeInclusive<u32>) -> Result<Self> {
        if candidates.is_empty() || *candidates.start() == 0 {
            return Err(TankReconError::InvalidCandidateRange {
                start: *candidates.start(),
                end: *candidates.end(),
            });
        }
        Ok(Self { candidates })
    }

    pub fn candidates(&self) -> RangeInclusive<u32> {
        self.candidates.clone()
    }

    /// Pick the multiplier that best reconciles `periods`
    ///
    /// `periods` are pre-multiplier states; they are re-classified from
    /// scratch for each candidate.
    pub fn calibrate(&self, periods: &[PeriodState]) -> Result<CalibrationResult> {
        let mut best: Option<(u32, f64, Vec<PeriodState>)> = None;
        let mut candidates = Vec::with_capacity(self.candidates.clone().count());

        for multiplier in self.candidates.clone() {
            let classified = ErrorClassifier::classify(periods, multiplier)?;
            let total = total_absolute_error(&classified);
            debug!(multiplier, total_absolute_error = total, "scored candidate");
            candidates.push(CandidateScore {
                multiplier,
                total_absolute_error: total,
            });

            let improves = match &best {
                None => true,
                Some((_, best_total, _)) => total < *best_total,
            };
            if improves {
                best = Some((multiplier, total, classified));
            }
        }

        // `new` guarantees at least one candidate
        let (multiplier, total_absolute_error, periods) =
            best.ok_or(TankReconError::InvalidCandidateRange {
                start: *self.candidates.start(),
                end: *self.candidates.end(),
            })?;

        Ok(CalibrationResult {
            multiplier,
            total_absolute_error,
            periods,
            candidates,
        })
    }
}
