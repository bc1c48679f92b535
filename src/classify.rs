//! Scaling and discrepancy classification
//!
//! Applies a barrel multiplier to pre-multiplier period states and labels the
//! signed difference between scaled consumption and billed volume.

use crate::error::{Result, TankReconError};
use crate::period_types::{Classification, PeriodState, Reconciliation};

/// Classifies period states against a multiplier
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Return classified copies of `periods`
    ///
    /// Input states are left untouched. Any existing reconciliation on an
    /// input state is replaced. Fails when `multiplier` is zero.
    pub fn classify(periods: &[PeriodState], multiplier: u32) -> Result<Vec<PeriodState>> {
        if multiplier == 0 {
            return Err(TankReconError::InvalidMultiplier(multiplier));
        }

        Ok(periods
            .iter()
            .map(|period| {
                let mut classified = period.clone();
                classified.reconciliation = Some(Self::reconcile(period, multiplier));
                classified
            })
            .collect())
    }

    /// Multiplier-dependent figures for one period
    pub fn reconcile(period: &PeriodState, multiplier: u32) -> Reconciliation {
        let scaled_consumption = period.consumption * f64::from(multiplier);
        let error = scaled_consumption - period.order_total;
        Reconciliation {
            multiplier,
            scaled_consumption,
            error,
            classification: Classification::of(error),
        }
    }
}

/// Sum of `|error|` over classified periods; unclassified periods count as 0
pub fn total_absolute_error(periods: &[PeriodState]) -> f64 {
    periods
        .iter()
        .filter_map(PeriodState::error)
        .map(f64::abs)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PeriodKey;
    use chrono::NaiveDate;

    fn state(day: u32, consumption: f64, order_total: f64) -> PeriodState {
        PeriodState {
            key: PeriodKey::Day(NaiveDate::from_ymd_opt(2024, 1, day).unwrap()),
            start_inventory: 1000.0,
            end_inventory: 1000.0 - consumption,
            refill_volume: 0.0,
            order_total,
            consumption,
            reading_count: 1,
            reconciliation: None,
        }
    }

    #[test]
    fn test_single_barrel_shortage() {
        let periods = vec![state(1, 100.0, 80.0)];
        let classified = ErrorClassifier::classify(&periods, 1).unwrap();
        let rec = classified[0].reconciliation.unwrap();
        assert_eq!(rec.scaled_consumption, 100.0);
        assert_eq!(rec.error, 20.0);
        assert_eq!(rec.classification, Classification::Shortage);
        // input is not modified
        assert!(periods[0].reconciliation.is_none());
    }

    #[test]
    fn test_multiplier_scales_consumption() {
        let periods = vec![state(1, 10.0, 25.0), state(2, 20.0, 35.0), state(3, 15.0, 30.0)];
        let classified = ErrorClassifier::classify(&periods, 2).unwrap();
        let errors: Vec<_> = classified.iter().filter_map(PeriodState::error).collect();
        assert_eq!(errors, vec![-5.0, 5.0, 0.0]);

        let labels: Vec<_> = classified
            .iter()
            .filter_map(PeriodState::classification)
            .collect();
        assert_eq!(
            labels,
            vec![
                Classification::Excess,
                Classification::Shortage,
                Classification::Balanced
            ]
        );
        assert_eq!(total_absolute_error(&classified), 10.0);
    }

    #[test]
    fn test_zero_multiplier_is_rejected() {
        let err = ErrorClassifier::classify(&[state(1, 1.0, 1.0)], 0).unwrap_err();
        assert!(matches!(err, TankReconError::InvalidMultiplier(0)));
    }

    #[test]
    fn test_negative_consumption_propagates() {
        let classified = ErrorClassifier::classify(&[state(1, -4.0, 0.0)], 3).unwrap();
        let rec = classified[0].reconciliation.unwrap();
        assert_eq!(rec.scaled_consumption, -12.0);
        assert_eq!(rec.classification, Classification::Excess);
        assert_eq!(rec.excess_volume(), 12.0);
    }

    #[test]
    fn test_total_absolute_error_ignores_unclassified() {
        assert_eq!(total_absolute_error(&[state(1, 5.0, 0.0)]), 0.0);
    }
}
