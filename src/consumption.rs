//! Mass-balance consumption per period
//!
//! Walks the periods of a report in ascending order, carrying the inventory
//! level from one period's end into the next period's start. For each
//! period:
//!
//! ```text
//! consumption = start_inventory - end_inventory + refill_volume
//! ```
//!
//! where `refill_volume` is the sum of every rise in remaining level seen
//! while scanning the period's readings from `start_inventory`. Any rise is
//! taken as a refill. The result is not clamped; a negative consumption is
//! reported as-is.
//!
//! Periods with no readings are zero-filled: the inventory carries through
//! unchanged and nothing is consumed or ordered. No interpolation happens.

use crate::bucket::Buckets;
use crate::period_types::{OpeningInventory, PeriodState};
use crate::types::{PeriodKey, Reading};
use tracing::debug;

/// Output of one calculator run
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionRun {
    /// Where the first period's start inventory came from
    pub opening: OpeningInventory,
    /// One unclassified state per period, ascending
    pub periods: Vec<PeriodState>,
}

/// Progress of the forward walk over periods
#[derive(Debug, Clone, Copy)]
enum WalkState {
    /// Before the first period; start inventory not yet resolved
    AwaitingFirstPeriod,
    /// Inside the walk, carrying the previous period's end inventory
    ProcessingPeriod { carried_inventory: f64 },
}

/// Computes per-period consumption from bucketed readings
pub struct ConsumptionCalculator;

impl ConsumptionCalculator {
    /// Compute the unclassified period series for `buckets`
    pub fn calculate(buckets: &Buckets) -> ConsumptionRun {
        let opening = buckets.opening_inventory();
        let mut state = WalkState::AwaitingFirstPeriod;
        let mut periods = Vec::with_capacity(buckets.len());

        for (key, readings) in buckets.iter() {
            let start_inventory = match state {
                WalkState::AwaitingFirstPeriod => opening.level(),
                WalkState::ProcessingPeriod { carried_inventory } => carried_inventory,
            };

            let period = Self::period_state(*key, start_inventory, readings);
            debug!(
                period = %period.key,
                start = period.start_inventory,
                end = period.end_inventory,
                refill = period.refill_volume,
                "computed period consumption"
            );

            state = WalkState::ProcessingPeriod {
                carried_inventory: period.end_inventory,
            };
            periods.push(period);
        }

        ConsumptionRun { opening, periods }
    }

    /// State for a single period, given its carried-over start inventory
    ///
    /// `readings` must be in timestamp order.
    pub fn period_state(key: PeriodKey, start_inventory: f64, readings: &[Reading]) -> PeriodState {
        let Some(last) = readings.last() else {
            return PeriodState {
                key,
                start_inventory,
                end_inventory: start_inventory,
                refill_volume: 0.0,
                order_total: 0.0,
                consumption: 0.0,
                reading_count: 0,
                reconciliation: None,
            };
        };

        let end_inventory = last.remaining_level;
        let order_total: f64 = readings.iter().map(|r| r.dispensed_volume).sum();
        let refill_volume = Self::inferred_refill(start_inventory, readings);

        PeriodState {
            key,
            start_inventory,
            end_inventory,
            refill_volume,
            order_total,
            consumption: start_inventory - end_inventory + refill_volume,
            reading_count: readings.len(),
            reconciliation: None,
        }
    }

    /// Sum of all level rises, starting from `start_level`
    pub fn inferred_refill(start_level: f64, readings: &[Reading]) -> f64 {
        let mut tracked = start_level;
        let mut refill = 0.0;
        for reading in readings {
            if reading.remaining_level > tracked {
                refill += reading.remaining_level - tracked;
            }
            tracked = reading.remaining_level;
        }
        refill
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::BucketAggregator;
    use crate::period::{DateRange, PeriodKeyer};
    use crate::types::{Granularity, ISOTimestamp};
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;

    fn reading(day: u32, hour: u32, volume: f64, level: f64) -> Reading {
        Reading::new(
            ISOTimestamp::new(Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()),
            volume,
            level,
        )
    }

    fn day_key(day: u32) -> PeriodKey {
        PeriodKey::Day(NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
    }

    fn run(readings: &[Reading], start: u32, end: u32) -> ConsumptionRun {
        let keyer = PeriodKeyer::new(Granularity::Daily, Tz::UTC);
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, start).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, end).unwrap(),
        )
        .unwrap();
        let buckets = BucketAggregator::new(&keyer, range).group(readings);
        ConsumptionCalculator::calculate(&buckets)
    }

    #[test]
    fn test_rise_then_fall_counts_only_the_rise() {
        let readings = [
            reading(1, 8, 0.0, 500.0),
            reading(1, 9, 0.0, 520.0),
            reading(1, 10, 0.0, 480.0),
        ];
        let state = ConsumptionCalculator::period_state(day_key(1), 500.0, &readings);
        assert_eq!(state.refill_volume, 20.0);
        assert_eq!(state.end_inventory, 480.0);
        assert_eq!(state.consumption, 40.0);
    }

    #[test]
    fn test_rise_from_start_inventory_counts() {
        // The first reading is compared with the carried inventory
        let readings = [reading(1, 8, 0.0, 700.0)];
        let state = ConsumptionCalculator::period_state(day_key(1), 400.0, &readings);
        assert_eq!(state.refill_volume, 300.0);
        assert_eq!(state.consumption, 0.0);
    }

    #[test]
    fn test_empty_period_is_zero_filled() {
        let state = ConsumptionCalculator::period_state(day_key(1), 321.5, &[]);
        assert_eq!(state.end_inventory, 321.5);
        assert_eq!(state.consumption, 0.0);
        assert_eq!(state.order_total, 0.0);
        assert_eq!(state.refill_volume, 0.0);
        assert!(state.is_gap());
    }

    #[test]
    fn test_carry_over_and_order_totals() {
        let readings = [
            reading(1, 8, 30.0, 950.0),
            reading(1, 18, 50.0, 900.0),
            reading(3, 8, 20.0, 870.0),
        ];
        let result = run(&readings, 1, 3);
        assert_eq!(result.opening, OpeningInventory::FirstInWindow(950.0));

        let p = &result.periods;
        assert_eq!(p.len(), 3);
        assert_eq!(p[0].start_inventory, 950.0);
        assert_eq!(p[0].order_total, 80.0);
        assert_eq!(p[0].consumption, 50.0);
        assert_eq!(p[1].start_inventory, 900.0);
        assert!(p[1].is_gap());
        assert_eq!(p[2].start_inventory, 900.0);
        assert_eq!(p[2].consumption, 30.0);
    }

    #[test]
    fn test_history_sets_opening_inventory() {
        let readings = [reading(1, 8, 0.0, 1000.0), reading(2, 8, 80.0, 900.0)];
        let result = run(&readings, 2, 2);
        assert_eq!(result.opening, OpeningInventory::History(1000.0));
        assert_eq!(result.periods[0].consumption, 100.0);
    }

    #[test]
    fn test_consumption_equals_sum_of_drops() {
        // Level dips then recovers above its start
        let readings = [reading(1, 8, 0.0, 100.0), reading(1, 9, 0.0, 300.0)];
        let state = ConsumptionCalculator::period_state(day_key(1), 200.0, &readings);
        assert_eq!(state.refill_volume, 200.0);
        assert_eq!(state.consumption, 100.0);

        let readings = [reading(1, 8, 0.0, 250.0), reading(1, 9, 0.0, 240.0)];
        let state = ConsumptionCalculator::period_state(day_key(1), 200.0, &readings);
        assert_eq!(state.refill_volume, 50.0);
        assert_eq!(state.consumption, 10.0);
    }

    #[test]
    fn test_no_data_at_all_yields_zero_series() {
        let result = run(&[], 1, 5);
        assert_eq!(result.opening, OpeningInventory::Empty);
        assert_eq!(result.periods.len(), 5);
        assert!(result
            .periods
            .iter()
            .all(|p| p.consumption == 0.0 && p.end_inventory == 0.0));
    }
}
