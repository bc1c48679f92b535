//! Cross-device summary rows
//!
//! Collapses a device report into one line of totals: billed volume,
//! consumption before and after scaling, the resulting error and its rate,
//! and how long the device was offline during the range.

use crate::engine::DeviceReport;
use crate::offline::{OfflineOverlapCalculator, remark};
use crate::period_types::DeviceSummary;
use crate::timezone::TimezoneConfig;
use chrono::{DateTime, Utc};

/// Build the summary row for `report`
///
/// `high_error_threshold` is a percentage. The offline window runs from the
/// first day's midnight to the last day's 23:59:59 in `timezone`.
pub fn summarize(
    report: &DeviceReport,
    timezone: &TimezoneConfig,
    high_error_threshold: f64,
    now: DateTime<Utc>,
) -> DeviceSummary {
    let total_order_volume = report.totals.order_total;
    let single_barrel_consumption = report.totals.consumption;
    let total_consumption = single_barrel_consumption * f64::from(report.multiplier);
    let total_error = total_consumption - total_order_volume;
    let average_daily_error = total_error / report.range.days() as f64;
    let error_percentage = if total_order_volume == 0.0 {
        0.0
    } else {
        total_error / total_order_volume * 100.0
    };

    let calculator = OfflineOverlapCalculator::new(
        timezone.start_of_day(report.range.start()),
        timezone.end_of_day(report.range.end()),
        now,
    );

    DeviceSummary {
        device_code: report.device_code.clone(),
        customer_name: report.customer_name.clone(),
        barrel_count: report.multiplier,
        total_order_volume,
        single_barrel_consumption,
        total_consumption,
        total_error,
        average_daily_error,
        error_percentage,
        high_error: error_percentage.abs() > high_error_threshold,
        offline_hours: calculator.total_hours(&report.offline),
        remarks: report
            .offline
            .iter()
            .map(|interval| remark(interval, &timezone.tz))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BarrelPlan, DeviceRequest, EngineConfig, Reconciler};
    use crate::period::DateRange;
    use crate::types::{DeviceCode, Granularity, RawOfflineInterval, RawReading};
    use chrono::{NaiveDate, TimeZone};

    fn raw(ts: &str, volume: f64, level: f64) -> RawReading {
        RawReading {
            timestamp: Some(ts.to_string()),
            dispensed_volume: Some(volume),
            remaining_level: Some(level),
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(EngineConfig::new(
            TimezoneConfig::fixed(chrono_tz::UTC),
            Granularity::Daily,
        ))
        .unwrap()
    }

    fn request() -> DeviceRequest {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        )
        .unwrap();
        DeviceRequest::new(
            DeviceCode::new("ZR-1"),
            range,
            vec![
                raw("2024-01-01 08:00:00", 0.0, 500.0),
                raw("2024-01-02 08:00:00", 90.0, 450.0),
                raw("2024-01-03 08:00:00", 110.0, 400.0),
            ],
        )
    }

    #[test]
    fn test_summary_scales_and_rates_error() {
        let reconciler = reconciler();
        let request = request()
            .with_barrel(BarrelPlan::Override(2))
            .with_customer_name(Some("North Depot".to_string()));
        let report = reconciler.reconcile(&request).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let summary = reconciler.summarize(&report, now);

        assert_eq!(summary.customer_name.as_deref(), Some("North Depot"));
        assert_eq!(summary.barrel_count, 2);
        assert_eq!(summary.total_order_volume, 200.0);
        assert_eq!(summary.single_barrel_consumption, 100.0);
        assert_eq!(summary.total_consumption, 200.0);
        assert_eq!(summary.total_error, 0.0);
        assert_eq!(summary.error_percentage, 0.0);
        assert!(!summary.high_error);
        assert_eq!(summary.offline_hours, 0.0);
    }

    #[test]
    fn test_summary_flags_high_error() {
        let reconciler = reconciler();
        let report = reconciler.reconcile(&request()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let summary = reconciler.summarize(&report, now);

        assert_eq!(summary.total_error, -100.0);
        assert_eq!(summary.average_daily_error, -25.0);
        assert_eq!(summary.error_percentage, -50.0);
        assert!(summary.high_error);
    }

    #[test]
    fn test_summary_uses_configured_threshold() {
        let config = EngineConfig::new(TimezoneConfig::fixed(chrono_tz::UTC), Granularity::Daily)
            .with_high_error_threshold(60.0);
        let reconciler = Reconciler::new(config).unwrap();
        let report = reconciler.reconcile(&request()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let summary = reconciler.summarize(&report, now);
        assert_eq!(summary.error_percentage, -50.0);
        assert!(!summary.high_error);

        let strict = summarize(&report, &TimezoneConfig::fixed(chrono_tz::UTC), 49.0, now);
        assert!(strict.high_error);
    }

    #[test]
    fn test_summary_offline_window_after_dst_gap() {
        let tz = TimezoneConfig::fixed("America/Santiago".parse().unwrap());
        let reconciler =
            Reconciler::new(EngineConfig::new(tz.clone(), Granularity::Daily)).unwrap();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 9, 8).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 8).unwrap(),
        )
        .unwrap();
        // Ongoing since the evening before; the day itself begins at 01:00 local
        let request = DeviceRequest::new(DeviceCode::new("ZR-9"), range, Vec::new()).with_offline(
            vec![RawOfflineInterval {
                device_code: "ZR-9".to_string(),
                start: "2024-09-07 20:00:00".to_string(),
                end: None,
                recovered: Some(false),
            }],
        );
        let report = reconciler.reconcile(&request).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 9, 8, 6, 0, 0).unwrap();
        let summary = reconciler.summarize(&report, now);
        assert_eq!(summary.offline_hours, 2.0);
    }

    #[test]
    fn test_summary_without_orders_has_zero_rate() {
        let reconciler = reconciler();
        let mut request = request();
        request.readings = vec![raw("2024-01-01 08:00:00", 0.0, 10.0)];
        let report = reconciler.reconcile(&request).unwrap();
        let summary = reconciler.summarize(&report, Utc::now());
        assert_eq!(summary.error_percentage, 0.0);
        assert!(!summary.high_error);
    }

    #[test]
    fn test_summary_offline_hours_and_remarks() {
        let reconciler = reconciler();
        let request = request().with_offline(vec![
            RawOfflineInterval {
                device_code: "ZR-1".to_string(),
                start: "2023-12-31 18:00:00".to_string(),
                end: Some("2024-01-01 06:00:00".to_string()),
                recovered: Some(true),
            },
            RawOfflineInterval {
                device_code: "ZR-1".to_string(),
                start: "2024-01-04 12:00:00".to_string(),
                end: None,
                recovered: None,
            },
        ]);
        let report = reconciler.reconcile(&request).unwrap();
        // ongoing outage runs to 23:59:59 on the last day
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let summary = reconciler.summarize(&report, now);

        let expected = 6.0 + (11.0 * 3600.0 + 59.0 * 60.0 + 59.0) / 3600.0;
        assert!((summary.offline_hours - expected).abs() < 1e-9);
        assert_eq!(
            summary.remarks,
            vec![
                "2023-12-31 18:00 offline until 2024-01-01 06:00".to_string(),
                "2024-01-04 12:00 offline, not recovered".to_string(),
            ]
        );
    }
}
