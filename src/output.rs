//! Output formatting module for tankrecon
//!
//! This module provides formatters for displaying reconciliation results in
//! different formats:
//! - Table format for human-readable terminal output
//! - JSON format for machine-readable output and integration with other tools
//!
//! Values reach this module at full precision; rounding happens here and only
//! for display.
//!
//! # Examples
//!
//! ```
//! use tankrecon::output::get_formatter;
//! use tankrecon::period::DateRange;
//! use tankrecon::period_types::Totals;
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let range = DateRange::new(day, day).unwrap();
//!
//! let formatter = get_formatter(true, false);
//! let output = formatter.format_summary(&[], &range, &Totals::default());
//! assert!(output.contains("\"devices\""));
//! ```

use crate::engine::DeviceReport;
use crate::period::DateRange;
use crate::period_types::{Classification, DeviceSummary, PeriodState, Totals};
use colored::Colorize;
use prettytable::{Cell, Row, Table, format, row};
use serde_json::json;

/// Trait for output formatters
///
/// Implementations can provide different output formats (table, JSON, CSV, etc.).
pub trait OutputFormatter {
    /// Format per-period reports, one block per device
    fn format_reports(&self, reports: &[DeviceReport]) -> String;

    /// Format the cross-device summary with totals
    fn format_summary(&self, data: &[DeviceSummary], range: &DateRange, totals: &Totals) -> String;
}

/// Table formatter for human-readable output
pub struct TableFormatter {
    /// Whether to color discrepancy labels
    pub color: bool,
}

impl TableFormatter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Round to two decimals and group thousands
    fn format_volume(value: f64) -> String {
        let formatted = format!("{:.2}", value.abs());
        let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

        let mut grouped = String::new();
        for (count, ch) in int_part.chars().rev().enumerate() {
            if count > 0 && count % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let int_grouped: String = grouped.chars().rev().collect();

        // -0.004 rounds to 0.00 and shows without a sign
        let negative = value < 0.0 && formatted.bytes().any(|b| (b'1'..=b'9').contains(&b));
        format!("{}{int_grouped}.{frac_part}", if negative { "-" } else { "" })
    }

    fn format_percentage(value: f64) -> String {
        format!("{value:.2}%")
    }

    fn label(&self, classification: Option<Classification>) -> String {
        let Some(classification) = classification else {
            return String::new();
        };
        let text = classification.to_string();
        if !self.color {
            return text;
        }
        match classification {
            Classification::Shortage => text.red().to_string(),
            Classification::Excess => text.yellow().to_string(),
            Classification::Balanced => text.green().to_string(),
        }
    }

    fn period_row(&self, period: &PeriodState) -> Row {
        let rec = period.reconciliation;
        row![
            period.key.to_string(),
            r -> Self::format_volume(period.start_inventory),
            r -> Self::format_volume(period.end_inventory),
            r -> Self::format_volume(period.refill_volume),
            r -> Self::format_volume(period.order_total),
            r -> Self::format_volume(period.consumption),
            r -> Self::format_volume(rec.map_or(0.0, |v| v.scaled_consumption)),
            r -> Self::format_volume(rec.map_or(0.0, |v| v.shortage_volume())),
            r -> Self::format_volume(rec.map_or(0.0, |v| v.excess_volume())),
            c -> self.label(period.classification())
        ]
    }

    /// Create a totals row for period tables
    fn format_totals_row(totals: &Totals) -> Row {
        row![
            b -> "TOTAL",
            "",
            "",
            b -> Self::format_volume(totals.refill_volume),
            b -> Self::format_volume(totals.order_total),
            b -> Self::format_volume(totals.consumption),
            b -> Self::format_volume(totals.scaled_consumption),
            b -> Self::format_volume(totals.shortage_volume),
            b -> Self::format_volume(totals.excess_volume),
            ""
        ]
    }

    fn format_report(&self, report: &DeviceReport) -> String {
        let mut out = format!(
            "Device {} ({} to {}, {}), barrels: {} ({})\n",
            report.device_code,
            report.range.start(),
            report.range.end(),
            report.granularity,
            report.multiplier,
            report.multiplier_source
        );
        if let Some(candidates) = &report.calibration {
            let scores: Vec<String> = candidates
                .iter()
                .map(|c| {
                    format!(
                        "{}={}",
                        c.multiplier,
                        Self::format_volume(c.total_absolute_error)
                    )
                })
                .collect();
            out.push_str(&format!("Calibration scores: {}\n", scores.join(", ")));
        }
        if !report.skipped.is_empty() {
            out.push_str(&format!("Skipped readings: {}\n", report.skipped.len()));
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![
            b -> "Period",
            b -> "Start",
            b -> "End",
            b -> "Refill",
            b -> "Orders",
            b -> "Consumption",
            b -> "Scaled",
            b -> "Shortage",
            b -> "Excess",
            b -> "Status"
        ]);

        for period in &report.periods {
            table.add_row(self.period_row(period));
        }

        // Add separator
        table.add_row(Row::new(vec![Cell::new(""); 10]));
        table.add_row(Self::format_totals_row(&report.totals));

        out.push_str(&table.to_string());
        out
    }
}

impl OutputFormatter for TableFormatter {
    fn format_reports(&self, reports: &[DeviceReport]) -> String {
        if reports.is_empty() {
            return "No devices to report.\n".to_string();
        }
        reports
            .iter()
            .map(|report| self.format_report(report))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_summary(&self, data: &[DeviceSummary], range: &DateRange, totals: &Totals) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![
            b -> "Device",
            b -> "Customer",
            b -> "Barrels",
            b -> "Orders",
            b -> "Single Barrel",
            b -> "Consumption",
            b -> "Error",
            b -> "Avg/Day",
            b -> "Error %",
            b -> "Offline h",
            b -> "Remarks"
        ]);

        for entry in data {
            let mut percentage = Self::format_percentage(entry.error_percentage);
            if entry.high_error && self.color {
                percentage = percentage.red().bold().to_string();
            } else if entry.high_error {
                percentage.push_str(" !");
            }
            table.add_row(row![
                entry.device_code,
                entry.customer_name.as_deref().unwrap_or(""),
                c -> entry.barrel_count,
                r -> Self::format_volume(entry.total_order_volume),
                r -> Self::format_volume(entry.single_barrel_consumption),
                r -> Self::format_volume(entry.total_consumption),
                r -> Self::format_volume(entry.total_error),
                r -> Self::format_volume(entry.average_daily_error),
                r -> percentage,
                r -> format!("{:.2}", entry.offline_hours),
                entry.remarks.join("\n")
            ]);
        }

        table.add_row(Row::new(vec![Cell::new(""); 11]));
        table.add_row(row![
            b -> "TOTAL",
            "",
            "",
            b -> Self::format_volume(totals.order_total),
            b -> Self::format_volume(totals.consumption),
            b -> Self::format_volume(totals.scaled_consumption),
            b -> Self::format_volume(totals.net_error),
            "",
            "",
            "",
            ""
        ]);

        format!(
            "Consumption summary {} to {}\n{}",
            range.start(),
            range.end(),
            table
        )
    }
}

/// JSON formatter for machine-readable output
///
/// All values are emitted at full precision.
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_reports(&self, reports: &[DeviceReport]) -> String {
        let output = json!({ "reports": reports });
        serde_json::to_string_pretty(&output).unwrap_or_default()
    }

    fn format_summary(&self, data: &[DeviceSummary], range: &DateRange, totals: &Totals) -> String {
        let output = json!({
            "range": {
                "start": range.start().to_string(),
                "end": range.end().to_string(),
                "days": range.days(),
            },
            "devices": data,
            "totals": totals,
        });
        serde_json::to_string_pretty(&output).unwrap_or_default()
    }
}

/// Get appropriate formatter based on JSON flag
///
/// `color` only affects the table formatter.
pub fn get_formatter(json: bool, color: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter::new(color))
    }
}
