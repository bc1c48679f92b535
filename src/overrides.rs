//! Barrel-count overrides
//!
//! Devices with more than one barrel behind a sensor are listed in a CSV file
//! with `device_code` and `barrel_count` columns. Devices not listed are
//! single-barrel unless calibrated. An optional `customer_name` column names
//! the customer a cabinet is installed for.

use crate::error::{Result, TankReconError};
use crate::types::DeviceCode;
use csv::StringRecord;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

const DEVICE_COLUMN: &str = "device_code";
const COUNT_COLUMN: &str = "barrel_count";
const CUSTOMER_COLUMN: &str = "customer_name";

/// Known barrel counts keyed by device
#[derive(Debug, Clone, Default)]
pub struct BarrelOverrides {
    counts: HashMap<DeviceCode, u32>,
    customers: HashMap<DeviceCode, String>,
}

impl BarrelOverrides {
    /// Load overrides from a CSV file
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            TankReconError::Config(format!(
                "Failed to open overrides file {}: {e}",
                path.display()
            ))
        })?;
        let overrides = Self::from_reader(file)?;
        debug!(
            "Loaded {} barrel-count overrides from {}",
            overrides.len(),
            path.display()
        );
        Ok(overrides)
    }

    /// Parse overrides from CSV text with a header row
    ///
    /// Rows with a blank device code are skipped, as are blank or non-numeric
    /// counts. A count below 1, or with a fractional part, is an error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let device_idx = column(&headers, DEVICE_COLUMN)?;
        let count_idx = column(&headers, COUNT_COLUMN)?;
        let customer_idx = headers.iter().position(|h| h == CUSTOMER_COLUMN);

        let mut counts = HashMap::new();
        let mut customers = HashMap::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let device = record.get(device_idx).unwrap_or("");
            if device.is_empty() {
                continue;
            }
            let code = DeviceCode::new(device);

            let customer = customer_idx.and_then(|idx| record.get(idx));
            if let Some(name) = customer.filter(|name| !name.is_empty()) {
                customers.insert(code.clone(), name.to_string());
            }

            let raw_count = record.get(count_idx).unwrap_or("");
            if raw_count.is_empty() {
                continue;
            }
            let Some(count) = parse_count(raw_count, device)? else {
                warn!(
                    "Skipping override row {} for {}: barrel count '{}' is not a number",
                    row + 1,
                    device,
                    raw_count
                );
                continue;
            };
            counts.insert(code, count);
        }

        Ok(Self { counts, customers })
    }

    pub fn get(&self, device: &DeviceCode) -> Option<u32> {
        self.counts.get(device).copied()
    }

    /// Customer the device is installed for, if listed
    pub fn customer(&self, device: &DeviceCode) -> Option<&str> {
        self.customers.get(device).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        TankReconError::Config(format!("Overrides file is missing column '{name}'"))
    })
}

/// `Ok(None)` for blank or non-numeric input
fn parse_count(raw: &str, device: &str) -> Result<Option<u32>> {
    let Ok(value) = raw.parse::<f64>() else {
        return Ok(None);
    };
    if !value.is_finite() {
        return Ok(None);
    }
    if value < 1.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(TankReconError::Config(format!(
            "Invalid barrel count '{raw}' for device {device}"
        )));
    }
    Ok(Some(value as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parses_counts_and_skips_blanks() {
        let csv = "device_code,barrel_count\nZR-1,3\nZR-2,\nZR-3,n/a\n ZR-4 , 2.0 \n,5\n";
        let overrides = BarrelOverrides::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get(&DeviceCode::new("ZR-1")), Some(3));
        assert_eq!(overrides.get(&DeviceCode::new("ZR-4")), Some(2));
        assert_eq!(overrides.get(&DeviceCode::new("ZR-2")), None);
    }

    #[test]
    fn test_customer_names_are_optional() {
        let csv = "device_code,barrel_count,customer_name\n\
                   ZR-1,2,North Depot\n\
                   ZR-2,,Harbour Yard\n\
                   ZR-3,1,\n";
        let overrides = BarrelOverrides::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(overrides.customer(&DeviceCode::new("ZR-1")), Some("North Depot"));
        assert_eq!(overrides.customer(&DeviceCode::new("ZR-2")), Some("Harbour Yard"));
        assert_eq!(overrides.get(&DeviceCode::new("ZR-2")), None);
        assert_eq!(overrides.customer(&DeviceCode::new("ZR-3")), None);
        assert_eq!(overrides.len(), 2);

        let overrides =
            BarrelOverrides::from_reader("device_code,barrel_count\nZR-1,2\n".as_bytes()).unwrap();
        assert_eq!(overrides.customer(&DeviceCode::new("ZR-1")), None);
    }

    #[test]
    fn test_zero_count_is_config_error() {
        let csv = "device_code,barrel_count\nZR-1,0\n";
        let err = BarrelOverrides::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TankReconError::Config(_)));

        let csv = "device_code,barrel_count\nZR-1,1.5\n";
        assert!(BarrelOverrides::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_column() {
        let csv = "device,count\nZR-1,2\n";
        let err = BarrelOverrides::from_reader(csv.as_bytes()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("barrel_count") || message.contains("device_code"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "barrel_count,device_code").unwrap();
        writeln!(file, "4,ZR-9").unwrap();
        let overrides = BarrelOverrides::load(file.path()).unwrap();
        assert_eq!(overrides.get(&DeviceCode::new("ZR-9")), Some(4));

        assert!(BarrelOverrides::load(Path::new("/no/such/overrides.csv")).is_err());
    }
}
