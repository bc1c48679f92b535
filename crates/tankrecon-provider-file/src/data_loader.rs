//! File data loader
//!
//! Reads exported device data from a directory laid out as
//!
//! ```text
//! <root>/readings/<device_code>.jsonl   one RawReading per line
//! <root>/offline.jsonl                  one RawOfflineInterval per line
//! ```
//!
//! Lines that are blank or not valid JSON are skipped with a warning; they
//! never abort a device.

use async_trait::async_trait;
use futures::stream::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tankrecon_core::error::{Result, TankReconError};
use tankrecon_core::provider::ReadingSource;
use tankrecon_core::types::{DeviceCode, RawOfflineInterval, RawReading};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const READINGS_DIR: &str = "readings";
const OFFLINE_FILE: &str = "offline.jsonl";

/// Data loader for exported JSONL device data.
pub struct DataLoader {
    root: PathBuf,
}

impl DataLoader {
    /// Create a loader rooted at `root`
    ///
    /// Fails when `root` does not exist; a missing `readings/` directory or
    /// `offline.jsonl` is treated as "no data".
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(TankReconError::Config(format!(
                "Data directory not found: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn readings_dir(&self) -> PathBuf {
        self.root.join(READINGS_DIR)
    }

    fn readings_path(&self, device: &DeviceCode) -> PathBuf {
        self.readings_dir().join(format!("{}.jsonl", device.as_str()))
    }
}

#[async_trait]
impl ReadingSource for DataLoader {
    async fn devices(&self) -> Result<Vec<DeviceCode>> {
        let dir = self.readings_dir();
        if !dir.exists() {
            debug!("Readings directory not found: {}", dir.display());
            return Ok(Vec::new());
        }

        let mut devices = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    devices.push(DeviceCode::new(stem));
                }
            }
        }
        devices.sort();
        debug!("Found {} device reading files", devices.len());
        Ok(devices)
    }

    fn load_readings<'a>(
        &'a self,
        device: &'a DeviceCode,
    ) -> Pin<Box<dyn Stream<Item = Result<RawReading>> + Send + 'a>> {
        Box::pin(async_stream::try_stream! {
            let path = self.readings_path(device);
            if !path.exists() {
                Err::<(), _>(TankReconError::UnknownDevice(device.clone()))?;
            }

            let rows: Vec<RawReading> = read_jsonl(&path).await?;
            debug!("Loaded {} raw readings for {}", rows.len(), device);
            for row in rows {
                yield row;
            }
        })
    }

    async fn load_offline(&self, device: &DeviceCode) -> Result<Vec<RawOfflineInterval>> {
        let path = self.root.join(OFFLINE_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let records: Vec<RawOfflineInterval> = read_jsonl(&path).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.device_code == device.as_str())
            .collect())
    }
}

/// Parse every well-formed JSON line of `path` into `T`
async fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        TankReconError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let mut rows = Vec::new();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!("Skipping line {} of {}: {}", line_no, path.display(), e);
            }
        }
    }
    Ok(rows)
}
