//! Reading source trait
//!
//! The engine never fetches data itself. A `ReadingSource` is the storage
//! collaborator that hands over a device's raw reading rows and its offline
//! records; the binary dispatches to whichever implementation is configured.

use crate::error::Result;
use crate::types::{DeviceCode, RawOfflineInterval, RawReading};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Trait for storage collaborators supplying raw device data.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// All device codes known to the source, sorted.
    async fn devices(&self) -> Result<Vec<DeviceCode>>;

    /// Stream a device's raw reading rows, in storage order.
    ///
    /// Implementations should include rows from before the report window when
    /// they have them; the engine uses the latest such row as the opening
    /// inventory.
    fn load_readings<'a>(
        &'a self,
        device: &'a DeviceCode,
    ) -> Pin<Box<dyn Stream<Item = Result<RawReading>> + Send + 'a>>;

    /// Offline records for one device.
    async fn load_offline(&self, device: &DeviceCode) -> Result<Vec<RawOfflineInterval>>;
}
