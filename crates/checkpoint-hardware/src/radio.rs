//! Beacon radio abstraction.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::{HardwareError, Subscription};

/// Opaque identifier for a paired beacon device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(u64);

impl DeviceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "beacon-{}", self.0)
    }
}

/// Which devices the platform's chooser should offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Advertised device names to accept.
    pub names: Vec<String>,
    /// 16-bit GATT service UUIDs to accept.
    pub services: Vec<u16>,
}

impl Default for DeviceFilter {
    /// Matches the classroom beacons Checkpoint is deployed with.
    fn default() -> Self {
        Self {
            names: vec!["MBeacon".into(), "mbeacon".into()],
            services: vec![0xFDA5],
        }
    }
}

/// One manufacturer-specific data section of an advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerData {
    /// Bluetooth SIG company identifier.
    pub company_id: u16,
    pub data: Vec<u8>,
}

/// A received advertisement packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Received signal strength in dBm.
    pub rssi: i16,
    pub manufacturer_data: Vec<ManufacturerData>,
    pub timestamp_ms: u64,
}

/// Access to a Bluetooth beacon radio.
///
/// `Send + Sync + 'static` so one radio can serve every attempt on a
/// station.
pub trait BeaconRadio: Send + Sync + 'static {
    /// Asks the platform for a beacon device matching `filter`. On success
    /// the device link is established.
    ///
    /// # Errors
    /// [`HardwareError::PermissionDenied`] when the user dismisses the
    /// chooser or the platform refuses Bluetooth.
    fn request_device(
        &self,
        filter: &DeviceFilter,
    ) -> impl Future<Output = Result<DeviceId, HardwareError>> + Send;

    /// Starts passively watching advertisements from `device`.
    ///
    /// # Errors
    /// [`HardwareError::Unsupported`] when the platform can't watch
    /// advertisements. The link from [`request_device`](Self::request_device)
    /// still stands.
    fn watch_advertisements(
        &self,
        device: DeviceId,
    ) -> impl Future<Output = Result<Subscription<Advertisement>, HardwareError>> + Send;
}

impl<R: BeaconRadio> BeaconRadio for Arc<R> {
    fn request_device(
        &self,
        filter: &DeviceFilter,
    ) -> impl Future<Output = Result<DeviceId, HardwareError>> + Send {
        (**self).request_device(filter)
    }

    fn watch_advertisements(
        &self,
        device: DeviceId,
    ) -> impl Future<Output = Result<Subscription<Advertisement>, HardwareError>> + Send {
        (**self).watch_advertisements(device)
    }
}
