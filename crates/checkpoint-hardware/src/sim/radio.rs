use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::{
    Advertisement, BeaconRadio, DeviceFilter, DeviceId, HardwareError, Subscription, subscription,
};

/// Counter for generating device ids.
static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// A beacon radio that replays a fixed advertisement script.
///
/// Every watch replays the whole script from the start, each step after
/// its delay, then stays open (silent) until cancelled, like a real radio
/// whose beacon went quiet.
///
/// ```rust
/// use std::time::Duration;
/// use checkpoint_hardware::sim::ScriptedRadio;
///
/// let radio = ScriptedRadio::new()
///     .advertise_rssi(Duration::from_millis(100), -90)
///     .advertise_rssi(Duration::from_millis(100), -70);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedRadio {
    script: Vec<(Duration, Advertisement)>,
    deny_permission: bool,
    watch_unsupported: bool,
    device_requests: Arc<AtomicUsize>,
    active_watches: Arc<AtomicUsize>,
}

impl ScriptedRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an advertisement delivered `delay` after the previous step.
    pub fn advertise(mut self, delay: Duration, advertisement: Advertisement) -> Self {
        self.script.push((delay, advertisement));
        self
    }

    /// Appends an advertisement without manufacturer data.
    pub fn advertise_rssi(self, delay: Duration, rssi: i16) -> Self {
        let timestamp_ms = self.next_timestamp_ms(delay);
        self.advertise(
            delay,
            Advertisement {
                rssi,
                manufacturer_data: Vec::new(),
                timestamp_ms,
            },
        )
    }

    /// `request_device` fails with [`HardwareError::PermissionDenied`].
    pub fn deny_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// `watch_advertisements` fails with [`HardwareError::Unsupported`].
    pub fn without_advertisement_watching(mut self) -> Self {
        self.watch_unsupported = true;
        self
    }

    /// How many times a device was requested.
    pub fn device_requests(&self) -> usize {
        self.device_requests.load(Ordering::SeqCst)
    }

    /// Watches still running (not yet cancelled).
    pub fn active_watches(&self) -> usize {
        self.active_watches.load(Ordering::SeqCst)
    }

    fn next_timestamp_ms(&self, delay: Duration) -> u64 {
        let elapsed: Duration = self.script.iter().map(|(d, _)| *d).sum();
        (elapsed + delay).as_millis() as u64
    }
}

impl BeaconRadio for ScriptedRadio {
    async fn request_device(&self, filter: &DeviceFilter) -> Result<DeviceId, HardwareError> {
        self.device_requests.fetch_add(1, Ordering::SeqCst);
        if self.deny_permission {
            return Err(HardwareError::PermissionDenied(
                "user cancelled the device chooser".into(),
            ));
        }
        let id = DeviceId::new(NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(device = %id, names = ?filter.names, "simulated beacon paired");
        Ok(id)
    }

    async fn watch_advertisements(
        &self,
        device: DeviceId,
    ) -> Result<Subscription<Advertisement>, HardwareError> {
        if self.watch_unsupported {
            return Err(HardwareError::Unsupported(
                "advertisement watching not available".into(),
            ));
        }

        let (sink, sub) = subscription(16);
        let script = self.script.clone();
        let active = Arc::clone(&self.active_watches);
        active.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            for (delay, advertisement) in script {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = sink.closed() => break,
                }
                if !sink.send(advertisement).await {
                    break;
                }
            }
            sink.closed().await;
            active.fetch_sub(1, Ordering::SeqCst);
            tracing::trace!(%device, "simulated watch ended");
        });

        Ok(sub)
    }
}
