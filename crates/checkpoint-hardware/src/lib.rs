//! Hardware abstraction layer for Checkpoint.
//!
//! Checkpoint never talks to Bluetooth or camera APIs directly. It consumes
//! two narrow traits:
//!
//! - [`BeaconRadio`]: pair with a classroom beacon and watch its
//!   advertisements.
//! - [`Camera`] / [`FrameFeed`]: stream landmark frames and capture a
//!   still for identity matching.
//!
//! Watches are explicit [`Subscription`] objects with `cancel()`, and a
//! [`SensorArbiter`] hands out one [`SensorLease`] at a time so two phases
//! never hold hardware at once.
//!
//! # Feature Flags
//!
//! - `sim` (default): [`sim::ScriptedRadio`] and [`sim::ScriptedCamera`]

#![allow(async_fn_in_trait)]

mod arbiter;
mod camera;
mod error;
mod radio;
#[cfg(feature = "sim")]
pub mod sim;
mod subscription;

pub use arbiter::{SensorArbiter, SensorKind, SensorLease};
pub use camera::{Camera, FrameFeed};
pub use error::HardwareError;
pub use radio::{Advertisement, BeaconRadio, DeviceFilter, DeviceId, ManufacturerData};
pub use subscription::{Subscription, SubscriptionSink, subscription};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_display() {
        assert_eq!(DeviceId::new(7).to_string(), "beacon-7");
    }

    #[test]
    fn test_device_filter_default_matches_classroom_beacons() {
        let filter = DeviceFilter::default();
        assert!(filter.names.iter().any(|n| n == "MBeacon"));
        assert_eq!(filter.services, vec![0xFDA5]);
    }

    #[test]
    fn test_hardware_error_display() {
        let err = HardwareError::Busy("radio".into());
        assert_eq!(err.to_string(), "sensor busy: held by radio");
    }
}
