//! Beacon proximity detection for Checkpoint.
//!
//! Phase two of a check-in: is the student near the beacon installed in
//! the session's classroom? The [`ProximityDetector`] pairs with a beacon
//! through a [`BeaconRadio`](checkpoint_hardware::BeaconRadio), turns each
//! advertisement into a [`SignalSample`](checkpoint_protocol::SignalSample)
//! (decoding iBeacon payloads through a [`BeaconDirectory`]), and
//! [`classify`]s it.
//!
//! ```text
//! Advertisement ──decode──→ SignalSample ──classify──→ ProximityEvent
//!                 (IBeacon +                           InRange / OutOfRange /
//!                  directory)                          WrongLocation / Unavailable
//! ```

mod detector;
mod event;
mod ibeacon;

pub use detector::{ProximityDetector, ProximityScan};
pub use event::{
    MANUAL_OVERRIDE_RSSI_DBM, Presence, PresenceSource, ProximityEvent, RSSI_THRESHOLD_DBM,
    classify,
};
pub use ibeacon::{BeaconDirectory, IBeacon};
