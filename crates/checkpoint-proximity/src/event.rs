//! Classified proximity events and the classification rule.

use checkpoint_hardware::HardwareError;
use checkpoint_protocol::{LocationId, SignalSample};
use serde::Serialize;

/// Samples must be strictly stronger than this to count as in range.
pub const RSSI_THRESHOLD_DBM: i16 = -80;

/// Signal value reported by a manual override.
pub const MANUAL_OVERRIDE_RSSI_DBM: i16 = -65;

/// How presence was established.
///
/// Only [`PresenceSource::Measured`] is backed by a signal-strength
/// reading. Surfaces must render the other two differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceSource {
    /// An advertisement above the threshold, from the right room.
    Measured,
    /// The platform can't watch advertisements; the device link stands in.
    LinkFallback,
    /// Entered by hand, no hardware involved.
    ManualOverride,
}

/// Evidence that the student is near the classroom beacon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presence {
    /// `None` when no reading backs the presence.
    pub rssi: Option<i16>,
    pub location: Option<LocationId>,
    pub source: PresenceSource,
}

/// One classified observation from a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProximityEvent {
    InRange(Presence),
    /// Too weak, or not attributable to the required room. Keep scanning.
    OutOfRange { rssi: i16 },
    /// A beacon from another room. Terminal for the scan.
    WrongLocation {
        expected: LocationId,
        observed: LocationId,
    },
    /// The radio couldn't be used at all. Terminal for the scan.
    Unavailable(HardwareError),
}

impl ProximityEvent {
    /// Whether the scan ends after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WrongLocation { .. } | Self::Unavailable(_))
    }

    pub fn is_in_range(&self) -> bool {
        matches!(self, Self::InRange(_))
    }
}

/// Classifies one signal sample.
///
/// Rules, in order:
/// 1. a location hint that differs from `required` → `WrongLocation`,
///    however strong the signal;
/// 2. `rssi > -80` and (`required` unset, or the hint equals it) →
///    `InRange`;
/// 3. anything else → `OutOfRange`. This includes strong samples with no
///    hint when a room is required: an unidentified beacon proves nothing
///    about which room it is in.
pub fn classify(sample: &SignalSample, required: Option<&LocationId>) -> ProximityEvent {
    if let (Some(expected), Some(observed)) = (required, sample.location_hint.as_ref()) {
        if expected != observed {
            return ProximityEvent::WrongLocation {
                expected: expected.clone(),
                observed: observed.clone(),
            };
        }
    }

    let location_ok = match required {
        None => true,
        Some(expected) => sample.location_hint.as_ref() == Some(expected),
    };

    if sample.rssi > RSSI_THRESHOLD_DBM && location_ok {
        ProximityEvent::InRange(Presence {
            rssi: Some(sample.rssi),
            location: sample.location_hint.clone(),
            source: PresenceSource::Measured,
        })
    } else {
        ProximityEvent::OutOfRange { rssi: sample.rssi }
    }
}
