//! iBeacon payload decoding and the beacon directory.
//!
//! An iBeacon advertises a manufacturer-data section under Apple's company
//! id. After the company id the payload is:
//!
//! ```text
//! 0      1      2 ........... 17  18  19  20  21  22
//! ┌──────┬──────┬───────────────┬───────┬───────┬─────┐
//! │ 0x02 │ 0x15 │ proximity UUID│ major │ minor │power│
//! └──────┴──────┴───────────────┴───────┴───────┴─────┘
//!  type   len    16 bytes        u16 BE  u16 BE   i8
//! ```
//!
//! Deployments number their beacons with `(major, minor)`; the
//! [`BeaconDirectory`] maps those pairs to classrooms.

use std::collections::HashMap;

use checkpoint_hardware::ManufacturerData;
use checkpoint_protocol::LocationId;

/// A decoded iBeacon frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IBeacon {
    pub proximity_uuid: [u8; 16],
    pub major: u16,
    pub minor: u16,
    /// Calibrated RSSI at one metre, in dBm.
    pub measured_power: i8,
}

impl IBeacon {
    /// Apple's Bluetooth SIG company identifier.
    pub const COMPANY_ID: u16 = 0x004C;
    const BEACON_TYPE: u8 = 0x02;
    const PAYLOAD_LEN: u8 = 0x15;
    const FRAME_LEN: usize = 2 + Self::PAYLOAD_LEN as usize;

    /// Decodes an iBeacon frame. `None` for any other manufacturer data.
    pub fn decode(section: &ManufacturerData) -> Option<Self> {
        if section.company_id != Self::COMPANY_ID {
            return None;
        }
        let data = section.data.as_slice();
        if data.len() != Self::FRAME_LEN
            || data[0] != Self::BEACON_TYPE
            || data[1] != Self::PAYLOAD_LEN
        {
            return None;
        }

        let mut proximity_uuid = [0u8; 16];
        proximity_uuid.copy_from_slice(&data[2..18]);
        Some(Self {
            proximity_uuid,
            major: u16::from_be_bytes([data[18], data[19]]),
            minor: u16::from_be_bytes([data[20], data[21]]),
            measured_power: i8::from_be_bytes([data[22]]),
        })
    }

    /// Encodes this frame as a manufacturer-data section.
    pub fn encode(&self) -> ManufacturerData {
        let mut data = Vec::with_capacity(Self::FRAME_LEN);
        data.push(Self::BEACON_TYPE);
        data.push(Self::PAYLOAD_LEN);
        data.extend_from_slice(&self.proximity_uuid);
        data.extend_from_slice(&self.major.to_be_bytes());
        data.extend_from_slice(&self.minor.to_be_bytes());
        data.extend_from_slice(&self.measured_power.to_be_bytes());
        ManufacturerData {
            company_id: Self::COMPANY_ID,
            data,
        }
    }
}

/// Maps beacon `(major, minor)` pairs to classrooms.
///
/// When a proximity UUID is set, beacons from other deployments are
/// ignored even if their numbers collide with ours.
#[derive(Debug, Clone, Default)]
pub struct BeaconDirectory {
    proximity_uuid: Option<[u8; 16]>,
    rooms: HashMap<(u16, u16), LocationId>,
}

impl BeaconDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept beacons advertising this UUID.
    pub fn with_proximity_uuid(mut self, uuid: [u8; 16]) -> Self {
        self.proximity_uuid = Some(uuid);
        self
    }

    /// Registers the classroom a beacon is installed in.
    pub fn with_room(mut self, major: u16, minor: u16, location: impl Into<LocationId>) -> Self {
        self.insert(major, minor, location.into());
        self
    }

    pub fn insert(&mut self, major: u16, minor: u16, location: LocationId) {
        self.rooms.insert((major, minor), location);
    }

    /// The classroom `beacon` is installed in, if it is one of ours.
    pub fn lookup(&self, beacon: &IBeacon) -> Option<&LocationId> {
        if self
            .proximity_uuid
            .is_some_and(|uuid| uuid != beacon.proximity_uuid)
        {
            return None;
        }
        self.rooms.get(&(beacon.major, beacon.minor))
    }

    /// Resolves the first decodable, mapped section of an advertisement.
    pub fn location_hint(&self, sections: &[ManufacturerData]) -> Option<LocationId> {
        sections
            .iter()
            .filter_map(IBeacon::decode)
            .find_map(|beacon| self.lookup(&beacon).cloned())
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
