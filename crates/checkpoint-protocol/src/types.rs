//! Core data types shared by every Checkpoint layer.
//!
//! These are read-only snapshots and ephemeral samples. None of them is
//! persisted by the core; the registry, the ledger, and the hardware layers
//! own their lifetimes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identifier newtypes
// ---------------------------------------------------------------------------

/// Registry-assigned identifier of an attendance session.
///
/// Newtype over `String` so it can't be confused with a classroom or a
/// registration id in function signatures. `#[serde(transparent)]` keeps the
/// wire form a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a registry id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A physical location a beacon is installed at (e.g. `"C-101"`).
///
/// Sessions name the classroom they require; decoded beacon payloads name
/// the classroom they were heard from. Equality between the two is the
/// whole location check, so comparison is exact (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(String);

impl LocationId {
    /// Wraps a location name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw location name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Immutable student identifier issued at enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(String);

impl RegistrationId {
    /// Wraps a registration id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw registration id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionCode
// ---------------------------------------------------------------------------

/// A 4-digit session code, validated at construction.
///
/// The only way to get a `SessionCode` is through [`SessionCode::parse`],
/// so holding one proves the format check already passed. Serde goes
/// through the same check (`try_from = "String"`), so a malformed code in
/// a registry document fails to decode instead of sneaking in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionCode(String);

impl SessionCode {
    /// Number of digits in a session code.
    pub const LEN: usize = 4;

    /// Parses a session code: exactly four ASCII decimal digits.
    ///
    /// No trimming and no Unicode digits; `" 1234"` and `"١٢٣٤"` are
    /// both rejected.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidSessionCode`] for anything else.
    pub fn parse(code: &str) -> Result<Self, ProtocolError> {
        let well_formed = code.len() == Self::LEN
            && code.bytes().all(|b| b.is_ascii_digit());
        if well_formed {
            Ok(Self(code.to_owned()))
        } else {
            Err(ProtocolError::InvalidSessionCode(code.to_owned()))
        }
    }

    /// The code as typed.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionCode> for String {
    fn from(code: SessionCode) -> Self {
        code.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionRef
// ---------------------------------------------------------------------------

/// Whether an attendance session still accepts check-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Inactive,
}

/// Read-only snapshot of a session, taken at code-resolution time.
///
/// The registry owns the real record. The core never writes back through
/// a `SessionRef`; if the instructor ends the session mid-attempt, this
/// snapshot does not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRef {
    pub id: SessionId,
    pub code: SessionCode,
    pub course_name: String,
    /// The classroom whose beacon the student must be near.
    pub classroom_id: LocationId,
    pub status: SessionStatus,
}

impl SessionRef {
    /// Returns `true` if the session was active when this snapshot was taken.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

// ---------------------------------------------------------------------------
// Sensor samples
// ---------------------------------------------------------------------------

/// One beacon advertisement, reduced to what the proximity rule needs.
///
/// Ephemeral: produced per advertisement, classified immediately, dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSample {
    /// Received signal strength in dBm. Less negative means closer.
    pub rssi: i16,
    /// Location decoded from the advertisement payload, if any.
    pub location_hint: Option<LocationId>,
    pub timestamp_ms: u64,
}

/// Facial landmark and expression scores for one processed camera frame.
///
/// Eye-closure scores are blendshape-style values in `[0, 1]`, where 1 is
/// fully closed. Either side may be missing when the landmarker can't see
/// that eye.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub face_found: bool,
    pub eye_closure_left: Option<f32>,
    pub eye_closure_right: Option<f32>,
    pub timestamp_ms: u64,
}

impl LandmarkFrame {
    /// A frame with a face and both eye scores.
    pub fn with_face(left: f32, right: f32, timestamp_ms: u64) -> Self {
        Self {
            face_found: true,
            eye_closure_left: Some(left),
            eye_closure_right: Some(right),
            timestamp_ms,
        }
    }

    /// A frame where no face was found.
    pub fn no_face(timestamp_ms: u64) -> Self {
        Self {
            face_found: false,
            eye_closure_left: None,
            eye_closure_right: None,
            timestamp_ms,
        }
    }

    /// Combined eye-closure score: the mean of the available sides, clamped
    /// to `[0, 1]`.
    ///
    /// Returns `None` when no face was found, when neither side is present,
    /// or when a present score is NaN.
    pub fn closure_score(&self) -> Option<f32> {
        if !self.face_found {
            return None;
        }
        let score = match (self.eye_closure_left, self.eye_closure_right) {
            (Some(l), Some(r)) => (l + r) / 2.0,
            (Some(one), None) | (None, Some(one)) => one,
            (None, None) => return None,
        };
        if score.is_nan() {
            return None;
        }
        Some(score.clamp(0.0, 1.0))
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The verified identity of a student, as reported by the remote matcher.
///
/// Fields are private and there are no setters: once created, an identity
/// never changes. The registration id in particular is carried through to
/// the attendance ledger unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    display_name: String,
    registration_id: RegistrationId,
}

impl Identity {
    /// Creates an identity.
    pub fn new(
        display_name: impl Into<String>,
        registration_id: RegistrationId,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            registration_id,
        }
    }

    /// Human-readable name for display.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The immutable student identifier.
    pub fn registration_id(&self) -> &RegistrationId {
        &self.registration_id
    }
}
