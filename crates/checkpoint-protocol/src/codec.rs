//! Codec trait and implementations for serializing protocol types.
//!
//! The core owns no wire format: persistence and transport belong to the
//! collaborators. Surfaces built on top (a kiosk UI, a log shipper, the demo
//! binary) still need to turn updates and configs into bytes, and they do it
//! through the [`Codec`] trait so the format can be swapped without touching
//! the core.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because codecs are shared by long-lived async
/// tasks (one check-in actor per attempt).
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use checkpoint_protocol::{Codec, JsonCodec, LocationId, SignalSample};
///
/// let codec = JsonCodec;
/// let sample = SignalSample {
///     rssi: -70,
///     location_hint: Some(LocationId::new("C-101")),
///     timestamp_ms: 1_000,
/// };
///
/// let bytes = codec.encode(&sample).unwrap();
/// let decoded: SignalSample = codec.decode(&bytes).unwrap();
/// assert_eq!(sample, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
