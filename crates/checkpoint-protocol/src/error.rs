//! Error types for the protocol layer.
//!
//! Each crate in Checkpoint defines its own error enum. A `ProtocolError`
//! always means the problem is in parsing or serialization, never in
//! hardware, networking, or the check-in flow itself.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// collaborator response that doesn't match the expected shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A session code that is not exactly four ASCII digits.
    ///
    /// Carries the rejected input so callers can log it. Session codes are
    /// short-lived and low-entropy, so logging them is not a secret leak.
    #[error("invalid session code {0:?}: expected exactly 4 decimal digits")]
    InvalidSessionCode(String),
}
