//! Error types for the session layer.

use checkpoint_protocol::SessionId;

/// Failure talking to a [`SessionRegistry`](crate::SessionRegistry).
///
/// Validation never surfaces this directly; it becomes
/// [`ValidationResult::TransportError`](crate::ValidationResult::TransportError).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// The registry could not be reached (network down, backend offline).
    #[error("session registry unreachable: {0}")]
    Unreachable(String),
}

/// Errors from managing sessions in the [`InMemoryRegistry`](crate::InMemoryRegistry).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists with this id.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session was already ended.
    #[error("session {0} is already inactive")]
    AlreadyEnded(SessionId),

    /// Every 4-digit code is held by an active session.
    /// With 9000 codes this means the registry is being abused, not used.
    #[error("no unused session codes left")]
    CodesExhausted,
}
