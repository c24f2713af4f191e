//! Error types for the identity layer.

use checkpoint_protocol::ProtocolError;

/// Failure talking to the [`RemoteMatcher`](crate::RemoteMatcher).
///
/// Verification never surfaces this directly; it becomes
/// [`VerifyResult::TransportError`](crate::VerifyResult::TransportError).
#[derive(Debug, Clone, thiserror::Error)]
pub enum MatcherError {
    /// The matcher could not be reached.
    #[error("face matcher unreachable: {0}")]
    Unreachable(String),

    /// The matcher answered with a server-side failure.
    #[error("face matcher failed with status {status}: {detail}")]
    Failed { status: u16, detail: String },

    /// The response body didn't have the expected shape.
    #[error("malformed matcher response: {0}")]
    MalformedResponse(String),
}

impl From<ProtocolError> for MatcherError {
    fn from(err: ProtocolError) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Failure talking to an [`AttendanceLedger`](crate::AttendanceLedger).
///
/// A ledger failure never reverts a confirmed check-in; callers log it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("attendance ledger unreachable: {0}")]
    Unreachable(String),
}
