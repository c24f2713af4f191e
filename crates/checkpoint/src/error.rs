//! Unified error type for Checkpoint.

use checkpoint_attempt::{CheckInError, StepError};
use checkpoint_hardware::HardwareError;
use checkpoint_identity::{LedgerError, MatcherError};
use checkpoint_protocol::ProtocolError;
use checkpoint_session::{RegistryError, SessionError};

/// Top-level error that wraps every crate's error.
///
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Parsing or serialization (codes, configs, matcher bodies).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Session lifecycle (open, end).
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// An event the state machine refused.
    #[error(transparent)]
    Step(#[from] StepError),

    /// A command the attempt actor refused or couldn't take.
    #[error(transparent)]
    CheckIn(#[from] CheckInError),
}

#[cfg(test)]
mod tests {
    use checkpoint_attempt::{AttemptId, CheckInPhase};
    use checkpoint_protocol::SessionId;

    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidSessionCode("12a4".into());
        let checkpoint_err: CheckpointError = err.into();
        assert!(matches!(checkpoint_err, CheckpointError::Protocol(_)));
        assert!(checkpoint_err.to_string().contains("12a4"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotFound(SessionId::new("session-9"));
        let checkpoint_err: CheckpointError = err.into();
        assert!(matches!(checkpoint_err, CheckpointError::Session(_)));
        assert!(checkpoint_err.to_string().contains("session-9"));
    }

    #[test]
    fn test_from_hardware_error() {
        let checkpoint_err: CheckpointError = HardwareError::Disconnected.into();
        assert!(matches!(checkpoint_err, CheckpointError::Hardware(_)));
    }

    #[test]
    fn test_from_ledger_error() {
        let checkpoint_err: CheckpointError = LedgerError::Unreachable("503".into()).into();
        assert!(matches!(checkpoint_err, CheckpointError::Ledger(_)));
    }

    #[test]
    fn test_from_check_in_error() {
        let err = CheckInError::Unavailable(AttemptId(4));
        let checkpoint_err: CheckpointError = err.into();
        assert!(matches!(checkpoint_err, CheckpointError::CheckIn(_)));
        assert!(checkpoint_err.to_string().contains("attempt-4"));
    }

    #[test]
    fn test_from_step_error() {
        let err = StepError::OutOfPhase {
            phase: CheckInPhase::Liveness,
            event: "proximity event",
        };
        let checkpoint_err: CheckpointError = err.into();
        assert!(checkpoint_err.to_string().contains("liveness"));
    }
}
