//! Error types for the attempt layer.

use checkpoint_protocol::SessionId;

use crate::{AttemptId, CheckInPhase};

/// An event the pure state machine refused.
///
/// The attempt is unchanged when one of these comes back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// The event belongs to a phase the attempt isn't in.
    #[error("{event} is not accepted in phase {phase}")]
    OutOfPhase {
        phase: CheckInPhase,
        event: &'static str,
    },

    /// A session snapshot that was no longer accepting check-ins.
    #[error("session {0} is not active")]
    InactiveSession(SessionId),
}

/// Errors returned to callers of a [`CheckInHandle`](crate::CheckInHandle).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckInError {
    #[error(transparent)]
    Step(#[from] StepError),

    /// The actor is waiting on a collaborator and only takes `cancel` or
    /// `status` until it answers.
    #[error("attempt is busy in phase {0}")]
    Busy(CheckInPhase),

    /// `manual_override` while the config forbids it.
    #[error("manual proximity override is disabled")]
    ManualOverrideDisabled,

    /// `retry` while nothing is stalled.
    #[error("nothing to retry in phase {0}")]
    NothingToRetry(CheckInPhase),

    /// The actor task has stopped.
    #[error("check-in attempt {0} is unavailable")]
    Unavailable(AttemptId),
}
