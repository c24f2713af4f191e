//! The pure check-in state machine.
//!
//! [`CheckInAttempt`] holds no hardware and does no I/O. It takes already
//! classified outcomes (a [`ValidationResult`], a [`ProximityEvent`], a
//! [`VerifyResult`]) and decides what they mean for the attempt. The actor
//! in [`crate::actor`] feeds it; tests can drive it directly.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use checkpoint_identity::VerifyResult;
use checkpoint_protocol::{Identity, LocationId, SessionCode, SessionRef};
use checkpoint_proximity::{Presence, ProximityEvent};
use checkpoint_session::ValidationResult;
use serde::{Deserialize, Serialize};

use crate::{CheckInPhase, StepError};

static NEXT_ATTEMPT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one attempt in logs and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub u64);

impl AttemptId {
    /// A process-unique id.
    pub fn next() -> Self {
        Self(NEXT_ATTEMPT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

/// Why a code didn't resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeRejection {
    /// Not four digits.
    Format,
    NotFound,
    /// The session exists but no longer accepts check-ins.
    Expired,
}

/// Why an attempt went back to `CodeEntry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// A beacon from another room was seen.
    WrongLocation {
        expected: LocationId,
        observed: LocationId,
    },
    /// More `NotMatched` outcomes than the config tolerates.
    IdentityRetriesExhausted,
    /// A sensor couldn't be acquired.
    HardwareUnavailable { detail: String },
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongLocation { expected, observed } => {
                write!(f, "wrong location: expected {expected}, saw {observed}")
            }
            Self::IdentityRetriesExhausted => f.write_str("identity retries exhausted"),
            Self::HardwareUnavailable { detail } => write!(f, "hardware unavailable: {detail}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// What an accepted event did to the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The code resolved; now in `Proximity`.
    SessionResolved(SessionRef),
    /// The code didn't resolve; still in `CodeEntry`.
    CodeRejected(CodeRejection),
    /// Close enough; now in `Liveness`.
    PresenceConfirmed(Presence),
    /// Out of range; keep scanning.
    KeepScanning { rssi: i16 },
    /// Blink progress recorded.
    BlinkProgress { count: u32 },
    /// The face didn't match; the blink challenge starts over.
    IdentityRejected { reason: String, retries_left: u32 },
    /// Terminal success.
    Confirmed(Identity),
    /// A collaborator failed; same phase, the user may retry.
    TransportError(String),
    /// Back to `CodeEntry`.
    Aborted(AbortReason),
}

/// One student's check-in, from code entry to confirmed identity.
///
/// Invariants:
/// - the phase only moves forward one step at a time, or back to
///   `CodeEntry` on abort;
/// - `verified_identity` is `Some` exactly when the phase is `Confirmed`;
/// - events for a phase other than the current one are rejected with
///   [`StepError::OutOfPhase`] and change nothing.
#[derive(Debug, Clone)]
pub struct CheckInAttempt {
    id: AttemptId,
    phase: CheckInPhase,
    session_code: Option<SessionCode>,
    resolved_session: Option<SessionRef>,
    classroom_requirement: Option<LocationId>,
    presence: Option<Presence>,
    blink_count: u32,
    verified_identity: Option<Identity>,
    identity_failures: u32,
    max_identity_retries: u32,
}

impl CheckInAttempt {
    pub fn new(max_identity_retries: u32) -> Self {
        Self {
            id: AttemptId::next(),
            phase: CheckInPhase::CodeEntry,
            session_code: None,
            resolved_session: None,
            classroom_requirement: None,
            presence: None,
            blink_count: 0,
            verified_identity: None,
            identity_failures: 0,
            max_identity_retries,
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn phase(&self) -> CheckInPhase {
        self.phase
    }

    pub fn session_code(&self) -> Option<&SessionCode> {
        self.session_code.as_ref()
    }

    pub fn resolved_session(&self) -> Option<&SessionRef> {
        self.resolved_session.as_ref()
    }

    /// The classroom whose beacon must be seen.
    pub fn classroom_requirement(&self) -> Option<&LocationId> {
        self.classroom_requirement.as_ref()
    }

    pub fn presence(&self) -> Option<&Presence> {
        self.presence.as_ref()
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    pub fn verified_identity(&self) -> Option<&Identity> {
        self.verified_identity.as_ref()
    }

    /// `NotMatched` outcomes so far in this attempt.
    pub fn identity_failures(&self) -> u32 {
        self.identity_failures
    }

    // -- Events -----------------------------------------------------------

    /// Applies the validator's answer for a typed code.
    pub fn on_validation(&mut self, result: ValidationResult) -> Result<Step, StepError> {
        self.expect_phase(CheckInPhase::CodeEntry, "code validation")?;

        match result {
            ValidationResult::Resolved(session) if session.is_active() => {
                Ok(self.enter_proximity(session))
            }
            ValidationResult::Resolved(_) | ValidationResult::Expired => {
                Ok(Step::CodeRejected(CodeRejection::Expired))
            }
            ValidationResult::FormatError => Ok(Step::CodeRejected(CodeRejection::Format)),
            ValidationResult::NotFound => Ok(Step::CodeRejected(CodeRejection::NotFound)),
            ValidationResult::TransportError(reason) => Ok(Step::TransportError(reason)),
        }
    }

    /// Starts proximity with a session resolved somewhere else.
    ///
    /// # Errors
    /// [`StepError::InactiveSession`] if the snapshot isn't active.
    pub fn enter_with_session(&mut self, session: SessionRef) -> Result<Step, StepError> {
        self.expect_phase(CheckInPhase::CodeEntry, "session entry")?;
        if !session.is_active() {
            return Err(StepError::InactiveSession(session.id));
        }
        Ok(self.enter_proximity(session))
    }

    /// Applies one classified proximity event.
    pub fn on_proximity(&mut self, event: &ProximityEvent) -> Result<Step, StepError> {
        self.expect_phase(CheckInPhase::Proximity, "proximity event")?;

        match event {
            ProximityEvent::InRange(presence) => {
                self.presence = Some(presence.clone());
                self.advance(CheckInPhase::Liveness);
                Ok(Step::PresenceConfirmed(presence.clone()))
            }
            ProximityEvent::OutOfRange { rssi } => Ok(Step::KeepScanning { rssi: *rssi }),
            ProximityEvent::WrongLocation { expected, observed } => {
                Ok(self.abort(AbortReason::WrongLocation {
                    expected: expected.clone(),
                    observed: observed.clone(),
                }))
            }
            ProximityEvent::Unavailable(e) => Ok(self.abort(AbortReason::HardwareUnavailable {
                detail: e.to_string(),
            })),
        }
    }

    /// Mirrors the liveness detector's blink count.
    pub fn on_blink_progress(&mut self, count: u32) -> Result<Step, StepError> {
        self.expect_phase(CheckInPhase::Liveness, "blink progress")?;
        self.blink_count = count;
        Ok(Step::BlinkProgress { count })
    }

    /// Zeroes the blink count before a fresh challenge round.
    pub fn restart_liveness(&mut self) -> Result<(), StepError> {
        self.expect_phase(CheckInPhase::Liveness, "liveness restart")?;
        self.blink_count = 0;
        Ok(())
    }

    /// Applies the identity verifier's answer after a completed challenge.
    pub fn on_verify_result(&mut self, result: VerifyResult) -> Result<Step, StepError> {
        self.expect_phase(CheckInPhase::Liveness, "identity result")?;

        match result {
            VerifyResult::Matched(identity) => {
                self.verified_identity = Some(identity.clone());
                self.advance(CheckInPhase::Confirmed);
                Ok(Step::Confirmed(identity))
            }
            VerifyResult::NotMatched { reason } => {
                self.identity_failures += 1;
                if self.identity_failures > self.max_identity_retries {
                    return Ok(self.abort(AbortReason::IdentityRetriesExhausted));
                }
                self.blink_count = 0;
                Ok(Step::IdentityRejected {
                    reason,
                    retries_left: self.max_identity_retries - self.identity_failures,
                })
            }
            VerifyResult::TransportError(reason) => Ok(Step::TransportError(reason)),
        }
    }

    /// Abandons the attempt from any phase but `Confirmed`.
    pub fn cancel(&mut self) -> Result<Step, StepError> {
        if self.phase.is_terminal() {
            return Err(StepError::OutOfPhase {
                phase: self.phase,
                event: "cancel",
            });
        }
        Ok(self.abort(AbortReason::Cancelled))
    }

    /// Resets to `CodeEntry` and reports why. Keeps the id.
    ///
    /// Does nothing to a confirmed attempt but report the reason.
    pub fn abort(&mut self, reason: AbortReason) -> Step {
        if !self.phase.is_terminal() {
            *self = Self {
                id: self.id,
                ..Self::new(self.max_identity_retries)
            };
        }
        Step::Aborted(reason)
    }

    // -- Internals --------------------------------------------------------

    fn enter_proximity(&mut self, session: SessionRef) -> Step {
        self.session_code = Some(session.code.clone());
        self.classroom_requirement = Some(session.classroom_id.clone());
        self.resolved_session = Some(session.clone());
        self.advance(CheckInPhase::Proximity);
        Step::SessionResolved(session)
    }

    fn advance(&mut self, to: CheckInPhase) {
        debug_assert!(self.phase.can_transition_to(to), "{} -> {to}", self.phase);
        self.phase = to;
    }

    fn expect_phase(&self, phase: CheckInPhase, event: &'static str) -> Result<(), StepError> {
        if self.phase == phase {
            Ok(())
        } else {
            tracing::debug!(attempt_id = %self.id, phase = %self.phase, event, "event out of phase");
            Err(StepError::OutOfPhase {
                phase: self.phase,
                event,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use checkpoint_hardware::HardwareError;
    use checkpoint_protocol::{RegistrationId, SessionId, SessionStatus};
    use checkpoint_proximity::PresenceSource;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn session(status: SessionStatus) -> SessionRef {
        SessionRef {
            id: SessionId::new("session-1"),
            code: SessionCode::parse("4821").unwrap(),
            course_name: "Compilers".into(),
            classroom_id: LocationId::new("C-101"),
            status,
        }
    }

    fn in_range() -> ProximityEvent {
        ProximityEvent::InRange(Presence {
            rssi: Some(-70),
            location: Some(LocationId::new("C-101")),
            source: PresenceSource::Measured,
        })
    }

    fn ada() -> Identity {
        Identity::new("Ada", RegistrationId::new("112233"))
    }

    fn not_matched() -> VerifyResult {
        VerifyResult::NotMatched {
            reason: "No match found in database".into(),
        }
    }

    fn in_liveness(max_retries: u32) -> CheckInAttempt {
        let mut a = CheckInAttempt::new(max_retries);
        a.on_validation(ValidationResult::Resolved(session(SessionStatus::Active)))
            .unwrap();
        a.on_proximity(&in_range()).unwrap();
        a
    }

    // =====================================================================
    // Code entry
    // =====================================================================

    #[test]
    fn test_on_validation_resolved_enters_proximity_with_requirement() {
        let mut a = CheckInAttempt::new(3);

        let step = a
            .on_validation(ValidationResult::Resolved(session(SessionStatus::Active)))
            .unwrap();

        assert!(matches!(step, Step::SessionResolved(_)));
        assert_eq!(a.phase(), CheckInPhase::Proximity);
        assert_eq!(a.classroom_requirement().unwrap().as_str(), "C-101");
        assert_eq!(a.session_code().unwrap().as_str(), "4821");
    }

    #[test]
    fn test_on_validation_rejections_stay_in_code_entry() {
        let cases = [
            (ValidationResult::FormatError, CodeRejection::Format),
            (ValidationResult::NotFound, CodeRejection::NotFound),
            (ValidationResult::Expired, CodeRejection::Expired),
            (
                ValidationResult::Resolved(session(SessionStatus::Inactive)),
                CodeRejection::Expired,
            ),
        ];

        for (result, expected) in cases {
            let mut a = CheckInAttempt::new(3);
            assert_eq!(a.on_validation(result).unwrap(), Step::CodeRejected(expected));
            assert_eq!(a.phase(), CheckInPhase::CodeEntry);
            assert!(a.resolved_session().is_none());
        }
    }

    #[test]
    fn test_on_validation_transport_error_keeps_phase() {
        let mut a = CheckInAttempt::new(3);
        let step = a
            .on_validation(ValidationResult::TransportError("down".into()))
            .unwrap();
        assert_eq!(step, Step::TransportError("down".into()));
        assert_eq!(a.phase(), CheckInPhase::CodeEntry);
    }

    #[test]
    fn test_enter_with_session_inactive_is_rejected() {
        let mut a = CheckInAttempt::new(3);
        let err = a
            .enter_with_session(session(SessionStatus::Inactive))
            .unwrap_err();
        assert_eq!(err, StepError::InactiveSession(SessionId::new("session-1")));
        assert_eq!(a.phase(), CheckInPhase::CodeEntry);
    }

    // =====================================================================
    // Proximity
    // =====================================================================

    #[test]
    fn test_on_proximity_out_of_range_keeps_scanning() {
        let mut a = CheckInAttempt::new(3);
        a.enter_with_session(session(SessionStatus::Active)).unwrap();

        let step = a.on_proximity(&ProximityEvent::OutOfRange { rssi: -90 }).unwrap();

        assert_eq!(step, Step::KeepScanning { rssi: -90 });
        assert_eq!(a.phase(), CheckInPhase::Proximity);
    }

    #[test]
    fn test_on_proximity_wrong_location_aborts_to_code_entry() {
        let mut a = CheckInAttempt::new(3);
        a.enter_with_session(session(SessionStatus::Active)).unwrap();
        let id = a.id();

        let step = a
            .on_proximity(&ProximityEvent::WrongLocation {
                expected: LocationId::new("C-101"),
                observed: LocationId::new("B-202"),
            })
            .unwrap();

        assert!(matches!(step, Step::Aborted(AbortReason::WrongLocation { .. })));
        assert_eq!(a.phase(), CheckInPhase::CodeEntry);
        assert!(a.resolved_session().is_none());
        assert!(a.classroom_requirement().is_none());
        assert_eq!(a.id(), id);
    }

    #[test]
    fn test_on_proximity_unavailable_is_hardware_abort() {
        let mut a = CheckInAttempt::new(3);
        a.enter_with_session(session(SessionStatus::Active)).unwrap();

        let step = a
            .on_proximity(&ProximityEvent::Unavailable(HardwareError::PermissionDenied(
                "user dismissed chooser".into(),
            )))
            .unwrap();

        let Step::Aborted(AbortReason::HardwareUnavailable { detail }) = step else {
            panic!("expected hardware abort, got {step:?}");
        };
        assert!(detail.contains("dismissed"));
    }

    // =====================================================================
    // Liveness and identity
    // =====================================================================

    #[test]
    fn test_on_verify_result_matched_confirms_once() {
        let mut a = in_liveness(3);
        assert!(a.verified_identity().is_none());

        let step = a.on_verify_result(VerifyResult::Matched(ada())).unwrap();

        assert_eq!(step, Step::Confirmed(ada()));
        assert_eq!(a.phase(), CheckInPhase::Confirmed);
        assert_eq!(a.verified_identity(), Some(&ada()));

        // Confirmed is terminal; nothing else is accepted.
        assert!(a.on_verify_result(VerifyResult::Matched(ada())).is_err());
        assert!(a.cancel().is_err());
        assert_eq!(a.verified_identity(), Some(&ada()));
    }

    #[test]
    fn test_on_verify_result_not_matched_resets_blinks_stays_in_liveness() {
        let mut a = in_liveness(3);
        a.on_blink_progress(2).unwrap();

        let step = a.on_verify_result(not_matched()).unwrap();

        assert_eq!(
            step,
            Step::IdentityRejected {
                reason: "No match found in database".into(),
                retries_left: 2,
            }
        );
        assert_eq!(a.phase(), CheckInPhase::Liveness);
        assert_eq!(a.blink_count(), 0);
        assert!(a.verified_identity().is_none());
    }

    #[test]
    fn test_on_verify_result_retries_exhausted_aborts() {
        let mut a = in_liveness(2);

        assert!(matches!(a.on_verify_result(not_matched()).unwrap(), Step::IdentityRejected { retries_left: 1, .. }));
        assert!(matches!(a.on_verify_result(not_matched()).unwrap(), Step::IdentityRejected { retries_left: 0, .. }));
        let step = a.on_verify_result(not_matched()).unwrap();

        assert_eq!(step, Step::Aborted(AbortReason::IdentityRetriesExhausted));
        assert_eq!(a.phase(), CheckInPhase::CodeEntry);
        assert_eq!(a.identity_failures(), 0);
    }

    #[test]
    fn test_on_verify_result_transport_error_keeps_phase_and_count() {
        let mut a = in_liveness(3);

        let step = a
            .on_verify_result(VerifyResult::TransportError("timeout".into()))
            .unwrap();

        assert_eq!(step, Step::TransportError("timeout".into()));
        assert_eq!(a.phase(), CheckInPhase::Liveness);
        assert_eq!(a.identity_failures(), 0);
    }

    // =====================================================================
    // Phase discipline
    // =====================================================================

    #[test]
    fn test_events_out_of_phase_are_rejected_unchanged() {
        let mut a = CheckInAttempt::new(3);

        let err = a.on_proximity(&in_range()).unwrap_err();
        assert_eq!(
            err,
            StepError::OutOfPhase {
                phase: CheckInPhase::CodeEntry,
                event: "proximity event",
            }
        );
        assert!(a.on_verify_result(VerifyResult::Matched(ada())).is_err());
        assert!(a.on_blink_progress(1).is_err());
        assert_eq!(a.phase(), CheckInPhase::CodeEntry);
        assert!(a.verified_identity().is_none());

        let mut b = in_liveness(3);
        assert!(b.on_validation(ValidationResult::NotFound).is_err());
        assert!(b.on_proximity(&in_range()).is_err());
        assert_eq!(b.phase(), CheckInPhase::Liveness);
    }

    #[test]
    fn test_cancel_from_liveness_resets_everything() {
        let mut a = in_liveness(3);
        a.on_blink_progress(1).unwrap();

        assert_eq!(a.cancel().unwrap(), Step::Aborted(AbortReason::Cancelled));
        assert_eq!(a.phase(), CheckInPhase::CodeEntry);
        assert_eq!(a.blink_count(), 0);
        assert!(a.presence().is_none());
    }

    #[test]
    fn test_attempt_ids_are_unique() {
        assert_ne!(CheckInAttempt::new(3).id(), CheckInAttempt::new(3).id());
    }
}
