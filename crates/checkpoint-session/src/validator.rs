//! The Session Code Validator: format check, then registry resolution.

use checkpoint_protocol::{SessionCode, SessionRef};

use crate::{BypassPolicy, RegistryError, SessionRegistry};

/// Outcome of validating a typed session code.
///
/// Every variant except `Resolved` is locally recoverable: the student can
/// type the code again. Whether they may is the attempt layer's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The code belongs to an active session.
    Resolved(SessionRef),
    /// Not exactly four ASCII digits. The registry was not contacted.
    FormatError,
    /// Well-formed, but no session has this code.
    NotFound,
    /// The code belongs to a session that is no longer active.
    Expired,
    /// The registry couldn't be reached.
    TransportError(String),
}

impl ValidationResult {
    /// Returns `true` for [`ValidationResult::Resolved`].
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Validates session codes against a [`SessionRegistry`].
///
/// Stateless apart from its collaborators: no caching and no automatic
/// retries.
pub struct SessionCodeValidator<R> {
    registry: R,
    bypass: BypassPolicy,
}

impl<R: SessionRegistry> SessionCodeValidator<R> {
    /// Creates a validator with the bypass disabled.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            bypass: BypassPolicy::Disabled,
        }
    }

    /// Sets the demo bypass policy.
    pub fn with_bypass(mut self, bypass: BypassPolicy) -> Self {
        self.bypass = bypass;
        self
    }

    /// The underlying registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Validates a code as typed by the student.
    ///
    /// Format errors short-circuit: a malformed code never reaches the
    /// registry, so typos cost no network round trip.
    pub async fn validate(&self, code: &str) -> ValidationResult {
        let code = match SessionCode::parse(code) {
            Ok(code) => code,
            Err(e) => {
                tracing::debug!(error = %e, "session code rejected by format check");
                return ValidationResult::FormatError;
            }
        };

        if let Some(session) = self.bypass.resolve(&code) {
            tracing::warn!(
                session_id = %session.id,
                "demo bypass code used; registry not consulted"
            );
            return ValidationResult::Resolved(session);
        }

        match self.registry.resolve_by_code(&code).await {
            Ok(Some(session)) if session.is_active() => {
                tracing::info!(
                    session_id = %session.id,
                    course = %session.course_name,
                    "session code resolved"
                );
                ValidationResult::Resolved(session)
            }
            Ok(Some(session)) => {
                tracing::info!(session_id = %session.id, "session code belongs to an ended session");
                ValidationResult::Expired
            }
            Ok(None) => {
                tracing::debug!("session code not found");
                ValidationResult::NotFound
            }
            Err(RegistryError::Unreachable(reason)) => {
                tracing::warn!(%reason, "session registry unreachable");
                ValidationResult::TransportError(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionCodeValidator`.
    //!
    //! The mock registry counts calls so tests can prove which inputs
    //! reach the collaborator and which are rejected locally.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use checkpoint_protocol::{LocationId, SessionId, SessionStatus};

    use super::*;

    // -- Helpers ----------------------------------------------------------

    /// What the mock registry answers with.
    enum Answer {
        Found(SessionStatus),
        Missing,
        Down,
    }

    struct MockRegistry {
        answer: Answer,
        calls: AtomicUsize,
    }

    impl MockRegistry {
        fn new(answer: Answer) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SessionRegistry for MockRegistry {
        async fn resolve_by_code(
            &self,
            code: &SessionCode,
        ) -> Result<Option<SessionRef>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answer {
                Answer::Found(status) => Ok(Some(SessionRef {
                    id: SessionId::new("s-1"),
                    code: code.clone(),
                    course_name: "Compilers".into(),
                    classroom_id: LocationId::new("C-101"),
                    status,
                })),
                Answer::Missing => Ok(None),
                Answer::Down => {
                    Err(RegistryError::Unreachable("connection refused".into()))
                }
            }
        }
    }

    fn validator(answer: Answer) -> SessionCodeValidator<MockRegistry> {
        SessionCodeValidator::new(MockRegistry::new(answer))
    }

    // =====================================================================
    // validate()
    // =====================================================================

    #[tokio::test]
    async fn test_validate_active_session_resolves() {
        let v = validator(Answer::Found(SessionStatus::Active));

        let result = v.validate("4821").await;

        match result {
            ValidationResult::Resolved(session) => {
                assert_eq!(session.code.as_str(), "4821");
                assert_eq!(session.classroom_id.as_str(), "C-101");
            }
            other => panic!("expected Resolved, got {other:?}"),
        }
        assert_eq!(v.registry().calls(), 1);
    }

    #[tokio::test]
    async fn test_validate_inactive_session_returns_expired() {
        let v = validator(Answer::Found(SessionStatus::Inactive));

        assert_eq!(v.validate("4821").await, ValidationResult::Expired);
    }

    #[tokio::test]
    async fn test_validate_unknown_code_returns_not_found() {
        let v = validator(Answer::Missing);

        assert_eq!(v.validate("0000").await, ValidationResult::NotFound);
    }

    #[tokio::test]
    async fn test_validate_registry_down_returns_transport_error() {
        let v = validator(Answer::Down);

        let result = v.validate("4821").await;

        assert!(
            matches!(result, ValidationResult::TransportError(ref r) if r.contains("refused")),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_validate_malformed_code_skips_registry() {
        let v = validator(Answer::Found(SessionStatus::Active));

        for bad in ["123", "12345", "abcd", "12 4", ""] {
            assert_eq!(v.validate(bad).await, ValidationResult::FormatError);
        }
        assert_eq!(v.registry().calls(), 0, "registry must not be called");
    }

    // =====================================================================
    // Demo bypass
    // =====================================================================

    #[tokio::test]
    async fn test_validate_bypass_resolves_demo_code_with_registry_down() {
        let v = validator(Answer::Down).with_bypass(BypassPolicy::DemoCode);

        let result = v.validate("1234").await;

        assert_eq!(
            result,
            ValidationResult::Resolved(BypassPolicy::demo_session())
        );
        assert_eq!(v.registry().calls(), 0);
    }

    #[tokio::test]
    async fn test_validate_without_bypass_demo_code_is_ordinary() {
        let v = validator(Answer::Down);

        let result = v.validate("1234").await;

        assert!(matches!(result, ValidationResult::TransportError(_)));
        assert_eq!(v.registry().calls(), 1);
    }
}
