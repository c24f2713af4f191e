//! Integration tests for session code validation.
//!
//! The "for all inputs" properties run under proptest; the end-to-end
//! scenarios run against the real `InMemoryRegistry`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use checkpoint_protocol::{LocationId, SessionCode, SessionRef};
use checkpoint_session::{
    BypassPolicy, InMemoryRegistry, RegistryError, SessionCodeValidator, SessionRegistry,
    ValidationResult,
};
use proptest::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

/// Counts calls and never finds anything.
#[derive(Default)]
struct CountingRegistry {
    calls: AtomicUsize,
}

impl SessionRegistry for CountingRegistry {
    async fn resolve_by_code(
        &self,
        _code: &SessionCode,
    ) -> Result<Option<SessionRef>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

/// A registry whose backend is always down.
struct OfflineRegistry;

impl SessionRegistry for OfflineRegistry {
    async fn resolve_by_code(
        &self,
        _code: &SessionCode,
    ) -> Result<Option<SessionRef>, RegistryError> {
        Err(RegistryError::Unreachable("dns lookup failed".into()))
    }
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(fut)
}

fn is_four_digits(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

// =========================================================================
// Properties
// =========================================================================

proptest! {
    /// Anything that isn't exactly four ASCII digits is a format error and
    /// never reaches the registry.
    #[test]
    fn prop_malformed_codes_never_reach_registry(input in "\\PC{0,8}") {
        prop_assume!(!is_four_digits(&input));

        let validator = SessionCodeValidator::new(CountingRegistry::default());
        let result = block_on(validator.validate(&input));

        prop_assert_eq!(result, ValidationResult::FormatError);
        prop_assert_eq!(validator.registry().calls.load(Ordering::SeqCst), 0);
    }

    /// Surrounding whitespace is not trimmed.
    #[test]
    fn prop_padded_codes_are_format_errors(code in "[0-9]{4}", pad in "[ \t\n]{1,3}") {
        let validator = SessionCodeValidator::new(CountingRegistry::default());

        let leading = block_on(validator.validate(&format!("{pad}{code}")));
        let trailing = block_on(validator.validate(&format!("{code}{pad}")));

        prop_assert_eq!(leading, ValidationResult::FormatError);
        prop_assert_eq!(trailing, ValidationResult::FormatError);
    }

    /// Every well-formed code is sent to the registry exactly once.
    #[test]
    fn prop_well_formed_codes_reach_registry_once(code in "[0-9]{4}") {
        let validator = SessionCodeValidator::new(CountingRegistry::default());

        let result = block_on(validator.validate(&code));

        prop_assert_eq!(result, ValidationResult::NotFound);
        prop_assert_eq!(validator.registry().calls.load(Ordering::SeqCst), 1);
    }
}

// =========================================================================
// Scenario: demo bypass with the registry offline
// =========================================================================

#[tokio::test]
async fn test_demo_code_with_bypass_resolves_while_offline() {
    let validator =
        SessionCodeValidator::new(OfflineRegistry).with_bypass(BypassPolicy::DemoCode);

    match validator.validate("1234").await {
        ValidationResult::Resolved(session) => {
            assert_eq!(session.id.as_str(), "demo-session-1234");
            assert_eq!(session.course_name, "Demo Session");
            assert_eq!(session.classroom_id, LocationId::new("ROOM-101"));
        }
        other => panic!("expected Resolved, got {other:?}"),
    }
}

#[tokio::test]
async fn test_demo_code_without_bypass_surfaces_transport_error() {
    let validator = SessionCodeValidator::new(OfflineRegistry);

    let result = validator.validate("1234").await;

    assert!(matches!(result, ValidationResult::TransportError(_)));
}

// =========================================================================
// Session lifecycle through the validator
// =========================================================================

#[tokio::test]
async fn test_session_lifecycle_resolved_then_expired() {
    let registry = Arc::new(InMemoryRegistry::new());
    let validator = SessionCodeValidator::new(Arc::clone(&registry));

    let issued = registry
        .create_session("teacher-7", "Operating Systems", LocationId::new("C-101"))
        .await
        .unwrap();

    let resolved = validator.validate(issued.code.as_str()).await;
    assert!(resolved.is_resolved(), "got {resolved:?}");

    registry.end_session(&issued.id).await.unwrap();

    assert_eq!(
        validator.validate(issued.code.as_str()).await,
        ValidationResult::Expired
    );
}
