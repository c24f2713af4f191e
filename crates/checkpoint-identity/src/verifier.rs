//! The Identity Verifier: one still in, one typed outcome out.

use checkpoint_protocol::{Identity, RegistrationId};

use crate::{MatchResponse, RemoteMatcher};

/// Placeholder the matcher uses for a face it knows but can't attribute.
const PLACEHOLDER_REGISTRATION_ID: &str = "N/A";

/// Display name used when a match carries a registration id but no name.
const UNKNOWN_NAME: &str = "Unknown";

/// Outcome of verifying one still.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// The face belongs to an enrolled student.
    Matched(Identity),
    /// Not a usable match. The liveness challenge should be repeated.
    NotMatched { reason: String },
    /// The matcher couldn't be reached or answered with a failure.
    TransportError(String),
}

impl VerifyResult {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Verifies stills against a [`RemoteMatcher`].
///
/// Exactly one matcher call per [`verify`](Self::verify); retrying is the
/// attempt layer's decision.
pub struct IdentityVerifier<M> {
    matcher: M,
}

impl<M: RemoteMatcher> IdentityVerifier<M> {
    pub fn new(matcher: M) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    /// Sends `still` to the matcher and normalizes the answer.
    pub async fn verify(&self, still: &[u8]) -> VerifyResult {
        if still.is_empty() {
            tracing::warn!("empty capture; matcher not called");
            return VerifyResult::NotMatched {
                reason: "empty capture".into(),
            };
        }

        match self.matcher.match_face(still).await {
            Ok(response) => normalize(response),
            Err(e) => {
                tracing::warn!(error = %e, "identity match failed");
                VerifyResult::TransportError(e.to_string())
            }
        }
    }
}

/// Turns a raw matcher response into a [`VerifyResult`].
///
/// A "verified" response only counts when it names a registration id; a
/// face the matcher recognizes but can't attribute to an enrollment record
/// is not an identity.
pub fn normalize(response: MatchResponse) -> VerifyResult {
    if !response.verified {
        let reason = response
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "no match found".into());
        tracing::info!(%reason, "face not matched");
        return VerifyResult::NotMatched { reason };
    }

    let registration_id = response
        .mis
        .map(|mis| mis.trim().to_owned())
        .filter(|mis| !mis.is_empty() && mis != PLACEHOLDER_REGISTRATION_ID);

    let Some(registration_id) = registration_id else {
        tracing::warn!(
            message = ?response.message,
            "matcher verified a face without an enrollment record"
        );
        return VerifyResult::NotMatched {
            reason: "matched face has no enrollment record".into(),
        };
    };

    let name = response
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_NAME.into());

    tracing::info!(
        registration_id = %registration_id,
        distance = ?response.distance,
        "face matched"
    );
    VerifyResult::Matched(Identity::new(name, RegistrationId::new(registration_id)))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::MatcherError;

    // -- Helpers ----------------------------------------------------------

    struct MockMatcher {
        answer: Result<MatchResponse, MatcherError>,
        calls: AtomicUsize,
        last_still: Mutex<Vec<u8>>,
    }

    impl MockMatcher {
        fn answering(answer: Result<MatchResponse, MatcherError>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
                last_still: Mutex::new(Vec::new()),
            }
        }
    }

    impl RemoteMatcher for MockMatcher {
        async fn match_face(&self, still: &[u8]) -> Result<MatchResponse, MatcherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_still.lock().unwrap() = still.to_vec();
            self.answer.clone()
        }
    }

    fn verified(name: Option<&str>, mis: Option<&str>) -> MatchResponse {
        MatchResponse {
            verified: true,
            name: name.map(Into::into),
            mis: mis.map(Into::into),
            ..Default::default()
        }
    }

    // =====================================================================
    // verify()
    // =====================================================================

    #[tokio::test]
    async fn test_verify_match_carries_registration_id_unmodified() {
        let v = IdentityVerifier::new(MockMatcher::answering(Ok(verified(
            Some("Ada Lovelace"),
            Some("112233"),
        ))));

        let result = v.verify(b"jpeg").await;

        let VerifyResult::Matched(identity) = result else {
            panic!("expected Matched, got {result:?}");
        };
        assert_eq!(identity.registration_id().as_str(), "112233");
        assert_eq!(identity.display_name(), "Ada Lovelace");
        assert_eq!(*v.matcher().last_still.lock().unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_verify_makes_exactly_one_call() {
        let v = IdentityVerifier::new(MockMatcher::answering(Err(MatcherError::Unreachable(
            "timeout".into(),
        ))));

        let result = v.verify(b"jpeg").await;

        assert!(matches!(result, VerifyResult::TransportError(ref m) if m.contains("timeout")));
        assert_eq!(v.matcher().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verify_empty_capture_skips_matcher() {
        let v = IdentityVerifier::new(MockMatcher::answering(Ok(verified(None, Some("1")))));

        let result = v.verify(&[]).await;

        assert!(matches!(result, VerifyResult::NotMatched { .. }));
        assert_eq!(v.matcher().calls.load(Ordering::SeqCst), 0);
    }

    // =====================================================================
    // normalize()
    // =====================================================================

    #[test]
    fn test_normalize_rejection_uses_message() {
        let result = normalize(MatchResponse {
            verified: false,
            message: Some("No match found in database".into()),
            ..Default::default()
        });
        assert_eq!(
            result,
            VerifyResult::NotMatched {
                reason: "No match found in database".into()
            }
        );
    }

    #[test]
    fn test_normalize_rejection_without_message_has_default_reason() {
        let result = normalize(MatchResponse::default());
        assert_eq!(
            result,
            VerifyResult::NotMatched {
                reason: "no match found".into()
            }
        );
    }

    #[test]
    fn test_normalize_placeholder_registration_id_is_not_matched() {
        let result = normalize(verified(Some("Unknown"), Some("N/A")));
        assert_eq!(
            result,
            VerifyResult::NotMatched {
                reason: "matched face has no enrollment record".into()
            }
        );
    }

    #[test]
    fn test_normalize_missing_registration_id_is_not_matched() {
        assert!(!normalize(verified(Some("Ada"), None)).is_matched());
        assert!(!normalize(verified(Some("Ada"), Some("  "))).is_matched());
    }

    #[test]
    fn test_normalize_missing_name_becomes_unknown() {
        let VerifyResult::Matched(identity) = normalize(verified(None, Some("42"))) else {
            panic!("expected Matched");
        };
        assert_eq!(identity.display_name(), "Unknown");
    }
}
