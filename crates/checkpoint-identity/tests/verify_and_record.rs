//! Integration tests: verify a still, then record the identity.

use std::sync::Arc;

use checkpoint_identity::{
    AppendOutcome, AttendanceLedger, AttendanceRecord, IdentityVerifier, InMemoryLedger,
    MatchResponse, MatcherError, RemoteMatcher, VerifyResult,
};
use checkpoint_protocol::SessionId;

/// Answers from a canned JSON body, the way an HTTP matcher would.
struct JsonMatcher(&'static [u8]);

impl RemoteMatcher for JsonMatcher {
    async fn match_face(&self, _still: &[u8]) -> Result<MatchResponse, MatcherError> {
        MatchResponse::from_json(self.0)
    }
}

#[tokio::test]
async fn test_matched_identity_recorded_with_same_registration_id() {
    let verifier = IdentityVerifier::new(JsonMatcher(
        br#"{"verified":true,"name":"Grace Hopper","mis":"612345","distance":0.18}"#,
    ));
    let ledger = Arc::new(InMemoryLedger::new());
    let session = SessionId::new("s-1");

    let VerifyResult::Matched(identity) = verifier.verify(b"\xFF\xD8jpeg").await else {
        panic!("expected a match");
    };
    let outcome = ledger
        .append(&session, AttendanceRecord::now(&identity))
        .await
        .unwrap();

    assert_eq!(outcome, AppendOutcome::Recorded { total: 1 });
    let recorded = ledger.list(&session).await.unwrap();
    assert_eq!(recorded[0].registration_id, *identity.registration_id());
    assert_eq!(recorded[0].registration_id.as_str(), "612345");
}

#[tokio::test]
async fn test_match_without_metadata_is_not_recorded() {
    let verifier = IdentityVerifier::new(JsonMatcher(
        br#"{"verified":true,"name":"Unknown","mis":"N/A","message":"Face matched with x.jpg but no metadata found."}"#,
    ));

    let result = verifier.verify(b"jpeg").await;

    assert!(matches!(result, VerifyResult::NotMatched { .. }), "got {result:?}");
}

#[tokio::test]
async fn test_malformed_body_is_transport_error() {
    let verifier = IdentityVerifier::new(JsonMatcher(b"Internal Server Error"));

    let result = verifier.verify(b"jpeg").await;

    assert!(matches!(result, VerifyResult::TransportError(_)), "got {result:?}");
}
