//! The attendance ledger collaborator and an in-memory implementation.
//!
//! Recording is the caller's job after a confirmed check-in, and it is
//! best effort: a ledger that is down or says "already recorded" never
//! reverts the confirmation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use checkpoint_protocol::{Identity, RegistrationId, SessionId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::LedgerError;

/// One attendance entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub display_name: String,
    pub registration_id: RegistrationId,
    /// Unix time in milliseconds.
    pub recorded_at_ms: u64,
}

impl AttendanceRecord {
    /// A record for `identity`, stamped with the current time.
    pub fn now(identity: &Identity) -> Self {
        let recorded_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            display_name: identity.display_name().to_owned(),
            registration_id: identity.registration_id().clone(),
            recorded_at_ms,
        }
    }
}

/// Result of an append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AppendOutcome {
    /// Recorded; `total` is the session's new head count.
    Recorded { total: usize },
    /// This registration id was already present for the session.
    AlreadyRecorded,
}

/// What ending a session's ledger returns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClearedLedger {
    pub final_list: Vec<AttendanceRecord>,
    pub total: usize,
}

/// Where confirmed attendance goes.
pub trait AttendanceLedger: Send + Sync + 'static {
    /// Appends a record to a session's list.
    fn append(
        &self,
        session: &SessionId,
        record: AttendanceRecord,
    ) -> impl Future<Output = Result<AppendOutcome, LedgerError>> + Send;

    /// The session's records in arrival order.
    fn list(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, LedgerError>> + Send;

    /// Returns the session's final list and empties it.
    fn clear(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<ClearedLedger, LedgerError>> + Send;
}

impl<L: AttendanceLedger> AttendanceLedger for Arc<L> {
    fn append(
        &self,
        session: &SessionId,
        record: AttendanceRecord,
    ) -> impl Future<Output = Result<AppendOutcome, LedgerError>> + Send {
        (**self).append(session, record)
    }

    fn list(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, LedgerError>> + Send {
        (**self).list(session)
    }

    fn clear(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<ClearedLedger, LedgerError>> + Send {
        (**self).clear(session)
    }
}

/// Keeps attendance in memory, one list per session.
///
/// Duplicate registration ids within a session are rejected with
/// [`AppendOutcome::AlreadyRecorded`].
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    sessions: RwLock<HashMap<SessionId, Vec<AttendanceRecord>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttendanceLedger for InMemoryLedger {
    async fn append(
        &self,
        session: &SessionId,
        record: AttendanceRecord,
    ) -> Result<AppendOutcome, LedgerError> {
        let mut sessions = self.sessions.write().await;
        let list = sessions.entry(session.clone()).or_default();

        if list
            .iter()
            .any(|r| r.registration_id == record.registration_id)
        {
            tracing::info!(
                session_id = %session,
                registration_id = %record.registration_id,
                "attendance already recorded"
            );
            return Ok(AppendOutcome::AlreadyRecorded);
        }

        tracing::info!(
            session_id = %session,
            registration_id = %record.registration_id,
            "attendance recorded"
        );
        list.push(record);
        Ok(AppendOutcome::Recorded { total: list.len() })
    }

    async fn list(&self, session: &SessionId) -> Result<Vec<AttendanceRecord>, LedgerError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, session: &SessionId) -> Result<ClearedLedger, LedgerError> {
        let final_list = self
            .sessions
            .write()
            .await
            .remove(session)
            .unwrap_or_default();
        let total = final_list.len();
        tracing::info!(session_id = %session, total, "attendance ledger closed");
        Ok(ClearedLedger { final_list, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mis: &str) -> AttendanceRecord {
        AttendanceRecord {
            display_name: format!("student {mis}"),
            registration_id: RegistrationId::new(mis),
            recorded_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_append_counts_per_session() {
        let ledger = InMemoryLedger::new();
        let s1 = SessionId::new("s-1");
        let s2 = SessionId::new("s-2");

        assert_eq!(
            ledger.append(&s1, record("1")).await.unwrap(),
            AppendOutcome::Recorded { total: 1 }
        );
        assert_eq!(
            ledger.append(&s1, record("2")).await.unwrap(),
            AppendOutcome::Recorded { total: 2 }
        );
        assert_eq!(
            ledger.append(&s2, record("1")).await.unwrap(),
            AppendOutcome::Recorded { total: 1 }
        );
    }

    #[tokio::test]
    async fn test_append_duplicate_is_already_recorded() {
        let ledger = InMemoryLedger::new();
        let s = SessionId::new("s-1");
        ledger.append(&s, record("1")).await.unwrap();

        let outcome = ledger.append(&s, record("1")).await.unwrap();

        assert_eq!(outcome, AppendOutcome::AlreadyRecorded);
        assert_eq!(ledger.list(&s).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_returns_final_list_and_empties() {
        let ledger = InMemoryLedger::new();
        let s = SessionId::new("s-1");
        ledger.append(&s, record("1")).await.unwrap();
        ledger.append(&s, record("2")).await.unwrap();

        let cleared = ledger.clear(&s).await.unwrap();

        assert_eq!(cleared.total, 2);
        assert_eq!(cleared.final_list[0].registration_id.as_str(), "1");
        assert!(ledger.list(&s).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_unknown_session_is_empty() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.list(&SessionId::new("nope")).await.unwrap().is_empty());
    }

    #[test]
    fn test_record_now_copies_identity() {
        let identity = Identity::new("Ada", RegistrationId::new("112233"));
        let r = AttendanceRecord::now(&identity);
        assert_eq!(r.registration_id, *identity.registration_id());
        assert!(r.recorded_at_ms > 0);
    }

    #[test]
    fn test_append_outcome_wire_shape() {
        let json = serde_json_shape(&AppendOutcome::AlreadyRecorded);
        assert_eq!(json, r#"{"status":"already_recorded"}"#);
    }

    fn serde_json_shape<T: Serialize>(value: &T) -> String {
        use checkpoint_protocol::{Codec, JsonCodec};
        String::from_utf8(JsonCodec.encode(value).unwrap()).unwrap()
    }
}
