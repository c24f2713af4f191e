//! An in-process session registry.
//!
//! Production deployments point Checkpoint at their real registry. This one
//! keeps sessions in memory so the demo, the tests, and a single-room
//! offline setup can run without a backend. It also carries the
//! instructor-side operations the check-in core never calls: opening a
//! session (which issues the code) and ending it.
//!
//! # Concurrency note
//!
//! The maps live behind a `tokio::sync::RwLock`: resolutions from many
//! attempts share the read side, and instructor operations take the write
//! side briefly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use checkpoint_protocol::{
    LocationId, SessionCode, SessionId, SessionRef, SessionStatus,
};
use rand::Rng;
use tokio::sync::RwLock;

use crate::{RegistryError, SessionError, SessionRegistry};

/// Smallest code the registry issues. Codes never start with a zero, so
/// they survive being typed into numeric fields.
const MIN_CODE: u16 = 1000;
/// Largest code the registry issues.
const MAX_CODE: u16 = 9999;

/// Random draws before falling back to a linear scan for a free code.
const RANDOM_ATTEMPTS: usize = 32;

/// Counter for generating session ids.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// What an instructor gets back when opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub id: SessionId,
    pub code: SessionCode,
}

/// A session plus the instructor who opened it.
#[derive(Debug, Clone)]
struct Entry {
    teacher_id: String,
    session: SessionRef,
}

/// Keeps sessions in memory and resolves codes against them.
///
/// ## Lifecycle
///
/// ```text
/// create_session() ──→ [active] ──→ end_session() ──→ [inactive]
///                          │                              │
///                 resolve_by_code() → Resolved    resolve_by_code() → Expired
/// ```
///
/// A code is unique among *active* sessions only. Once a session ends its
/// code may be issued again; resolution then prefers the active session.
#[derive(Default)]
pub struct InMemoryRegistry {
    sessions: RwLock<HashMap<SessionId, Entry>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new active session and issues it an unused code.
    ///
    /// # Errors
    /// Returns [`SessionError::CodesExhausted`] if every code in
    /// `1000..=9999` is held by an active session.
    pub async fn create_session(
        &self,
        teacher_id: &str,
        course_name: &str,
        classroom_id: LocationId,
    ) -> Result<IssuedSession, SessionError> {
        let mut sessions = self.sessions.write().await;

        let in_use: Vec<&str> = sessions
            .values()
            .filter(|e| e.session.is_active())
            .map(|e| e.session.code.as_str())
            .collect();
        let code = generate_code(&in_use).ok_or(SessionError::CodesExhausted)?;

        let id = SessionId::new(format!(
            "session-{}",
            NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
        ));
        let session = SessionRef {
            id: id.clone(),
            code: code.clone(),
            course_name: course_name.to_owned(),
            classroom_id,
            status: SessionStatus::Active,
        };

        sessions.insert(
            id.clone(),
            Entry {
                teacher_id: teacher_id.to_owned(),
                session,
            },
        );
        tracing::info!(session_id = %id, %teacher_id, "session opened");

        Ok(IssuedSession { id, code })
    }

    /// Marks a session inactive. Its code stops resolving to `Resolved`.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: unknown id
    /// - [`SessionError::AlreadyEnded`]: already inactive
    pub async fn end_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        if !entry.session.is_active() {
            return Err(SessionError::AlreadyEnded(id.clone()));
        }
        entry.session.status = SessionStatus::Inactive;
        tracing::info!(session_id = %id, "session ended");
        Ok(())
    }

    /// All sessions opened by one instructor, active or not.
    pub async fn sessions_for(&self, teacher_id: &str) -> Vec<SessionRef> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|e| e.teacher_id == teacher_id)
            .map(|e| e.session.clone())
            .collect()
    }

    /// Returns the number of sessions (any state).
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no sessions were ever opened.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl SessionRegistry for InMemoryRegistry {
    async fn resolve_by_code(
        &self,
        code: &SessionCode,
    ) -> Result<Option<SessionRef>, RegistryError> {
        let sessions = self.sessions.read().await;
        let matching = || {
            sessions
                .values()
                .map(|e| &e.session)
                .filter(|s| s.code == *code)
        };

        // Prefer the active holder of a reused code.
        Ok(matching()
            .find(|s| s.is_active())
            .or_else(|| matching().next())
            .cloned())
    }
}

/// Picks a code in `MIN_CODE..=MAX_CODE` not present in `in_use`.
///
/// Random draws first, so codes aren't guessable from the order sessions
/// were opened; a linear scan guarantees termination when the space is
/// nearly full.
fn generate_code(in_use: &[&str]) -> Option<SessionCode> {
    let taken = |candidate: &str| in_use.contains(&candidate);
    let mut rng = rand::rng();

    for _ in 0..RANDOM_ATTEMPTS {
        let candidate = rng.random_range(MIN_CODE..=MAX_CODE).to_string();
        if !taken(&candidate) {
            return SessionCode::parse(&candidate).ok();
        }
    }

    (MIN_CODE..=MAX_CODE)
        .map(|n| n.to_string())
        .find(|candidate| !taken(candidate))
        .and_then(|candidate| SessionCode::parse(&candidate).ok())
}

// =========================================================================
// Tests
// =========================================================================
