//! The session registry collaborator.
//!
//! Checkpoint doesn't store sessions itself; the course/session registry
//! does (a REST backend, a database table). The core
//! only needs one question answered: "which session does this code belong
//! to?", so that is the whole trait.
//!
//! Implementations exist for production backends, for tests (mocks that
//! count calls or simulate outages), and for development
//! ([`InMemoryRegistry`](crate::InMemoryRegistry)).

use std::future::Future;

use checkpoint_protocol::{SessionCode, SessionRef};

use crate::RegistryError;

/// Resolves session codes to session snapshots.
///
/// `Send + Sync + 'static` because a registry is shared by every check-in
/// actor on a station for the station's whole lifetime.
///
/// # Example
///
/// ```rust
/// use checkpoint_protocol::{LocationId, SessionCode, SessionId, SessionRef, SessionStatus};
/// use checkpoint_session::{RegistryError, SessionRegistry};
///
/// /// Knows exactly one session.
/// struct SingleSession(SessionRef);
///
/// impl SessionRegistry for SingleSession {
///     async fn resolve_by_code(
///         &self,
///         code: &SessionCode,
///     ) -> Result<Option<SessionRef>, RegistryError> {
///         Ok((self.0.code == *code).then(|| self.0.clone()))
///     }
/// }
/// ```
pub trait SessionRegistry: Send + Sync + 'static {
    /// Looks up the session a code belongs to.
    ///
    /// # Returns
    /// - `Ok(Some(session))`: found; the caller must still check
    ///   [`SessionRef::status`]
    /// - `Ok(None)`: no session has this code
    /// - `Err(RegistryError::Unreachable)`: the registry couldn't answer
    fn resolve_by_code(
        &self,
        code: &SessionCode,
    ) -> impl Future<Output = Result<Option<SessionRef>, RegistryError>> + Send;
}

/// Stations share one registry across attempts by wrapping it in an `Arc`.
impl<R: SessionRegistry> SessionRegistry for std::sync::Arc<R> {
    fn resolve_by_code(
        &self,
        code: &SessionCode,
    ) -> impl Future<Output = Result<Option<SessionRef>, RegistryError>> + Send
    {
        (**self).resolve_by_code(code)
    }
}
