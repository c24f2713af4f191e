//! Demo bypass: a fixed code that resolves without the registry.
//!
//! Classroom demos happen in rooms where the registry backend may not be
//! reachable. The bypass lets one well-known code (`1234`) resolve to a
//! canned active session so the rest of the protocol can be shown.
//!
//! It is **off by default**. With the bypass disabled, `1234` is an
//! ordinary code and goes to the registry like any other.

use checkpoint_protocol::{
    LocationId, SessionCode, SessionId, SessionRef, SessionStatus,
};
use serde::{Deserialize, Serialize};

/// The code the demo bypass answers to.
pub const DEMO_CODE: &str = "1234";

/// Whether the demo bypass code is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassPolicy {
    /// Every code goes to the registry.
    #[default]
    Disabled,
    /// [`DEMO_CODE`] resolves to [`BypassPolicy::demo_session`] locally.
    DemoCode,
}

impl BypassPolicy {
    /// Returns the canned session if this policy bypasses `code`.
    pub fn resolve(self, code: &SessionCode) -> Option<SessionRef> {
        match self {
            Self::DemoCode if code.as_str() == DEMO_CODE => {
                Some(Self::demo_session())
            }
            _ => None,
        }
    }

    /// The fixed session the bypass resolves to.
    pub fn demo_session() -> SessionRef {
        SessionRef {
            id: SessionId::new("demo-session-1234"),
            code: SessionCode::parse(DEMO_CODE)
                .expect("DEMO_CODE is four digits"),
            course_name: "Demo Session".into(),
            classroom_id: LocationId::new("ROOM-101"),
            status: SessionStatus::Active,
        }
    }
}
