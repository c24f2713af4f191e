//! Session code validation for Checkpoint.
//!
//! This crate is phase one of a check-in: proving the student knows the
//! 4-digit code the instructor put on the board.
//!
//! 1. **Format check**: exactly four ASCII digits, no network involved.
//! 2. **Resolution**: asking the [`SessionRegistry`] collaborator which
//!    session the code belongs to, and whether it is still active.
//! 3. **Demo bypass**: an opt-in [`BypassPolicy`] that resolves a fixed
//!    code locally for demonstrations.
//!
//! # How it fits in the stack
//!
//! ```text
//! Attempt Layer (above)  ← decides whether to let the student re-enter a code
//!     ↕
//! Session Layer (this crate)  ← turns typed input into a ValidationResult
//!     ↕
//! Protocol Layer (below)  ← provides SessionCode, SessionRef
//! ```

#![allow(async_fn_in_trait)]

mod bypass;
mod error;
mod memory;
mod registry;
mod validator;

pub use bypass::{BypassPolicy, DEMO_CODE};
pub use error::{RegistryError, SessionError};
pub use memory::{InMemoryRegistry, IssuedSession};
pub use registry::SessionRegistry;
pub use validator::{SessionCodeValidator, ValidationResult};
