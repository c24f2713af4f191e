//! Shared data model for Checkpoint.
//!
//! Every layer of the check-in protocol speaks in terms of the types defined
//! here:
//!
//! - **Session snapshots** ([`SessionRef`], [`SessionCode`]): what the
//!   registry hands back when a student types the instructor's code.
//! - **Sensor samples** ([`SignalSample`], [`LandmarkFrame`]): the raw
//!   per-event readings the detectors classify.
//! - **Outcomes** ([`Identity`]): who the remote matcher says the student is.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how surfaces built on the
//!   core turn these types into bytes.
//!
//! # Architecture
//!
//! ```text
//! Hardware / collaborators → Protocol (typed samples) → Detectors → Attempt
//! ```
//!
//! The protocol crate owns no behavior beyond parsing and scoring helpers.
//! It doesn't know about phases, retries, or hardware.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Identity, LandmarkFrame, LocationId, RegistrationId, SessionCode,
    SessionId, SessionRef, SessionStatus, SignalSample,
};
