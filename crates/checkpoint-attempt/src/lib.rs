//! The check-in state machine for Checkpoint.
//!
//! A check-in moves through four phases:
//!
//! ```text
//! CodeEntry → Proximity → Liveness → Confirmed
//! ```
//!
//! # Key types
//!
//! - [`CheckInAttempt`]: the pure state machine. Takes classified outcomes,
//!   returns a [`Step`]; no I/O.
//! - [`spawn_check_in`] / [`CheckInHandle`]: one actor task per attempt
//!   that drives the detectors, holds the phase's sensor lease, and turns
//!   steps into [`CheckInUpdate`]s.
//! - [`CheckInConfig`]: retries, timeouts, frame rate, manual override.

mod actor;
mod attempt;
mod config;
mod error;

pub use actor::{AttemptStatus, CheckInHandle, CheckInUpdate, Collaborators, spawn_check_in};
pub use attempt::{AbortReason, AttemptId, CheckInAttempt, CodeRejection, Step};
pub use config::{CheckInConfig, CheckInPhase};
pub use error::{CheckInError, StepError};
