//! Identity verification and attendance recording for Checkpoint.
//!
//! Once the liveness challenge passes, exactly one still goes to the
//! [`RemoteMatcher`]. The [`IdentityVerifier`] normalizes its loosely
//! shaped answer into a [`VerifyResult`]; on a match the caller records
//! attendance through the [`AttendanceLedger`].
//!
//! Neither collaborator is implemented here beyond [`InMemoryLedger`]:
//! face embeddings and enrollment live elsewhere.

#![allow(async_fn_in_trait)]

mod error;
mod ledger;
mod matcher;
mod verifier;

pub use error::{LedgerError, MatcherError};
pub use ledger::{AppendOutcome, AttendanceLedger, AttendanceRecord, ClearedLedger, InMemoryLedger};
pub use matcher::{MatchResponse, RemoteMatcher};
pub use verifier::{IdentityVerifier, VerifyResult, normalize};
