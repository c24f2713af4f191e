//! # Checkpoint
//!
//! Classroom check-in verification. A student proves, in order:
//!
//! 1. they know the live session code the instructor announced,
//! 2. they are near the classroom's beacon,
//! 3. they are a live person (two blinks), and
//! 4. their face matches an enrolled student.
//!
//! Only then is attendance recorded.
//!
//! This crate ties the layers together behind one [`CheckInStation`] and
//! one error type. The collaborators (registry, radio, camera, matcher,
//! ledger) are traits; plug in real ones or the simulators under
//! `sim`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkpoint::prelude::*;
//!
//! checkpoint::init_tracing();
//! let station = CheckInStation::builder()
//!     .directory(BeaconDirectory::new().with_room(1, 101, "C-101"))
//!     .build(registry, radio, camera, matcher, ledger);
//!
//! let (attempt, mut updates) = station.begin();
//! attempt.submit_code("4821").await?;
//! while let Some(update) = updates.recv().await {
//!     // render the update
//! }
//! ```

mod error;
mod station;
mod telemetry;

pub use error::CheckpointError;
pub use station::{CheckInStation, CheckInStationBuilder};
pub use telemetry::init_tracing;

pub use checkpoint_attempt as attempt;
pub use checkpoint_hardware as hardware;
pub use checkpoint_identity as identity;
pub use checkpoint_liveness as liveness;
pub use checkpoint_protocol as protocol;
pub use checkpoint_proximity as proximity;
pub use checkpoint_sampler as sampler;
pub use checkpoint_session as session;

/// Everything a station needs, in one import.
pub mod prelude {
    pub use crate::{CheckInStation, CheckInStationBuilder, CheckpointError, init_tracing};

    pub use checkpoint_attempt::{
        AbortReason, AttemptStatus, CheckInConfig, CheckInError, CheckInHandle, CheckInPhase,
        CheckInUpdate, CodeRejection,
    };
    pub use checkpoint_hardware::{
        BeaconRadio, Camera, DeviceFilter, FrameFeed, HardwareError, SensorArbiter,
    };
    pub use checkpoint_identity::{
        AppendOutcome, AttendanceLedger, AttendanceRecord, ClearedLedger, InMemoryLedger,
        MatchResponse, MatcherError, RemoteMatcher,
    };
    pub use checkpoint_protocol::{
        Codec, Identity, JsonCodec, LocationId, RegistrationId, SessionCode, SessionId,
        SessionRef,
    };
    pub use checkpoint_proximity::{BeaconDirectory, PresenceSource};
    pub use checkpoint_session::{BypassPolicy, InMemoryRegistry, SessionRegistry};
}
