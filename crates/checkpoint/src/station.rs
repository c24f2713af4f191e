//! `CheckInStation`: a kiosk or phone that runs check-ins.
//!
//! A station owns one set of collaborators and one [`SensorArbiter`], and
//! spawns an attempt actor per student. Attempts on the same station share
//! the arbiter, so two of them can never hold the radio or camera at once.

use std::sync::Arc;

use checkpoint_attempt::{
    CheckInConfig, CheckInHandle, CheckInUpdate, Collaborators, spawn_check_in,
};
use checkpoint_hardware::{BeaconRadio, Camera, DeviceFilter, SensorArbiter};
use checkpoint_identity::{
    AttendanceLedger, AttendanceRecord, ClearedLedger, IdentityVerifier, RemoteMatcher,
};
use checkpoint_protocol::SessionId;
use checkpoint_proximity::{BeaconDirectory, ProximityDetector};
use checkpoint_session::{SessionCodeValidator, SessionRegistry};
use tokio::sync::mpsc;

use crate::CheckpointError;

/// Builder for a [`CheckInStation`].
///
/// # Example
///
/// ```rust,ignore
/// let station = CheckInStation::builder()
///     .config(CheckInConfig { allow_manual_override: true, ..Default::default() })
///     .directory(BeaconDirectory::new().with_room(1, 101, "C-101"))
///     .build(registry, radio, camera, matcher, ledger);
/// ```
pub struct CheckInStationBuilder {
    config: CheckInConfig,
    directory: BeaconDirectory,
    filter: DeviceFilter,
}

impl CheckInStationBuilder {
    /// A builder with default config, no mapped beacons, and the default
    /// beacon filter.
    pub fn new() -> Self {
        Self {
            config: CheckInConfig::default(),
            directory: BeaconDirectory::new(),
            filter: DeviceFilter::default(),
        }
    }

    /// Sets the attempt configuration. Validated at build time.
    pub fn config(mut self, config: CheckInConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the beacon-to-classroom mapping.
    pub fn directory(mut self, directory: BeaconDirectory) -> Self {
        self.directory = directory;
        self
    }

    /// Sets which beacons the radio pairs with.
    pub fn device_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Wires the collaborators into a station.
    pub fn build<R, B, C, M, L>(
        self,
        registry: R,
        radio: B,
        camera: C,
        matcher: M,
        ledger: L,
    ) -> CheckInStation<R, B, C, M, L>
    where
        R: SessionRegistry,
        B: BeaconRadio,
        C: Camera,
        M: RemoteMatcher,
        L: AttendanceLedger,
    {
        let config = self.config.validated();
        let services = Collaborators {
            validator: Arc::new(SessionCodeValidator::new(registry).with_bypass(config.bypass)),
            proximity: Arc::new(
                ProximityDetector::new(radio, self.directory).with_filter(self.filter),
            ),
            camera: Arc::new(camera),
            verifier: Arc::new(IdentityVerifier::new(matcher)),
            ledger: Arc::new(ledger),
            arbiter: SensorArbiter::new(),
        };

        tracing::info!(
            bypass = ?config.bypass,
            manual_override = config.allow_manual_override,
            frame_rate_hz = config.max_frame_rate_hz,
            "check-in station ready"
        );
        CheckInStation { services, config }
    }
}

impl Default for CheckInStationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs check-in attempts against one set of collaborators.
pub struct CheckInStation<R, B, C, M, L> {
    services: Collaborators<R, B, C, M, L>,
    config: CheckInConfig,
}

impl CheckInStation<(), (), (), (), ()> {
    /// Creates a new builder. The collaborator types come from
    /// [`CheckInStationBuilder::build`].
    pub fn builder() -> CheckInStationBuilder {
        CheckInStationBuilder::new()
    }
}

impl<R, B, C, M, L> CheckInStation<R, B, C, M, L>
where
    R: SessionRegistry,
    B: BeaconRadio,
    C: Camera,
    M: RemoteMatcher,
    L: AttendanceLedger,
{
    /// Starts a new attempt for one student.
    pub fn begin(&self) -> (CheckInHandle, mpsc::UnboundedReceiver<CheckInUpdate>) {
        let (handle, updates) = spawn_check_in(self.services.clone(), self.config.clone());
        tracing::debug!(attempt_id = %handle.attempt_id(), "attempt started");
        (handle, updates)
    }

    pub fn config(&self) -> &CheckInConfig {
        &self.config
    }

    pub fn arbiter(&self) -> &SensorArbiter {
        &self.services.arbiter
    }

    pub fn registry(&self) -> &R {
        self.services.validator.registry()
    }

    pub fn ledger(&self) -> &L {
        &self.services.ledger
    }

    /// Attendance recorded so far for `session`.
    pub async fn attendance(
        &self,
        session: &SessionId,
    ) -> Result<Vec<AttendanceRecord>, CheckpointError> {
        Ok(self.services.ledger.list(session).await?)
    }

    /// Closes out a session's attendance: returns the final list and
    /// empties the ledger for it.
    pub async fn close_attendance(
        &self,
        session: &SessionId,
    ) -> Result<ClearedLedger, CheckpointError> {
        let cleared = self.services.ledger.clear(session).await?;
        tracing::info!(session_id = %session, total = cleared.total, "attendance closed");
        Ok(cleared)
    }
}
