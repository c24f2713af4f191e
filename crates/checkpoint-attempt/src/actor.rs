//! The attempt actor: one Tokio task per check-in.
//!
//! The actor owns the [`CheckInAttempt`], the phase's sensor lease, and
//! the phase's subscription. Everything the outside world wants goes
//! through [`CheckInHandle`]; everything the attempt has to say comes out
//! as [`CheckInUpdate`]s on an unbounded channel.
//!
//! Every wait (registry lookup, beacon scan, frame poll, remote match) is
//! raced against the command channel, so `cancel` is always honoured and
//! drops whatever the phase was holding.

use std::future::Future;
use std::sync::Arc;

use checkpoint_hardware::{BeaconRadio, Camera, FrameFeed, SensorArbiter, SensorKind};
use checkpoint_identity::{
    AppendOutcome, AttendanceLedger, AttendanceRecord, IdentityVerifier, RemoteMatcher,
};
use checkpoint_liveness::{FrameOutcome, LivenessDetector};
use checkpoint_protocol::{Identity, SessionRef};
use checkpoint_proximity::{Presence, ProximityDetector};
use checkpoint_sampler::SampleScheduler;
use checkpoint_session::{SessionCodeValidator, SessionRegistry};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::{
    AbortReason, AttemptId, CheckInAttempt, CheckInConfig, CheckInError, CheckInPhase,
    CodeRejection, Step, StepError,
};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Everything an attempt talks to.
///
/// Shared between attempts on the same station; cloning is cheap.
pub struct Collaborators<R, B, C, M, L> {
    pub validator: Arc<SessionCodeValidator<R>>,
    pub proximity: Arc<ProximityDetector<B>>,
    pub camera: Arc<C>,
    pub verifier: Arc<IdentityVerifier<M>>,
    pub ledger: Arc<L>,
    pub arbiter: SensorArbiter,
}

impl<R, B, C, M, L> Clone for Collaborators<R, B, C, M, L> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
            proximity: Arc::clone(&self.proximity),
            camera: Arc::clone(&self.camera),
            verifier: Arc::clone(&self.verifier),
            ledger: Arc::clone(&self.ledger),
            arbiter: self.arbiter.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Updates and status
// ---------------------------------------------------------------------------

/// Something the attempt wants its surface to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckInUpdate {
    PhaseChanged {
        from: CheckInPhase,
        to: CheckInPhase,
    },
    SessionResolved {
        session: SessionRef,
    },
    CodeRejected {
        reason: CodeRejection,
    },
    /// A beacon sample too weak, or not from the classroom.
    SignalWeak {
        rssi: i16,
    },
    PresenceConfirmed {
        presence: Presence,
    },
    FaceFound,
    FaceLost,
    BlinkRegistered {
        count: u32,
    },
    /// The face didn't match; blink again.
    IdentityRejected {
        reason: String,
        retries_left: u32,
    },
    Confirmed {
        identity: Identity,
    },
    AttendanceRecorded {
        outcome: AppendOutcome,
    },
    /// A collaborator failed or a phase timed out. The phase is kept and
    /// `retry` resumes it.
    Notice {
        phase: CheckInPhase,
        message: String,
    },
    Aborted {
        reason: AbortReason,
    },
}

/// A snapshot of the attempt, as returned by [`CheckInHandle::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptStatus {
    pub attempt_id: AttemptId,
    pub phase: CheckInPhase,
    pub session: Option<SessionRef>,
    pub presence: Option<Presence>,
    pub blink_count: u32,
    pub verified_identity: Option<Identity>,
    pub identity_failures: u32,
    /// Waiting for `retry` after a notice.
    pub stalled: bool,
}

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

type Reply = oneshot::Sender<Result<(), CheckInError>>;

pub(crate) enum AttemptCommand {
    SubmitCode { code: String, reply: Reply },
    EnterWithSession { session: SessionRef, reply: Reply },
    ManualOverride { reply: Reply },
    Retry { reply: Reply },
    Cancel { reply: Reply },
    Status { reply: oneshot::Sender<AttemptStatus> },
}

impl AttemptCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::SubmitCode { .. } => "submit_code",
            Self::EnterWithSession { .. } => "enter_with_session",
            Self::ManualOverride { .. } => "manual_override",
            Self::Retry { .. } => "retry",
            Self::Cancel { .. } => "cancel",
            Self::Status { .. } => "status",
        }
    }

    /// Answers the command with `err`. Status requests can't be refused
    /// and are dropped here; callers answer them first.
    fn refuse(self, err: CheckInError) {
        let reply = match self {
            Self::SubmitCode { reply, .. }
            | Self::EnterWithSession { reply, .. }
            | Self::ManualOverride { reply }
            | Self::Retry { reply }
            | Self::Cancel { reply } => reply,
            Self::Status { .. } => return,
        };
        let _ = reply.send(Err(err));
    }
}

/// Handle to a running attempt actor.
///
/// Cheap to clone. When every handle is dropped the actor releases its
/// sensors and stops.
#[derive(Clone)]
pub struct CheckInHandle {
    attempt_id: AttemptId,
    sender: mpsc::Sender<AttemptCommand>,
}

impl CheckInHandle {
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    /// Submits a typed session code. `Ok` means the code was accepted for
    /// validation; the outcome arrives as an update.
    pub async fn submit_code(&self, code: impl Into<String>) -> Result<(), CheckInError> {
        let code = code.into();
        self.request(|reply| AttemptCommand::SubmitCode { code, reply })
            .await
    }

    /// Skips code entry with a session resolved elsewhere.
    pub async fn enter_with_session(&self, session: SessionRef) -> Result<(), CheckInError> {
        self.request(|reply| AttemptCommand::EnterWithSession { session, reply })
            .await
    }

    /// Asserts presence without a beacon, if the config allows it.
    pub async fn manual_override(&self) -> Result<(), CheckInError> {
        self.request(|reply| AttemptCommand::ManualOverride { reply })
            .await
    }

    /// Resumes a phase stalled by a notice.
    pub async fn retry(&self) -> Result<(), CheckInError> {
        self.request(|reply| AttemptCommand::Retry { reply }).await
    }

    /// Abandons the attempt and releases its sensors.
    pub async fn cancel(&self) -> Result<(), CheckInError> {
        self.request(|reply| AttemptCommand::Cancel { reply }).await
    }

    pub async fn status(&self) -> Result<AttemptStatus, CheckInError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(AttemptCommand::Status { reply: reply_tx })
            .await
            .map_err(|_| CheckInError::Unavailable(self.attempt_id))?;
        reply_rx
            .await
            .map_err(|_| CheckInError::Unavailable(self.attempt_id))
    }

    async fn request(
        &self,
        command: impl FnOnce(Reply) -> AttemptCommand,
    ) -> Result<(), CheckInError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| CheckInError::Unavailable(self.attempt_id))?;
        reply_rx
            .await
            .map_err(|_| CheckInError::Unavailable(self.attempt_id))?
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

enum Flow {
    Continue,
    Stop,
}

/// How a raced wait ended.
enum Raced<T> {
    Done(T),
    /// A command moved the attempt to another phase while waiting.
    Interrupted,
    /// Every handle is gone.
    Closed,
    /// The deadline passed first. Only [`CheckInActor::race_until`] with a
    /// deadline returns this.
    Expired,
}

enum Interrupt {
    None,
    /// The attempt left the phase (cancel, manual override).
    Moved,
    Closed,
}

struct CheckInActor<R, B, C, M, L> {
    attempt: CheckInAttempt,
    config: CheckInConfig,
    services: Collaborators<R, B, C, M, L>,
    receiver: mpsc::Receiver<AttemptCommand>,
    updates: mpsc::UnboundedSender<CheckInUpdate>,
    stalled: bool,
}

impl<R, B, C, M, L> CheckInActor<R, B, C, M, L>
where
    R: SessionRegistry,
    B: BeaconRadio,
    C: Camera,
    M: RemoteMatcher,
    L: AttendanceLedger,
{
    async fn run(mut self) {
        let attempt_id = self.attempt.id();
        tracing::info!(%attempt_id, "check-in actor started");

        loop {
            let flow = match self.attempt.phase() {
                CheckInPhase::Confirmed => self.finish().await,
                _ if self.stalled => self.wait_for_command().await,
                CheckInPhase::CodeEntry => self.wait_for_command().await,
                CheckInPhase::Proximity => self.run_proximity().await,
                CheckInPhase::Liveness => self.run_liveness().await,
            };
            if let Flow::Stop = flow {
                break;
            }
        }

        tracing::info!(%attempt_id, phase = %self.attempt.phase(), "check-in actor stopped");
    }

    // -- Idle -------------------------------------------------------------

    /// Handles one command while nothing is in flight.
    async fn wait_for_command(&mut self) -> Flow {
        let Some(cmd) = self.receiver.recv().await else {
            return Flow::Stop;
        };

        match cmd {
            AttemptCommand::SubmitCode { .. } if self.attempt.phase() != CheckInPhase::CodeEntry => {
                let err = self.refusal(&cmd);
                cmd.refuse(err);
                Flow::Continue
            }
            AttemptCommand::SubmitCode { code, reply } => {
                let _ = reply.send(Ok(()));

                let validator = Arc::clone(&self.services.validator);
                match self.race(validator.validate(&code)).await {
                    Raced::Done(result) => {
                        let _ = self.step(|a| a.on_validation(result));
                        Flow::Continue
                    }
                    Raced::Interrupted | Raced::Expired => Flow::Continue,
                    Raced::Closed => Flow::Stop,
                }
            }
            AttemptCommand::EnterWithSession { session, reply } => {
                let result = self.step(|a| a.enter_with_session(session));
                let _ = reply.send(result.map(drop).map_err(Into::into));
                Flow::Continue
            }
            AttemptCommand::Retry { reply } => {
                let result = if self.stalled {
                    self.stalled = false;
                    tracing::info!(
                        attempt_id = %self.attempt.id(),
                        phase = %self.attempt.phase(),
                        "retrying phase"
                    );
                    Ok(())
                } else {
                    Err(CheckInError::NothingToRetry(self.attempt.phase()))
                };
                let _ = reply.send(result);
                Flow::Continue
            }
            cmd => match self.interrupt(Some(cmd)) {
                Interrupt::Closed => Flow::Stop,
                Interrupt::None | Interrupt::Moved => Flow::Continue,
            },
        }
    }

    // -- Proximity --------------------------------------------------------

    async fn run_proximity(&mut self) -> Flow {
        let _lease = match self.services.arbiter.acquire(SensorKind::Radio) {
            Ok(lease) => lease,
            Err(e) => return self.hardware_abort(e.to_string()),
        };

        let proximity = Arc::clone(&self.services.proximity);
        let required = self.attempt.classroom_requirement().cloned();
        let mut scan = match self.race(proximity.start_scan(required)).await {
            Raced::Done(scan) => scan,
            Raced::Interrupted | Raced::Expired => return Flow::Continue,
            Raced::Closed => return Flow::Stop,
        };
        let deadline = self.config.proximity_timeout.map(|t| Instant::now() + t);

        loop {
            tokio::select! {
                event = scan.next() => {
                    let Some(event) = event else {
                        self.stall("beacon scan ended before the classroom was in range");
                        return Flow::Continue;
                    };
                    match self.step(|a| a.on_proximity(&event)) {
                        Ok(Step::KeepScanning { .. }) => {}
                        _ => return Flow::Continue,
                    }
                }
                cmd = self.receiver.recv() => match self.interrupt(cmd) {
                    Interrupt::None => {}
                    Interrupt::Moved => return Flow::Continue,
                    Interrupt::Closed => return Flow::Stop,
                },
                () = expire(deadline) => {
                    self.stall("no classroom beacon in range before the timeout");
                    return Flow::Continue;
                }
            }
        }
    }

    fn manual_override(&mut self) -> Result<(), CheckInError> {
        let phase = self.attempt.phase();
        if phase != CheckInPhase::Proximity {
            return Err(StepError::OutOfPhase {
                phase,
                event: "manual_override",
            }
            .into());
        }
        if !self.config.allow_manual_override {
            return Err(CheckInError::ManualOverrideDisabled);
        }

        let event = self
            .services
            .proximity
            .manual_override(self.attempt.classroom_requirement().cloned());
        self.step(|a| a.on_proximity(&event))?;
        self.stalled = false;
        Ok(())
    }

    // -- Liveness ---------------------------------------------------------

    async fn run_liveness(&mut self) -> Flow {
        let _lease = match self.services.arbiter.acquire(SensorKind::Camera) {
            Ok(lease) => lease,
            Err(e) => return self.hardware_abort(e.to_string()),
        };

        let camera = Arc::clone(&self.services.camera);
        let mut feed = match self.race(camera.open()).await {
            Raced::Done(Ok(feed)) => feed,
            Raced::Done(Err(e)) => return self.hardware_abort(e.to_string()),
            Raced::Interrupted | Raced::Expired => return Flow::Continue,
            Raced::Closed => return Flow::Stop,
        };

        let _ = self.attempt.restart_liveness();
        let mut detector = LivenessDetector::with_sampler(self.config.sampler());
        let mut scheduler = SampleScheduler::new(self.config.sampler());
        let mut deadline = self.challenge_deadline();

        loop {
            tokio::select! {
                _ = scheduler.wait_for_sample() => {}
                cmd = self.receiver.recv() => match self.interrupt(cmd) {
                    Interrupt::None => continue,
                    Interrupt::Moved => return Flow::Continue,
                    Interrupt::Closed => return Flow::Stop,
                },
                () = expire(deadline) => return self.liveness_expired(),
            }

            let frame = match self.race_until(feed.grab(), deadline).await {
                Raced::Done(Ok(Some(frame))) => frame,
                Raced::Done(Ok(None)) => continue,
                Raced::Done(Err(e)) => {
                    self.stall(format!("camera failed: {e}"));
                    return Flow::Continue;
                }
                Raced::Interrupted => return Flow::Continue,
                Raced::Closed => return Flow::Stop,
                Raced::Expired => return self.liveness_expired(),
            };

            match detector.on_frame(frame) {
                FrameOutcome::FaceFound => self.emit(CheckInUpdate::FaceFound),
                FrameOutcome::PresenceLost => self.emit(CheckInUpdate::FaceLost),
                FrameOutcome::BlinkRegistered { count } => {
                    let _ = self.step(|a| a.on_blink_progress(count));
                }
                FrameOutcome::ChallengeComplete => {
                    let count = detector.blink_count();
                    let _ = self.step(|a| a.on_blink_progress(count));
                    match self.verify_identity(&mut feed, deadline).await {
                        Some(flow) => return flow,
                        None => {
                            detector.reset();
                            deadline = self.challenge_deadline();
                        }
                    }
                }
                FrameOutcome::Throttled | FrameOutcome::Ignored | FrameOutcome::NoChange => {}
            }
        }
    }

    /// Deadline for one blink challenge round.
    fn challenge_deadline(&self) -> Option<Instant> {
        self.config.liveness_timeout.map(|t| Instant::now() + t)
    }

    fn liveness_expired(&mut self) -> Flow {
        self.stall("blink challenge not completed before the timeout");
        Flow::Continue
    }

    /// Captures a still and asks the matcher. `None` means the face didn't
    /// match and the challenge should run again.
    ///
    /// The capture counts against the round's `deadline`; the remote match
    /// does not.
    async fn verify_identity(
        &mut self,
        feed: &mut C::Feed,
        deadline: Option<Instant>,
    ) -> Option<Flow> {
        let still = match self.race_until(feed.capture_still(), deadline).await {
            Raced::Done(Ok(still)) => still,
            Raced::Done(Err(e)) => {
                self.stall(format!("still capture failed: {e}"));
                return Some(Flow::Continue);
            }
            Raced::Interrupted => return Some(Flow::Continue),
            Raced::Closed => return Some(Flow::Stop),
            Raced::Expired => return Some(self.liveness_expired()),
        };

        let verifier = Arc::clone(&self.services.verifier);
        let result = match self.race(verifier.verify(&still)).await {
            Raced::Done(result) => result,
            Raced::Interrupted | Raced::Expired => return Some(Flow::Continue),
            Raced::Closed => return Some(Flow::Stop),
        };

        match self.step(|a| a.on_verify_result(result)) {
            Ok(Step::IdentityRejected { .. }) => None,
            _ => Some(Flow::Continue),
        }
    }

    // -- Confirmed --------------------------------------------------------

    /// Records attendance, then answers status requests until every
    /// handle is dropped.
    async fn finish(&mut self) -> Flow {
        if let (Some(session), Some(identity)) = (
            self.attempt.resolved_session(),
            self.attempt.verified_identity(),
        ) {
            let session_id = session.id.clone();
            let record = AttendanceRecord::now(identity);
            match self.services.ledger.append(&session_id, record).await {
                Ok(outcome) => self.emit(CheckInUpdate::AttendanceRecorded { outcome }),
                Err(e) => tracing::warn!(
                    attempt_id = %self.attempt.id(),
                    session_id = %session_id,
                    error = %e,
                    "attendance not recorded; check-in stays confirmed"
                ),
            }
        }

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                AttemptCommand::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                cmd => {
                    let err = self.refusal(&cmd);
                    cmd.refuse(err);
                }
            }
        }
        Flow::Stop
    }

    // -- Helpers ----------------------------------------------------------

    /// Runs `work` while still answering commands.
    async fn race<F: Future>(&mut self, work: F) -> Raced<F::Output> {
        self.race_until(work, None).await
    }

    /// Runs `work` while still answering commands, giving up at `deadline`.
    /// Dropping `work` on the way out releases whatever it borrowed.
    async fn race_until<F: Future>(
        &mut self,
        work: F,
        deadline: Option<Instant>,
    ) -> Raced<F::Output> {
        tokio::pin!(work);
        loop {
            tokio::select! {
                out = &mut work => return Raced::Done(out),
                cmd = self.receiver.recv() => match self.interrupt(cmd) {
                    Interrupt::None => {}
                    Interrupt::Moved => return Raced::Interrupted,
                    Interrupt::Closed => return Raced::Closed,
                },
                () = expire(deadline) => return Raced::Expired,
            }
        }
    }

    /// Handles a command that arrived while the phase was busy, or any
    /// command the idle loop doesn't treat specially.
    fn interrupt(&mut self, cmd: Option<AttemptCommand>) -> Interrupt {
        match cmd {
            None => {
                tracing::debug!(attempt_id = %self.attempt.id(), "all handles dropped");
                Interrupt::Closed
            }
            Some(AttemptCommand::Cancel { reply }) => {
                let result = self.step(CheckInAttempt::cancel);
                let cancelled = result.is_ok();
                let _ = reply.send(result.map(drop).map_err(Into::into));
                if cancelled {
                    Interrupt::Moved
                } else {
                    Interrupt::None
                }
            }
            Some(AttemptCommand::ManualOverride { reply }) => {
                let result = self.manual_override();
                let overridden = result.is_ok();
                let _ = reply.send(result);
                if overridden {
                    Interrupt::Moved
                } else {
                    Interrupt::None
                }
            }
            Some(AttemptCommand::Status { reply }) => {
                let _ = reply.send(self.status());
                Interrupt::None
            }
            Some(cmd) => {
                let err = self.refusal(&cmd);
                tracing::debug!(
                    attempt_id = %self.attempt.id(),
                    command = cmd.name(),
                    error = %err,
                    "command refused"
                );
                cmd.refuse(err);
                Interrupt::None
            }
        }
    }

    /// Why `cmd` can't run right now.
    fn refusal(&self, cmd: &AttemptCommand) -> CheckInError {
        let phase = self.attempt.phase();
        let out_of_phase = || {
            CheckInError::from(StepError::OutOfPhase {
                phase,
                event: cmd.name(),
            })
        };

        match cmd {
            AttemptCommand::SubmitCode { .. } | AttemptCommand::EnterWithSession { .. }
                if phase != CheckInPhase::CodeEntry =>
            {
                out_of_phase()
            }
            AttemptCommand::ManualOverride { .. } if phase != CheckInPhase::Proximity => {
                out_of_phase()
            }
            AttemptCommand::Cancel { .. } if phase.is_terminal() => out_of_phase(),
            AttemptCommand::Retry { .. } => CheckInError::NothingToRetry(phase),
            _ => CheckInError::Busy(phase),
        }
    }

    /// Applies an event to the attempt and publishes what it did.
    fn step(
        &mut self,
        event: impl FnOnce(&mut CheckInAttempt) -> Result<Step, StepError>,
    ) -> Result<Step, StepError> {
        let from = self.attempt.phase();
        let step = event(&mut self.attempt)?;
        self.publish(from, &step);
        Ok(step)
    }

    fn publish(&mut self, from: CheckInPhase, step: &Step) {
        let attempt_id = self.attempt.id();
        let phase = self.attempt.phase();

        let update = match step {
            Step::SessionResolved(session) => {
                tracing::info!(
                    %attempt_id,
                    session_id = %session.id,
                    classroom = %session.classroom_id,
                    "session resolved"
                );
                CheckInUpdate::SessionResolved {
                    session: session.clone(),
                }
            }
            Step::CodeRejected(reason) => {
                tracing::info!(%attempt_id, ?reason, "session code rejected");
                CheckInUpdate::CodeRejected { reason: *reason }
            }
            Step::PresenceConfirmed(presence) => {
                tracing::info!(
                    %attempt_id,
                    rssi = ?presence.rssi,
                    source = ?presence.source,
                    "presence confirmed"
                );
                CheckInUpdate::PresenceConfirmed {
                    presence: presence.clone(),
                }
            }
            Step::KeepScanning { rssi } => {
                tracing::trace!(%attempt_id, rssi, "beacon out of range");
                CheckInUpdate::SignalWeak { rssi: *rssi }
            }
            Step::BlinkProgress { count } => {
                tracing::debug!(%attempt_id, blink_count = count, "blink registered");
                CheckInUpdate::BlinkRegistered { count: *count }
            }
            Step::IdentityRejected {
                reason,
                retries_left,
            } => {
                tracing::info!(%attempt_id, %reason, retries_left, "identity not matched");
                CheckInUpdate::IdentityRejected {
                    reason: reason.clone(),
                    retries_left: *retries_left,
                }
            }
            Step::Confirmed(identity) => {
                tracing::info!(
                    %attempt_id,
                    registration_id = %identity.registration_id(),
                    "check-in confirmed"
                );
                CheckInUpdate::Confirmed {
                    identity: identity.clone(),
                }
            }
            Step::TransportError(reason) => {
                tracing::warn!(%attempt_id, %phase, %reason, "collaborator unavailable");
                // Code entry is retried by submitting again.
                self.stalled = phase != CheckInPhase::CodeEntry;
                CheckInUpdate::Notice {
                    phase,
                    message: reason.clone(),
                }
            }
            Step::Aborted(reason) => {
                match reason {
                    AbortReason::Cancelled => {
                        tracing::info!(%attempt_id, from = %from, "check-in cancelled");
                    }
                    _ => tracing::warn!(%attempt_id, from = %from, %reason, "check-in aborted"),
                }
                self.stalled = false;
                CheckInUpdate::Aborted {
                    reason: reason.clone(),
                }
            }
        };
        self.emit(update);

        if from != phase {
            tracing::info!(%attempt_id, from = %from, to = %phase, "phase changed");
            self.emit(CheckInUpdate::PhaseChanged { from, to: phase });
        }
    }

    fn hardware_abort(&mut self, detail: String) -> Flow {
        let _ = self.step(|a| Ok(a.abort(AbortReason::HardwareUnavailable { detail })));
        Flow::Continue
    }

    /// Keeps the phase but waits for `retry` before resuming it.
    fn stall(&mut self, message: impl Into<String>) {
        let message = message.into();
        let phase = self.attempt.phase();
        tracing::warn!(attempt_id = %self.attempt.id(), %phase, %message, "phase stalled");
        self.stalled = true;
        self.emit(CheckInUpdate::Notice { phase, message });
    }

    fn emit(&self, update: CheckInUpdate) {
        // Nobody listening is fine; the attempt still runs.
        let _ = self.updates.send(update);
    }

    fn status(&self) -> AttemptStatus {
        AttemptStatus {
            attempt_id: self.attempt.id(),
            phase: self.attempt.phase(),
            session: self.attempt.resolved_session().cloned(),
            presence: self.attempt.presence().cloned(),
            blink_count: self.attempt.blink_count(),
            verified_identity: self.attempt.verified_identity().cloned(),
            identity_failures: self.attempt.identity_failures(),
            stalled: self.stalled,
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Spawns an attempt actor and returns its handle and update stream.
///
/// `config` is validated first. The demo bypass is a property of the
/// validator inside `services`, not of this call.
pub fn spawn_check_in<R, B, C, M, L>(
    services: Collaborators<R, B, C, M, L>,
    config: CheckInConfig,
) -> (CheckInHandle, mpsc::UnboundedReceiver<CheckInUpdate>)
where
    R: SessionRegistry,
    B: BeaconRadio,
    C: Camera,
    M: RemoteMatcher,
    L: AttendanceLedger,
{
    let config = config.validated();
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();

    let attempt = CheckInAttempt::new(config.max_identity_retries);
    let handle = CheckInHandle {
        attempt_id: attempt.id(),
        sender: tx,
    };

    let actor = CheckInActor {
        attempt,
        config,
        services,
        receiver: rx,
        updates: updates_tx,
        stalled: false,
    };
    tokio::spawn(actor.run());

    (handle, updates_rx)
}
