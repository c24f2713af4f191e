//! Blink-based liveness detection for Checkpoint.
//!
//! A printed photo or a replayed video can show a face, but it can't blink
//! on request. Phase three of a check-in therefore asks the student to
//! blink [`REQUIRED_BLINKS`] times and counts genuine blinks in the
//! landmark stream before any still is sent for identity matching.
//!
//! # Blink edges
//!
//! Each frame's combined closure score (the average of both eyes) is
//! compared against [`CLOSURE_THRESHOLD`]:
//!
//! ```text
//! score  0.5 ┤  ██            ██
//!            │  ██            ██
//!  0.35 ─────┼──██────────────██────────  threshold
//!            │  ██  ██        ██  ██
//!        0.1 ┤  ██  ██        ██  ██
//!            └──┴───┴─────────┴───┴───→ t
//!              close open   close open
//!                   ↑              ↑
//!                blink 1        blink 2 → Complete
//! ```
//!
//! - A closure *onset* is accepted when the score rises above the
//!   threshold, the eyes were not already closed, and at least
//!   [`BLINK_DEBOUNCE_MS`] have passed since the onset of the last counted
//!   blink. A prolonged closure is a single onset.
//! - The blink is *counted* when the score drops back below the threshold.
//!
//! Frames are rate-gated by their own timestamps through a
//! [`SampleGate`](checkpoint_sampler::SampleGate); frames closer together
//! than the gate interval are dropped as [`FrameOutcome::Throttled`].

use std::fmt;

use checkpoint_protocol::LandmarkFrame;
use checkpoint_sampler::{SampleGate, SamplerConfig};
use serde::Serialize;

/// Combined closure score above which the eyes count as closed.
pub const CLOSURE_THRESHOLD: f32 = 0.35;

/// Minimum spacing between the onsets of two counted blinks.
pub const BLINK_DEBOUNCE_MS: u64 = 400;

/// Blinks needed to complete the challenge.
pub const REQUIRED_BLINKS: u32 = 2;

/// Where the challenge stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessPhase {
    /// No face in view.
    AwaitingFace,
    /// Face in view, no blinks yet.
    Armed,
    /// Face in view, some blinks counted.
    Counting,
    /// Enough blinks. Terminal until [`LivenessDetector::reset`].
    Complete,
}

impl fmt::Display for LivenessPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingFace => write!(f, "awaiting_face"),
            Self::Armed => write!(f, "armed"),
            Self::Counting => write!(f, "counting"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// The blink-edge bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LivenessState {
    pub blink_count: u32,
    /// Onset timestamp of the last counted blink.
    pub last_blink_timestamp_ms: Option<u64>,
    pub was_eyes_closed: bool,
}

/// What a single frame did to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Dropped by the rate gate; not scored.
    Throttled,
    /// A face came into view.
    FaceFound,
    /// The face left the view. Blink progress is kept.
    PresenceLost,
    /// A blink was counted; `count` is the new total.
    BlinkRegistered { count: u32 },
    /// The final required blink was counted.
    ChallengeComplete,
    /// The challenge is already complete; the frame was not scored.
    Ignored,
    /// Scored, nothing notable.
    NoChange,
}

/// Counts blinks in a landmark stream.
///
/// One detector per liveness challenge. It never looks at pixels or
/// identities, only closure scores and timestamps.
#[derive(Debug, Clone)]
pub struct LivenessDetector {
    gate: SampleGate,
    state: LivenessState,
    /// Onset of the closure in progress, if any.
    closure_onset_ms: Option<u64>,
    face_present: bool,
}

impl Default for LivenessDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessDetector {
    /// A detector sampling at most 30 frames per second.
    pub fn new() -> Self {
        Self::with_sampler(SamplerConfig::default())
    }

    /// A detector sampling at most `max_rate_hz` frames per second.
    pub fn with_rate(max_rate_hz: u32) -> Self {
        Self::with_sampler(SamplerConfig::with_rate(max_rate_hz))
    }

    pub fn with_sampler(config: SamplerConfig) -> Self {
        Self {
            gate: SampleGate::new(config),
            state: LivenessState::default(),
            closure_onset_ms: None,
            face_present: false,
        }
    }

    /// Feeds one landmark frame.
    pub fn on_frame(&mut self, frame: LandmarkFrame) -> FrameOutcome {
        if self.challenge_complete() {
            return FrameOutcome::Ignored;
        }
        if !self.gate.admit(frame.timestamp_ms) {
            return FrameOutcome::Throttled;
        }

        if !frame.face_found {
            if self.face_present {
                self.face_present = false;
                // A closure only counts if the reopening is seen in the same view.
                self.state.was_eyes_closed = false;
                self.closure_onset_ms = None;
                tracing::debug!(blink_count = self.state.blink_count, "face lost");
                return FrameOutcome::PresenceLost;
            }
            return FrameOutcome::NoChange;
        }

        let face_found = !self.face_present;
        if face_found {
            self.face_present = true;
            tracing::debug!(timestamp_ms = frame.timestamp_ms, "face found");
        }

        let scored = match frame.closure_score() {
            Some(score) => self.score(score, frame.timestamp_ms),
            None => FrameOutcome::NoChange,
        };

        match scored {
            FrameOutcome::NoChange if face_found => FrameOutcome::FaceFound,
            other => other,
        }
    }

    fn score(&mut self, score: f32, timestamp_ms: u64) -> FrameOutcome {
        if score > CLOSURE_THRESHOLD {
            if !self.state.was_eyes_closed && self.debounce_elapsed(timestamp_ms) {
                self.state.was_eyes_closed = true;
                self.closure_onset_ms = Some(timestamp_ms);
                tracing::trace!(timestamp_ms, score, "closure onset");
            }
            return FrameOutcome::NoChange;
        }

        if score < CLOSURE_THRESHOLD && self.state.was_eyes_closed {
            self.state.was_eyes_closed = false;
            self.state.blink_count += 1;
            self.state.last_blink_timestamp_ms = self.closure_onset_ms.take();

            let count = self.state.blink_count;
            if count >= REQUIRED_BLINKS {
                tracing::info!(blink_count = count, "liveness challenge complete");
                return FrameOutcome::ChallengeComplete;
            }
            tracing::debug!(blink_count = count, "blink registered");
            return FrameOutcome::BlinkRegistered { count };
        }

        FrameOutcome::NoChange
    }

    fn debounce_elapsed(&self, timestamp_ms: u64) -> bool {
        match self.state.last_blink_timestamp_ms {
            None => true,
            Some(last) => timestamp_ms.saturating_sub(last) >= BLINK_DEBOUNCE_MS,
        }
    }

    /// Clears all progress for a fresh challenge.
    pub fn reset(&mut self) {
        self.state = LivenessState::default();
        self.closure_onset_ms = None;
        self.face_present = false;
        self.gate.reset();
        tracing::debug!("liveness detector reset");
    }

    pub fn blink_count(&self) -> u32 {
        self.state.blink_count
    }

    pub fn challenge_complete(&self) -> bool {
        self.state.blink_count >= REQUIRED_BLINKS
    }

    /// The current phase, derived from face presence and blink count.
    ///
    /// Losing the face after some blinks reports `AwaitingFace`; the count
    /// is kept and counting resumes when the face returns.
    pub fn phase(&self) -> LivenessPhase {
        if self.challenge_complete() {
            LivenessPhase::Complete
        } else if !self.face_present {
            LivenessPhase::AwaitingFace
        } else if self.state.blink_count == 0 {
            LivenessPhase::Armed
        } else {
            LivenessPhase::Counting
        }
    }

    /// Snapshot of the blink-edge bookkeeping.
    pub fn state(&self) -> LivenessState {
        self.state
    }

    /// The frame gate, for throttling metrics.
    pub fn gate(&self) -> &SampleGate {
        &self.gate
    }
}
