//! Frame-rate gating for Checkpoint.
//!
//! Landmark pipelines produce frames as fast as the camera allows. The
//! liveness challenge only needs ~30 per second, and processing more just
//! burns battery on the student's device. This crate provides two tools:
//!
//! - [`SampleGate`]: a pure, timestamp-based filter. Feed it the frame's
//!   own timestamp and it says whether to process or drop. No clocks, so
//!   it is deterministic under test.
//! - [`SampleScheduler`]: an async pacer for pull-based sources. It sleeps
//!   until the next sample is due, so a polling loop never spins.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside an actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = scheduler.wait_for_sample() => {
//!             if let Some(frame) = feed.grab().await? {
//!                 detector.on_frame(frame);
//!             }
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sampling configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Upper bound on processed samples per second.
    pub max_rate_hz: u32,
    /// Create the scheduler paused. `wait_for_sample` pends until resumed.
    pub start_paused: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_rate_hz: Self::MAX_RATE_HZ,
            start_paused: false,
        }
    }
}

impl SamplerConfig {
    /// Landmark processing never needs more than this.
    pub const MAX_RATE_HZ: u32 = 30;

    /// Create a config for a specific rate with defaults otherwise.
    pub fn with_rate(max_rate_hz: u32) -> Self {
        Self {
            max_rate_hz,
            ..Default::default()
        }
    }

    /// Clamp the rate into `1..=MAX_RATE_HZ`.
    ///
    /// Called automatically by [`SampleGate::new`] and
    /// [`SampleScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.max_rate_hz == 0 {
            warn!("max_rate_hz of 0 would never sample; using 1");
            self.max_rate_hz = 1;
        } else if self.max_rate_hz > Self::MAX_RATE_HZ {
            warn!(
                rate = self.max_rate_hz,
                max = Self::MAX_RATE_HZ,
                "max_rate_hz exceeds maximum; clamping"
            );
            self.max_rate_hz = Self::MAX_RATE_HZ;
        }
        self
    }

    /// Minimum spacing between accepted samples in whole milliseconds.
    ///
    /// Integer division: 30 Hz gives 33 ms, matching how frame timestamps
    /// are reported.
    pub fn min_interval_ms(&self) -> u64 {
        1000 / u64::from(self.max_rate_hz.max(1))
    }

    /// [`Self::min_interval_ms`] as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms())
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Drops samples that arrive sooner than the configured interval after the
/// last accepted one.
///
/// Timestamps come from the samples themselves (milliseconds, any epoch).
/// A timestamp earlier than the last accepted one is treated as a duplicate
/// and dropped.
#[derive(Debug, Clone)]
pub struct SampleGate {
    min_interval_ms: u64,
    last_accepted_ms: Option<u64>,
    accepted: u64,
    dropped: u64,
}

impl SampleGate {
    /// Create a gate from config.
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            min_interval_ms: config.validated().min_interval_ms(),
            last_accepted_ms: None,
            accepted: 0,
            dropped: 0,
        }
    }

    /// Create a gate for a specific rate.
    pub fn with_rate(max_rate_hz: u32) -> Self {
        Self::new(SamplerConfig::with_rate(max_rate_hz))
    }

    /// Whether the sample stamped `timestamp_ms` should be processed.
    pub fn admit(&mut self, timestamp_ms: u64) -> bool {
        if let Some(last) = self.last_accepted_ms {
            if timestamp_ms < last || timestamp_ms - last < self.min_interval_ms {
                self.dropped += 1;
                trace!(timestamp_ms, last, "sample throttled");
                return false;
            }
        }
        self.last_accepted_ms = Some(timestamp_ms);
        self.accepted += 1;
        true
    }

    /// Forget the last accepted timestamp. Counters are kept.
    pub fn reset(&mut self) {
        self.last_accepted_ms = None;
    }

    /// The enforced spacing in milliseconds.
    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms
    }

    /// Samples admitted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Samples dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for SampleGate {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Returned by [`SampleScheduler::wait_for_sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTick {
    /// Monotonically increasing sample number (starts at 1).
    pub sample: u64,
    /// Sample slots missed because the caller was slow to poll.
    pub missed: u64,
}

/// Counters for a [`SampleScheduler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplerMetrics {
    /// Sample slots that fired.
    pub total_samples: u64,
    /// Sample slots skipped because the caller fell behind.
    pub total_missed: u64,
}

/// Paces a pull-based sampling loop.
///
/// When the caller falls behind, missed slots are skipped and the next
/// slot is scheduled from now; there is never a burst of catch-up samples.
pub struct SampleScheduler {
    interval: Duration,
    next_sample: Instant,
    sample_count: u64,
    paused: bool,
    metrics: SamplerMetrics,
}

impl SampleScheduler {
    /// Create a scheduler. The first sample is due one interval from now.
    pub fn new(config: SamplerConfig) -> Self {
        let config = config.validated();
        let interval = config.interval();

        debug!(
            rate_hz = config.max_rate_hz,
            interval_ms = config.min_interval_ms(),
            "sample scheduler created"
        );

        Self {
            interval,
            next_sample: Instant::now() + interval,
            sample_count: 0,
            paused: config.start_paused,
            metrics: SamplerMetrics::default(),
        }
    }

    /// Create a scheduler for a specific rate.
    pub fn with_rate(max_rate_hz: u32) -> Self {
        Self::new(SamplerConfig::with_rate(max_rate_hz))
    }

    /// Wait until the next sample slot.
    ///
    /// While paused this future pends forever; `tokio::select!` still
    /// services its other branches.
    pub async fn wait_for_sample(&mut self) -> SampleTick {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let due = self.next_sample;
        time::sleep_until(due).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(due);
        let missed = (late_by.as_nanos() / self.interval.as_nanos().max(1)) as u64;
        if missed > 0 {
            debug!(missed, "sampler fell behind; skipping slots");
        }

        self.next_sample = now + self.interval;
        self.sample_count += 1;
        self.metrics.total_samples += 1;
        self.metrics.total_missed += missed;

        trace!(sample = self.sample_count, "sample due");

        SampleTick {
            sample: self.sample_count,
            missed,
        }
    }

    /// Stop producing samples. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(sample = self.sample_count, "sample scheduler paused");
        }
    }

    /// Resume after a pause. The next sample is one interval from now.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_sample = Instant::now() + self.interval;
            debug!(sample = self.sample_count, "sample scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_zero_rate_becomes_one() {
        let cfg = SamplerConfig::with_rate(0).validated();
        assert_eq!(cfg.max_rate_hz, 1);
        assert_eq!(cfg.min_interval_ms(), 1000);
    }

    #[test]
    fn test_validated_rate_above_max_is_clamped() {
        let cfg = SamplerConfig::with_rate(120).validated();
        assert_eq!(cfg.max_rate_hz, SamplerConfig::MAX_RATE_HZ);
    }

    #[test]
    fn test_min_interval_at_30hz_is_33ms() {
        assert_eq!(SamplerConfig::default().min_interval_ms(), 33);
    }

    #[test]
    fn test_admit_out_of_order_timestamp_dropped() {
        let mut gate = SampleGate::default();
        assert!(gate.admit(1_000));
        assert!(!gate.admit(900));
        assert_eq!(gate.dropped(), 1);
    }

    #[test]
    fn test_reset_allows_immediate_sample() {
        let mut gate = SampleGate::default();
        assert!(gate.admit(1_000));
        gate.reset();
        assert!(gate.admit(1_001));
        assert_eq!(gate.accepted(), 2);
    }
}
