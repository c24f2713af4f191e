//! Attempt configuration and the check-in phase machine.

use std::fmt;
use std::time::Duration;

use checkpoint_sampler::SamplerConfig;
use checkpoint_session::BypassPolicy;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CheckInConfig
// ---------------------------------------------------------------------------

/// Shortest timeout [`CheckInConfig::validated`] lets through.
const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings for one check-in attempt.
///
/// Missing fields take their defaults when deserialized, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckInConfig {
    /// How many `NotMatched` outcomes are tolerated before the attempt
    /// aborts. The mismatch after the last tolerated one aborts.
    pub max_identity_retries: u32,

    /// How long a proximity scan may run without an in-range sample.
    /// `None` waits forever.
    pub proximity_timeout: Option<Duration>,

    /// How long one blink challenge round may take, still capture included.
    /// Each round after a mismatch starts a fresh window; the remote match
    /// itself is not counted. `None` waits forever.
    pub liveness_timeout: Option<Duration>,

    /// Camera polling rate in Hz, clamped to `1..=30`.
    pub max_frame_rate_hz: u32,

    /// Whether the student may assert presence by hand.
    pub allow_manual_override: bool,

    /// Whether the demo code resolves without the registry.
    pub bypass: BypassPolicy,

    /// Capacity of the attempt's command channel.
    pub command_buffer: usize,
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            max_identity_retries: 3,
            proximity_timeout: Some(Duration::from_secs(60)),
            liveness_timeout: Some(Duration::from_secs(90)),
            max_frame_rate_hz: SamplerConfig::MAX_RATE_HZ,
            allow_manual_override: false,
            bypass: BypassPolicy::Disabled,
            command_buffer: 32,
        }
    }
}

impl CheckInConfig {
    /// Returns a copy with out-of-range values clamped, logging each fix.
    pub fn validated(mut self) -> Self {
        let rate = self
            .max_frame_rate_hz
            .clamp(1, SamplerConfig::MAX_RATE_HZ);
        if rate != self.max_frame_rate_hz {
            tracing::warn!(
                requested = self.max_frame_rate_hz,
                clamped = rate,
                "frame rate out of range, clamping"
            );
            self.max_frame_rate_hz = rate;
        }

        for (name, timeout) in [
            ("proximity_timeout", &mut self.proximity_timeout),
            ("liveness_timeout", &mut self.liveness_timeout),
        ] {
            if let Some(t) = timeout.filter(|t| *t < MIN_TIMEOUT) {
                tracing::warn!(
                    timeout = name,
                    requested_ms = t.as_millis() as u64,
                    "timeout too short, raising to one second"
                );
                *timeout = Some(MIN_TIMEOUT);
            }
        }

        if self.command_buffer == 0 {
            tracing::warn!("command buffer of zero, using one");
            self.command_buffer = 1;
        }

        self
    }

    /// The sampler settings for the camera polling loop.
    pub fn sampler(&self) -> SamplerConfig {
        SamplerConfig::with_rate(self.max_frame_rate_hz)
    }
}

// ---------------------------------------------------------------------------
// CheckInPhase
// ---------------------------------------------------------------------------

/// Where a check-in attempt stands.
///
/// Forward transitions are strictly ordered, no skipping:
///
/// ```text
/// CodeEntry → Proximity → Liveness → Confirmed
/// ```
///
/// An abort from any phase but `Confirmed` goes back to `CodeEntry`.
/// `Confirmed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInPhase {
    CodeEntry,
    Proximity,
    Liveness,
    Confirmed,
}

impl CheckInPhase {
    /// The next phase in the forward order, or `None` at `Confirmed`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::CodeEntry => Some(Self::Proximity),
            Self::Proximity => Some(Self::Liveness),
            Self::Liveness => Some(Self::Confirmed),
            Self::Confirmed => None,
        }
    }

    /// Whether moving forward to `target` is legal.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Confirmed
    }
}

impl fmt::Display for CheckInPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CodeEntry => "code_entry",
            Self::Proximity => "proximity",
            Self::Liveness => "liveness",
            Self::Confirmed => "confirmed",
        };
        f.write_str(s)
    }
}
