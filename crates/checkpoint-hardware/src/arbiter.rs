//! Exclusive sensor access.
//!
//! A check-in uses the radio during proximity and the camera during
//! liveness, never both. The [`SensorArbiter`] enforces that on a station:
//! at most one [`SensorLease`] exists at a time, and a lease is released
//! when dropped. Handoff between phases is therefore release-then-acquire.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::HardwareError;

/// Which sensor a lease covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Radio,
    Camera,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Radio => write!(f, "radio"),
            Self::Camera => write!(f, "camera"),
        }
    }
}

/// Hands out at most one [`SensorLease`] at a time.
///
/// Cheap to clone; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SensorArbiter {
    holder: Arc<Mutex<Option<SensorKind>>>,
}

impl SensorArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the sensor slot for `kind`.
    ///
    /// # Errors
    /// [`HardwareError::Busy`] if any lease is outstanding.
    pub fn acquire(&self, kind: SensorKind) -> Result<SensorLease, HardwareError> {
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = *holder {
            tracing::debug!(requested = %kind, held_by = %current, "sensor busy");
            return Err(HardwareError::Busy(current.to_string()));
        }
        *holder = Some(kind);
        tracing::trace!(sensor = %kind, "sensor lease acquired");

        Ok(SensorLease {
            kind,
            holder: Arc::clone(&self.holder),
        })
    }

    /// The sensor currently leased, if any.
    pub fn current(&self) -> Option<SensorKind> {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of exclusive sensor access. Released on drop.
#[derive(Debug)]
pub struct SensorLease {
    kind: SensorKind,
    holder: Arc<Mutex<Option<SensorKind>>>,
}

impl SensorLease {
    pub fn kind(&self) -> SensorKind {
        self.kind
    }
}

impl Drop for SensorLease {
    fn drop(&mut self) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::trace!(sensor = %self.kind, "sensor lease released");
    }
}
