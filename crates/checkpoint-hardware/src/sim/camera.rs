use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use checkpoint_protocol::LandmarkFrame;

use crate::{Camera, FrameFeed, HardwareError};

/// Still returned when no script was given: a JPEG SOI marker and a tag.
const DEFAULT_STILL: &[u8] = b"\xFF\xD8simulated-still";

#[derive(Debug, Default)]
struct Script {
    frames: VecDeque<LandmarkFrame>,
    stills: VecDeque<Vec<u8>>,
}

/// A camera that plays back scripted landmark frames.
///
/// The frame queue is shared by every feed opened from this camera, so a
/// test can script several liveness rounds up front or push more frames
/// while an attempt is running.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCamera {
    script: Arc<Mutex<Script>>,
    open_error: Option<HardwareError>,
    open_feeds: Arc<AtomicUsize>,
}

impl ScriptedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues frames for playback.
    pub fn with_frames(self, frames: impl IntoIterator<Item = LandmarkFrame>) -> Self {
        self.push_frames(frames);
        self
    }

    /// Queues the stills returned by successive captures. The last one
    /// repeats once the rest are used.
    pub fn with_stills(self, stills: impl IntoIterator<Item = Vec<u8>>) -> Self {
        self.lock().stills.extend(stills);
        self
    }

    /// `open` fails with `error`.
    pub fn fail_open(mut self, error: HardwareError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Queues more frames, visible to already-open feeds.
    pub fn push_frames(&self, frames: impl IntoIterator<Item = LandmarkFrame>) {
        self.lock().frames.extend(frames);
    }

    /// Frames not yet grabbed.
    pub fn pending_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// Feeds currently open (not yet dropped).
    pub fn open_feeds(&self) -> usize {
        self.open_feeds.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Camera for ScriptedCamera {
    type Feed = ScriptedFeed;

    async fn open(&self) -> Result<ScriptedFeed, HardwareError> {
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        self.open_feeds.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("simulated camera opened");
        Ok(ScriptedFeed {
            script: Arc::clone(&self.script),
            open_feeds: Arc::clone(&self.open_feeds),
        })
    }
}

/// An open [`ScriptedCamera`]. Dropping it closes the camera.
#[derive(Debug)]
pub struct ScriptedFeed {
    script: Arc<Mutex<Script>>,
    open_feeds: Arc<AtomicUsize>,
}

impl FrameFeed for ScriptedFeed {
    async fn grab(&mut self) -> Result<Option<LandmarkFrame>, HardwareError> {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(script.frames.pop_front())
    }

    async fn capture_still(&mut self) -> Result<Vec<u8>, HardwareError> {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        let still = if script.stills.len() > 1 {
            script.stills.pop_front()
        } else {
            script.stills.front().cloned()
        };
        Ok(still.unwrap_or_else(|| DEFAULT_STILL.to_vec()))
    }
}

impl Drop for ScriptedFeed {
    fn drop(&mut self) {
        self.open_feeds.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!("simulated camera closed");
    }
}
