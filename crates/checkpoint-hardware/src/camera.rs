//! Camera and landmark pipeline abstraction.
//!
//! The landmark model runs on the hardware side; Checkpoint only sees its
//! output as [`LandmarkFrame`]s, plus one encoded still per liveness round
//! for the remote matcher.

use std::future::Future;
use std::sync::Arc;

use checkpoint_protocol::LandmarkFrame;

use crate::HardwareError;

/// A camera that can be opened for landmark streaming.
pub trait Camera: Send + Sync + 'static {
    /// The open-camera handle. Dropping it releases the camera.
    type Feed: FrameFeed;

    /// Opens the camera.
    ///
    /// # Errors
    /// [`HardwareError::PermissionDenied`] if the user refuses access.
    fn open(&self) -> impl Future<Output = Result<Self::Feed, HardwareError>> + Send;
}

/// An open camera producing landmark frames.
pub trait FrameFeed: Send + 'static {
    /// Pulls the most recent landmark frame.
    ///
    /// `Ok(None)` means no new frame is ready yet.
    fn grab(&mut self) -> impl Future<Output = Result<Option<LandmarkFrame>, HardwareError>> + Send;

    /// Captures one encoded still image (JPEG) for identity matching.
    fn capture_still(&mut self) -> impl Future<Output = Result<Vec<u8>, HardwareError>> + Send;
}

impl<C: Camera> Camera for Arc<C> {
    type Feed = C::Feed;

    fn open(&self) -> impl Future<Output = Result<Self::Feed, HardwareError>> + Send {
        (**self).open()
    }
}
