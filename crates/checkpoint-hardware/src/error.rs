/// Errors that can occur in the hardware layer.
///
/// Cloneable so a failure can be carried inside classified events and
/// attempt updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// The user or the platform refused access to the device.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The platform lacks the requested capability.
    ///
    /// For beacon radios this means "no passive advertisement watching";
    /// the device link itself may still be usable.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Another phase holds the sensor.
    #[error("sensor busy: held by {0}")]
    Busy(String),

    /// The device went away mid-use.
    #[error("device disconnected")]
    Disconnected,

    /// The camera couldn't produce a still image.
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}
