//! Error kinds surfaced by the control loop.
//!
//! Everything propagates as `anyhow::Error`; the typed kinds below are attached
//! at the boundary where the failure happens so the top level can
//! `downcast_ref::<RoverError>()` and decide what is recoverable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoverError {
    /// Pin claim or configuration failure at startup. Never retried.
    #[error("hardware init failed: {0:#}")]
    HardwareInit(anyhow::Error),

    /// Camera read failure. Fatal for the current run.
    #[error("frame acquisition failed: {0:#}")]
    FrameAcquisition(anyhow::Error),

    /// Inference failure. Fatal for the current run.
    #[error("detection failed: {0:#}")]
    Detection(anyhow::Error),

    /// Overlay rendering failure. Logged and skipped for that frame only.
    #[error("overlay render failed: {0:#}")]
    OverlayRender(anyhow::Error),

    /// Motor pin write failure. Fatal after a best-effort stop.
    #[error("actuation failed: {0:#}")]
    Actuation(anyhow::Error),
}

/// Low-level status reported by a camera backend while submitting a capture
/// buffer. Carried inside `anyhow::Error` so wrappers can filter on `code`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("capture status {code}: {message}")]
pub struct CaptureStatus {
    pub code: i32,
    pub message: String,
}

impl CaptureStatus {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
