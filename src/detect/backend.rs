use anyhow::Result;

use crate::detect::result::DetectionSet;
use crate::frame::Frame;

/// Object detector backend.
///
/// Backends are black boxes that map one RGB frame to a list of labelled
/// boxes. They must treat the frame as read-only and must not keep references
/// to its pixels past the `detect` call.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Returns at most `max_results` detections whose score is at least
    /// `threshold`. Order is backend-defined.
    fn detect(&mut self, frame: &Frame, threshold: f32, max_results: usize)
        -> Result<DetectionSet>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
