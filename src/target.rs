//! Target selection.
//!
//! Picks the single detection the rover should follow in the current frame.
//! Nothing is carried between frames: every frame is decided on its own.

use crate::detect::{Detection, PixelBox};

/// The detection chosen for this frame, with its geometry in pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub detection: Detection,
    pub pixel_box: PixelBox,
    pub center_x: f32,
    pub center_y: f32,
    pub width_px: f32,
}

impl Target {
    pub fn from_detection(detection: &Detection, frame_width: u32, frame_height: u32) -> Self {
        let pixel_box = detection.bbox.to_pixels(frame_width, frame_height);
        let (center_x, center_y) = pixel_box.center();
        Self {
            detection: detection.clone(),
            pixel_box,
            center_x,
            center_y,
            width_px: pixel_box.width(),
        }
    }
}

/// First detection, in the order the detector returned them, whose label id
/// is `target_label`. Returns `None` for an empty set or no match.
pub fn select_target(
    detections: &[Detection],
    target_label: u32,
    frame_width: u32,
    frame_height: u32,
) -> Option<Target> {
    detections
        .iter()
        .find(|d| d.label_id == target_label)
        .map(|d| Target::from_detection(d, frame_width, frame_height))
}
