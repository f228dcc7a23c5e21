//! Debug overlay for the camera preview.
//!
//! Each iteration builds a transparent RGBA plane the size of the frame with
//! the steering guide lines (quarter, center, three-quarter), the target box
//! and its center marker, plus a text annotation with the inference time.
//! Rendering is best-effort: sink failures never stop the rover.

mod canvas;
mod sink;

use std::time::Duration;

pub use canvas::{Canvas, Rgba, CLEAR, RED, WHITE};
#[cfg(feature = "overlay-snapshot")]
pub use sink::SnapshotSink;
pub use sink::{open_sink, LogSink, NullSink, OverlaySink};

use crate::target::Target;

/// One frame's annotation plane.
#[derive(Clone, Debug)]
pub struct Overlay {
    pub canvas: Canvas,
    pub annotation: Option<String>,
}

impl Overlay {
    pub fn build(
        width: u32,
        height: u32,
        target: Option<&Target>,
        label: Option<&str>,
        inference: Duration,
    ) -> Self {
        let mut canvas = Canvas::new(width, height, CLEAR);
        let w = width as i64;
        canvas.vline(w / 2, WHITE);
        canvas.vline(w / 4, WHITE);
        canvas.vline(3 * w / 4, WHITE);

        let elapsed_ms = inference.as_secs_f64() * 1000.0;
        let annotation = match target {
            Some(target) => {
                let b = target.pixel_box;
                canvas.rect(b.x0 as i64, b.y0 as i64, b.x1 as i64, b.y1 as i64, RED);
                canvas.marker(target.center_x as i64, target.center_y as i64, WHITE);
                format!(
                    "{} {:.2}\n{:.2}ms",
                    label.unwrap_or("?"),
                    target.detection.score,
                    elapsed_ms
                )
            }
            None => format!("{:.2}ms", elapsed_ms),
        };

        Self {
            canvas,
            annotation: Some(annotation),
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection};

    #[test]
    fn overlay_has_guides_box_and_annotation() {
        let detection = Detection {
            bbox: BoundingBox::new(0.5, 0.25, 0.7, 0.75),
            label_id: 51,
            score: 0.87,
        };
        let target = Target::from_detection(&detection, 640, 480);
        let overlay = Overlay::build(
            640,
            480,
            Some(&target),
            Some("banana"),
            Duration::from_micros(12_500),
        );

        assert_eq!(overlay.canvas.as_bytes().len(), 640 * 480 * 4);
        assert_eq!(overlay.canvas.pixel(160, 10), Some(WHITE));
        assert_eq!(overlay.canvas.pixel(320, 10), Some(WHITE));
        assert_eq!(overlay.canvas.pixel(480, 10), Some(WHITE));
        assert_eq!(overlay.canvas.pixel(100, 10), Some(CLEAR));
        // Box corners.
        assert_eq!(overlay.canvas.pixel(330, 120), Some(RED));
        assert_eq!(overlay.canvas.pixel(448, 360), Some(RED));
        // Center marker.
        assert_eq!(overlay.canvas.pixel(384, 240), Some(WHITE));
        assert_eq!(overlay.annotation.as_deref(), Some("banana 0.87\n12.50ms"));
    }

    #[test]
    fn overlay_without_target_only_reports_timing() {
        let overlay = Overlay::build(64, 48, None, None, Duration::from_millis(3));
        assert_eq!(overlay.annotation.as_deref(), Some("3.00ms"));
        assert_eq!(overlay.canvas.pixel(32, 0), Some(WHITE));
    }
}
