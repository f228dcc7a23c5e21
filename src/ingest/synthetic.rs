//! Synthetic frame source (`stub://`).
//!
//! Produces frames of the configured resolution with a slowly shifting
//! gradient so consecutive frames differ. No device access.

use anyhow::Result;

use super::{FrameSource, SourceStats};
use crate::config::CameraSettings;
use crate::frame::Frame;

pub struct SyntheticSource {
    config: CameraSettings,
    frame_count: u64,
    /// Simulated scene state, advanced every 50 frames.
    scene_state: u8,
    limit: Option<u64>,
}

impl SyntheticSource {
    pub fn new(config: CameraSettings) -> Self {
        Self {
            config,
            frame_count: 0,
            scene_state: 0,
            limit: None,
        }
    }

    /// Fail with an end-of-stream error after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{} @ {} fps)",
            self.config.url,
            self.config.width,
            self.config.height,
            self.config.fps
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if let Some(limit) = self.limit {
            if self.frame_count >= limit {
                anyhow::bail!("synthetic stream ended after {} frames", limit);
            }
        }
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            statuses_suppressed: 0,
            url: self.config.url.clone(),
        }
    }
}
