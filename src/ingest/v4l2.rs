//! V4L2 camera source.
//!
//! Opens a local device node (e.g. `v4l2:///dev/video0`), negotiates RGB24
//! (falling back to YUYV), and pulls frames from a memory-mapped stream.
//! Driver errors that carry an OS error code are surfaced as
//! `CaptureStatus` so `SuppressStatus` can filter the benign ones.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{FrameSource, SourceStats};
use crate::config::CameraSettings;
use crate::error::CaptureStatus;
use crate::frame::Frame;

pub struct V4l2Source {
    config: CameraSettings,
    device_path: String,
    state: Option<DeviceState>,
    format: PixelFormat,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn new(config: CameraSettings, device_path: &str) -> Self {
        Self {
            config,
            device_path: device_path.to_string(),
            state: None,
            format: PixelFormat::Rgb24,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.fps == 0 {
            2_000
        } else {
            (1000 / self.config.fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

impl FrameSource for V4l2Source {
    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.device_path)
            .with_context(|| format!("open v4l2 device {}", self.device_path))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set RGB3 on {}: {}",
                    self.device_path,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        if format.width != self.config.width || format.height != self.config.height {
            return Err(anyhow!(
                "v4l2 device {} negotiated {}x{}, expected {}x{}",
                self.device_path,
                format.width,
                format.height,
                self.config.width,
                self.config.height
            ));
        }
        self.format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "v4l2 device {} offers unsupported pixel format {}",
                self.device_path,
                format.fourcc
            )
        })?;

        if self.config.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.device_path,
                    err
                );
            }
        }

        let state = DeviceStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);
        self.last_error = None;

        log::info!(
            "V4l2Source: connected to {} ({}x{}, {:?})",
            self.device_path,
            self.config.width,
            self.config.height,
            self.format
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let format = self.format;
        let (width, height) = (self.config.width, self.config.height);
        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let pixels = state.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, _meta) = fields.stream.next().map_err(|err| match err.raw_os_error() {
                Some(code) => anyhow::Error::new(CaptureStatus::new(code, err.to_string())),
                None => anyhow::Error::new(err).context("capture v4l2 frame"),
            })?;
            normalize_to_rgb(buf, width, height, format)
        });
        let pixels = pixels.map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        let frame = Frame::new(pixels, width, height, self.frame_count)?;
        Ok(if self.config.rotate_180 {
            frame.rotated_180()
        } else {
            frame
        })
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            statuses_suppressed: 0,
            url: self.config.url.clone(),
        }
    }
}
