use anyhow::{anyhow, Result};

use super::Overlay;
use crate::config::OverlaySettings;
use crate::frame::Frame;

/// Receiver of the per-frame debug overlay.
pub trait OverlaySink {
    fn name(&self) -> &'static str;

    /// Show `overlay` on top of `frame`.
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()>;
}

/// Discards overlays.
#[derive(Debug, Default)]
pub struct NullSink;

impl OverlaySink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    fn render(&mut self, _frame: &Frame, _overlay: &Overlay) -> Result<()> {
        Ok(())
    }
}

/// Logs the annotation text at debug level.
#[derive(Debug, Default)]
pub struct LogSink {
    rendered: u64,
}

impl LogSink {
    pub fn rendered(&self) -> u64 {
        self.rendered
    }
}

impl OverlaySink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        if overlay.width() != frame.width || overlay.height() != frame.height {
            return Err(anyhow!(
                "overlay {}x{} does not match frame {}x{}",
                overlay.width(),
                overlay.height(),
                frame.width,
                frame.height
            ));
        }
        self.rendered += 1;
        if let Some(text) = &overlay.annotation {
            log::debug!("frame {}: {}", frame.sequence, text.replace('\n', " | "));
        }
        Ok(())
    }
}

/// Writes every Nth frame, composited with its overlay, as a JPEG file.
#[cfg(feature = "overlay-snapshot")]
pub struct SnapshotSink {
    dir: std::path::PathBuf,
    every: u64,
    seen: u64,
}

#[cfg(feature = "overlay-snapshot")]
impl SnapshotSink {
    pub fn new(dir: impl Into<std::path::PathBuf>, every: u64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| anyhow!("failed to create snapshot dir {}: {}", dir.display(), e))?;
        Ok(Self {
            dir,
            every: every.max(1),
            seen: 0,
        })
    }

    fn composite(frame: &Frame, overlay: &Overlay) -> Vec<u8> {
        let mut rgb = frame.pixels().to_vec();
        for (dst, src) in rgb.chunks_exact_mut(3).zip(overlay.canvas.as_bytes().chunks_exact(4)) {
            let alpha = src[3] as u32;
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * (255 - alpha)) / 255) as u8;
            }
        }
        rgb
    }
}

#[cfg(feature = "overlay-snapshot")]
impl OverlaySink for SnapshotSink {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        self.seen += 1;
        if self.seen % self.every != 0 {
            return Ok(());
        }
        let rgb = Self::composite(frame, overlay);
        let image = image::RgbImage::from_raw(frame.width, frame.height, rgb)
            .ok_or_else(|| anyhow!("snapshot buffer does not match frame size"))?;
        let path = self.dir.join(format!("frame_{:06}.jpg", frame.sequence));
        image
            .save(&path)
            .map_err(|e| anyhow!("failed to write snapshot {}: {}", path.display(), e))?;
        log::debug!("overlay snapshot written to {}", path.display());
        Ok(())
    }
}

/// Build the sink named in the configuration.
pub fn open_sink(settings: &OverlaySettings) -> Result<Box<dyn OverlaySink>> {
    match settings.sink.as_str() {
        "null" => Ok(Box::new(NullSink)),
        "log" => Ok(Box::new(LogSink::default())),
        #[cfg(feature = "overlay-snapshot")]
        "snapshot" => Ok(Box::new(SnapshotSink::new(
            &settings.snapshot_dir,
            settings.snapshot_every,
        )?)),
        #[cfg(not(feature = "overlay-snapshot"))]
        "snapshot" => Err(anyhow!("snapshot overlays require the overlay-snapshot feature")),
        other => Err(anyhow!("unknown overlay sink '{}'", other)),
    }
}
