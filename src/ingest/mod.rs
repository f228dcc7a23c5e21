//! Camera frame sources.
//!
//! This module provides the sources that feed the control loop:
//! - Synthetic source (`stub://...`, tests and dry runs)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! Every source is a blocking pull: `next_frame` returns only once a full RGB
//! frame of the configured resolution is available. Sources are restartable
//! at process level only; there is no mid-stream reconnect.
//!
//! `SuppressStatus` wraps any source and filters known-benign low-level
//! capture statuses so a driver quirk does not end the run.

#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod suppress;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};

use crate::config::CameraSettings;
use crate::frame::Frame;

pub use suppress::SuppressStatus;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

/// Blocking source of fixed-resolution RGB frames.
pub trait FrameSource {
    /// Open the underlying device. Called once before the first pull.
    fn connect(&mut self) -> Result<()>;

    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub statuses_suppressed: u64,
    pub url: String,
}

/// Capture statuses that are safe to retry for the backend named by `url`.
///
/// Codes are backend specific: the V4L2 source reports raw errno values, and
/// only `EAGAIN` (buffer not ready yet) is benign there. The synthetic source
/// never reports a status.
pub fn default_benign_statuses(url: &str) -> Vec<i32> {
    if url.starts_with("v4l2://") {
        vec![libc::EAGAIN]
    } else {
        Vec::new()
    }
}

/// Build the source named by `settings.url`, wrapped in the benign-status
/// filter. Configured codes replace the backend defaults.
pub fn open_source(settings: &CameraSettings) -> Result<SuppressStatus<Box<dyn FrameSource>>> {
    let inner: Box<dyn FrameSource> = if settings.url.starts_with("stub://") {
        Box::new(SyntheticSource::new(settings.clone()))
    } else if let Some(device) = settings.url.strip_prefix("v4l2://") {
        open_v4l2(settings, device)?
    } else {
        return Err(anyhow!(
            "unsupported camera url '{}' (expected stub:// or v4l2://)",
            settings.url
        ));
    };
    let benign = settings
        .benign_status_codes
        .clone()
        .unwrap_or_else(|| default_benign_statuses(&settings.url));
    let source = SuppressStatus::new(inner, benign, settings.max_suppressed);
    log::info!(
        "camera {}: retrying capture statuses {:?} (at most {} in a row)",
        settings.url,
        source.benign_codes(),
        settings.max_suppressed
    );
    Ok(source)
}

#[cfg(feature = "ingest-v4l2")]
fn open_v4l2(settings: &CameraSettings, device: &str) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(V4l2Source::new(settings.clone(), device)))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_v4l2(_settings: &CameraSettings, _device: &str) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!("v4l2 cameras require the ingest-v4l2 feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4l2_retries_eagain_but_not_efault() {
        let benign = default_benign_statuses("v4l2:///dev/video0");
        assert!(benign.contains(&libc::EAGAIN));
        assert!(!benign.contains(&libc::EFAULT));
        assert!(default_benign_statuses("stub://cam").is_empty());
    }

    #[test]
    fn configured_codes_replace_backend_defaults() -> Result<()> {
        let settings = CameraSettings {
            url: "stub://cam".to_string(),
            benign_status_codes: Some(vec![42]),
            ..CameraSettings::default()
        };
        let source = open_source(&settings)?;
        assert_eq!(source.benign_codes(), &[42]);

        let source = open_source(&CameraSettings::default())?;
        assert!(source.benign_codes().is_empty());
        Ok(())
    }
}
