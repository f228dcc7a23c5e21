use anyhow::{anyhow, Result};

use super::{FrameSource, SourceStats};
use crate::error::CaptureStatus;
use crate::frame::Frame;

/// Error filter around a camera source.
///
/// Some camera stacks report a harmless status while handing a buffer back to
/// the driver. Errors carrying a `CaptureStatus` whose code is in `benign`
/// are logged and the pull is retried. More than `max_consecutive` benign
/// errors in a row, or any other error, is returned to the caller.
pub struct SuppressStatus<S> {
    inner: S,
    benign: Vec<i32>,
    max_consecutive: u32,
    suppressed_total: u64,
}

impl<S: FrameSource> SuppressStatus<S> {
    pub fn new(inner: S, benign: Vec<i32>, max_consecutive: u32) -> Self {
        Self {
            inner,
            benign,
            max_consecutive,
            suppressed_total: 0,
        }
    }

    pub fn benign_codes(&self) -> &[i32] {
        &self.benign
    }

    fn is_benign(&self, err: &anyhow::Error) -> Option<i32> {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<CaptureStatus>())
            .map(|status| status.code)
            .filter(|code| self.benign.contains(code))
    }
}

impl<S: FrameSource> FrameSource for SuppressStatus<S> {
    fn connect(&mut self) -> Result<()> {
        self.inner.connect()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let mut consecutive = 0u32;
        loop {
            match self.inner.next_frame() {
                Ok(frame) => return Ok(frame),
                Err(err) => {
                    let Some(code) = self.is_benign(&err) else {
                        return Err(err);
                    };
                    consecutive += 1;
                    self.suppressed_total += 1;
                    if consecutive > self.max_consecutive {
                        return Err(err.context(anyhow!(
                            "capture status {} repeated {} times in a row",
                            code,
                            consecutive
                        )));
                    }
                    log::debug!("suppressed benign capture status {}: {:#}", code, err);
                }
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            statuses_suppressed: self.suppressed_total,
            ..self.inner.stats()
        }
    }
}
