use anyhow::{anyhow, Result};
use std::collections::VecDeque;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionSet};
use crate::frame::Frame;

/// Backend that replays pre-recorded detections, one set per frame.
///
/// Used by tests and dry runs. When the script runs out it either keeps
/// returning empty sets or, with `fail_when_exhausted`, reports an error so a
/// test can exercise the fatal-detection path.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: VecDeque<DetectionSet>,
    fail_when_exhausted: bool,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = DetectionSet>,
    {
        Self {
            script: frames.into_iter().collect(),
            fail_when_exhausted: false,
            calls: 0,
        }
    }

    /// A backend that never detects anything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fail_when_exhausted(mut self) -> Self {
        self.fail_when_exhausted = true;
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(
        &mut self,
        _frame: &Frame,
        threshold: f32,
        max_results: usize,
    ) -> Result<DetectionSet> {
        self.calls += 1;
        let detections = match self.script.pop_front() {
            Some(set) => set,
            None if self.fail_when_exhausted => {
                return Err(anyhow!("detection script exhausted after {} frames", self.calls - 1))
            }
            None => Vec::new(),
        };
        Ok(detections
            .into_iter()
            .filter(|d: &Detection| d.score >= threshold)
            .take(max_results)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 12], 2, 2, 1).unwrap()
    }

    fn det(label_id: u32, score: f32) -> Detection {
        Detection {
            bbox: BoundingBox::new(0.1, 0.1, 0.2, 0.2),
            label_id,
            score,
        }
    }

    #[test]
    fn scripted_backend_applies_threshold_and_limit() {
        let mut backend = ScriptedBackend::new(vec![vec![
            det(1, 0.9),
            det(2, 0.1),
            det(3, 0.5),
            det(4, 0.6),
        ]]);

        let out = backend.detect(&frame(), 0.2, 2).unwrap();
        let labels: Vec<u32> = out.iter().map(|d| d.label_id).collect();
        assert_eq!(labels, vec![1, 3]);

        // Script exhausted: empty sets from here on.
        assert!(backend.detect(&frame(), 0.2, 2).unwrap().is_empty());
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn scripted_backend_can_fail_when_exhausted() {
        let mut backend = ScriptedBackend::new(Vec::new()).fail_when_exhausted();
        assert!(backend.detect(&frame(), 0.2, 5).is_err());
    }
}
