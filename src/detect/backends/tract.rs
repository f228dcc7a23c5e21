#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, DetectionSet};
use crate::frame::Frame;

/// Tract-based backend for SSD-style ONNX detection models.
///
/// Expects the TensorFlow object-detection export layout: a `uint8` NHWC
/// image input and four outputs in order `boxes [1,N,4]` (ymin, xmin, ymax,
/// xmax, normalized), `classes [1,N]`, `scores [1,N]`, `count [1]`.
/// Frames are resized to the model input with nearest-neighbour sampling.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_width: u32,
    input_height: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_width: u32, input_height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    u8::datum_type(),
                    tvec!(1, input_height as usize, input_width as usize, 3),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_width,
            input_height,
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width == 0 || frame.height == 0 {
            return Err(anyhow!("empty frame"));
        }
        let pixels = frame.pixels();
        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let dst_w = self.input_width as usize;
        let dst_h = self.input_height as usize;

        let input = tract_ndarray::Array4::from_shape_fn((1, dst_h, dst_w, 3), |(_, y, x, c)| {
            let sy = (y * src_h / dst_h).min(src_h - 1);
            let sx = (x * src_w / dst_w).min(src_w - 1);
            pixels[(sy * src_w + sx) * 3 + c]
        });

        Ok(input.into_tensor())
    }

    fn decode(
        &self,
        outputs: TVec<TValue>,
        threshold: f32,
        max_results: usize,
    ) -> Result<DetectionSet> {
        if outputs.len() < 3 {
            return Err(anyhow!(
                "expected at least 3 model outputs (boxes, classes, scores), got {}",
                outputs.len()
            ));
        }
        let boxes = outputs[0]
            .to_array_view::<f32>()
            .context("box tensor was not f32")?;
        let classes = outputs[1]
            .to_array_view::<f32>()
            .context("class tensor was not f32")?;
        let scores = outputs[2]
            .to_array_view::<f32>()
            .context("score tensor was not f32")?;

        let boxes: Vec<f32> = boxes.iter().copied().collect();
        let classes: Vec<f32> = classes.iter().copied().collect();
        let scores: Vec<f32> = scores.iter().copied().collect();
        let mut count = scores.len().min(classes.len()).min(boxes.len() / 4);
        if let Some(reported) = outputs.get(3) {
            if let Ok(view) = reported.to_array_view::<f32>() {
                if let Some(n) = view.iter().next() {
                    count = count.min(n.max(0.0) as usize);
                }
            }
        }

        let mut detections = Vec::new();
        for i in 0..count {
            if detections.len() >= max_results {
                break;
            }
            let score = scores[i];
            if score < threshold {
                continue;
            }
            let b = &boxes[i * 4..i * 4 + 4];
            detections.push(Detection {
                bbox: BoundingBox::new(b[1], b[0], b[3], b[2]).normalized(),
                label_id: classes[i].max(0.0) as u32,
                score,
            });
        }
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(
        &mut self,
        frame: &Frame,
        threshold: f32,
        max_results: usize,
    ) -> Result<DetectionSet> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, threshold, max_results)
    }
}
