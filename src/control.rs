//! The perception-to-actuation loop.
//!
//! One iteration, strictly in order:
//! 1. pull a frame from the camera (blocking)
//! 2. run the detector on it
//! 3. select a target and decide a drive action
//! 4. dispatch the action to the motors
//! 5. build and render the debug overlay (best-effort)
//!
//! Frame N's motor command is always issued before frame N+1 is requested.
//! Whatever ends the loop (shutdown flag, frame limit, or error), the motors
//! are stopped and their pins released before `run` returns.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::RoverConfig;
use crate::detect::{DetectorBackend, LabelTable};
use crate::drive::{DriveAction, MotorActuator};
use crate::error::RoverError;
use crate::ingest::FrameSource;
use crate::overlay::{Overlay, OverlaySink};
use crate::steering::SteeringPolicy;
use crate::target::{select_target, Target};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Decision parameters for the loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopSettings {
    pub target_label: u32,
    pub threshold: f32,
    pub max_results: usize,
    pub policy: SteeringPolicy,
}

impl LoopSettings {
    /// Resolve the configured target class name through the label table.
    pub fn from_config(cfg: &RoverConfig, labels: &LabelTable) -> Result<Self> {
        let target_label = labels.id_of(&cfg.detector.target_label).ok_or_else(|| {
            anyhow!(
                "target label '{}' is not in the label table ({} entries)",
                cfg.detector.target_label,
                labels.len()
            )
        })?;
        Ok(Self {
            target_label,
            threshold: cfg.detector.threshold,
            max_results: cfg.detector.max_results,
            policy: SteeringPolicy::new(cfg.steering.pivot_radius, cfg.steering.forward_duty),
        })
    }
}

/// What one iteration saw and did.
#[derive(Clone, Debug)]
pub struct StepReport {
    pub sequence: u64,
    pub detections: usize,
    pub target: Option<Target>,
    pub action: DriveAction,
    pub inference: Duration,
}

/// Totals for a finished run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub overlay_failures: u64,
    pub interrupted: bool,
}

pub struct ControlLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    labels: LabelTable,
    actuator: MotorActuator,
    sink: Box<dyn OverlaySink>,
    settings: LoopSettings,
    frames: u64,
    overlay_failures: u64,
    last_inference: Duration,
}

impl ControlLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        labels: LabelTable,
        actuator: MotorActuator,
        sink: Box<dyn OverlaySink>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            detector,
            labels,
            actuator,
            sink,
            settings,
            frames: 0,
            overlay_failures: 0,
            last_inference: Duration::ZERO,
        }
    }

    pub fn actuator(&self) -> &MotorActuator {
        &self.actuator
    }

    /// Connect the camera and warm up the detector.
    pub fn start(&mut self) -> Result<()> {
        self.source
            .connect()
            .map_err(RoverError::FrameAcquisition)?;
        self.detector.warm_up().map_err(RoverError::Detection)?;
        log::info!(
            "control loop ready: detector={} sink={} target_label={} threshold={:.2} top_k={}",
            self.detector.name(),
            self.sink.name(),
            self.settings.target_label,
            self.settings.threshold,
            self.settings.max_results
        );
        Ok(())
    }

    /// Run one full iteration.
    pub fn step(&mut self) -> Result<StepReport> {
        let frame = self
            .source
            .next_frame()
            .map_err(RoverError::FrameAcquisition)?;

        let started = Instant::now();
        let detections = self
            .detector
            .detect(&frame, self.settings.threshold, self.settings.max_results)
            .map_err(RoverError::Detection)?;
        let inference = started.elapsed();
        self.last_inference = inference;

        let target = select_target(
            &detections,
            self.settings.target_label,
            frame.width,
            frame.height,
        );
        let action = self.settings.policy.decide(target.as_ref(), frame.width);
        if let Some(target) = &target {
            log::debug!(
                "frame {}: offset {:.0} width {:.0} -> {}",
                frame.sequence,
                target.center_x - frame.width as f32 / 2.0,
                target.width_px,
                action.label()
            );
        }
        self.actuator.apply(action)?;
        self.frames += 1;

        let label = target
            .as_ref()
            .and_then(|t| self.labels.name(t.detection.label_id));
        let overlay = Overlay::build(frame.width, frame.height, target.as_ref(), label, inference);
        if let Err(err) = self.sink.render(&frame, &overlay) {
            self.overlay_failures += 1;
            log::warn!("{}", RoverError::OverlayRender(err));
        }

        Ok(StepReport {
            sequence: frame.sequence,
            detections: detections.len(),
            target,
            action,
            inference,
        })
    }

    /// Iterate until `shutdown` is set, `max_frames` have been processed, or
    /// an iteration fails. The motors are always shut down before returning.
    pub fn run(&mut self, shutdown: &AtomicBool, max_frames: Option<u64>) -> Result<RunSummary> {
        let outcome = self.run_frames(shutdown, max_frames);
        let released = self.actuator.shutdown();

        match outcome {
            Ok(summary) => {
                released?;
                log::info!(
                    "control loop finished after {} frames ({} overlay failures)",
                    summary.frames,
                    summary.overlay_failures
                );
                Ok(summary)
            }
            Err(err) => {
                if let Err(release_err) = released {
                    log::error!("motor shutdown after failure also failed: {:#}", release_err);
                }
                log::error!("control loop stopped: {:#}", err);
                Err(err)
            }
        }
    }

    fn run_frames(&mut self, shutdown: &AtomicBool, max_frames: Option<u64>) -> Result<RunSummary> {
        self.start()?;
        let mut last_health_log = Instant::now();
        let mut interrupted = false;

        loop {
            if shutdown.load(Ordering::SeqCst) {
                log::info!("shutdown requested, leaving control loop");
                interrupted = true;
                break;
            }
            if max_frames.is_some_and(|limit| self.frames >= limit) {
                break;
            }

            self.step()?;

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "camera health={} frames={} suppressed={} url={} last_inference={:.2}ms",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.statuses_suppressed,
                    stats.url,
                    self.last_inference.as_secs_f64() * 1000.0
                );
                last_health_log = Instant::now();
            }
        }

        Ok(RunSummary {
            frames: self.frames,
            overlay_failures: self.overlay_failures,
            interrupted,
        })
    }
}
