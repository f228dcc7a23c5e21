use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::drive::{PinAssignment, DEFAULT_PWM_HZ, FULL_DUTY};
use crate::steering::DEFAULT_PIVOT_RADIUS;

const DEFAULT_CAMERA_URL: &str = "stub://rover_camera";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 15;
const DEFAULT_MAX_SUPPRESSED: u32 = 8;
const DEFAULT_DETECTOR_BACKEND: &str = "scripted";
const DEFAULT_MODEL_PATH: &str = "mobilenet_ssd_v2_coco.onnx";
const DEFAULT_LABELS_PATH: &str = "coco_labels.txt";
const DEFAULT_THRESHOLD: f32 = 0.2;
const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_INPUT_SIZE: u32 = 300;
const DEFAULT_TARGET_LABEL: &str = "banana";
const DEFAULT_MOTOR_BACKEND: &str = "sim";
const DEFAULT_OVERLAY_SINK: &str = "log";
const DEFAULT_SNAPSHOT_DIR: &str = "overlay";
const DEFAULT_SNAPSHOT_EVERY: u64 = 30;

#[derive(Debug, Deserialize, Default)]
struct RoverConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    motors: Option<MotorConfigFile>,
    steering: Option<SteeringConfigFile>,
    overlay: Option<OverlayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    rotate_180: Option<bool>,
    benign_status_codes: Option<Vec<i32>>,
    max_suppressed: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    threshold: Option<f32>,
    max_results: Option<usize>,
    input_size: Option<u32>,
    target_label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MotorConfigFile {
    backend: Option<String>,
    pwm_hz: Option<f64>,
    left: Option<crate::drive::SidePins>,
    right: Option<crate::drive::SidePins>,
}

#[derive(Debug, Deserialize, Default)]
struct SteeringConfigFile {
    pivot_radius: Option<u8>,
    forward_duty: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    sink: Option<String>,
    snapshot_dir: Option<PathBuf>,
    snapshot_every: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RoverConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub motors: MotorSettings,
    pub steering: SteeringSettings,
    pub overlay: OverlaySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub rotate_180: bool,
    /// Capture statuses to retry. `None` uses the camera backend's own
    /// defaults (see `ingest::default_benign_statuses`).
    pub benign_status_codes: Option<Vec<i32>>,
    pub max_suppressed: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CAMERA_URL.to_string(),
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            fps: DEFAULT_CAMERA_FPS,
            rotate_180: true,
            benign_status_codes: None,
            max_suppressed: DEFAULT_MAX_SUPPRESSED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub threshold: f32,
    pub max_results: usize,
    /// Square model input edge, in pixels.
    pub input_size: u32,
    pub target_label: String,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_DETECTOR_BACKEND.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            labels_path: PathBuf::from(DEFAULT_LABELS_PATH),
            threshold: DEFAULT_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
            input_size: DEFAULT_INPUT_SIZE,
            target_label: DEFAULT_TARGET_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotorSettings {
    pub backend: String,
    pub pwm_hz: f64,
    pub pins: PinAssignment,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_MOTOR_BACKEND.to_string(),
            pwm_hz: DEFAULT_PWM_HZ,
            pins: PinAssignment::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SteeringSettings {
    pub pivot_radius: u8,
    pub forward_duty: u8,
}

impl Default for SteeringSettings {
    fn default() -> Self {
        Self {
            pivot_radius: DEFAULT_PIVOT_RADIUS,
            forward_duty: FULL_DUTY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverlaySettings {
    pub sink: String,
    pub snapshot_dir: PathBuf,
    pub snapshot_every: u64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            sink: DEFAULT_OVERLAY_SINK.to_string(),
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
        }
    }
}

impl RoverConfig {
    /// Load from `ROVER_CONFIG` (JSON, optional), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ROVER_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RoverConfigFile) -> Self {
        let camera_file = file.camera.unwrap_or_default();
        let camera_defaults = CameraSettings::default();
        let camera = CameraSettings {
            url: camera_file.url.unwrap_or(camera_defaults.url),
            width: camera_file.width.unwrap_or(camera_defaults.width),
            height: camera_file.height.unwrap_or(camera_defaults.height),
            fps: camera_file.fps.unwrap_or(camera_defaults.fps),
            rotate_180: camera_file.rotate_180.unwrap_or(camera_defaults.rotate_180),
            benign_status_codes: camera_file
                .benign_status_codes
                .or(camera_defaults.benign_status_codes),
            max_suppressed: camera_file
                .max_suppressed
                .unwrap_or(camera_defaults.max_suppressed),
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector_defaults = DetectorSettings::default();
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or(detector_defaults.backend),
            model_path: detector_file
                .model_path
                .unwrap_or(detector_defaults.model_path),
            labels_path: detector_file
                .labels_path
                .unwrap_or(detector_defaults.labels_path),
            threshold: detector_file
                .threshold
                .unwrap_or(detector_defaults.threshold),
            max_results: detector_file
                .max_results
                .unwrap_or(detector_defaults.max_results),
            input_size: detector_file
                .input_size
                .unwrap_or(detector_defaults.input_size),
            target_label: detector_file
                .target_label
                .unwrap_or(detector_defaults.target_label),
        };

        let motor_file = file.motors.unwrap_or_default();
        let motor_defaults = MotorSettings::default();
        let motors = MotorSettings {
            backend: motor_file.backend.unwrap_or(motor_defaults.backend),
            pwm_hz: motor_file.pwm_hz.unwrap_or(motor_defaults.pwm_hz),
            pins: PinAssignment {
                left: motor_file.left.unwrap_or(motor_defaults.pins.left),
                right: motor_file.right.unwrap_or(motor_defaults.pins.right),
            },
        };

        let steering_file = file.steering.unwrap_or_default();
        let steering_defaults = SteeringSettings::default();
        let steering = SteeringSettings {
            pivot_radius: steering_file
                .pivot_radius
                .unwrap_or(steering_defaults.pivot_radius),
            forward_duty: steering_file
                .forward_duty
                .unwrap_or(steering_defaults.forward_duty),
        };

        let overlay_file = file.overlay.unwrap_or_default();
        let overlay_defaults = OverlaySettings::default();
        let overlay = OverlaySettings {
            sink: overlay_file.sink.unwrap_or(overlay_defaults.sink),
            snapshot_dir: overlay_file
                .snapshot_dir
                .unwrap_or(overlay_defaults.snapshot_dir),
            snapshot_every: overlay_file
                .snapshot_every
                .unwrap_or(overlay_defaults.snapshot_every),
        };

        Self {
            camera,
            detector,
            motors,
            steering,
            overlay,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = non_empty_env("ROVER_CAMERA_URL") {
            self.camera.url = url;
        }
        if let Some(backend) = non_empty_env("ROVER_DETECTOR") {
            self.detector.backend = backend;
        }
        if let Some(path) = non_empty_env("ROVER_MODEL_PATH") {
            self.detector.model_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_env("ROVER_LABELS_PATH") {
            self.detector.labels_path = PathBuf::from(path);
        }
        if let Some(label) = non_empty_env("ROVER_TARGET_LABEL") {
            self.detector.target_label = label;
        }
        if let Some(backend) = non_empty_env("ROVER_MOTOR_BACKEND") {
            self.motors.backend = backend;
        }
        if let Some(hz) = non_empty_env("ROVER_PWM_HZ") {
            self.motors.pwm_hz = hz
                .parse()
                .map_err(|_| anyhow!("ROVER_PWM_HZ must be a number of hertz"))?;
        }
        if let Some(sink) = non_empty_env("ROVER_OVERLAY_SINK") {
            self.overlay.sink = sink;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera resolution must be non-zero"));
        }
        if self.camera.fps == 0 {
            return Err(anyhow!("camera fps must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.detector.threshold) {
            return Err(anyhow!(
                "detector threshold must be within 0..1, got {}",
                self.detector.threshold
            ));
        }
        if self.detector.max_results == 0 {
            return Err(anyhow!("detector max_results must be greater than zero"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        self.detector.target_label = self.detector.target_label.trim().to_string();
        if self.detector.target_label.is_empty() {
            return Err(anyhow!("detector target_label must not be empty"));
        }
        if !(self.motors.pwm_hz.is_finite() && self.motors.pwm_hz > 0.0) {
            return Err(anyhow!("motor pwm_hz must be greater than zero"));
        }
        self.motors.pins.validate()?;
        if self.steering.pivot_radius > FULL_DUTY || self.steering.forward_duty > FULL_DUTY {
            return Err(anyhow!("steering duties must be within 0..=100"));
        }
        if self.overlay.snapshot_every == 0 {
            return Err(anyhow!("overlay snapshot_every must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self::from_file(RoverConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<RoverConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
