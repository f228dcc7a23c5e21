use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use target_rover::config::{CameraSettings, RoverConfig};
use target_rover::drive::DEFAULT_PWM_HZ;
use target_rover::{
    BoundingBox, ControlLoop, Detection, DetectionSet, DetectorBackend, Direction, DriveAction,
    Frame, FrameSource, LabelTable, LogSink, LoopSettings, MotorActuator, Overlay, OverlaySink, PinAssignment,
    RoverError, ScriptedBackend, SimulatedPins, SteeringPolicy, SyntheticSource,
};

const BANANA: u32 = 51;
const APPLE: u32 = 52;

fn labels() -> LabelTable {
    LabelTable::parse("50 spoon\n51 banana\n52 apple\n").expect("labels")
}

fn det(label_id: u32, x0: f32, x1: f32, score: f32) -> Detection {
    Detection {
        bbox: BoundingBox::new(x0, 0.3, x1, 0.7),
        label_id,
        score,
    }
}

fn settings() -> LoopSettings {
    LoopSettings {
        target_label: BANANA,
        threshold: 0.2,
        max_results: 5,
        policy: SteeringPolicy::default(),
    }
}

struct FailingSink;

impl OverlaySink for FailingSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn render(&mut self, _frame: &Frame, _overlay: &Overlay) -> Result<()> {
        Err(anyhow!("display unplugged"))
    }
}

/// Sees a centered banana every frame and raises `stop` after `after` frames,
/// the way a signal handler would mid-run.
struct InterruptingDetector {
    stop: Arc<AtomicBool>,
    after: u64,
    calls: u64,
}

impl DetectorBackend for InterruptingDetector {
    fn name(&self) -> &'static str {
        "interrupting"
    }

    fn detect(&mut self, _frame: &Frame, _threshold: f32, _max: usize) -> Result<DetectionSet> {
        self.calls += 1;
        if self.calls == self.after {
            self.stop.store(true, Ordering::SeqCst);
        }
        Ok(vec![det(BANANA, 0.45, 0.55, 0.9)])
    }
}

fn build(
    detector: impl DetectorBackend + 'static,
    frame_limit: Option<u64>,
    sink: Box<dyn OverlaySink>,
) -> (ControlLoop, SimulatedPins) {
    let camera = CameraSettings::default();
    assert_eq!((camera.width, camera.height), (640, 480));
    let mut source = SyntheticSource::new(camera);
    if let Some(limit) = frame_limit {
        source = source.with_limit(limit);
    }
    let source: Box<dyn FrameSource> = Box::new(source);

    let pins = SimulatedPins::new();
    let actuator = MotorActuator::initialize(
        Box::new(pins.clone()),
        PinAssignment::default(),
        DEFAULT_PWM_HZ,
    )
    .expect("init motors");

    let control = ControlLoop::new(
        source,
        Box::new(detector),
        labels(),
        actuator,
        sink,
        settings(),
    );
    (control, pins)
}

fn single_step(frame: DetectionSet) -> (DriveAction, ControlLoop, SimulatedPins) {
    let (mut control, pins) = build(ScriptedBackend::new([frame]), None, Box::new(LogSink::default()));
    control.start().unwrap();
    let report = control.step().unwrap();
    (report.action, control, pins)
}

#[test]
fn small_centered_target_drives_forward() {
    let (action, control, _pins) = single_step(vec![det(BANANA, 0.45, 0.55, 0.9)]);
    assert_eq!(action, DriveAction::Forward { duty: 100 });
    let state = control.actuator().state();
    assert_eq!(state.left.direction, Direction::Forward);
    assert_eq!(state.right.direction, Direction::Forward);
}

#[test]
fn target_on_the_right_turns_right() {
    let (action, control, _pins) = single_step(vec![det(BANANA, 0.85, 0.95, 0.9)]);
    assert_eq!(action, DriveAction::TurnRight { radius: 30 });
    let state = control.actuator().state();
    assert_eq!(state.right.duty, 30);
    assert_eq!(state.left.duty, 100);
}

#[test]
fn target_on_the_left_turns_left() {
    let (action, _control, _pins) = single_step(vec![det(BANANA, 0.05, 0.15, 0.9)]);
    assert_eq!(action, DriveAction::TurnLeft { radius: 30 });
}

#[test]
fn nothing_detected_keeps_the_motors_idle() {
    let (action, control, pins) = single_step(Vec::new());
    assert_eq!(action, DriveAction::Stop);
    assert!(control.actuator().state().is_stopped());
    let board = pins.lock();
    assert!(
        board.history().all(|(_, level)| !level.is_energized()),
        "no pin may be energized without a target"
    );
}

#[test]
fn large_centered_target_halts() {
    let (action, control, _pins) = single_step(vec![det(BANANA, 0.3, 0.7, 0.9)]);
    assert_eq!(action, DriveAction::Stop);
    assert!(control.actuator().state().is_stopped());
}

#[test]
fn other_classes_and_weak_scores_are_ignored() {
    let (action, _control, _pins) = single_step(vec![
        det(APPLE, 0.45, 0.55, 0.95),
        det(BANANA, 0.85, 0.95, 0.1),
    ]);
    assert_eq!(action, DriveAction::Stop);
}

#[test]
fn first_matching_detection_wins() {
    let (action, _control, _pins) = single_step(vec![
        det(APPLE, 0.85, 0.95, 0.95),
        det(BANANA, 0.05, 0.15, 0.6),
        det(BANANA, 0.85, 0.95, 0.9),
    ]);
    assert_eq!(action, DriveAction::TurnLeft { radius: 30 });
}

#[test]
fn run_honours_frame_limit_and_releases_pins() {
    let script = vec![
        vec![det(BANANA, 0.85, 0.95, 0.9)],
        vec![det(BANANA, 0.45, 0.55, 0.9)],
        vec![det(BANANA, 0.3, 0.7, 0.9)],
    ];
    let (mut control, pins) = build(ScriptedBackend::new(script), None, Box::new(LogSink::default()));
    let shutdown = AtomicBool::new(false);

    let summary = control.run(&shutdown, Some(3)).unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.overlay_failures, 0);
    assert!(!summary.interrupted);
    assert!(control.actuator().is_released());
    assert_eq!(pins.lock().claimed_count(), 0);
}

#[test]
fn overlay_failures_do_not_stop_the_loop() {
    let script = vec![vec![det(BANANA, 0.45, 0.55, 0.9)]; 4];
    let (mut control, _pins) = build(ScriptedBackend::new(script), None, Box::new(FailingSink));
    let shutdown = AtomicBool::new(false);

    let summary = control.run(&shutdown, Some(4)).unwrap();
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.overlay_failures, 4);
}

#[test]
fn detection_failure_is_fatal_and_stops_the_motors() {
    let script = vec![vec![det(BANANA, 0.45, 0.55, 0.9)]];
    let (mut control, pins) = build(
        ScriptedBackend::new(script).fail_when_exhausted(),
        None,
        Box::new(LogSink::default()),
    );
    let shutdown = AtomicBool::new(false);

    let err = control.run(&shutdown, Some(10)).expect_err("second frame fails");
    assert!(matches!(
        err.downcast_ref::<RoverError>(),
        Some(RoverError::Detection(_))
    ));
    assert!(control.actuator().is_released());
    assert!(control.actuator().state().is_stopped());
    assert_eq!(pins.lock().claimed_count(), 0);
}

#[test]
fn camera_end_of_stream_is_fatal_and_stops_the_motors() {
    let script = vec![vec![det(BANANA, 0.45, 0.55, 0.9)]; 5];
    let (mut control, pins) = build(
        ScriptedBackend::new(script),
        Some(2),
        Box::new(LogSink::default()),
    );
    let shutdown = AtomicBool::new(false);

    let err = control.run(&shutdown, None).expect_err("stream ends");
    assert!(matches!(
        err.downcast_ref::<RoverError>(),
        Some(RoverError::FrameAcquisition(_))
    ));
    assert!(control.actuator().is_released());
    assert_eq!(pins.lock().claimed_count(), 0);
}

#[test]
fn preset_shutdown_flag_exits_before_the_first_frame() {
    let (mut control, pins) = build(ScriptedBackend::empty(), None, Box::new(LogSink::default()));
    let shutdown = AtomicBool::new(true);

    let summary = control.run(&shutdown, None).unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.frames, 0);
    assert_eq!(pins.lock().claimed_count(), 0);
}

#[test]
fn loop_settings_resolve_target_by_name() {
    let cfg = RoverConfig::default();
    let resolved = LoopSettings::from_config(&cfg, &labels()).unwrap();
    assert_eq!(resolved.target_label, BANANA);
    assert_eq!(resolved.threshold, 0.2);
    assert_eq!(resolved.max_results, 5);

    let mut cfg = RoverConfig::default();
    cfg.detector.target_label = "giraffe".to_string();
    assert!(LoopSettings::from_config(&cfg, &labels()).is_err());
}

#[test]
fn pin_write_failure_mid_run_is_fatal_and_releases_pins() {
    let script = vec![vec![det(BANANA, 0.45, 0.55, 0.9)]; 5];
    let (mut control, pins) = build(ScriptedBackend::new(script), None, Box::new(LogSink::default()));
    control.start().unwrap();
    let first = control.step().unwrap();
    assert_eq!(first.action, DriveAction::Forward { duty: 100 });

    pins.fail_writes_after(0);
    let shutdown = AtomicBool::new(false);
    let err = control.run(&shutdown, Some(5)).expect_err("pin writes fail");

    assert!(matches!(
        err.downcast_ref::<RoverError>(),
        Some(RoverError::Actuation(_))
    ));
    assert!(control.actuator().state().is_stopped());
    assert!(control.actuator().is_released());
    assert_eq!(pins.lock().claimed_count(), 0);
}

#[test]
fn stop_request_mid_run_finishes_the_frame_and_releases_pins() {
    let stop = Arc::new(AtomicBool::new(false));
    let detector = InterruptingDetector {
        stop: Arc::clone(&stop),
        after: 3,
        calls: 0,
    };
    let (mut control, pins) = build(detector, None, Box::new(LogSink::default()));

    let summary = control.run(&stop, None).unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.frames, 3);
    assert!(control.actuator().is_released());
    assert!(control.actuator().state().is_stopped());
    assert_eq!(pins.lock().claimed_count(), 0);
}
