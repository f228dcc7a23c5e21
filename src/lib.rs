//! Target-seeking rover controller.
//!
//! Turns a stream of camera frames into differential-drive motor commands so
//! a small rover turns toward, approaches, and halts in front of one class of
//! object.
//!
//! # Architecture
//!
//! The control loop runs once per camera frame, single-threaded:
//!
//! 1. **Acquire**: block for the next RGB frame (`ingest`).
//! 2. **Detect**: run the object detector on it (`detect`).
//! 3. **Select**: keep the first detection of the target class (`target`).
//! 4. **Steer**: map the target's position and size to one discrete action
//!    (`steering`): turn toward it, drive forward, or stop.
//! 5. **Actuate**: drive the dual H-bridge (`drive`).
//! 6. **Annotate**: render a best-effort debug overlay (`overlay`).
//!
//! The motor actuator stops and releases its pins on every exit path.
//!
//! # Module Structure
//!
//! - `frame`: immutable RGB frames
//! - `ingest`: camera sources and the benign-status filter
//! - `detect`: detector backends, detections, label table
//! - `target`, `steering`: per-frame decision logic
//! - `drive`: drive actions, pin drivers, motor actuator
//! - `overlay`: debug overlay and sinks
//! - `control`: the loop itself
//! - `signal`: SIGINT/SIGTERM escalation to a motor kill switch
//! - `config`, `error`, `ui`: ambient plumbing

pub mod config;
pub mod control;
pub mod detect;
pub mod drive;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod signal;
pub mod steering;
pub mod target;
pub mod ui;

pub use config::RoverConfig;
pub use control::{ControlLoop, LoopSettings, RunSummary, StepReport};
pub use detect::{
    open_backend, BoundingBox, Detection, DetectionSet, DetectorBackend, LabelTable, PixelBox,
    ScriptedBackend,
};
pub use drive::{
    open_actuator, Direction, DriveAction, KillSwitch, MotorActuator, MotorState, PinAssignment,
    PinDriver, Side, SidePins, SimulatedPins, TimedAction,
};
pub use error::{CaptureStatus, RoverError};
pub use frame::Frame;
pub use ingest::{open_source, FrameSource, SourceStats, SuppressStatus, SyntheticSource};
pub use overlay::{open_sink, LogSink, NullSink, Overlay, OverlaySink};
pub use signal::{SignalOutcome, StopSignal};
pub use steering::SteeringPolicy;
pub use target::{select_target, Target};
