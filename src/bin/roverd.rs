//! roverd - target-seeking rover daemon
//!
//! This daemon:
//! 1. Claims the motor pins (fatal if they are busy)
//! 2. Loads the label table and the detector
//! 3. Opens the camera
//! 4. Runs the control loop until SIGINT/SIGTERM, a frame limit, or a fatal error
//!    (a second signal stops the motors immediately and exits with status 130)
//! 5. Stops the motors and releases the pins on the way out

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use target_rover::ui::Ui;
use target_rover::{
    open_actuator, open_backend, open_sink, open_source, ControlLoop, LabelTable, LoopSettings,
    RoverConfig, StopSignal,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Target-seeking rover control loop")]
struct Args {
    /// JSON config file. Environment overrides still apply.
    #[arg(long, env = "ROVER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after this many frames (runs until Ctrl-C when omitted).
    #[arg(long)]
    max_frames: Option<u64>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = {
        let _stage = ui.stage("Load configuration");
        RoverConfig::load_from(args.config.as_deref())?
    };
    let actuator = {
        let _stage = ui.stage("Claim motor pins");
        open_actuator(&cfg.motors)?
    };
    // From here on a second SIGINT/SIGTERM stops the motors even if the
    // main thread is blocked in startup or a camera read.
    let stop = StopSignal::new(Some(actuator.kill_switch()));
    stop.install()?;

    let labels = {
        let _stage = ui.stage("Load label table");
        LabelTable::load(&cfg.detector.labels_path)?
    };
    let settings = LoopSettings::from_config(&cfg, &labels)?;
    let detector = {
        let _stage = ui.stage("Load detector");
        open_backend(&cfg.detector)?
    };
    let source = {
        let _stage = ui.stage("Open camera");
        open_source(&cfg.camera)?
    };
    let sink = open_sink(&cfg.overlay)?;

    log::info!(
        "roverd running: camera={} {}x{} target='{}' motors={}",
        cfg.camera.url,
        cfg.camera.width,
        cfg.camera.height,
        cfg.detector.target_label,
        cfg.motors.backend
    );

    let mut control = ControlLoop::new(
        Box::new(source),
        detector,
        labels,
        actuator,
        sink,
        settings,
    );
    let summary = control.run(stop.flag(), args.max_frames)?;
    log::info!(
        "roverd exiting: frames={} overlay_failures={} interrupted={}",
        summary.frames,
        summary.overlay_failures,
        summary.interrupted
    );
    Ok(())
}
