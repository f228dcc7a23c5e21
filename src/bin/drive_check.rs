//! drive_check - exercise each motor action for hardware bring-up.
//!
//! Runs forward, reverse, pivot and spin turns, brake and stop, each held for
//! `--hold-ms`, then shuts the motors down. Lift the wheels off the ground.
//! SIGINT/SIGTERM cuts the current hold short and stops the motors.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use target_rover::ui::Ui;
use target_rover::{open_actuator, DriveAction, RoverConfig, StopSignal, TimedAction};

#[derive(Parser, Debug)]
#[command(author, version, about = "Cycle the rover motors through every action")]
struct Args {
    /// JSON config file. Environment overrides still apply.
    #[arg(long, env = "ROVER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// How long to hold each action, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    hold_ms: u64,

    /// Inner-wheel duty for the pivot turns.
    #[arg(long, default_value_t = 30)]
    radius: u8,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let ui = Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = RoverConfig::load_from(args.config.as_deref())?;
    let mut actuator = {
        let _stage = ui.stage("Claim motor pins");
        open_actuator(&cfg.motors)?
    };
    let stop = StopSignal::new(Some(actuator.kill_switch()));
    stop.install()?;
    let hold = Duration::from_millis(args.hold_ms);

    let sequence = [
        DriveAction::Forward { duty: 100 },
        DriveAction::Reverse { duty: 100 },
        DriveAction::TurnLeft {
            radius: args.radius,
        },
        DriveAction::TurnRight {
            radius: args.radius,
        },
        DriveAction::TurnLeft { radius: 0 },
        DriveAction::TurnRight { radius: 0 },
        DriveAction::Brake,
        DriveAction::Stop,
    ];

    let mut progress = ui.actions(sequence.len());
    for action in sequence {
        progress.begin(action.label());
        log::debug!("{:?} for {}ms", action, args.hold_ms);
        if !actuator.perform_until(TimedAction::new(action, hold), stop.flag())? {
            log::warn!("interrupted during {}", action.label());
            break;
        }
        progress.finish_one();
    }

    let completed = progress.done();
    drop(progress);
    actuator.shutdown()?;
    if stop.is_requested() {
        log::info!("drive_check interrupted after {} of {} actions", completed, sequence.len());
    } else {
        log::info!("drive_check complete");
    }
    Ok(())
}
