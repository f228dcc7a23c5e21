//! SIGINT / SIGTERM handling for the binaries that own the motors.
//!
//! The first signal only raises a flag: the control loop (or a timed hold)
//! notices it at its next check and shuts the motors down on the way out.
//! A second signal stops the motors straight from the handler thread and
//! exits, for when the owner is stuck in a blocking camera read.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::drive::KillSwitch;

/// Exit status after a forced stop (128 + SIGINT).
pub const FORCED_EXIT_CODE: i32 = 130;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Flag raised; the owner winds down by itself.
    Graceful,
    /// Motors already stopped here; the process should exit now.
    Forced,
}

#[derive(Clone)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
    kill_switch: Option<KillSwitch>,
}

impl StopSignal {
    /// `kill_switch` is `None` for tools that never drive the motors.
    pub fn new(kill_switch: Option<KillSwitch>) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            kill_switch,
        }
    }

    /// Flag to hand to `ControlLoop::run` or `MotorActuator::perform_until`.
    pub fn flag(&self) -> &AtomicBool {
        &self.requested
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// React to one signal delivery.
    pub fn notify(&self) -> SignalOutcome {
        if !self.requested.swap(true, Ordering::SeqCst) {
            log::info!("stop requested, finishing the current step (repeat to force)");
            return SignalOutcome::Graceful;
        }
        log::warn!("second stop request, stopping motors from the signal handler");
        if let Some(kill_switch) = &self.kill_switch {
            if let Err(err) = kill_switch.engage() {
                log::error!("forced motor stop failed: {:#}", err);
            }
        }
        SignalOutcome::Forced
    }

    /// Route SIGINT and SIGTERM to `notify`. A forced stop exits the process
    /// with `FORCED_EXIT_CODE`. Only one handler can be installed per process.
    pub fn install(&self) -> Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            if signal.notify() == SignalOutcome::Forced {
                std::process::exit(FORCED_EXIT_CODE);
            }
        })
        .context("install SIGINT/SIGTERM handler")
    }
}
