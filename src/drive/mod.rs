//! Motor actuation.
//!
//! - `action`: discrete drive commands (`DriveAction`, `TimedAction`)
//! - `pins`: pin table and the `PinDriver` GPIO trait
//! - `actuator`: `MotorActuator`, the dual H-bridge driver
//! - `sim`: in-memory pin driver (tests, workstation dry runs)
//! - `rpi`: Raspberry Pi GPIO via rppal (feature: gpio-rppal)

pub mod action;
pub mod actuator;
pub mod pins;
#[cfg(feature = "gpio-rppal")]
pub mod rpi;
pub mod sim;

use anyhow::{anyhow, Result};

pub use action::{clamp_duty, DriveAction, TimedAction, FULL_DUTY};
pub use actuator::{Direction, KillSwitch, MotorActuator, MotorState, SideState, DEFAULT_PWM_HZ};
pub use pins::{PinAssignment, PinDriver, Side, SidePins};
#[cfg(feature = "gpio-rppal")]
pub use rpi::RppalPins;
pub use sim::{PinLevel, SimulatedPins};

use crate::config::MotorSettings;
use crate::error::RoverError;

/// Build the pin driver named in the configuration and initialize the
/// actuator on it.
pub fn open_actuator(settings: &MotorSettings) -> Result<MotorActuator> {
    let driver = open_pin_driver(&settings.backend)
        .map_err(|err| anyhow::Error::new(RoverError::HardwareInit(err)))?;
    MotorActuator::initialize(driver, settings.pins, settings.pwm_hz)
}

fn open_pin_driver(backend: &str) -> Result<Box<dyn PinDriver>> {
    match backend {
        "sim" => Ok(Box::new(SimulatedPins::new())),
        #[cfg(feature = "gpio-rppal")]
        "rppal" => Ok(Box::new(RppalPins::new()?)),
        #[cfg(not(feature = "gpio-rppal"))]
        "rppal" => Err(anyhow!("rppal motor backend requires the gpio-rppal feature")),
        other => Err(anyhow!("unknown motor backend '{}'", other)),
    }
}
