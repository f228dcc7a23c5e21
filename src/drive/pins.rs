use anyhow::{anyhow, Result};
use serde::Deserialize;

/// One wheel side of the differential drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// H-bridge pins for one side (BCM numbering): the enable/PWM pin and the
/// two direction inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct SidePins {
    pub enable: u8,
    pub in1: u8,
    pub in2: u8,
}

impl SidePins {
    pub fn all(&self) -> [u8; 3] {
        [self.enable, self.in1, self.in2]
    }
}

/// Static pin table for both sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct PinAssignment {
    pub left: SidePins,
    pub right: SidePins,
}

impl PinAssignment {
    pub fn side(&self, side: Side) -> SidePins {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = u8> {
        self.left.all().into_iter().chain(self.right.all())
    }

    /// Every pin must be distinct.
    pub fn validate(&self) -> Result<()> {
        let mut seen: Vec<u8> = Vec::with_capacity(6);
        for pin in self.all() {
            if seen.contains(&pin) {
                return Err(anyhow!("motor pin {} is assigned more than once", pin));
            }
            seen.push(pin);
        }
        Ok(())
    }
}

impl Default for PinAssignment {
    /// L298 wiring on a Raspberry Pi header.
    fn default() -> Self {
        Self {
            left: SidePins {
                enable: 18,
                in1: 14,
                in2: 15,
            },
            right: SidePins {
                enable: 17,
                in1: 27,
                in2: 22,
            },
        }
    }
}

/// GPIO backend used by the motor actuator. `Send` so a signal handler can
/// stop the motors through a `KillSwitch`.
///
/// Implementations own the physical pins. `write` drives a steady level and
/// cancels any PWM running on that pin; `set_pwm` starts or retunes PWM.
pub trait PinDriver: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Claim `pin` as an output, initially low. Fails if the pin is in use.
    fn claim_output(&mut self, pin: u8) -> Result<()>;

    /// Drive a steady level.
    fn write(&mut self, pin: u8, high: bool) -> Result<()>;

    /// Run PWM at `frequency_hz` with `duty` percent (0..=100).
    fn set_pwm(&mut self, pin: u8, frequency_hz: f64, duty: u8) -> Result<()>;

    /// Return the pin to its unclaimed state.
    fn release(&mut self, pin: u8) -> Result<()>;
}
