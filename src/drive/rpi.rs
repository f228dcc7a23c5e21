//! Raspberry Pi GPIO backend (BCM numbering, software PWM).

use anyhow::{anyhow, Context, Result};
use rppal::gpio::{Gpio, OutputPin};
use std::collections::HashMap;

use super::pins::PinDriver;

pub struct RppalPins {
    gpio: Gpio,
    outputs: HashMap<u8, OutputPin>,
}

impl RppalPins {
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().context("open /dev/gpiomem")?;
        Ok(Self {
            gpio,
            outputs: HashMap::new(),
        })
    }

    fn output(&mut self, pin: u8) -> Result<&mut OutputPin> {
        self.outputs
            .get_mut(&pin)
            .ok_or_else(|| anyhow!("GPIO {} is not claimed", pin))
    }
}

impl PinDriver for RppalPins {
    fn name(&self) -> &'static str {
        "rppal"
    }

    fn claim_output(&mut self, pin: u8) -> Result<()> {
        if self.outputs.contains_key(&pin) {
            return Err(anyhow!("GPIO {} is already claimed", pin));
        }
        let output = self
            .gpio
            .get(pin)
            .with_context(|| format!("GPIO {} is unavailable", pin))?
            .into_output_low();
        self.outputs.insert(pin, output);
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<()> {
        let output = self.output(pin)?;
        output
            .clear_pwm()
            .with_context(|| format!("clear PWM on GPIO {}", pin))?;
        if high {
            output.set_high();
        } else {
            output.set_low();
        }
        Ok(())
    }

    fn set_pwm(&mut self, pin: u8, frequency_hz: f64, duty: u8) -> Result<()> {
        let output = self.output(pin)?;
        output
            .set_pwm_frequency(frequency_hz, f64::from(duty.min(100)) / 100.0)
            .with_context(|| format!("start PWM on GPIO {}", pin))
    }

    fn release(&mut self, pin: u8) -> Result<()> {
        if let Some(mut output) = self.outputs.remove(&pin) {
            output
                .clear_pwm()
                .with_context(|| format!("clear PWM on GPIO {}", pin))?;
            output.set_low();
            // Dropping the pin resets it to its original mode.
        }
        Ok(())
    }
}
