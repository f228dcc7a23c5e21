//! In-memory pin driver.
//!
//! Records the level of every claimed pin and a bounded write history so
//! tests (and dry runs on a workstation) can inspect what the actuator did.

use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::pins::PinDriver;

/// Level changes kept in the history; older entries are dropped.
pub const HISTORY_LIMIT: usize = 4096;

/// Observable level of a simulated pin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PinLevel {
    Low,
    High,
    Pwm { frequency_hz: f64, duty: u8 },
}

impl PinLevel {
    /// True when the pin is driving current (steady high or non-zero PWM).
    pub fn is_energized(&self) -> bool {
        match self {
            PinLevel::Low => false,
            PinLevel::High => true,
            PinLevel::Pwm { duty, .. } => *duty > 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct SimBoard {
    levels: BTreeMap<u8, PinLevel>,
    claimed: BTreeSet<u8>,
    busy: BTreeSet<u8>,
    history: VecDeque<(u8, PinLevel)>,
    writes_before_failure: Option<u64>,
}

impl SimBoard {
    pub fn level(&self, pin: u8) -> Option<PinLevel> {
        self.levels.get(&pin).copied()
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }

    /// The most recent level changes (at most `HISTORY_LIMIT`), oldest
    /// first, including the initial low on claim.
    pub fn history(&self) -> impl Iterator<Item = &(u8, PinLevel)> + '_ {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn record(&mut self, pin: u8, level: PinLevel) -> Result<()> {
        if !self.claimed.contains(&pin) {
            return Err(anyhow!("pin {} is not claimed", pin));
        }
        if let Some(remaining) = self.writes_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(anyhow!("simulated write failure on pin {}", pin));
            }
            *remaining -= 1;
        }
        self.levels.insert(pin, level);
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back((pin, level));
        Ok(())
    }
}

/// Cloneable handle onto a simulated board.
#[derive(Clone, Debug, Default)]
pub struct SimulatedPins {
    board: Arc<Mutex<SimBoard>>,
}

impl SimulatedPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `pin` as held by another process so claiming it fails.
    pub fn with_busy_pin(self, pin: u8) -> Self {
        self.lock().busy.insert(pin);
        self
    }

    /// Let `count` more writes succeed, then fail every write after that.
    pub fn fail_writes_after(&self, count: u64) {
        self.lock().writes_before_failure = Some(count);
    }

    /// Make writes succeed again.
    pub fn heal(&self) {
        self.lock().writes_before_failure = None;
    }

    /// Inspect the board.
    pub fn lock(&self) -> MutexGuard<'_, SimBoard> {
        // A poisoned board only happens after a test panic; the data is still usable.
        self.board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PinDriver for SimulatedPins {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn claim_output(&mut self, pin: u8) -> Result<()> {
        let mut board = self.lock();
        if board.busy.contains(&pin) || board.claimed.contains(&pin) {
            return Err(anyhow!("pin {} is already in use", pin));
        }
        board.claimed.insert(pin);
        board.record(pin, PinLevel::Low)
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<()> {
        let level = if high { PinLevel::High } else { PinLevel::Low };
        self.lock().record(pin, level)
    }

    fn set_pwm(&mut self, pin: u8, frequency_hz: f64, duty: u8) -> Result<()> {
        self.lock().record(pin, PinLevel::Pwm { frequency_hz, duty })
    }

    fn release(&mut self, pin: u8) -> Result<()> {
        let mut board = self.lock();
        board.claimed.remove(&pin);
        board.levels.remove(&pin);
        Ok(())
    }
}
