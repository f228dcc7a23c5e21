//! Differential-drive actuator for a dual H-bridge (L298-style).
//!
//! Each side has an enable pin carrying PWM and two direction inputs. The
//! actuator owns the pins from `initialize` until `shutdown`; dropping it runs
//! `shutdown`, so every exit path leaves the motors de-energized. A
//! `KillSwitch` taken from the actuator can do the same from another thread
//! while the owner is blocked.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::action::{clamp_duty, DriveAction, TimedAction, FULL_DUTY};
use super::pins::{PinAssignment, PinDriver, Side};
use crate::error::RoverError;

/// Default PWM carrier frequency for the L298 board.
pub const DEFAULT_PWM_HZ: f64 = 20.0;

/// How often a cancellable hold checks its flag.
const HOLD_SLICE: Duration = Duration::from_millis(20);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Enable low, both inputs low (coasting).
    #[default]
    Idle,
    Forward,
    Reverse,
    /// Enable high, both inputs low (short brake).
    Brake,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SideState {
    pub direction: Direction,
    pub duty: u8,
}

/// Snapshot of what the actuator last commanded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MotorState {
    pub left: SideState,
    pub right: SideState,
}

impl MotorState {
    pub fn side(&self, side: Side) -> SideState {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn is_stopped(&self) -> bool {
        Side::BOTH
            .iter()
            .all(|side| self.side(*side).direction == Direction::Idle && self.side(*side).duty == 0)
    }
}

/// The claimed pins, shared by the actuator and its kill switches.
struct MotorBus {
    driver: Box<dyn PinDriver>,
    pins: PinAssignment,
    pwm_hz: f64,
    released: bool,
}

impl MotorBus {
    /// Set one side's direction, clearing the opposing input first so the
    /// two inputs are never high together, then start PWM on the enable pin.
    fn drive_side(
        &mut self,
        state: &mut MotorState,
        side: Side,
        direction: Direction,
        duty: u8,
    ) -> Result<()> {
        let pins = self.pins.side(side);
        match direction {
            Direction::Forward => {
                self.driver.write(pins.in2, false)?;
                self.driver.write(pins.in1, true)?;
            }
            Direction::Reverse => {
                self.driver.write(pins.in1, false)?;
                self.driver.write(pins.in2, true)?;
            }
            Direction::Idle | Direction::Brake => {
                return Err(anyhow!("drive_side only handles forward and reverse"));
            }
        }
        self.driver.set_pwm(pins.enable, self.pwm_hz, duty)?;
        *state.side_mut(side) = SideState { direction, duty };
        Ok(())
    }

    fn coast_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for side in Side::BOTH {
            let pins = self.pins.side(side);
            for pin in [pins.enable, pins.in1, pins.in2] {
                if let Err(err) = self.driver.write(pin, false) {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Coast both sides and release every pin. Does nothing once released.
    fn stop_and_release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        let stopped = self.coast_all();
        let mut release_err = None;
        for pin in self.pins.all() {
            if let Err(err) = self.driver.release(pin) {
                log::error!("failed to release motor pin {}: {:#}", pin, err);
                release_err.get_or_insert(err);
            }
        }
        self.released = true;
        log::info!("motors stopped and pins released");
        if let Err(err) = stopped {
            return Err(RoverError::Actuation(err).into());
        }
        match release_err {
            Some(err) => Err(RoverError::Actuation(err).into()),
            None => Ok(()),
        }
    }
}

fn lock_bus(bus: &Mutex<MotorBus>) -> MutexGuard<'_, MotorBus> {
    // A panic elsewhere must not keep the motors from being stopped.
    bus.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Stops the motors and releases their pins from any thread.
///
/// Meant for signal handlers: the owning `MotorActuator` may be blocked in a
/// camera read when the operator asks to quit.
#[derive(Clone)]
pub struct KillSwitch {
    bus: Arc<Mutex<MotorBus>>,
}

impl KillSwitch {
    /// Same effect as `MotorActuator::shutdown`. Safe to call repeatedly and
    /// after the actuator has shut down.
    pub fn engage(&self) -> Result<()> {
        lock_bus(&self.bus).stop_and_release()
    }
}

pub struct MotorActuator {
    bus: Arc<Mutex<MotorBus>>,
    pwm_hz: f64,
    state: MotorState,
}

impl MotorActuator {
    /// Claim every motor pin as a low output.
    ///
    /// Any claim failure releases the pins claimed so far and returns a
    /// `RoverError::HardwareInit`.
    pub fn initialize(
        mut driver: Box<dyn PinDriver>,
        pins: PinAssignment,
        pwm_hz: f64,
    ) -> Result<Self> {
        if let Err(err) = pins.validate() {
            return Err(RoverError::HardwareInit(err).into());
        }
        if !(pwm_hz.is_finite() && pwm_hz > 0.0) {
            return Err(RoverError::HardwareInit(anyhow!(
                "PWM frequency must be positive, got {}",
                pwm_hz
            ))
            .into());
        }

        let mut claimed = Vec::with_capacity(6);
        for pin in pins.all() {
            if let Err(err) = driver.claim_output(pin) {
                for pin in claimed {
                    let _ = driver.release(pin);
                }
                return Err(RoverError::HardwareInit(
                    err.context(format!("claim motor pin {} on {}", pin, driver.name())),
                )
                .into());
            }
            claimed.push(pin);
        }

        log::info!(
            "motors ready on {} (left EN{} IN{}/{}, right EN{} IN{}/{}, {} Hz)",
            driver.name(),
            pins.left.enable,
            pins.left.in1,
            pins.left.in2,
            pins.right.enable,
            pins.right.in1,
            pins.right.in2,
            pwm_hz
        );

        Ok(Self {
            bus: Arc::new(Mutex::new(MotorBus {
                driver,
                pins,
                pwm_hz,
                released: false,
            })),
            pwm_hz,
            state: MotorState::default(),
        })
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn pwm_hz(&self) -> f64 {
        self.pwm_hz
    }

    pub fn is_released(&self) -> bool {
        lock_bus(&self.bus).released
    }

    pub fn kill_switch(&self) -> KillSwitch {
        KillSwitch {
            bus: Arc::clone(&self.bus),
        }
    }

    /// Both sides forward at `duty`.
    pub fn forward(&mut self, duty: u8, hold: Option<Duration>) -> Result<()> {
        let duty = clamp_duty(duty);
        self.command(|bus, state| {
            bus.drive_side(state, Side::Left, Direction::Forward, duty)?;
            bus.drive_side(state, Side::Right, Direction::Forward, duty)
        })?;
        pause(hold);
        Ok(())
    }

    /// Both sides reverse at `duty`.
    pub fn reverse(&mut self, duty: u8, hold: Option<Duration>) -> Result<()> {
        let duty = clamp_duty(duty);
        self.command(|bus, state| {
            bus.drive_side(state, Side::Left, Direction::Reverse, duty)?;
            bus.drive_side(state, Side::Right, Direction::Reverse, duty)
        })?;
        pause(hold);
        Ok(())
    }

    /// Turn with the left wheel on the inside.
    pub fn turn_left(&mut self, radius: u8, duty: u8, hold: Option<Duration>) -> Result<()> {
        self.turn(Side::Left, radius, duty)?;
        pause(hold);
        Ok(())
    }

    /// Turn with the right wheel on the inside.
    pub fn turn_right(&mut self, radius: u8, duty: u8, hold: Option<Duration>) -> Result<()> {
        self.turn(Side::Right, radius, duty)?;
        pause(hold);
        Ok(())
    }

    /// Pivot (`radius > 0`: inner wheel forward at `radius`) or spin in place
    /// (`radius == 0`: inner wheel reversed). The outer wheel always runs
    /// forward at `duty`.
    fn turn(&mut self, inner: Side, radius: u8, duty: u8) -> Result<()> {
        let outer = match inner {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        };
        let radius = clamp_duty(radius);
        let duty = clamp_duty(duty);
        self.command(|bus, state| {
            if radius > 0 {
                bus.drive_side(state, inner, Direction::Forward, radius)?;
            } else {
                bus.drive_side(state, inner, Direction::Reverse, duty)?;
            }
            bus.drive_side(state, outer, Direction::Forward, duty)
        })
    }

    /// De-energize both enable pins and clear every direction pin.
    pub fn stop(&mut self) -> Result<()> {
        self.command(|bus, state| {
            bus.coast_all()?;
            *state = MotorState::default();
            Ok(())
        })
    }

    /// Hold both enable pins high with the direction pins cleared.
    pub fn brake(&mut self) -> Result<()> {
        self.command(|bus, state| {
            for side in Side::BOTH {
                let pins = bus.pins.side(side);
                bus.driver.write(pins.in1, false)?;
                bus.driver.write(pins.in2, false)?;
                bus.driver.write(pins.enable, true)?;
                *state.side_mut(side) = SideState {
                    direction: Direction::Brake,
                    duty: FULL_DUTY,
                };
            }
            Ok(())
        })
    }

    /// Dispatch one policy decision without blocking.
    pub fn apply(&mut self, action: DriveAction) -> Result<()> {
        self.dispatch(action.clamped(), None)
    }

    /// Perform an action and keep it running for `timed.hold`.
    pub fn perform(&mut self, timed: TimedAction) -> Result<()> {
        self.dispatch(timed.action.clamped(), Some(timed.hold))
    }

    /// Like `perform`, but the hold ends as soon as `cancel` is set.
    /// Returns `false` when the hold was cut short. The action itself keeps
    /// running either way; the caller decides whether to stop.
    pub fn perform_until(&mut self, timed: TimedAction, cancel: &AtomicBool) -> Result<bool> {
        self.dispatch(timed.action.clamped(), None)?;
        Ok(hold_until(timed.hold, cancel))
    }

    fn dispatch(&mut self, action: DriveAction, hold: Option<Duration>) -> Result<()> {
        match action {
            DriveAction::Forward { duty } => self.forward(duty, hold),
            DriveAction::Reverse { duty } => self.reverse(duty, hold),
            DriveAction::TurnLeft { radius } => self.turn_left(radius, FULL_DUTY, hold),
            DriveAction::TurnRight { radius } => self.turn_right(radius, FULL_DUTY, hold),
            DriveAction::Stop => {
                self.stop()?;
                pause(hold);
                Ok(())
            }
            DriveAction::Brake => {
                self.brake()?;
                pause(hold);
                Ok(())
            }
        }
    }

    /// Stop the motors and release every pin. Safe to call repeatedly.
    pub fn shutdown(&mut self) -> Result<()> {
        let result = lock_bus(&self.bus).stop_and_release();
        self.state = MotorState::default();
        result
    }

    /// Run a pin sequence. On failure, try once to coast both sides before
    /// reporting the error as `RoverError::Actuation`.
    fn command<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut MotorBus, &mut MotorState) -> Result<()>,
    {
        let mut bus = lock_bus(&self.bus);
        if bus.released {
            return Err(RoverError::Actuation(anyhow!("motor pins already released")).into());
        }
        if let Err(err) = f(&mut *bus, &mut self.state) {
            if let Err(stop_err) = bus.coast_all() {
                log::error!("best-effort motor stop failed: {:#}", stop_err);
            }
            self.state = MotorState::default();
            return Err(RoverError::Actuation(err).into());
        }
        Ok(())
    }
}

impl Drop for MotorActuator {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("motor shutdown on drop failed: {:#}", err);
        }
    }
}

fn pause(hold: Option<Duration>) {
    if let Some(hold) = hold {
        std::thread::sleep(hold);
    }
}

/// Sleep for `hold` in short slices. Returns `false` if `cancel` was set
/// before the time ran out.
fn hold_until(hold: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + hold;
    loop {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(HOLD_SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::sim::{PinLevel, SimulatedPins};

    fn actuator() -> (MotorActuator, SimulatedPins) {
        let pins = SimulatedPins::new();
        let act = MotorActuator::initialize(
            Box::new(pins.clone()),
            PinAssignment::default(),
            DEFAULT_PWM_HZ,
        )
        .expect("init");
        (act, pins)
    }

    #[test]
    fn initialize_claims_all_pins_low() {
        let (_act, pins) = actuator();
        let board = pins.lock();
        assert_eq!(board.claimed_count(), 6);
        for pin in PinAssignment::default().all() {
            assert_eq!(board.level(pin), Some(PinLevel::Low));
        }
    }

    #[test]
    fn busy_pin_is_a_hardware_init_error() {
        let pins = SimulatedPins::new().with_busy_pin(27);
        let err = MotorActuator::initialize(
            Box::new(pins.clone()),
            PinAssignment::default(),
            DEFAULT_PWM_HZ,
        )
        .err()
        .expect("busy pin must fail");
        assert!(matches!(
            err.downcast_ref::<RoverError>(),
            Some(RoverError::HardwareInit(_))
        ));
        // Partially claimed pins are handed back.
        assert_eq!(pins.lock().claimed_count(), 0);
    }

    #[test]
    fn forward_sets_both_sides() -> Result<()> {
        let (mut act, pins) = actuator();
        act.forward(80, None)?;
        let state = act.state();
        assert_eq!(state.left, SideState { direction: Direction::Forward, duty: 80 });
        assert_eq!(state.right, SideState { direction: Direction::Forward, duty: 80 });
        let board = pins.lock();
        assert_eq!(board.level(14), Some(PinLevel::High));
        assert_eq!(board.level(15), Some(PinLevel::Low));
        assert_eq!(
            board.level(18),
            Some(PinLevel::Pwm { frequency_hz: 20.0, duty: 80 })
        );
        Ok(())
    }

    #[test]
    fn reverse_swaps_direction_pins() -> Result<()> {
        let (mut act, pins) = actuator();
        act.reverse(FULL_DUTY, None)?;
        let board = pins.lock();
        assert_eq!(board.level(27), Some(PinLevel::Low));
        assert_eq!(board.level(22), Some(PinLevel::High));
        Ok(())
    }

    #[test]
    fn turns_use_pivot_or_spin() -> Result<()> {
        let (mut act, _pins) = actuator();

        act.turn_left(30, FULL_DUTY, None)?;
        assert_eq!(act.state().left, SideState { direction: Direction::Forward, duty: 30 });
        assert_eq!(act.state().right, SideState { direction: Direction::Forward, duty: 100 });

        act.turn_left(0, FULL_DUTY, None)?;
        assert_eq!(act.state().left.direction, Direction::Reverse);
        assert_eq!(act.state().right, SideState { direction: Direction::Forward, duty: 100 });

        act.turn_right(30, FULL_DUTY, None)?;
        assert_eq!(act.state().left, SideState { direction: Direction::Forward, duty: 100 });
        assert_eq!(act.state().right, SideState { direction: Direction::Forward, duty: 30 });

        act.turn_right(0, FULL_DUTY, None)?;
        assert_eq!(act.state().left, SideState { direction: Direction::Forward, duty: 100 });
        assert_eq!(act.state().right.direction, Direction::Reverse);
        Ok(())
    }

    #[test]
    fn brake_energizes_enable_with_inputs_cleared() -> Result<()> {
        let (mut act, pins) = actuator();
        act.forward(FULL_DUTY, None)?;
        act.brake()?;
        let board = pins.lock();
        for side in [PinAssignment::default().left, PinAssignment::default().right] {
            assert_eq!(board.level(side.enable), Some(PinLevel::High));
            assert_eq!(board.level(side.in1), Some(PinLevel::Low));
            assert_eq!(board.level(side.in2), Some(PinLevel::Low));
        }
        assert_eq!(act.state().left.direction, Direction::Brake);
        Ok(())
    }

    #[test]
    fn intensity_is_clamped() -> Result<()> {
        let (mut act, _pins) = actuator();
        act.apply(DriveAction::Forward { duty: 200 })?;
        assert_eq!(act.state().left.duty, 100);
        act.turn_right(150, 255, None)?;
        assert_eq!(act.state().right.duty, 100);
        Ok(())
    }

    #[test]
    fn write_failure_is_actuation_error_with_best_effort_stop() -> Result<()> {
        let (mut act, pins) = actuator();
        act.forward(FULL_DUTY, None)?;
        // First write of the next command succeeds, the second fails.
        pins.fail_writes_after(1);
        let err = act.reverse(FULL_DUTY, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoverError>(),
            Some(RoverError::Actuation(_))
        ));
        assert!(act.state().is_stopped());
        Ok(())
    }

    #[test]
    fn perform_holds_the_action() -> Result<()> {
        let (mut act, _pins) = actuator();
        let started = std::time::Instant::now();
        act.perform(TimedAction::new(
            DriveAction::Forward { duty: 50 },
            Duration::from_millis(20),
        ))?;
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(act.state().left.duty, 50);
        Ok(())
    }

    #[test]
    fn commands_after_shutdown_are_refused() -> Result<()> {
        let (mut act, pins) = actuator();
        act.shutdown()?;
        assert!(act.is_released());
        assert_eq!(pins.lock().claimed_count(), 0);
        assert!(act.forward(FULL_DUTY, None).is_err());
        Ok(())
    }

    #[test]
    fn drop_releases_pins() -> Result<()> {
        let (mut act, pins) = actuator();
        act.forward(FULL_DUTY, None)?;
        drop(act);
        assert_eq!(pins.lock().claimed_count(), 0);
        Ok(())
    }
}
