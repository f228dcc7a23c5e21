use std::time::Duration;

/// Full PWM duty cycle, in percent.
pub const FULL_DUTY: u8 = 100;

/// Discrete drive command produced by the steering policy.
///
/// `radius` is the inner wheel's duty cycle during a turn: zero spins in
/// place, anything else pivots around the slowed inner wheel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveAction {
    Forward { duty: u8 },
    Reverse { duty: u8 },
    TurnLeft { radius: u8 },
    TurnRight { radius: u8 },
    Stop,
    Brake,
}

impl DriveAction {
    /// Same action with every intensity clamped into `[0, 100]`.
    pub fn clamped(self) -> Self {
        match self {
            DriveAction::Forward { duty } => DriveAction::Forward {
                duty: clamp_duty(duty),
            },
            DriveAction::Reverse { duty } => DriveAction::Reverse {
                duty: clamp_duty(duty),
            },
            DriveAction::TurnLeft { radius } => DriveAction::TurnLeft {
                radius: clamp_duty(radius),
            },
            DriveAction::TurnRight { radius } => DriveAction::TurnRight {
                radius: clamp_duty(radius),
            },
            other => other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DriveAction::Forward { .. } => "FORWARD",
            DriveAction::Reverse { .. } => "REVERSE",
            DriveAction::TurnLeft { .. } => "TURN L",
            DriveAction::TurnRight { .. } => "TURN R",
            DriveAction::Stop => "STOP",
            DriveAction::Brake => "BRAKE",
        }
    }
}

pub fn clamp_duty(duty: u8) -> u8 {
    duty.min(FULL_DUTY)
}

/// An action held for a fixed time before the caller regains control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedAction {
    pub action: DriveAction,
    pub hold: Duration,
}

impl TimedAction {
    pub fn new(action: DriveAction, hold: Duration) -> Self {
        Self { action, hold }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_caps_intensity() {
        assert_eq!(
            DriveAction::Forward { duty: 250 }.clamped(),
            DriveAction::Forward { duty: 100 }
        );
        assert_eq!(
            DriveAction::TurnLeft { radius: 30 }.clamped(),
            DriveAction::TurnLeft { radius: 30 }
        );
        assert_eq!(DriveAction::Brake.clamped(), DriveAction::Brake);
    }
}
