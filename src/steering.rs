//! Three-zone steering: turn toward the target, approach it, or halt.
//!
//! The frame is split by a deadband of a quarter of its width around the
//! center line. Outside the deadband the rover pivots toward the target.
//! Inside it, the rover drives forward until the target fills a quarter of
//! the frame width, then stops. No hysteresis: a target sitting on the
//! deadband edge can flip between left and right on consecutive frames.

use crate::drive::{DriveAction, FULL_DUTY};
use crate::target::Target;

/// Default inner-wheel duty for pivot turns.
pub const DEFAULT_PIVOT_RADIUS: u8 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SteeringPolicy {
    pub pivot_radius: u8,
    pub forward_duty: u8,
}

impl Default for SteeringPolicy {
    fn default() -> Self {
        Self {
            pivot_radius: DEFAULT_PIVOT_RADIUS,
            forward_duty: FULL_DUTY,
        }
    }
}

impl SteeringPolicy {
    pub fn new(pivot_radius: u8, forward_duty: u8) -> Self {
        Self {
            pivot_radius,
            forward_duty,
        }
    }

    pub fn decide(&self, target: Option<&Target>, frame_width: u32) -> DriveAction {
        let Some(target) = target else {
            return DriveAction::Stop;
        };
        let frame_width = frame_width as f32;
        let offset = target.center_x - frame_width / 2.0;
        let deadband = frame_width / 4.0;

        if offset > deadband {
            DriveAction::TurnRight {
                radius: self.pivot_radius,
            }
        } else if offset < -deadband {
            DriveAction::TurnLeft {
                radius: self.pivot_radius,
            }
        } else if target.width_px < frame_width / 4.0 {
            DriveAction::Forward {
                duty: self.forward_duty,
            }
        } else {
            DriveAction::Stop
        }
    }
}
