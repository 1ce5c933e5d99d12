#[allow(unused_imports)]
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::geometry::field_to_robot;

#[derive(Default, Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub forward: f64,
    /// Positive slides right.
    pub strafe: f64,
    /// Positive turns clockwise.
    pub rotate: f64,
}

impl DriveCommand {
    pub const ZERO: Self = Self {
        forward: 0.0,
        strafe: 0.0,
        rotate: 0.0,
    };

    pub const fn new(forward: f64, strafe: f64, rotate: f64) -> Self {
        Self {
            forward,
            strafe,
            rotate,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.forward == 0.0 && self.strafe == 0.0 && self.rotate == 0.0
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct WheelPowers {
    pub front_left: f64,
    pub front_right: f64,
    pub back_left: f64,
    pub back_right: f64,
}

impl WheelPowers {
    pub const ZERO: Self = Self {
        front_left: 0.0,
        front_right: 0.0,
        back_left: 0.0,
        back_right: 0.0,
    };

    pub fn max_magnitude(&self) -> f64 {
        self.front_left
            .abs()
            .max(self.front_right.abs())
            .max(self.back_left.abs())
            .max(self.back_right.abs())
    }

    pub fn as_array(&self) -> [f64; 4] {
        [
            self.front_left,
            self.front_right,
            self.back_left,
            self.back_right,
        ]
    }
}

/// Mixes without strafe compensation.
pub fn wheel_powers(forward: f64, strafe: f64, rotate: f64) -> WheelPowers {
    let front_left = forward + strafe + rotate;
    let front_right = forward - strafe - rotate;
    let back_left = forward - strafe + rotate;
    let back_right = forward + strafe - rotate;

    // scale all four together so the largest stays within 1
    let denom = (forward.abs() + strafe.abs() + rotate.abs()).max(1.0);
    WheelPowers {
        front_left: front_left / denom,
        front_right: front_right / denom,
        back_left: back_left / denom,
        back_right: back_right / denom,
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct MecanumKinematics {
    /// Multiplier on strafe before mixing.
    pub strafe_compensation: f64,
}

impl Default for MecanumKinematics {
    fn default() -> Self {
        Self {
            strafe_compensation: 1.1,
        }
    }
}

impl MecanumKinematics {
    pub fn new(strafe_compensation: f64) -> Self {
        Self {
            strafe_compensation,
        }
    }

    pub fn wheel_powers(&self, cmd: DriveCommand) -> WheelPowers {
        if !(cmd.forward.is_finite() && cmd.strafe.is_finite() && cmd.rotate.is_finite()) {
            return WheelPowers::ZERO;
        }
        wheel_powers(cmd.forward, cmd.strafe * self.strafe_compensation, cmd.rotate)
    }

    /// Recovers the chassis command from four wheel powers, undoing strafe compensation.
    pub fn chassis_command(&self, wheels: &WheelPowers) -> DriveCommand {
        let WheelPowers {
            front_left: fl,
            front_right: fr,
            back_left: bl,
            back_right: br,
        } = *wheels;
        let strafe = (fl - fr - bl + br) / 4.0;
        DriveCommand {
            forward: (fl + fr + bl + br) / 4.0,
            strafe: if self.strafe_compensation != 0.0 {
                strafe / self.strafe_compensation
            } else {
                0.0
            },
            rotate: (fl - fr + bl - br) / 4.0,
        }
    }

    pub fn field_relative(&self, field_x: f64, field_y: f64, rotate: f64, heading: f64) -> DriveCommand {
        let (forward, left) = field_to_robot(field_x, field_y, heading);
        DriveCommand::new(forward, -left, rotate)
    }
}
