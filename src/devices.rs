use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{geometry::Pose, mecanum::WheelPowers};

pub trait PoseSource {
    fn pose(&mut self) -> Option<Pose>;
    fn reset_pose(&mut self, pose: Pose);
}

pub trait DriveMotors {
    /// Each value is in [-1, 1].
    fn set_wheel_powers(&mut self, powers: WheelPowers);
}

pub trait Flywheel {
    fn set_power(&mut self, power: f64);
    fn set_target_velocity(&mut self, ticks_per_second: f64);
    /// Measured velocity in encoder ticks per second.
    fn velocity(&mut self) -> Option<f64>;
}

pub trait GateServo {
    /// Position in [0, 1].
    fn set_position(&mut self, position: f64);
}

pub trait Intake {
    fn set_intake_power(&mut self, power: f64);
}

pub trait StopSignal {
    fn stop_requested(&mut self) -> bool;
}

/// Monotonic time since some fixed start.
pub trait Clock {
    fn now(&mut self) -> Duration;
}

pub trait RobotIo:
    PoseSource + DriveMotors + Flywheel + GateServo + Intake + StopSignal + Clock
{
}

impl<T> RobotIo for T where
    T: PoseSource + DriveMotors + Flywheel + GateServo + Intake + StopSignal + Clock
{
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeCommand {
    #[default]
    Stop,
    Intake,
    Reverse,
}

impl IntakeCommand {
    pub fn power(self, speed: f64) -> f64 {
        match self {
            IntakeCommand::Stop => 0.0,
            IntakeCommand::Intake => speed,
            IntakeCommand::Reverse => -speed,
        }
    }
}
