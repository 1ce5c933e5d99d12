#![cfg_attr(not(test), no_std)]
//! Closed-loop navigation and launch control for a mecanum competition robot.
extern crate alloc;

pub mod config;
pub mod control;
pub mod devices;
pub mod driver;
pub mod error;
pub mod gate;
pub mod geometry;
pub mod launcher;
pub mod mecanum;
pub mod navigation;
pub mod odometry;
pub mod pid;
pub mod plan;
pub mod routines;
pub mod sim;
pub mod units;
pub mod zone;

pub use config::{Alliance, RobotConfig};
pub use control::{ControlLoop, Intent, TickStatus};
pub use geometry::{Point, Pose};
pub use mecanum::{DriveCommand, MecanumKinematics, WheelPowers};
pub use navigation::{NavStatus, NavTarget, Navigator};
pub use plan::{Action, PlanRunner, PlanStatus};
