use log::{debug, info, warn};
#[allow(unused_imports)]
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::{
    devices::IntakeCommand,
    geometry::{Point, Pose, field_to_robot, normalize_angle},
    mecanum::{DriveCommand, MecanumKinematics, WheelPowers},
    pid::{Pid, PidGains},
};

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Per-axis arrival tolerance, inches.
    pub tolerance: f64,
    pub drive_speed: f64,
    pub slow_speed: f64,
    /// Heading correction, output per degree of error.
    pub heading: PidGains,
    /// Ticks a single target may take before it is abandoned. Zero disables the guard.
    pub max_ticks: u32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            tolerance: 2.0,
            drive_speed: 1.0,
            slow_speed: 0.5,
            heading: PidGains::p(0.02),
            max_ticks: 750,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct NavTarget {
    pub position: Point,
    pub speed: f64,
    /// Field heading to hold while driving, radians.
    pub heading: Option<f64>,
    pub tolerance: f64,
    /// Run alongside the drive and stopped on arrival.
    pub companion: Option<IntakeCommand>,
}

impl NavTarget {
    pub fn new(x: f64, y: f64, speed: f64, tolerance: f64) -> Self {
        Self {
            position: Point::new(x, y),
            speed,
            heading: None,
            tolerance,
            companion: None,
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_heading_degrees(self, heading_deg: f64) -> Self {
        self.with_heading(heading_deg.to_radians())
    }

    pub fn with_companion(mut self, command: IntakeCommand) -> Self {
        self.companion = Some(command);
        self
    }
}

/// Drive command toward `target`, and whether it has been reached.
pub fn drive_toward(current: &Pose, target: &NavTarget, heading: &mut Pid, dt: f64) -> (DriveCommand, bool) {
    let ex = target.position.x - current.x;
    let ey = target.position.y - current.y;
    if !(ex.is_finite() && ey.is_finite()) {
        return (DriveCommand::ZERO, false);
    }
    if ex.abs() < target.tolerance && ey.abs() < target.tolerance {
        return (DriveCommand::ZERO, true);
    }

    let distance = ex.hypot(ey);
    if distance <= f64::EPSILON {
        return (DriveCommand::ZERO, false);
    }
    let (forward, left) = field_to_robot(
        ex / distance * target.speed,
        ey / distance * target.speed,
        current.heading,
    );

    let rotate = match target.heading {
        Some(h) => {
            let error_deg = normalize_angle(h - current.heading).to_degrees();
            (-heading.next(error_deg, dt)).clamp(-1.0, 1.0)
        }
        None => 0.0,
    };

    (DriveCommand::new(forward, -left, rotate), false)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NavStatus {
    Idle,
    Approaching,
    Arrived,
    /// No pose this tick; the previous command is being held.
    SensorStale,
    Cancelled,
    TimedOut,
}

#[derive(Copy, Clone, Debug)]
pub struct NavOutput {
    pub command: DriveCommand,
    pub wheels: WheelPowers,
    pub status: NavStatus,
}

pub struct Navigator {
    kinematics: MecanumKinematics,
    heading_pid: Pid,
    max_ticks: u32,
    target: Option<NavTarget>,
    ticks: u32,
    stale_ticks: u32,
    last_command: DriveCommand,
}

impl Navigator {
    pub fn new(config: &NavigationConfig, kinematics: MecanumKinematics) -> Self {
        Self {
            kinematics,
            heading_pid: Pid::from(config.heading).with_output_limit(1.0),
            max_ticks: config.max_ticks,
            target: None,
            ticks: 0,
            stale_ticks: 0,
            last_command: DriveCommand::ZERO,
        }
    }

    pub fn set_target(&mut self, target: NavTarget) {
        info!(
            "nav target ({:.1}, {:.1}) speed {:.2} heading {:?}",
            target.position.x,
            target.position.y,
            target.speed,
            target.heading.map(|h| h.to_degrees())
        );
        self.heading_pid.reset();
        self.target = Some(target);
        self.ticks = 0;
        self.stale_ticks = 0;
        self.last_command = DriveCommand::ZERO;
    }

    pub fn target(&self) -> Option<&NavTarget> {
        self.target.as_ref()
    }

    pub fn clear(&mut self) {
        self.target = None;
        self.last_command = DriveCommand::ZERO;
    }

    fn output(&self, command: DriveCommand, status: NavStatus) -> NavOutput {
        NavOutput {
            command,
            wheels: self.kinematics.wheel_powers(command),
            status,
        }
    }

    pub fn tick(&mut self, pose: Option<Pose>, stop: bool, dt: f64) -> NavOutput {
        let Some(target) = self.target else {
            return self.output(DriveCommand::ZERO, NavStatus::Idle);
        };
        if stop {
            info!("nav cancelled");
            self.clear();
            return self.output(DriveCommand::ZERO, NavStatus::Cancelled);
        }

        self.ticks += 1;
        if self.max_ticks > 0 && self.ticks > self.max_ticks {
            warn!(
                "nav gave up on ({:.1}, {:.1}) after {} ticks",
                target.position.x, target.position.y, self.max_ticks
            );
            self.clear();
            return self.output(DriveCommand::ZERO, NavStatus::TimedOut);
        }

        let Some(pose) = pose else {
            if self.stale_ticks == 0 {
                warn!("nav: no pose, holding last command");
            }
            self.stale_ticks += 1;
            return self.output(self.last_command, NavStatus::SensorStale);
        };
        self.stale_ticks = 0;

        let (command, done) = drive_toward(&pose, &target, &mut self.heading_pid, dt);
        if done {
            info!(
                "nav arrived at ({:.1}, {:.1}) in {} ticks",
                pose.x, pose.y, self.ticks
            );
            self.clear();
            return self.output(DriveCommand::ZERO, NavStatus::Arrived);
        }
        debug!("nav {:?} -> {:?}", pose, command);
        self.last_command = command;
        self.output(command, NavStatus::Approaching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f64::consts::PI;

    fn heading_pid() -> Pid {
        Pid::from(PidGains::p(0.02))
    }

    #[test]
    fn first_tick_drives_forward_then_arrives() {
        let target = NavTarget::new(10.0, 0.0, 1.0, 1.0);
        let mut pid = heading_pid();

        let (cmd, done) = drive_toward(&Pose::with_heading(0.0, 0.0, 0.0), &target, &mut pid, 0.02);
        assert!(!done);
        assert_relative_eq!(cmd.forward, 1.0);
        assert_relative_eq!(cmd.strafe, 0.0);
        assert_relative_eq!(cmd.rotate, 0.0);

        let (cmd, done) = drive_toward(&Pose::with_heading(9.5, 0.3, 0.0), &target, &mut pid, 0.02);
        assert!(done);
        assert!(cmd.is_zero());
    }

    #[test]
    fn arrival_needs_both_axes_inside_tolerance() {
        let target = NavTarget::new(10.0, 0.0, 1.0, 1.0);
        let (_, done) = drive_toward(&Pose::new(9.5, 1.5), &target, &mut heading_pid(), 0.02);
        assert!(!done);
        // exactly on the tolerance is not inside it
        let (_, done) = drive_toward(&Pose::new(9.0, 0.0), &target, &mut heading_pid(), 0.02);
        assert!(!done);
    }

    #[test]
    fn speed_scales_the_unit_vector() {
        let target = NavTarget::new(3.0, 4.0, 0.5, 1.0);
        let (cmd, _) = drive_toward(&Pose::new(0.0, 0.0), &target, &mut heading_pid(), 0.02);
        // heading 0 faces +x: +y is to the left
        assert_relative_eq!(cmd.forward, 0.3);
        assert_relative_eq!(cmd.strafe, -0.4);
    }

    #[test]
    fn error_is_expressed_in_robot_frame() {
        let target = NavTarget::new(0.0, 10.0, 1.0, 1.0);
        let (cmd, _) = drive_toward(&Pose::with_heading(0.0, 0.0, PI / 2.0), &target, &mut heading_pid(), 0.02);
        assert_relative_eq!(cmd.forward, 1.0, epsilon = 1e-12);
        assert_relative_eq!(cmd.strafe, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn heading_correction_is_proportional_and_clamped() {
        let target = NavTarget::new(10.0, 0.0, 1.0, 1.0).with_heading_degrees(10.0);
        let (cmd, _) = drive_toward(&Pose::new(0.0, 0.0), &target, &mut heading_pid(), 0.02);
        // 10 degrees CCW needed: counter-clockwise is negative rotate
        assert_relative_eq!(cmd.rotate, -0.2, max_relative = 1e-9);

        let target = NavTarget::new(10.0, 0.0, 1.0, 1.0).with_heading_degrees(-120.0);
        let (cmd, _) = drive_toward(&Pose::new(0.0, 0.0), &target, &mut heading_pid(), 0.02);
        assert_relative_eq!(cmd.rotate, 1.0);
    }

    #[test]
    fn heading_error_wraps_the_short_way() {
        let target = NavTarget::new(10.0, 0.0, 1.0, 1.0).with_heading_degrees(-175.0);
        let pose = Pose::with_heading_degrees(0.0, 0.0, 175.0);
        let (cmd, _) = drive_toward(&pose, &target, &mut heading_pid(), 0.02);
        assert_relative_eq!(cmd.rotate, -0.2, max_relative = 1e-9);
    }

    #[test]
    fn non_finite_pose_does_not_move() {
        let target = NavTarget::new(10.0, 0.0, 1.0, 1.0);
        let (cmd, done) = drive_toward(&Pose::new(f64::NAN, 0.0), &target, &mut heading_pid(), 0.02);
        assert!(!done);
        assert!(cmd.is_zero());
    }

    fn navigator(max_ticks: u32) -> Navigator {
        let config = NavigationConfig {
            max_ticks,
            ..Default::default()
        };
        Navigator::new(&config, MecanumKinematics::default())
    }

    #[test]
    fn navigator_walks_through_states() {
        let mut nav = navigator(0);
        assert_eq!(nav.tick(Some(Pose::default()), false, 0.02).status, NavStatus::Idle);

        nav.set_target(NavTarget::new(10.0, 0.0, 1.0, 1.0));
        let out = nav.tick(Some(Pose::default()), false, 0.02);
        assert_eq!(out.status, NavStatus::Approaching);
        assert_relative_eq!(out.wheels.front_left, 1.0);

        let out = nav.tick(None, false, 0.02);
        assert_eq!(out.status, NavStatus::SensorStale);
        assert_relative_eq!(out.command.forward, 1.0);

        let out = nav.tick(Some(Pose::new(9.9, 0.0)), false, 0.02);
        assert_eq!(out.status, NavStatus::Arrived);
        assert!(out.command.is_zero());
        assert!(nav.target().is_none());

        // a fresh target re-enters approaching
        nav.set_target(NavTarget::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(nav.tick(Some(Pose::new(9.9, 0.0)), false, 0.02).status, NavStatus::Approaching);
    }

    #[test]
    fn stop_cancels() {
        let mut nav = navigator(0);
        nav.set_target(NavTarget::new(10.0, 0.0, 1.0, 1.0));
        nav.tick(Some(Pose::default()), false, 0.02);
        let out = nav.tick(Some(Pose::default()), true, 0.02);
        assert_eq!(out.status, NavStatus::Cancelled);
        assert!(out.command.is_zero());
        assert_eq!(out.wheels, WheelPowers::ZERO);
    }

    #[test]
    fn guard_abandons_unreachable_target() {
        let mut nav = navigator(3);
        nav.set_target(NavTarget::new(100.0, 0.0, 1.0, 1.0));
        for _ in 0..3 {
            assert_eq!(nav.tick(Some(Pose::default()), false, 0.02).status, NavStatus::Approaching);
        }
        let out = nav.tick(Some(Pose::default()), false, 0.02);
        assert_eq!(out.status, NavStatus::TimedOut);
        assert!(out.command.is_zero());
    }
}
