//! A simulated robot for tests and the desktop build.

use alloc::vec::Vec;
use core::time::Duration;

#[allow(unused_imports)]
use num_traits::Float;

use crate::{
    control::ControlLoop,
    devices::{Clock, DriveMotors, Flywheel, GateServo, Intake, PoseSource, StopSignal},
    geometry::{Pose, normalize_angle, robot_to_field},
    launcher::{rpm_to_ticks_per_second, ticks_per_second_to_rpm},
    mecanum::{MecanumKinematics, WheelPowers},
    plan::{PlanRunner, PlanStatus},
};

#[derive(Copy, Clone, Debug)]
enum FlywheelDrive {
    Power(f64),
    Velocity(f64),
}

pub struct SimRobot {
    pub pose: Pose,
    kinematics: MecanumKinematics,
    /// Inches per second at full power.
    pub max_speed: f64,
    /// Radians per second at full rotate.
    pub max_turn_rate: f64,
    pub wheels: WheelPowers,

    pub flywheel_rpm: f64,
    flywheel: FlywheelDrive,
    pub free_rpm: f64,
    /// Flywheel time constant, seconds.
    pub spin_lag: f64,
    pub ticks_per_rev: f64,
    pub has_encoder: bool,
    /// Speed lost per ball launched.
    pub shot_dip_rpm: f64,

    pub gate_position: f64,
    /// Servo position above which the gate counts as open.
    pub gate_open_above: f64,
    pub intake_power: f64,
    pub loaded: u32,
    pub capacity: u32,
    pub launched: u32,
    ball_timer: Duration,

    pose_dropouts: u32,
    stop_at: Option<u64>,
    steps: u64,
    clock: Duration,
    pub trace: Vec<Pose>,
}

impl SimRobot {
    pub fn new(start: Pose, kinematics: MecanumKinematics) -> Self {
        Self {
            pose: start,
            kinematics,
            max_speed: 60.0,
            max_turn_rate: 6.0,
            wheels: WheelPowers::ZERO,
            flywheel_rpm: 0.0,
            flywheel: FlywheelDrive::Power(0.0),
            free_rpm: 6000.0,
            spin_lag: 0.3,
            ticks_per_rev: 28.0,
            has_encoder: true,
            shot_dip_rpm: 600.0,
            gate_position: 0.5,
            gate_open_above: 0.6,
            intake_power: 0.0,
            loaded: 3,
            capacity: 3,
            launched: 0,
            ball_timer: Duration::ZERO,
            pose_dropouts: 0,
            stop_at: None,
            steps: 0,
            clock: Duration::ZERO,
            trace: Vec::new(),
        }
    }

    /// The next `ticks` pose reads return nothing.
    pub fn drop_pose_for(&mut self, ticks: u32) {
        self.pose_dropouts = ticks;
    }

    /// Raise the stop signal once `step` has been called `steps` times.
    pub fn stop_after(&mut self, steps: u64) {
        self.stop_at = Some(steps);
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn gate_open(&self) -> bool {
        self.gate_position > self.gate_open_above
    }

    pub fn step(&mut self, dt: Duration) {
        let secs = dt.as_secs_f64();
        self.steps += 1;
        self.clock += dt;

        let cmd = self.kinematics.chassis_command(&self.wheels);
        let (dx, dy) = robot_to_field(
            cmd.forward * self.max_speed * secs,
            -cmd.strafe * self.max_speed * secs,
            self.pose.heading,
        );
        self.pose.x += dx;
        self.pose.y += dy;
        self.pose.heading = normalize_angle(self.pose.heading - cmd.rotate * self.max_turn_rate * secs);
        self.trace.push(self.pose);

        let target = match self.flywheel {
            FlywheelDrive::Power(p) => p * self.free_rpm,
            FlywheelDrive::Velocity(t) => ticks_per_second_to_rpm(t, self.ticks_per_rev).min(self.free_rpm),
        };
        let alpha = if self.spin_lag > 0.0 {
            (secs / self.spin_lag).min(1.0)
        } else {
            1.0
        };
        self.flywheel_rpm += (target - self.flywheel_rpm) * alpha;

        // a ball moves through the intake every 250 ms; with the flywheel spinning and the gate
        // shut it waits at the gate instead of being picked up
        let period = Duration::from_millis(250);
        if self.intake_power > 0.0 {
            self.ball_timer = (self.ball_timer + dt).min(period);
            if self.ball_timer >= period {
                if self.gate_open() {
                    if self.loaded > 0 {
                        self.loaded -= 1;
                        self.launched += 1;
                        self.flywheel_rpm = (self.flywheel_rpm - self.shot_dip_rpm).max(0.0);
                    }
                    self.ball_timer = Duration::ZERO;
                } else if target <= 0.0 && self.loaded < self.capacity {
                    self.loaded += 1;
                    self.ball_timer = Duration::ZERO;
                }
            }
        } else {
            self.ball_timer = Duration::ZERO;
        }
    }

    pub fn run(&mut self, ctl: &mut ControlLoop, runner: &mut PlanRunner, limit: u64) -> PlanStatus {
        let dt = ctl.dt();
        let mut status = PlanStatus::Running { step: 0 };
        for _ in 0..limit {
            status = runner.tick(ctl, self);
            if !matches!(status, PlanStatus::Running { .. }) {
                break;
            }
            self.step(dt);
        }
        status
    }
}

impl PoseSource for SimRobot {
    fn pose(&mut self) -> Option<Pose> {
        if self.pose_dropouts > 0 {
            self.pose_dropouts -= 1;
            return None;
        }
        Some(self.pose)
    }

    fn reset_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }
}

impl DriveMotors for SimRobot {
    fn set_wheel_powers(&mut self, powers: WheelPowers) {
        self.wheels = powers;
    }
}

impl Flywheel for SimRobot {
    fn set_power(&mut self, power: f64) {
        self.flywheel = FlywheelDrive::Power(power.clamp(-1.0, 1.0));
    }

    fn set_target_velocity(&mut self, ticks_per_second: f64) {
        self.flywheel = FlywheelDrive::Velocity(ticks_per_second);
    }

    fn velocity(&mut self) -> Option<f64> {
        self.has_encoder
            .then(|| rpm_to_ticks_per_second(self.flywheel_rpm, self.ticks_per_rev))
    }
}

impl GateServo for SimRobot {
    fn set_position(&mut self, position: f64) {
        self.gate_position = position;
    }
}

impl Intake for SimRobot {
    fn set_intake_power(&mut self, power: f64) {
        self.intake_power = power;
    }
}

impl Clock for SimRobot {
    fn now(&mut self) -> Duration {
        self.clock
    }
}

impl StopSignal for SimRobot {
    fn stop_requested(&mut self) -> bool {
        self.stop_at.is_some_and(|at| self.steps >= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mecanum::DriveCommand;
    use approx::assert_relative_eq;
    use core::f64::consts::PI;

    const DT: Duration = Duration::from_millis(20);

    #[test]
    fn integrates_forward_along_heading() {
        let k = MecanumKinematics::default();
        let mut sim = SimRobot::new(Pose::with_heading(0.0, 0.0, PI / 2.0), k);
        sim.set_wheel_powers(k.wheel_powers(DriveCommand::new(1.0, 0.0, 0.0)));
        for _ in 0..50 {
            sim.step(DT);
        }
        assert_relative_eq!(sim.pose.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(sim.pose.y, 60.0, max_relative = 1e-9);
    }

    #[test]
    fn positive_rotate_turns_clockwise() {
        let k = MecanumKinematics::default();
        let mut sim = SimRobot::new(Pose::default(), k);
        sim.set_wheel_powers(k.wheel_powers(DriveCommand::new(0.0, 0.0, 0.5)));
        sim.step(DT);
        assert!(sim.pose.heading < 0.0);
    }

    #[test]
    fn flywheel_lags_toward_command() {
        let mut sim = SimRobot::new(Pose::default(), MecanumKinematics::default());
        sim.set_power(0.5);
        sim.step(DT);
        assert!(sim.flywheel_rpm > 0.0 && sim.flywheel_rpm < 3000.0);
        for _ in 0..200 {
            sim.step(DT);
        }
        assert_relative_eq!(sim.flywheel_rpm, 3000.0, max_relative = 1e-3);
        assert_relative_eq!(sim.velocity().unwrap(), 1400.0, max_relative = 1e-3);

        sim.has_encoder = false;
        assert!(sim.velocity().is_none());
    }

    #[test]
    fn dropouts_and_stop() {
        let mut sim = SimRobot::new(Pose::default(), MecanumKinematics::default());
        sim.drop_pose_for(2);
        assert!(sim.pose().is_none());
        assert!(sim.pose().is_none());
        assert!(sim.pose().is_some());

        sim.stop_after(1);
        assert!(!sim.stop_requested());
        sim.step(DT);
        assert!(sim.stop_requested());
    }

    #[test]
    fn open_gate_launches_loaded_balls() {
        let mut sim = SimRobot::new(Pose::default(), MecanumKinematics::default());
        sim.set_power(1.0);
        sim.set_intake_power(1.0);
        sim.set_position(140.0 / 180.0);
        for _ in 0..100 {
            sim.step(DT);
        }
        assert_eq!(sim.launched, 3);
        assert_eq!(sim.loaded, 0);
    }
}
