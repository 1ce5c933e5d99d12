use core::time::Duration;

use log::{trace, warn};

use crate::{
    config::RobotConfig,
    devices::{IntakeCommand, RobotIo},
    driver,
    error::ConfigError,
    geometry::Pose,
    launcher::{LaunchRegulator, LaunchSetpoint, LauncherCommand, LauncherOutput},
    mecanum::{DriveCommand, WheelPowers},
    navigation::{NavStatus, Navigator},
    zone::{Zone, ZoneDetector},
};

#[derive(Default, Copy, Clone, Debug)]
pub enum DriveIntent {
    #[default]
    Hold,
    /// Robot-frame command.
    Robot(DriveCommand),
    /// Field-frame translation, rotated into the robot frame with the last known heading.
    Field { x: f64, y: f64, rotate: f64 },
    /// Follow the navigator's current target.
    Navigate,
}

#[derive(Default, Copy, Clone, Debug)]
pub enum LaunchIntent {
    #[default]
    Off,
    /// Pick the setpoint from the zone the robot is in, or `fallback` outside every zone.
    Zone { fallback: Option<LaunchSetpoint> },
    Setpoint(LaunchSetpoint),
}

#[derive(Default, Copy, Clone, Debug)]
pub struct Intent {
    pub drive: DriveIntent,
    pub launch: LaunchIntent,
    pub intake: IntakeCommand,
    /// Permission to release. The gate still waits for speed.
    pub fire: bool,
    /// Turn toward the goal while the driver is idle inside a zone.
    pub aim: bool,
}

#[derive(Copy, Clone, Debug)]
pub struct TickStatus {
    /// Last known pose, possibly from an earlier tick.
    pub pose: Option<Pose>,
    /// False when the pose source had nothing new this tick.
    pub pose_fresh: bool,
    /// Index of the first zone containing the robot.
    pub zone: Option<usize>,
    pub nav: NavStatus,
    pub wheels: WheelPowers,
    pub launcher: LauncherOutput,
    pub stopped: bool,
    /// Time since the previous tick, from the robot clock.
    pub elapsed: Duration,
}

pub struct ControlLoop {
    config: RobotConfig,
    zones: ZoneDetector,
    navigator: Navigator,
    launcher: LaunchRegulator,
    last_pose: Option<Pose>,
    last_tick: Option<Duration>,
    ticks: u64,
}

impl ControlLoop {
    pub fn new(config: RobotConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            zones: ZoneDetector::new(&config.zones),
            navigator: Navigator::new(&config.navigation, config.drive),
            launcher: LaunchRegulator::new(config.launcher, config.gate),
            last_pose: None,
            last_tick: None,
            ticks: 0,
            config,
        })
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn dt(&self) -> Duration {
        self.config.dt
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    pub fn launcher(&self) -> &LaunchRegulator {
        &self.launcher
    }

    pub fn zones(&self) -> &[Zone] {
        self.zones.zones()
    }

    pub fn last_pose(&self) -> Option<Pose> {
        self.last_pose
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reset_pose<R: RobotIo + ?Sized>(&mut self, io: &mut R, pose: Pose) {
        io.reset_pose(pose);
        self.last_pose = Some(pose);
        self.zones.classify(&pose);
    }

    fn assisted(&self, cmd: DriveCommand, aim: bool, in_zone: bool) -> DriveCommand {
        match self.last_pose {
            Some(pose) if aim && in_zone && driver::sticks_idle(&cmd, self.config.aim.deadband) => {
                DriveCommand {
                    rotate: driver::aim_rotate(&pose, &self.config.goal, self.config.aim.gain),
                    ..cmd
                }
            }
            _ => cmd,
        }
    }

    pub fn tick<R: RobotIo + ?Sized>(&mut self, io: &mut R, intent: &Intent) -> TickStatus {
        self.ticks += 1;
        let now = io.now();
        // the first tick has nothing to measure against
        let dt = self
            .last_tick
            .map_or(self.config.dt, |prev| now.saturating_sub(prev));
        self.last_tick = Some(now);
        let stop = io.stop_requested();

        let sample = io
            .pose()
            .filter(|p| p.x.is_finite() && p.y.is_finite() && p.heading.is_finite());
        if let Some(pose) = sample {
            self.last_pose = Some(pose);
            self.zones.classify(&pose);
        }
        let matched = self.zones.first_match().map(|(i, z)| (i, z.def.tier));
        let zone = matched.map(|(i, _)| i);

        let kinematics = self.config.drive;
        let (wheels, nav) = if stop {
            let out = self.navigator.tick(sample, true, dt.as_secs_f64());
            (WheelPowers::ZERO, out.status)
        } else {
            match intent.drive {
                DriveIntent::Hold => (WheelPowers::ZERO, NavStatus::Idle),
                DriveIntent::Robot(cmd) => {
                    let cmd = self.assisted(cmd, intent.aim, zone.is_some());
                    (kinematics.wheel_powers(cmd), NavStatus::Idle)
                }
                DriveIntent::Field { x, y, rotate } => {
                    let heading = self.last_pose.map_or(0.0, |p| p.heading);
                    let cmd = kinematics.field_relative(x, y, rotate, heading);
                    let cmd = self.assisted(cmd, intent.aim, zone.is_some());
                    (kinematics.wheel_powers(cmd), NavStatus::Idle)
                }
                DriveIntent::Navigate => {
                    let out = self.navigator.tick(sample, false, dt.as_secs_f64());
                    (out.wheels, out.status)
                }
            }
        };

        if stop {
            if self.launcher.is_active() {
                warn!("stop requested, powering down launcher");
                self.launcher.stop();
            }
        } else {
            match intent.launch {
                LaunchIntent::Off => {
                    if self.launcher.is_active() {
                        self.launcher.stop();
                    }
                }
                LaunchIntent::Zone { fallback } => {
                    let tiered = matched.zip(self.last_pose).map(|((_, tier), pose)| {
                        tier.setpoint(&pose, &self.config.goal, self.config.launcher.free_rpm)
                    });
                    match tiered.or(fallback) {
                        Some(setpoint) => self.launcher.retarget(setpoint),
                        None => {
                            if self.launcher.is_active() {
                                self.launcher.stop();
                            }
                        }
                    }
                }
                LaunchIntent::Setpoint(setpoint) => self.launcher.retarget(setpoint),
            }
        }
        let launcher = self.launcher.tick(io.velocity(), intent.fire && !stop, dt);

        io.set_wheel_powers(wheels);
        match launcher.command {
            LauncherCommand::Off => io.set_power(0.0),
            LauncherCommand::Power(p) => io.set_power(p),
            LauncherCommand::Velocity(v) => io.set_target_velocity(v),
        }
        io.set_position(launcher.gate_position);
        let intake = if stop {
            0.0
        } else {
            intent.intake.power(self.config.intake_speed)
        };
        io.set_intake_power(intake);

        trace!(
            "tick {}: pose {:?} zone {:?} nav {:?} launcher {:?}",
            self.ticks, self.last_pose, zone, nav, launcher
        );

        TickStatus {
            pose: self.last_pose,
            pose_fresh: sample.is_some(),
            zone,
            nav,
            wheels,
            launcher,
            stopped: stop,
            elapsed: dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Alliance, FRONT_ZONE},
        gate::GateState,
        launcher::SpinUp,
        navigation::NavTarget,
        sim::SimRobot,
    };
    use approx::assert_relative_eq;

    fn setup(start: Pose) -> (ControlLoop, SimRobot) {
        let config = RobotConfig::for_alliance(Alliance::Blue);
        let sim = SimRobot::new(start, config.drive);
        (ControlLoop::new(config).unwrap(), sim)
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = RobotConfig::default();
        config.navigation.tolerance = -1.0;
        assert!(ControlLoop::new(config).is_err());
    }

    #[test]
    fn hold_writes_safe_outputs() {
        let (mut ctl, mut sim) = setup(Pose::new(72.0, 100.0));
        sim.intake_power = 0.7;
        let status = ctl.tick(&mut sim, &Intent::default());
        assert_eq!(status.wheels, WheelPowers::ZERO);
        assert_eq!(status.launcher.gate, GateState::Closed);
        assert_eq!(sim.intake_power, 0.0);
        assert_eq!(status.zone, Some(0));
        assert!(status.pose_fresh);
    }

    #[test]
    fn zone_intent_uses_first_matching_tier() {
        let (mut ctl, mut sim) = setup(Pose::new(72.0, 100.0));
        let intent = Intent {
            launch: LaunchIntent::Zone { fallback: None },
            ..Default::default()
        };
        let status = ctl.tick(&mut sim, &intent);
        assert_eq!(status.launcher.spin_up, SpinUp::Spinning);
        let session = ctl.launcher().session().unwrap();
        // the front tier expects the speed its own scaled power produces
        assert_relative_eq!(session.setpoint.target_rpm, session.setpoint.power * 6000.0);
        assert!(session.setpoint.power <= 0.5);
        assert!(ctl.zones()[0].inside);
        assert_eq!(ctl.zones()[0].def.name, FRONT_ZONE);

        // leaving every zone with no fallback powers the launcher down
        sim.pose = Pose::new(72.0, 50.0);
        let status = ctl.tick(&mut sim, &intent);
        assert_eq!(status.zone, None);
        assert_eq!(status.launcher.spin_up, SpinUp::Idle);
        assert!(!ctl.launcher().is_active());
    }

    #[test]
    fn back_zone_picks_long_shot() {
        let (mut ctl, mut sim) = setup(Pose::new(72.0, 10.0));
        let intent = Intent {
            launch: LaunchIntent::Zone { fallback: None },
            ..Default::default()
        };
        let status = ctl.tick(&mut sim, &intent);
        assert_eq!(status.zone, Some(1));
        let setpoint = ctl.launcher().session().unwrap().setpoint;
        assert!(setpoint.power > 0.8);
        assert_relative_eq!(setpoint.target_rpm, setpoint.power * 6000.0);
    }

    #[test]
    fn zone_shots_reach_speed_and_launch() {
        for (x, y, zone) in [(72.0, 10.0, 1), (60.0, 5.0, 1), (30.0, 120.0, 0), (72.0, 100.0, 0)] {
            let (mut ctl, mut sim) = setup(Pose::new(x, y));
            let intent = Intent {
                launch: LaunchIntent::Zone { fallback: None },
                intake: IntakeCommand::Intake,
                fire: true,
                ..Default::default()
            };
            let mut opened = false;
            for _ in 0..300 {
                let status = ctl.tick(&mut sim, &intent);
                assert_eq!(status.zone, Some(zone));
                opened |= status.launcher.gate == GateState::Open;
                sim.step(ctl.dt());
            }
            assert!(opened, "gate never opened at ({x}, {y})");
            assert_eq!(sim.launched, 3, "at ({x}, {y})");
        }
    }

    #[test]
    fn spin_up_deadline_follows_the_clock() {
        let (mut ctl, mut sim) = setup(Pose::new(72.0, 50.0));
        sim.free_rpm = 1000.0;
        let intent = Intent {
            launch: LaunchIntent::Setpoint(ctl.config().default_shot),
            ..Default::default()
        };
        // ticks arrive every 100 ms instead of every 20 ms
        let slow = Duration::from_millis(100);
        for _ in 0..15 {
            let status = ctl.tick(&mut sim, &intent);
            assert_eq!(status.launcher.spin_up, SpinUp::Spinning);
            sim.step(slow);
        }
        let status = ctl.tick(&mut sim, &intent);
        assert_eq!(status.elapsed, slow);
        assert_eq!(status.launcher.spin_up, SpinUp::DeadlineElapsed);
        assert_eq!(ctl.launcher().session().unwrap().elapsed, Duration::from_millis(1520));
    }

    #[test]
    fn stale_pose_holds_navigation_command() {
        let (mut ctl, mut sim) = setup(Pose::new(20.0, 20.0));
        ctl.navigator_mut().set_target(NavTarget::new(60.0, 20.0, 1.0, 2.0));
        let intent = Intent {
            drive: DriveIntent::Navigate,
            ..Default::default()
        };
        let first = ctl.tick(&mut sim, &intent);
        assert_eq!(first.nav, NavStatus::Approaching);

        sim.drop_pose_for(1);
        let stale = ctl.tick(&mut sim, &intent);
        assert_eq!(stale.nav, NavStatus::SensorStale);
        assert!(!stale.pose_fresh);
        assert_eq!(stale.wheels, first.wheels);
        // the last known pose is still reported
        assert_relative_eq!(stale.pose.unwrap().x, 20.0);
    }

    #[test]
    fn stop_zeroes_everything() {
        let (mut ctl, mut sim) = setup(Pose::new(72.0, 100.0));
        let intent = Intent {
            drive: DriveIntent::Robot(DriveCommand::new(1.0, 0.0, 0.0)),
            launch: LaunchIntent::Setpoint(ctl.config().full_power_shot),
            intake: IntakeCommand::Intake,
            fire: true,
            aim: false,
        };
        ctl.tick(&mut sim, &intent);
        assert!(ctl.launcher().is_active());

        sim.stop_after(0);
        let status = ctl.tick(&mut sim, &intent);
        assert!(status.stopped);
        assert_eq!(sim.wheels, WheelPowers::ZERO);
        assert_eq!(sim.intake_power, 0.0);
        assert_eq!(status.launcher.gate, GateState::Closed);
        assert!(!ctl.launcher().is_active());
    }

    #[test]
    fn aim_assist_only_when_idle_in_zone() {
        let (mut ctl, mut sim) = setup(Pose::with_heading(72.0, 100.0, 0.0));
        let idle = Intent {
            drive: DriveIntent::Robot(DriveCommand::ZERO),
            aim: true,
            ..Default::default()
        };
        let status = ctl.tick(&mut sim, &idle);
        // goal is up and to the left of a robot facing +x: counter-clockwise
        assert!(status.wheels.front_left < 0.0);
        assert!(status.wheels.front_right > 0.0);

        let driving = Intent {
            drive: DriveIntent::Robot(DriveCommand::new(0.5, 0.0, 0.0)),
            aim: true,
            ..Default::default()
        };
        let status = ctl.tick(&mut sim, &driving);
        assert_relative_eq!(status.wheels.front_left, status.wheels.front_right);

        sim.pose = Pose::with_heading(72.0, 50.0, 0.0);
        let status = ctl.tick(&mut sim, &idle);
        assert_eq!(status.wheels, WheelPowers::ZERO);
    }

    #[test]
    fn field_relative_uses_last_heading() {
        let (mut ctl, mut sim) = setup(Pose::with_heading(72.0, 50.0, core::f64::consts::PI / 2.0));
        let intent = Intent {
            drive: DriveIntent::Field {
                x: 0.0,
                y: 0.5,
                rotate: 0.0,
            },
            ..Default::default()
        };
        let status = ctl.tick(&mut sim, &intent);
        // facing +y already, so this is straight ahead
        for w in status.wheels.as_array() {
            assert_relative_eq!(w, 0.5, epsilon = 1e-12);
        }
    }
}
