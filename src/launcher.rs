use core::time::Duration;

use log::{debug, info, warn};
#[allow(unused_imports)]
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::{
    gate::{Gate, GateSetpoints, GateState},
    geometry::{Point, Pos2Like},
    pid::{Pid, PidGains},
};

/// `|measured - target| <= tolerance`. NaN is never at speed.
pub fn at_speed(measured: f64, target: f64, tolerance: f64) -> bool {
    (measured - target).abs() <= tolerance
}

/// Launch power proportional to distance, saturating at `reference`.
pub fn scaled_power(distance: f64, reference: f64) -> f64 {
    if !(reference > 0.0) {
        return 1.0;
    }
    let ratio = distance / reference;
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

pub fn compute_scaled_power<A: Pos2Like, B: Pos2Like>(current: &A, target: &B, reference: f64) -> f64 {
    scaled_power(current.distance_to(target), reference)
}

pub fn rpm_to_ticks_per_second(rpm: f64, ticks_per_rev: f64) -> f64 {
    rpm * ticks_per_rev / 60.0
}

pub fn ticks_per_second_to_rpm(ticks_per_second: f64, ticks_per_rev: f64) -> f64 {
    if ticks_per_rev == 0.0 {
        return 0.0;
    }
    ticks_per_second * 60.0 / ticks_per_rev
}

/// Nearest whole rpm, for motor controllers that take an integer velocity.
pub fn whole_rpm(ticks_per_second: f64, ticks_per_rev: f64) -> i32 {
    ticks_per_second_to_rpm(ticks_per_second, ticks_per_rev).round() as i32
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub enum ReferenceDistance {
    Fixed(f64),
    /// Distance from the goal to this point.
    FromPoint(Point),
}

impl ReferenceDistance {
    pub fn resolve<P: Pos2Like>(&self, goal: &P) -> f64 {
        match self {
            ReferenceDistance::Fixed(d) => *d,
            ReferenceDistance::FromPoint(p) => goal.distance_to(p),
        }
    }
}

/// Launcher behavior tied to a zone.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ShotTier {
    /// Multiplier applied after distance scaling.
    pub power_scale: f64,
    pub reference: ReferenceDistance,
}

impl ShotTier {
    // the target is what the scaled power drives an unloaded flywheel to
    pub fn setpoint<A: Pos2Like, B: Pos2Like>(&self, position: &A, goal: &B, free_rpm: f64) -> LaunchSetpoint {
        let power = compute_scaled_power(position, goal, self.reference.resolve(goal));
        LaunchSetpoint::from_power((power * self.power_scale).clamp(0.0, 1.0), free_rpm)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchSetpoint {
    pub target_rpm: f64,
    /// Open-loop power in [0, 1], used in [`Actuation::Power`].
    pub power: f64,
}

impl LaunchSetpoint {
    pub fn from_power(power: f64, free_rpm: f64) -> Self {
        Self {
            target_rpm: power * free_rpm,
            power,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LauncherCommand {
    Off,
    Power(f64),
    Velocity(f64),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedFeedback {
    /// Compare encoder velocity against the target.
    Measured,
    /// For a missing encoder: at speed once `timed_at_speed` has elapsed. A reading, when
    /// there is one, must still agree.
    Timed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actuation {
    /// Open-loop power, optionally trimmed by a velocity PID.
    Power,
    Velocity,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct LauncherConfig {
    pub ticks_per_rev: f64,
    pub rpm_tolerance: f64,
    /// Unloaded speed at full power. Scales the velocity trim.
    pub free_rpm: f64,
    pub spin_up_deadline: Duration,
    pub timed_at_speed: Duration,
    pub feed_duration: Duration,
    pub settle: Duration,
    pub feedback: SpeedFeedback,
    pub actuation: Actuation,
    /// Applied to the RPM error normalized by `free_rpm`.
    pub velocity_trim: Option<PidGains>,
    /// RPM drop below the at-speed reading that counts as a shot.
    pub shot_drop_rpm: f64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            ticks_per_rev: 28.0,
            rpm_tolerance: 200.0,
            free_rpm: 6000.0,
            spin_up_deadline: Duration::from_millis(1500),
            timed_at_speed: Duration::from_millis(1000),
            feed_duration: Duration::from_millis(5000),
            settle: Duration::from_millis(200),
            feedback: SpeedFeedback::Measured,
            actuation: Actuation::Power,
            velocity_trim: None,
            shot_drop_rpm: 400.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpinUp {
    Idle,
    Spinning,
    AtSpeed,
    /// Not at speed and the spin-up deadline has passed. The sequence may move on, but the gate
    /// still waits for speed.
    DeadlineElapsed,
}

#[derive(Copy, Clone, Debug)]
pub struct ShotEvent {
    pub rpm_before: f64,
    pub min_rpm: f64,
}

/// Counts shots from the dip they put in flywheel speed.
#[derive(Clone, Debug)]
pub struct ShotMonitor {
    drop_rpm: f64,
    rpm_before: Option<f64>,
    recovering: Option<ShotEvent>,
    shots: u32,
}

impl ShotMonitor {
    pub fn new(drop_rpm: f64) -> Self {
        Self {
            drop_rpm,
            rpm_before: None,
            recovering: None,
            shots: 0,
        }
    }

    /// Returns the completed shot once speed has recovered.
    pub fn update(&mut self, rpm: f64, at_speed: bool) -> Option<ShotEvent> {
        if let Some(shot) = self.recovering.as_mut() {
            shot.min_rpm = shot.min_rpm.min(rpm);
            if at_speed {
                let done = *shot;
                self.recovering = None;
                self.rpm_before = Some(rpm);
                return Some(done);
            }
            return None;
        }
        match self.rpm_before {
            Some(before) if rpm < before - self.drop_rpm => {
                self.shots += 1;
                self.recovering = Some(ShotEvent {
                    rpm_before: before,
                    min_rpm: rpm,
                });
            }
            _ if at_speed => self.rpm_before = Some(rpm),
            _ => {}
        }
        None
    }

    pub fn shots(&self) -> u32 {
        self.shots
    }
}

#[derive(Clone, Debug)]
pub struct LaunchSession {
    pub setpoint: LaunchSetpoint,
    pub measured_rpm: Option<f64>,
    pub tolerance: f64,
    pub at_speed: bool,
    pub gate: GateState,
    pub elapsed: Duration,
    pub spin_up_time: Option<Duration>,
    pub deadline_elapsed: bool,
    pub shots: u32,
    pub min_rpm: Option<f64>,
}

impl LaunchSession {
    fn new(setpoint: LaunchSetpoint, tolerance: f64) -> Self {
        Self {
            setpoint,
            measured_rpm: None,
            tolerance,
            at_speed: false,
            gate: GateState::Closed,
            elapsed: Duration::ZERO,
            spin_up_time: None,
            deadline_elapsed: false,
            shots: 0,
            min_rpm: None,
        }
    }

    /// Takes a new speed reading. A missing reading is never at speed.
    pub fn update(&mut self, measured_rpm: Option<f64>) -> bool {
        self.measured_rpm = measured_rpm.filter(|m| m.is_finite());
        self.at_speed = self
            .measured_rpm
            .is_some_and(|m| at_speed(m, self.setpoint.target_rpm, self.tolerance));
        self.at_speed
    }
}

#[derive(Copy, Clone, Debug)]
pub struct LauncherOutput {
    pub command: LauncherCommand,
    pub gate: GateState,
    pub gate_position: f64,
    pub at_speed: bool,
    pub spin_up: SpinUp,
}

pub struct LaunchRegulator {
    config: LauncherConfig,
    gate: Gate,
    trim: Option<Pid>,
    monitor: ShotMonitor,
    session: Option<LaunchSession>,
}

impl LaunchRegulator {
    pub fn new(config: LauncherConfig, gate: GateSetpoints) -> Self {
        Self {
            config,
            gate: Gate::new(gate),
            trim: config.velocity_trim.map(Pid::from),
            monitor: ShotMonitor::new(config.shot_drop_rpm),
            session: None,
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&LaunchSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn start(&mut self, setpoint: LaunchSetpoint) {
        info!(
            "launcher spin-up: {:.0} rpm, power {:.2}",
            setpoint.target_rpm, setpoint.power
        );
        if let Some(pid) = self.trim.as_mut() {
            pid.reset();
        }
        self.monitor = ShotMonitor::new(self.config.shot_drop_rpm);
        self.gate.close();
        self.session = Some(LaunchSession::new(setpoint, self.config.rpm_tolerance));
    }

    /// Moves the setpoint without restarting the session timers.
    pub fn retarget(&mut self, setpoint: LaunchSetpoint) {
        match self.session.as_mut() {
            Some(session) => {
                if session.setpoint.target_rpm != setpoint.target_rpm {
                    debug!("launcher retarget {:.0} rpm", setpoint.target_rpm);
                }
                session.setpoint = setpoint;
            }
            None => self.start(setpoint),
        }
    }

    pub fn stop(&mut self) -> Option<LaunchSession> {
        self.gate.close();
        let session = self.session.take();
        if let Some(s) = &session {
            info!(
                "launcher stopped after {:?}: {} shot(s), spin-up {:?}",
                s.elapsed, s.shots, s.spin_up_time
            );
        }
        session
    }

    /// `measured` is in ticks per second. `ready` is permission to release.
    pub fn tick(&mut self, measured: Option<f64>, ready: bool, dt: Duration) -> LauncherOutput {
        let Some(session) = self.session.as_mut() else {
            self.gate.close();
            return LauncherOutput {
                command: LauncherCommand::Off,
                gate: GateState::Closed,
                gate_position: self.gate.position(),
                at_speed: false,
                spin_up: SpinUp::Idle,
            };
        };

        session.elapsed += dt;
        let measured_rpm = measured.map(|t| ticks_per_second_to_rpm(t, self.config.ticks_per_rev));
        let at_speed = match self.config.feedback {
            SpeedFeedback::Measured => session.update(measured_rpm),
            SpeedFeedback::Timed => {
                // the timer stands in for a missing encoder, never overrides a reading
                let timer = session.elapsed >= self.config.timed_at_speed;
                let reading = match measured_rpm {
                    Some(_) => session.update(measured_rpm),
                    None => {
                        session.measured_rpm = None;
                        true
                    }
                };
                session.at_speed = timer && reading;
                session.at_speed
            }
        };

        if at_speed && session.spin_up_time.is_none() {
            session.spin_up_time = Some(session.elapsed);
            info!("launcher at speed after {:?}", session.elapsed);
        }
        if !at_speed
            && session.spin_up_time.is_none()
            && !session.deadline_elapsed
            && session.elapsed >= self.config.spin_up_deadline
        {
            session.deadline_elapsed = true;
            warn!(
                "launcher not at speed after {:?} (measured {:?} rpm, target {:.0})",
                session.elapsed, session.measured_rpm, session.setpoint.target_rpm
            );
        }

        if let (SpeedFeedback::Measured, Some(rpm)) = (self.config.feedback, session.measured_rpm) {
            if let Some(shot) = self.monitor.update(rpm, at_speed) {
                debug!(
                    "shot recovered: {:.0} -> {:.0} rpm",
                    shot.rpm_before, shot.min_rpm
                );
            }
            session.shots = self.monitor.shots();
            if session.spin_up_time.is_some() {
                session.min_rpm = Some(session.min_rpm.map_or(rpm, |m: f64| m.min(rpm)));
            }
        }

        let command = match self.config.actuation {
            Actuation::Velocity => LauncherCommand::Velocity(rpm_to_ticks_per_second(
                session.setpoint.target_rpm,
                self.config.ticks_per_rev,
            )),
            Actuation::Power => {
                let trim = match (self.trim.as_mut(), session.measured_rpm) {
                    (Some(pid), Some(rpm)) if self.config.free_rpm > 0.0 => {
                        let error = (session.setpoint.target_rpm - rpm) / self.config.free_rpm;
                        pid.next(error, dt.as_secs_f64())
                    }
                    _ => 0.0,
                };
                LauncherCommand::Power((session.setpoint.power + trim).clamp(0.0, 1.0))
            }
        };

        let gate = self.gate.update(at_speed, ready);
        session.gate = gate;

        LauncherOutput {
            command,
            gate,
            gate_position: self.gate.position(),
            at_speed,
            spin_up: if at_speed {
                SpinUp::AtSpeed
            } else if session.deadline_elapsed {
                SpinUp::DeadlineElapsed
            } else {
                SpinUp::Spinning
            },
        }
    }
}
