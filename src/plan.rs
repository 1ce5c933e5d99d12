use alloc::vec::Vec;
use core::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    control::{ControlLoop, DriveIntent, Intent, LaunchIntent},
    devices::{IntakeCommand, RobotIo},
    geometry::Pose,
    launcher::{LaunchSetpoint, SpinUp},
    navigation::{NavStatus, NavTarget},
};

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub enum ShotPower {
    /// Tier of the zone the robot is in, falling back to the configured default shot.
    Zone,
    Fixed(LaunchSetpoint),
}

#[derive(Copy, Clone, Debug)]
pub enum Action {
    DriveTo(NavTarget),
    Shoot { power: ShotPower, feed: Duration },
    Intake(IntakeCommand),
    Wait(Duration),
    SetPose(Pose),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlanStatus {
    Running { step: usize },
    Done,
    Aborted,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Enter,
    Driving,
    SpinUp,
    Feeding,
    Settling,
    Waiting,
}

/// Runs an action list one control tick at a time. A stop request aborts the plan.
pub struct PlanRunner {
    actions: Vec<Action>,
    index: usize,
    phase: Phase,
    elapsed: Duration,
    intake: IntakeCommand,
    finished: Option<PlanStatus>,
}

impl PlanRunner {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions,
            index: 0,
            phase: Phase::Enter,
            elapsed: Duration::ZERO,
            intake: IntakeCommand::Stop,
            finished: None,
        }
    }

    pub fn step(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    fn advance(&mut self) {
        self.index += 1;
        self.phase = Phase::Enter;
        self.elapsed = Duration::ZERO;
    }

    fn finish<R: RobotIo + ?Sized>(&mut self, ctl: &mut ControlLoop, io: &mut R, status: PlanStatus) -> PlanStatus {
        self.finished = Some(status);
        ctl.tick(io, &Intent::default());
        status
    }

    pub fn tick<R: RobotIo + ?Sized>(&mut self, ctl: &mut ControlLoop, io: &mut R) -> PlanStatus {
        if let Some(status) = self.finished {
            ctl.tick(io, &Intent::default());
            return status;
        }

        let action = loop {
            match self.actions.get(self.index).copied() {
                None => {
                    info!("plan complete after {} ticks", ctl.ticks());
                    return self.finish(ctl, io, PlanStatus::Done);
                }
                Some(Action::SetPose(pose)) => {
                    info!("pose set to ({:.1}, {:.1}, {:.0} deg)", pose.x, pose.y, pose.heading.to_degrees());
                    ctl.reset_pose(io, pose);
                    self.advance();
                }
                Some(Action::Intake(cmd)) => {
                    self.intake = cmd;
                    self.advance();
                }
                Some(action) => break action,
            }
        };

        let mut intent = Intent {
            intake: self.intake,
            ..Default::default()
        };
        match action {
            Action::DriveTo(target) => {
                if self.phase == Phase::Enter {
                    ctl.navigator_mut().set_target(target);
                    self.phase = Phase::Driving;
                }
                intent.drive = DriveIntent::Navigate;
                if let Some(cmd) = target.companion {
                    intent.intake = cmd;
                }
            }
            Action::Shoot { power, .. } => {
                if self.phase == Phase::Enter {
                    self.phase = Phase::SpinUp;
                }
                intent.launch = match power {
                    ShotPower::Zone => LaunchIntent::Zone {
                        fallback: Some(ctl.config().default_shot),
                    },
                    ShotPower::Fixed(setpoint) => LaunchIntent::Setpoint(setpoint),
                };
                match self.phase {
                    Phase::Feeding => {
                        intent.fire = true;
                        intent.intake = IntakeCommand::Intake;
                    }
                    Phase::Settling => {
                        intent.launch = LaunchIntent::Off;
                        intent.intake = IntakeCommand::Stop;
                    }
                    _ => {}
                }
            }
            Action::Wait(_) => {
                if self.phase == Phase::Enter {
                    self.phase = Phase::Waiting;
                }
            }
            Action::Intake(_) | Action::SetPose(_) => {}
        }

        let status = ctl.tick(io, &intent);
        let dt = status.elapsed;
        if status.stopped {
            warn!("plan aborted at step {}", self.index);
            self.finished = Some(PlanStatus::Aborted);
            return PlanStatus::Aborted;
        }

        match action {
            Action::DriveTo(target) => match status.nav {
                NavStatus::Arrived => self.advance(),
                NavStatus::TimedOut => {
                    warn!(
                        "step {}: skipping unreachable waypoint ({:.1}, {:.1})",
                        self.index, target.position.x, target.position.y
                    );
                    self.advance();
                }
                NavStatus::Cancelled | NavStatus::Idle => {
                    warn!("step {}: navigation dropped its target", self.index);
                    self.finished = Some(PlanStatus::Aborted);
                    return PlanStatus::Aborted;
                }
                NavStatus::Approaching | NavStatus::SensorStale => {}
            },
            Action::Shoot { feed, .. } => match self.phase {
                Phase::SpinUp => {
                    if matches!(status.launcher.spin_up, SpinUp::AtSpeed | SpinUp::DeadlineElapsed) {
                        info!("step {}: feeding", self.index);
                        self.phase = Phase::Feeding;
                        self.elapsed = Duration::ZERO;
                    }
                }
                Phase::Feeding => {
                    self.elapsed += dt;
                    if self.elapsed >= feed {
                        self.phase = Phase::Settling;
                        self.elapsed = Duration::ZERO;
                    }
                }
                Phase::Settling => {
                    self.elapsed += dt;
                    if self.elapsed >= ctl.config().launcher.settle {
                        info!("step {}: shot sequence done", self.index);
                        self.intake = IntakeCommand::Stop;
                        self.advance();
                    }
                }
                _ => {}
            },
            Action::Wait(duration) => {
                self.elapsed += dt;
                if self.elapsed >= duration {
                    self.advance();
                }
            }
            Action::Intake(_) | Action::SetPose(_) => {}
        }

        PlanStatus::Running { step: self.index }
    }
}
