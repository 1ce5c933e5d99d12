use alloc::{string::String, vec, vec::Vec};
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    config::RobotConfig,
    devices::IntakeCommand,
    error::RoutineError,
    geometry::Pose,
    launcher::LaunchSetpoint,
    navigation::NavTarget,
    plan::{Action, ShotPower},
};

pub const OTOS_CYCLE: &str = "otos cycle";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IRSpeed {
    Drive,
    Slow,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum IRAction {
    DriveTo {
        x: f64,
        y: f64,
        heading_deg: Option<f64>,
        speed: IRSpeed,
        intake: bool,
    },
    /// Without both `rpm` and `power` the shot follows the zone tier.
    Shoot {
        rpm: Option<f64>,
        power: Option<f64>,
        feed_ms: Option<u64>,
    },
    Intake(IntakeCommand),
    Wait(u64),
    SetPose { x: f64, y: f64, heading_deg: f64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IRRoutine {
    pub name: String,
    pub actions: Vec<IRAction>,
}

fn finite(index: usize, values: &[f64]) -> Result<(), RoutineError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(RoutineError::InvalidStep {
            index,
            reason: "non-finite value",
        })
    }
}

fn map_action(index: usize, a: &IRAction, config: &RobotConfig) -> Result<Action, RoutineError> {
    let alliance = config.alliance;
    Ok(match *a {
        IRAction::DriveTo {
            x,
            y,
            heading_deg,
            speed,
            intake,
        } => {
            finite(index, &[x, y, heading_deg.unwrap_or(0.0)])?;
            let speed = match speed {
                IRSpeed::Drive => config.navigation.drive_speed,
                IRSpeed::Slow => config.navigation.slow_speed,
            };
            let pose = alliance.mirror_pose(Pose::with_heading_degrees(x, y, heading_deg.unwrap_or(0.0)));
            let mut target = NavTarget::new(pose.x, pose.y, speed, config.navigation.tolerance);
            if heading_deg.is_some() {
                target = target.with_heading(pose.heading);
            }
            if intake {
                target = target.with_companion(IntakeCommand::Intake);
            }
            Action::DriveTo(target)
        }
        IRAction::Shoot { rpm, power, feed_ms } => {
            let power = match (rpm, power) {
                (Some(target_rpm), Some(power)) => {
                    finite(index, &[target_rpm, power])?;
                    if !(0.0..=1.0).contains(&power) {
                        return Err(RoutineError::InvalidStep {
                            index,
                            reason: "shot power outside [0, 1]",
                        });
                    }
                    ShotPower::Fixed(LaunchSetpoint { target_rpm, power })
                }
                _ => ShotPower::Zone,
            };
            Action::Shoot {
                power,
                feed: feed_ms.map_or(config.launcher.feed_duration, Duration::from_millis),
            }
        }
        IRAction::Intake(cmd) => Action::Intake(cmd),
        IRAction::Wait(ms) => Action::Wait(Duration::from_millis(ms)),
        IRAction::SetPose { x, y, heading_deg } => {
            finite(index, &[x, y, heading_deg])?;
            Action::SetPose(alliance.mirror_pose(Pose::with_heading_degrees(x, y, heading_deg)))
        }
    })
}

/// Resolves a routine into actions for the configured alliance.
pub fn resolve(routine: &IRRoutine, config: &RobotConfig) -> Result<Vec<Action>, RoutineError> {
    routine
        .actions
        .iter()
        .enumerate()
        .map(|(i, a)| map_action(i, a, config))
        .collect()
}

pub fn encode(routine: &IRRoutine) -> Result<Vec<u8>, RoutineError> {
    postcard::to_allocvec(routine).map_err(RoutineError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<IRRoutine, RoutineError> {
    postcard::from_bytes(bytes).map_err(RoutineError::Decode)
}

pub fn load(bytes: &[u8], config: &RobotConfig) -> Result<(String, Vec<Action>), RoutineError> {
    let routine = decode(bytes)?;
    let actions = resolve(&routine, config)?;
    Ok((routine.name, actions))
}

/// Built-in routine by name, ignoring case.
pub fn find(name: &str) -> Result<IRRoutine, RoutineError> {
    [otos_cycle()]
        .into_iter()
        .find(|r| r.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| RoutineError::Unknown(name.into()))
}

/// Shoot the preload, then twice: collect a row of balls and come back to shoot them.
pub fn otos_cycle() -> IRRoutine {
    const SHOOT: (f64, f64, f64) = (50.0, 94.0, 142.0);
    let drive = |x, y, heading| IRAction::DriveTo {
        x,
        y,
        heading_deg: Some(heading),
        speed: IRSpeed::Drive,
        intake: false,
    };
    let collect = |x, y| IRAction::DriveTo {
        x,
        y,
        heading_deg: Some(180.0),
        speed: IRSpeed::Slow,
        intake: true,
    };
    let shoot = IRAction::Shoot {
        rpm: Some(5100.0),
        power: Some(0.85),
        feed_ms: None,
    };

    let mut actions = vec![
        IRAction::SetPose {
            x: 15.0,
            y: 111.0,
            heading_deg: 90.0,
        },
        drive(SHOOT.0, SHOOT.1, SHOOT.2),
        shoot.clone(),
    ];
    for row_y in [84.0, 60.0] {
        actions.push(drive(50.0, row_y, 180.0));
        actions.push(collect(22.0, row_y));
        actions.push(drive(SHOOT.0, SHOOT.1, SHOOT.2));
        actions.push(shoot.clone());
    }
    IRRoutine {
        name: OTOS_CYCLE.into(),
        actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Alliance;
    use approx::assert_relative_eq;

    #[test]
    fn blob_survives_storage() {
        let routine = otos_cycle();
        let bytes = encode(&routine).unwrap();
        assert_eq!(decode(&bytes).unwrap(), routine);
    }

    #[test]
    fn cycle_shape() {
        let actions = resolve(&otos_cycle(), &RobotConfig::default()).unwrap();
        assert_eq!(actions.len(), 11);
        let shots = actions
            .iter()
            .filter(|a| matches!(a, Action::Shoot { .. }))
            .count();
        assert_eq!(shots, 3);
        let Action::DriveTo(collect) = actions[4] else {
            panic!("expected a drive");
        };
        assert_eq!(collect.companion, Some(IntakeCommand::Intake));
        assert_relative_eq!(collect.speed, 0.5);
        assert_relative_eq!(collect.tolerance, 2.0);
    }

    #[test]
    fn red_mirrors_positions_and_headings() {
        let config = RobotConfig::for_alliance(Alliance::Red);
        let (_, actions) = load(&encode(&otos_cycle()).unwrap(), &config).unwrap();
        let Action::SetPose(start) = actions[0] else {
            panic!("expected a pose");
        };
        assert_relative_eq!(start.x, 129.0);
        assert_relative_eq!(start.heading.to_degrees(), 90.0, max_relative = 1e-9);

        let Action::DriveTo(first) = actions[1] else {
            panic!("expected a drive");
        };
        assert_relative_eq!(first.position.x, 94.0);
        assert_relative_eq!(first.heading.unwrap().to_degrees(), 38.0, max_relative = 1e-9);
    }

    #[test]
    fn corrupt_blob_is_a_decode_error() {
        let bad: &[u8] = &[0xff, 0xff, 0xff];
        assert!(matches!(load(bad, &RobotConfig::default()), Err(RoutineError::Decode(_))));
    }

    #[test]
    fn invalid_steps_are_rejected() {
        let routine = IRRoutine {
            name: "broken".into(),
            actions: vec![
                IRAction::Wait(10),
                IRAction::Shoot {
                    rpm: Some(3000.0),
                    power: Some(1.5),
                    feed_ms: None,
                },
            ],
        };
        let err = resolve(&routine, &RobotConfig::default()).unwrap_err();
        assert!(matches!(err, RoutineError::InvalidStep { index: 1, .. }));

        assert!(matches!(find("nope"), Err(RoutineError::Unknown(_))));
        assert_eq!(find("OTOS CYCLE").unwrap().name, OTOS_CYCLE);
    }
}
