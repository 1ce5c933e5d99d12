#[allow(unused_imports)]
use num_traits::Float;

use crate::{
    config::RobotConfig,
    control::{DriveIntent, Intent, LaunchIntent},
    devices::IntakeCommand,
    geometry::{Point, Pos2Like, Pose},
    mecanum::DriveCommand,
};

#[derive(Default, Copy, Clone, Debug)]
pub struct DriverInput {
    /// Forward stick, [-1, 1].
    pub forward: f64,
    /// Sideways stick, positive right.
    pub strafe: f64,
    /// Turn stick, positive clockwise.
    pub turn: f64,
    pub field_relative: bool,
    pub intake: bool,
    pub reverse_intake: bool,
    pub full_power: bool,
    pub test_fire: bool,
}

pub fn intent(input: &DriverInput, config: &RobotConfig) -> Intent {
    let drive = if input.field_relative {
        DriveIntent::Field {
            x: input.strafe,
            y: input.forward,
            rotate: input.turn,
        }
    } else {
        DriveIntent::Robot(DriveCommand::new(input.forward, input.strafe, input.turn))
    };
    let launch = if input.full_power {
        LaunchIntent::Setpoint(config.full_power_shot)
    } else {
        LaunchIntent::Zone { fallback: None }
    };
    let intake = if input.reverse_intake {
        IntakeCommand::Reverse
    } else if input.intake || input.test_fire {
        IntakeCommand::Intake
    } else {
        IntakeCommand::Stop
    };
    Intent {
        drive,
        launch,
        intake,
        fire: input.test_fire,
        aim: true,
    }
}

pub fn sticks_idle(cmd: &DriveCommand, deadband: f64) -> bool {
    cmd.forward.abs() < deadband && cmd.strafe.abs() < deadband && cmd.rotate.abs() < deadband
}

pub fn aim_rotate(pose: &Pose, goal: &Point, gain: f64) -> f64 {
    let error = pose.heading_error(pose.heading_to(goal));
    (-gain * error).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f64::consts::PI;

    #[test]
    fn buttons_map_to_intent() {
        let config = RobotConfig::default();
        let i = intent(
            &DriverInput {
                forward: 0.5,
                intake: true,
                ..Default::default()
            },
            &config,
        );
        assert!(matches!(i.drive, DriveIntent::Robot(c) if c.forward == 0.5));
        assert!(matches!(i.launch, LaunchIntent::Zone { fallback: None }));
        assert_eq!(i.intake, IntakeCommand::Intake);
        assert!(!i.fire);

        let i = intent(
            &DriverInput {
                reverse_intake: true,
                full_power: true,
                test_fire: true,
                field_relative: true,
                ..Default::default()
            },
            &config,
        );
        assert!(matches!(i.drive, DriveIntent::Field { .. }));
        assert!(matches!(i.launch, LaunchIntent::Setpoint(s) if s.power == 1.0 && s.target_rpm == 6000.0));
        assert_eq!(i.intake, IntakeCommand::Reverse);
        assert!(i.fire);
    }

    #[test]
    fn idle_respects_deadband() {
        assert!(sticks_idle(&DriveCommand::new(0.05, -0.05, 0.0), 0.1));
        assert!(!sticks_idle(&DriveCommand::new(0.0, 0.0, 0.2), 0.1));
    }

    #[test]
    fn aim_turns_toward_goal() {
        let goal = Point::new(0.0, 10.0);
        // facing +x, goal straight to the left: turn counter-clockwise
        let r = aim_rotate(&Pose::new(0.0, 0.0), &goal, 0.5);
        assert_relative_eq!(r, -0.5 * PI / 2.0);
        // already facing it
        let r = aim_rotate(&Pose::with_heading(0.0, 0.0, PI / 2.0), &goal, 0.5);
        assert_relative_eq!(r, 0.0, epsilon = 1e-12);
        // large error saturates
        let r = aim_rotate(&Pose::with_heading(0.0, 0.0, -PI / 2.0), &goal, 0.5);
        assert_relative_eq!(r.abs(), 1.0);
    }
}
