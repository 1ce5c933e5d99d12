use core::time::Duration;

use approx::assert_relative_eq;
use decode_control::{
    Alliance, ControlLoop, PlanRunner, PlanStatus, Pose, RobotConfig,
    geometry::{Point, Pos2Like},
    launcher::{LaunchSetpoint, SpeedFeedback},
    navigation::NavTarget,
    plan::{Action, ShotPower},
    routines,
    sim::SimRobot,
};

fn run(alliance: Alliance, prepare: impl FnOnce(&mut SimRobot)) -> (PlanStatus, SimRobot, ControlLoop) {
    let config = RobotConfig::for_alliance(alliance);
    let actions = routines::resolve(&routines::otos_cycle(), &config).unwrap();
    let mut sim = SimRobot::new(Pose::default(), config.drive);
    prepare(&mut sim);
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut runner = PlanRunner::new(actions);
    let status = sim.run(&mut ctl, &mut runner, 10_000);
    (status, sim, ctl)
}

fn shoot_spot(alliance: Alliance) -> Point {
    alliance.mirror_point(Point::new(50.0, 94.0))
}

#[test]
fn blue_cycle_completes_and_scores() {
    let (status, sim, ctl) = run(Alliance::Blue, |_| {});
    assert_eq!(status, PlanStatus::Done);
    // preload plus at least one collected ball from each row
    assert!(sim.launched >= 5, "launched {}", sim.launched);
    assert!(sim.pose.distance_to(&shoot_spot(Alliance::Blue)) < 3.0);
    assert!(!ctl.launcher().is_active());
    assert!(!sim.gate_open());
}

#[test]
fn red_cycle_mirrors_blue() {
    let (status, sim, _) = run(Alliance::Red, |_| {});
    assert_eq!(status, PlanStatus::Done);
    assert!(sim.launched >= 5);
    assert!(sim.pose.distance_to(&shoot_spot(Alliance::Red)) < 3.0);
    // the robot never strays onto the blue half of the start area
    assert!(sim.trace.iter().all(|p| p.x > 72.0));
}

#[test]
fn start_pose_comes_from_the_routine() {
    let (_, sim, _) = run(Alliance::Blue, |_| {});
    let first = sim.trace.first().unwrap();
    assert!((first.x - 15.0).abs() < 2.0);
    assert!((first.y - 111.0).abs() < 2.0);
}

#[test]
fn pose_dropouts_delay_but_do_not_derail() {
    let (status, sim, _) = run(Alliance::Blue, |sim| sim.drop_pose_for(40));
    assert_eq!(status, PlanStatus::Done);
    assert!(sim.pose.distance_to(&shoot_spot(Alliance::Blue)) < 3.0);
}

#[test]
fn stop_mid_routine_aborts_with_outputs_off() {
    let (status, sim, ctl) = run(Alliance::Blue, |sim| sim.stop_after(200));
    assert_eq!(status, PlanStatus::Aborted);
    assert_eq!(sim.steps(), 200);
    assert_eq!(sim.wheels.max_magnitude(), 0.0);
    assert_eq!(sim.intake_power, 0.0);
    assert!(!sim.gate_open());
    assert!(!ctl.launcher().is_active());
}

#[test]
fn timed_launcher_without_encoder_still_scores() {
    let mut config = RobotConfig::default();
    config.launcher.feedback = SpeedFeedback::Timed;
    let mut sim = SimRobot::new(config.start_pose, config.drive);
    sim.has_encoder = false;
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut runner = PlanRunner::new(vec![Action::Shoot {
        power: ShotPower::Fixed(LaunchSetpoint {
            target_rpm: 5100.0,
            power: 0.85,
        }),
        feed: Duration::from_millis(3000),
    }]);
    assert_eq!(sim.run(&mut ctl, &mut runner, 1_000), PlanStatus::Done);
    assert_eq!(sim.launched, 3);
}

#[test]
fn unreachable_waypoint_is_skipped() {
    let mut config = RobotConfig::default();
    config.navigation.max_ticks = 50;
    let start = config.start_pose;
    let mut sim = SimRobot::new(start, config.drive);
    // wheels spin but the robot is pinned
    sim.max_speed = 0.0;
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut runner = PlanRunner::new(vec![
        Action::DriveTo(NavTarget::new(100.0, 100.0, 1.0, 2.0)),
        Action::Wait(Duration::from_millis(100)),
    ]);
    assert_eq!(sim.run(&mut ctl, &mut runner, 1_000), PlanStatus::Done);
    assert_relative_eq!(sim.pose.x, start.x);
    assert!(sim.steps() > 50);
}
