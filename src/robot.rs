//! V5 hardware behind the control-loop traits.

use alloc::vec::Vec;
use core::time::Duration;

use decode_control::{
    ControlLoop, PlanRunner, PlanStatus, Pose, RobotConfig,
    devices::{Clock, DriveMotors, Flywheel, GateServo, Intake, PoseSource, StopSignal},
    driver::{self, DriverInput},
    launcher::{rpm_to_ticks_per_second, whole_rpm},
    mecanum::WheelPowers,
    odometry::{Odometry, TrackingWheelConfig},
    plan::Action,
    routines,
};
use log::{error, info, warn};
use vexide::{
    devices::adi::servo::AdiServo, devices::smart::imu::InertialSensor, fs, prelude::*,
    time::Instant,
};

const MAX_VOLTS: f64 = 12.0;
const ROUTINE_PATH: &str = "routine.bin";

pub struct Hardware {
    front_left: Motor,
    front_right: Motor,
    back_left: Motor,
    back_right: Motor,
    flywheel: Motor,
    intake: Motor,
    gate: AdiServo,
    imu: InertialSensor,
    parallel_wheel: RotationSensor,
    perpendicular_wheel: RotationSensor,
    odometry: Odometry,
    controller: Controller,
    ticks_per_rev: f64,
    started: Instant,
}

impl Hardware {
    /// IMU heading in radians, CCW positive. The sensor reports clockwise degrees.
    fn imu_heading(&self) -> Option<f64> {
        self.imu.heading().ok().map(|deg| -deg.to_radians())
    }
}

impl PoseSource for Hardware {
    fn pose(&mut self) -> Option<Pose> {
        let parallel = self.parallel_wheel.position().ok()?;
        let perpendicular = self.perpendicular_wheel.position().ok()?;
        let heading = self.imu_heading()?;
        self.odometry
            .update(parallel.as_revolutions(), perpendicular.as_revolutions(), heading);
        Some(self.odometry.pose())
    }

    fn reset_pose(&mut self, pose: Pose) {
        let heading = self.imu_heading().unwrap_or(0.0);
        self.odometry.reset(pose, heading);
    }
}

impl DriveMotors for Hardware {
    fn set_wheel_powers(&mut self, powers: WheelPowers) {
        let _ = self.front_left.set_voltage(powers.front_left * MAX_VOLTS);
        let _ = self.front_right.set_voltage(powers.front_right * MAX_VOLTS);
        let _ = self.back_left.set_voltage(powers.back_left * MAX_VOLTS);
        let _ = self.back_right.set_voltage(powers.back_right * MAX_VOLTS);
    }
}

impl Flywheel for Hardware {
    fn set_power(&mut self, power: f64) {
        let _ = self.flywheel.set_voltage(power.clamp(-1.0, 1.0) * MAX_VOLTS);
    }

    fn set_target_velocity(&mut self, ticks_per_second: f64) {
        let _ = self
            .flywheel
            .set_velocity(whole_rpm(ticks_per_second, self.ticks_per_rev));
    }

    fn velocity(&mut self) -> Option<f64> {
        self.flywheel
            .velocity()
            .ok()
            .map(|rpm| rpm_to_ticks_per_second(rpm, self.ticks_per_rev))
    }
}

impl GateServo for Hardware {
    fn set_position(&mut self, position: f64) {
        // the ADI servo spans +/-50 degrees around center
        let degrees = (position.clamp(0.0, 1.0) - 0.5) * 100.0;
        let _ = self.gate.set_target(Position::from_degrees(degrees));
    }
}

impl Intake for Hardware {
    fn set_intake_power(&mut self, power: f64) {
        let _ = self.intake.set_voltage(power.clamp(-1.0, 1.0) * MAX_VOLTS);
    }
}

impl Clock for Hardware {
    fn now(&mut self) -> Duration {
        self.started.elapsed()
    }
}

impl StopSignal for Hardware {
    fn stop_requested(&mut self) -> bool {
        self.controller
            .state()
            .map(|s| s.button_b.is_pressed())
            .unwrap_or(false)
    }
}

pub struct Robot {
    hardware: Hardware,
    control: ControlLoop,
}

impl Robot {
    pub async fn new(peripherals: Peripherals, config: RobotConfig) -> Option<Self> {
        let ticks_per_rev = config.launcher.ticks_per_rev;
        let start = config.start_pose;
        let control = match ControlLoop::new(config) {
            Ok(control) => control,
            Err(e) => {
                error!("bad configuration: {e}");
                return None;
            }
        };

        let mut imu = InertialSensor::new(peripherals.port_7);
        if let Err(e) = imu.calibrate().await {
            warn!("imu calibration failed: {e:?}");
        }
        let tw_config = TrackingWheelConfig {
            parallel_offset: 0.302,
            perpendicular_offset: -0.021,
            wheel_diameter: 2.0,
        };

        let hardware = Hardware {
            front_left: Motor::new(peripherals.port_1, Gearset::Green, Direction::Reverse),
            front_right: Motor::new(peripherals.port_2, Gearset::Green, Direction::Forward),
            back_left: Motor::new(peripherals.port_3, Gearset::Green, Direction::Reverse),
            back_right: Motor::new(peripherals.port_4, Gearset::Green, Direction::Forward),
            flywheel: Motor::new(peripherals.port_5, Gearset::Blue, Direction::Forward),
            intake: Motor::new(peripherals.port_6, Gearset::Blue, Direction::Forward),
            gate: AdiServo::new(peripherals.adi_a),
            imu,
            parallel_wheel: RotationSensor::new(peripherals.port_8, Direction::Forward),
            perpendicular_wheel: RotationSensor::new(peripherals.port_9, Direction::Forward),
            odometry: Odometry::new(start, tw_config),
            controller: peripherals.primary_controller,
            ticks_per_rev,
            started: Instant::now(),
        };
        Some(Self { hardware, control })
    }

    fn load_routine(&self) -> Vec<Action> {
        let config = self.control.config();
        match fs::read(ROUTINE_PATH) {
            Ok(bytes) => match routines::load(&bytes, config) {
                Ok((name, actions)) => {
                    info!("running `{name}` from {ROUTINE_PATH}");
                    return actions;
                }
                Err(e) => warn!("{ROUTINE_PATH}: {e}, using built-in routine"),
            },
            Err(_) => info!("no {ROUTINE_PATH}, using built-in routine"),
        }
        routines::find(routines::OTOS_CYCLE)
            .and_then(|routine| routines::resolve(&routine, config))
            .unwrap_or_default()
    }
}

impl Compete for Robot {
    async fn autonomous(&mut self) {
        let mut runner = PlanRunner::new(self.load_routine());
        let dt = self.control.dt();
        loop {
            match runner.tick(&mut self.control, &mut self.hardware) {
                PlanStatus::Running { .. } => sleep(dt).await,
                status => {
                    info!("autonomous finished: {status:?}");
                    break;
                }
            }
        }
    }

    async fn driver(&mut self) {
        let dt = self.control.dt();
        loop {
            let state = self.hardware.controller.state().unwrap_or_default();
            let input = DriverInput {
                forward: state.left_stick.y(),
                strafe: state.left_stick.x(),
                turn: state.right_stick.x(),
                field_relative: state.button_x.is_pressed(),
                intake: state.button_r1.is_pressed(),
                reverse_intake: state.button_r2.is_pressed(),
                full_power: state.button_l1.is_pressed(),
                test_fire: state.button_l2.is_pressed(),
            };
            let intent = driver::intent(&input, self.control.config());
            self.control.tick(&mut self.hardware, &intent);
            sleep(dt).await;
        }
    }
}
