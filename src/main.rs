#![cfg_attr(target_os = "vexos", no_std, no_main)]

extern crate alloc;

mod logger;
#[cfg(target_os = "vexos")]
mod robot;

use decode_control::{Alliance, RobotConfig};
use log::LevelFilter;

const ALLIANCE: Alliance = Alliance::Blue;

#[cfg(target_os = "vexos")]
#[vexide::main]
async fn main(peripherals: vexide::prelude::Peripherals) {
    use vexide::prelude::Compete;

    logger::init(LevelFilter::Info);
    let config = RobotConfig::for_alliance(ALLIANCE);
    log::info!("{}", config.describe());
    if let Some(robot) = robot::Robot::new(peripherals, config).await {
        robot.compete().await;
    }
}

// decode-control [blue|red] [routine.bin | routine name]
// decode-control export <routine.bin> [routine name]
#[cfg(not(target_os = "vexos"))]
fn main() -> std::process::ExitCode {
    use std::process::ExitCode;

    use decode_control::{ControlLoop, PlanRunner, PlanStatus, routines, sim::SimRobot};
    use log::{error, info};

    logger::init(LevelFilter::Info);
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("export") {
        let Some(path) = args.get(1) else {
            error!("export needs an output path");
            return ExitCode::FAILURE;
        };
        let name = args.get(2).map_or(routines::OTOS_CYCLE, String::as_str);
        let written = routines::find(name)
            .and_then(|routine| routines::encode(&routine))
            .map_err(|e| e.to_string())
            .and_then(|bytes| std::fs::write(path, bytes).map_err(|e| e.to_string()));
        return match written {
            Ok(()) => {
                info!("wrote `{name}` to {path}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{path}: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let alliance = match args.first().map(String::as_str) {
        None | Some("blue") => ALLIANCE,
        Some("red") => Alliance::Red,
        Some(other) => {
            error!("unknown alliance `{other}`");
            return ExitCode::FAILURE;
        }
    };
    let config = RobotConfig::for_alliance(alliance);
    info!("{}", config.describe());

    let source = args.get(1).map_or(routines::OTOS_CYCLE, String::as_str);
    let loaded = if std::path::Path::new(source).is_file() {
        match std::fs::read(source) {
            Ok(bytes) => routines::load(&bytes, &config),
            Err(e) => {
                error!("{source}: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        routines::find(source).and_then(|routine| {
            let actions = routines::resolve(&routine, &config)?;
            Ok((routine.name, actions))
        })
    };
    let (name, actions) = match loaded {
        Ok(routine) => routine,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut sim = SimRobot::new(config.start_pose, config.drive);
    sim.free_rpm = config.launcher.free_rpm;
    sim.ticks_per_rev = config.launcher.ticks_per_rev;
    let dt = config.dt;
    let mut control = match ControlLoop::new(config) {
        Ok(control) => control,
        Err(e) => {
            error!("bad configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut runner = PlanRunner::new(actions);
    let status = sim.run(&mut control, &mut runner, 30_000);

    let elapsed = dt * sim.steps() as u32;
    info!(
        "`{name}` {status:?} after {}: {} launched, pose ({:.1}, {:.1}, {:.0} deg)",
        humantime::format_duration(elapsed),
        sim.launched,
        sim.pose.x,
        sim.pose.y,
        sim.pose.heading.to_degrees()
    );
    if status == PlanStatus::Done {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
