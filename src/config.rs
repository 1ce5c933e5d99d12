use alloc::{format, string::String, vec, vec::Vec};
use core::{f64::consts::PI, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    gate::GateSetpoints,
    geometry::{Point, Pose, normalize_angle},
    launcher::{LaunchSetpoint, LauncherConfig, ReferenceDistance, ShotTier},
    mecanum::MecanumKinematics,
    navigation::NavigationConfig,
    units::{FIELD_SIZE, cm},
    zone::{Triangle, ZoneDef},
};

pub const FRONT_ZONE: &str = "front";
pub const BACK_ZONE: &str = "back";

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alliance {
    #[default]
    Blue,
    Red,
}

impl Alliance {
    pub fn is_red(self) -> bool {
        self == Alliance::Red
    }

    pub fn mirror_point(self, p: Point) -> Point {
        match self {
            Alliance::Blue => p,
            Alliance::Red => Point::new(FIELD_SIZE - p.x, p.y),
        }
    }

    pub fn mirror_heading(self, heading: f64) -> f64 {
        match self {
            Alliance::Blue => heading,
            Alliance::Red => normalize_angle(PI - heading),
        }
    }

    pub fn mirror_pose(self, pose: Pose) -> Pose {
        let p = self.mirror_point(pose.position());
        Pose::with_heading(p.x, p.y, self.mirror_heading(pose.heading))
    }
}

/// Operator aim assist.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct AimConfig {
    /// Rotate output per radian of heading error.
    pub gain: f64,
    /// Stick magnitude below which the driver counts as idle.
    pub deadband: f64,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            gain: 0.5,
            deadband: 0.1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RobotConfig {
    pub alliance: Alliance,
    pub dt: Duration,
    pub drive: MecanumKinematics,
    pub navigation: NavigationConfig,
    pub launcher: LauncherConfig,
    pub gate: GateSetpoints,
    /// Checked in order; the first zone containing the robot picks the shot tier.
    pub zones: Vec<ZoneDef>,
    pub goal: Point,
    /// Used by a zone-driven shot when the robot is outside every zone.
    pub default_shot: LaunchSetpoint,
    /// Operator full-power override.
    pub full_power_shot: LaunchSetpoint,
    pub aim: AimConfig,
    pub intake_speed: f64,
    pub start_pose: Pose,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self::for_alliance(Alliance::Blue)
    }
}

impl RobotConfig {
    pub fn for_alliance(alliance: Alliance) -> Self {
        let goal = alliance.mirror_point(Point::new(12.5, 134.5));
        let front = Triangle::new(
            Point::new(15.5, 127.5),
            Point::new(72.0, 72.0),
            Point::new(128.5, 127.5),
        )
        .map(|p| alliance.mirror_point(p));
        let back = Triangle::new(Point::new(51.0, 1.5), Point::new(72.0, 23.0), Point::new(93.0, 1.5))
            .map(|p| alliance.mirror_point(p));

        let launcher = LauncherConfig::default();

        Self {
            alliance,
            dt: Duration::from_millis(20),
            drive: MecanumKinematics::default(),
            navigation: NavigationConfig::default(),
            launcher,
            gate: GateSetpoints::default(),
            zones: vec![
                ZoneDef {
                    name: FRONT_ZONE.into(),
                    triangle: front,
                    tier: ShotTier {
                        power_scale: 0.5,
                        // 152.4 cm, measured against an inch pose
                        reference: ReferenceDistance::Fixed(cm(152.4)),
                    },
                },
                ZoneDef {
                    name: BACK_ZONE.into(),
                    triangle: back,
                    tier: ShotTier {
                        power_scale: 1.0,
                        reference: ReferenceDistance::FromPoint(back.far_vertex(&goal)),
                    },
                },
            ],
            goal,
            default_shot: LaunchSetpoint {
                target_rpm: 5100.0,
                power: 0.85,
            },
            full_power_shot: LaunchSetpoint::from_power(1.0, launcher.free_rpm),
            aim: AimConfig::default(),
            intake_speed: 1.0,
            start_pose: alliance.mirror_pose(Pose::with_heading(15.0, 111.0, PI / 2.0)),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dt.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        positive("navigation tolerance", self.navigation.tolerance)?;
        positive("rpm tolerance", self.launcher.rpm_tolerance)?;
        positive("free rpm", self.launcher.free_rpm)?;
        unit_speed("drive speed", self.navigation.drive_speed)?;
        unit_speed("slow speed", self.navigation.slow_speed)?;
        unit_speed("intake speed", self.intake_speed)?;
        if self.launcher.ticks_per_rev == 0.0 || !self.launcher.ticks_per_rev.is_finite() {
            return Err(ConfigError::ZeroTicksPerRevolution);
        }
        for zone in &self.zones {
            let t = &zone.triangle;
            if [t.a, t.b, t.c]
                .iter()
                .any(|p| !(p.x.is_finite() && p.y.is_finite()))
            {
                return Err(ConfigError::NonFiniteVertex(zone.name.clone()));
            }
        }
        Ok(())
    }

    pub fn describe(&self) -> String {
        format!(
            "{:?} alliance, goal ({:.1}, {:.1}), {} zone(s), dt {:?}",
            self.alliance,
            self.goal.x,
            self.goal.y,
            self.zones.len(),
            self.dt
        )
    }
}

fn positive(what: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { what, value })
    }
}

fn unit_speed(what: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::SpeedOutOfRange { what, value })
    }
}
