//! Dead reckoning from two unpowered tracking wheels and an IMU heading.

use core::f64::consts::PI;

#[allow(unused_imports)]
use num_traits::Float;

use crate::geometry::{Pose, normalize_angle};

#[derive(Debug, Clone, Copy)]
pub struct TrackingWheelConfig {
    pub parallel_offset: f64,
    pub perpendicular_offset: f64,
    pub wheel_diameter: f64,
}

pub struct Odometry {
    pose: Pose,
    heading_offset: f64,
    prev_parallel_revs: Option<f64>,
    prev_perpendicular_revs: Option<f64>,
    tracking_wheels: TrackingWheelConfig,
}

impl Odometry {
    pub fn new(initial_pose: Pose, tracking_wheels: TrackingWheelConfig) -> Self {
        Self {
            pose: initial_pose,
            heading_offset: 0.0,
            prev_parallel_revs: None,
            prev_perpendicular_revs: None,
            tracking_wheels,
        }
    }

    /// Integrates one sample. `imu_heading_rad` is the raw IMU reading, CCW positive.
    pub fn update(&mut self, parallel_revs: f64, perpendicular_revs: f64, imu_heading_rad: f64) {
        let tw = &self.tracking_wheels;
        let p = parallel_revs;
        let q = perpendicular_revs;

        let dp = (p - self.prev_parallel_revs.unwrap_or(p)) * tw.wheel_diameter * PI;
        let ds = (q - self.prev_perpendicular_revs.unwrap_or(q)) * tw.wheel_diameter * PI;

        self.prev_parallel_revs = Some(p);
        self.prev_perpendicular_revs = Some(q);

        let theta = normalize_angle(imu_heading_rad + self.heading_offset);
        let dtheta = normalize_angle(theta - self.pose.heading);
        // compensate rotation-induced wheel travel
        let dx_robot = dp - dtheta * tw.perpendicular_offset;
        let dy_robot = ds + dtheta * tw.parallel_offset;

        // integrate at the mid-step heading
        let mid = self.pose.heading + dtheta / 2.0;
        let (sin, cos) = mid.sin_cos();
        self.pose.x += dx_robot * cos - dy_robot * sin;
        self.pose.y += dx_robot * sin + dy_robot * cos;
        self.pose.heading = theta;
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// `imu_heading_rad` is the IMU reading at `pose`.
    pub fn reset(&mut self, pose: Pose, imu_heading_rad: f64) {
        self.pose = pose;
        self.heading_offset = pose.heading - imu_heading_rad;
        self.prev_parallel_revs = None;
        self.prev_perpendicular_revs = None;
    }
}
