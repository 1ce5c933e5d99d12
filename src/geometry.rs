use core::f64::consts::{PI, TAU};

#[allow(unused_imports)]
use num_traits::Float;
use serde::{Deserialize, Serialize};

pub trait Pos2Like {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
    fn distance_to<P: Pos2Like>(&self, other: &P) -> f64 {
        (other.x() - self.x()).hypot(other.y() - self.y())
    }
    /// Field heading (radians, CCW from +x) pointing from `self` toward `other`.
    fn heading_to<P: Pos2Like>(&self, other: &P) -> f64 {
        (other.y() - self.y()).atan2(other.x() - self.x())
    }
}

#[derive(Default, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Pos2Like for Point {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
}

/// Inches, heading in radians CCW from +x.
#[derive(Default, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, heading: 0.0 }
    }
    pub const fn with_heading(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }
    pub fn with_heading_degrees(x: f64, y: f64, heading_deg: f64) -> Self {
        Self::with_heading(x, y, heading_deg.to_radians())
    }
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
    /// Signed shortest rotation (radians) from this pose's heading to `target`.
    pub fn heading_error(&self, target: f64) -> f64 {
        normalize_angle(target - self.heading)
    }
}

impl Pos2Like for Pose {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
}

/// Wraps an angle into (-PI, PI]. Non-finite input maps to zero.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = angle;
    if a.abs() > 4.0 * TAU {
        a -= (a / TAU).trunc() * TAU;
    }
    while a > PI {
        a -= TAU;
    }
    while a <= -PI {
        a += TAU;
    }
    a
}

/// Field-frame vector as `(forward, left)` for a robot facing `heading`.
pub fn field_to_robot(dx: f64, dy: f64, heading: f64) -> (f64, f64) {
    let (sin, cos) = heading.sin_cos();
    (dx * cos + dy * sin, -dx * sin + dy * cos)
}

pub fn robot_to_field(forward: f64, left: f64, heading: f64) -> (f64, f64) {
    let (sin, cos) = heading.sin_cos();
    (forward * cos - left * sin, forward * sin + left * cos)
}
