use alloc::{string::String, vec::Vec};

#[allow(unused_imports)]
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Point, Pos2Like},
    launcher::ShotTier,
};

pub const AREA_EPSILON: f64 = 1e-9;

/// Absolute area of the triangle `a b c` (shoelace).
pub fn triangle_area<A: Pos2Like, B: Pos2Like, C: Pos2Like>(a: &A, b: &B, c: &C) -> f64 {
    (a.x() * (b.y() - c.y()) + b.x() * (c.y() - a.y()) + c.x() * (a.y() - b.y())).abs() / 2.0
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Point,
    pub b: Point,
    pub c: Point,
}

impl Triangle {
    pub const fn new(a: Point, b: Point, c: Point) -> Self {
        Self { a, b, c }
    }

    pub fn area(&self) -> f64 {
        triangle_area(&self.a, &self.b, &self.c)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.area() >= AREA_EPSILON)
    }

    pub fn contains<P: Pos2Like>(&self, p: &P) -> bool {
        let whole = self.area();
        if !(whole >= AREA_EPSILON) {
            return false;
        }
        let parts = triangle_area(p, &self.b, &self.c)
            + triangle_area(&self.a, p, &self.c)
            + triangle_area(&self.a, &self.b, p);
        (parts - whole).abs() < AREA_EPSILON
    }

    /// Vertex farthest from `from`.
    pub fn far_vertex<P: Pos2Like>(&self, from: &P) -> Point {
        let mut best = self.a;
        for v in [self.b, self.c] {
            if from.distance_to(&v) > from.distance_to(&best) {
                best = v;
            }
        }
        best
    }

    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self::new(f(self.a), f(self.b), f(self.c))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneDef {
    pub name: String,
    pub triangle: Triangle,
    pub tier: ShotTier,
}

#[derive(Clone, Debug)]
pub struct Zone {
    pub def: ZoneDef,
    pub inside: bool,
}

/// Zones may overlap; each is classified on its own.
pub struct ZoneDetector {
    zones: Vec<Zone>,
}

impl ZoneDetector {
    pub fn new(defs: &[ZoneDef]) -> Self {
        Self {
            zones: defs
                .iter()
                .cloned()
                .map(|def| Zone {
                    def,
                    inside: false,
                })
                .collect(),
        }
    }

    pub fn classify<P: Pos2Like>(&mut self, point: &P) -> &[Zone] {
        for zone in self.zones.iter_mut() {
            zone.inside = zone.def.triangle.contains(point);
        }
        &self.zones
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// First zone containing the last classified point, with its index.
    pub fn first_match(&self) -> Option<(usize, &Zone)> {
        self.zones.iter().enumerate().find(|(_, z)| z.inside)
    }
}
