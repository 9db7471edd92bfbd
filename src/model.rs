use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Vec3 {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) z: f64,
}

impl Vec3 {
    pub(crate) const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub(crate) fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Static per-body parameters. Built once at start-up and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct CelestialBody {
    pub(crate) name: String,
    pub(crate) semi_major_axis: f64,
    pub(crate) semi_minor_axis: f64,
    pub(crate) display_size: f64,
    /// Radians of phase per frame.
    pub(crate) angular_speed: f64,
    /// Display attribute; only the renderer interprets it.
    pub(crate) color: String,
}

impl CelestialBody {
    pub(crate) fn new(
        name: &str,
        semi_major_axis: f64,
        semi_minor_axis: f64,
        display_size: f64,
        angular_speed: f64,
        color: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            semi_major_axis,
            semi_minor_axis,
            display_size,
            angular_speed,
            color: color.to_string(),
        }
    }
}

/// Per-frame sample of one body. Recomputed every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub(crate) struct OrbitState {
    pub(crate) phase: f64,
    pub(crate) position: Vec3,
}

/// Bounded FIFO of recent positions, oldest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TrailBuffer {
    points: VecDeque<Vec3>,
}

impl TrailBuffer {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(cap),
        }
    }

    /// Appends `p` and evicts from the front until `len <= max_len`.
    pub(crate) fn push(&mut self, p: Vec3, max_len: usize) {
        self.points.push_back(p);
        while self.points.len() > max_len {
            self.points.pop_front();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
    }
    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }
    pub(crate) fn iter(&self) -> impl ExactSizeIterator<Item = &Vec3> + '_ {
        self.points.iter()
    }
    pub(crate) fn to_vec(&self) -> Vec<Vec3> {
        self.iter().copied().collect()
    }
}

// a, b, marker size, phase per frame, color
pub(crate) fn default_bodies() -> Vec<CelestialBody> {
    vec![
        CelestialBody::new("Mercury", 0.4, 0.38, 80.0, 0.04, "grey"),
        CelestialBody::new("Venus", 0.7, 0.69, 100.0, 0.03, "orange"),
        CelestialBody::new("Earth", 1.0, 0.99, 120.0, 0.02, "blue"),
        CelestialBody::new("Mars", 1.5, 1.48, 90.0, 0.015, "red"),
        CelestialBody::new("Jupiter", 2.2, 2.15, 200.0, 0.01, "brown"),
        CelestialBody::new("Saturn", 2.8, 2.7, 180.0, 0.008, "gold"),
        CelestialBody::new("Uranus", 3.4, 3.35, 160.0, 0.006, "lightblue"),
        CelestialBody::new("Neptune", 4.0, 3.95, 160.0, 0.005, "darkblue"),
    ]
}

pub(crate) const SUN_DISPLAY_SIZE: f64 = 400.0;
