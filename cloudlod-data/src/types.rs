//! Core value types for colored point clouds.
//!
//! Everything here is double precision: the on-disk format stores doubles and
//! picking works in the same world units as the source data.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A colored point in 3D space.
///
/// Points have no identity beyond their position in a store and are never
/// mutated once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Position in world space.
    pub position: DVec3,
    /// RGB color (normalized, 0-1 range).
    pub color: DVec3,
    /// Alpha (normalized, 0-1 range).
    pub alpha: f64,
}

impl Point {
    /// Create a new point with position, color and alpha.
    pub fn new(position: DVec3, color: DVec3, alpha: f64) -> Self {
        Self {
            position,
            color,
            alpha,
        }
    }

    /// Create an opaque white point at the given position.
    pub fn white(position: DVec3) -> Self {
        Self {
            position,
            color: DVec3::ONE,
            alpha: 1.0,
        }
    }

    /// Color and alpha as a single `[r, g, b, a]` array.
    pub fn rgba(&self) -> [f64; 4] {
        [self.color.x, self.color.y, self.color.z, self.alpha]
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::white(DVec3::ZERO)
    }
}

/// Axis-aligned bounding box.
///
/// A freshly created box is empty (min = +inf, max = -inf) and grows as
/// points are added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: DVec3,
    pub max: DVec3,
}

impl Bounds {
    /// Create an empty box.
    pub fn new() -> Self {
        Self {
            min: DVec3::splat(f64::INFINITY),
            max: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    /// Create a box from explicit corners.
    pub fn from_corners(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Create the tightest box around a set of positions.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a DVec3>) -> Self {
        let mut bounds = Self::new();
        for p in positions {
            bounds.update(*p);
        }
        bounds
    }

    /// Grow the box to include a position.
    pub fn update(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Union of two boxes.
    pub fn merge(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// True until at least one position has been added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// World space dimensions, zero for an empty box.
    pub fn extent(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn diagonal(&self) -> f64 {
        self.extent().length()
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Slab test of a ray against the box.
    ///
    /// `inv_dir` is the component-wise reciprocal of the ray direction.
    /// Returns the entry and exit parameters clipped to `t >= 0`, or `None`
    /// if the ray misses.
    pub fn ray_span(&self, origin: DVec3, inv_dir: DVec3) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let mut t_enter = 0.0f64;
        let mut t_exit = f64::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let inv = inv_dir[axis];
            if inv.is_infinite() {
                // Parallel to this slab: inside or miss.
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t0 = (self.min[axis] - o) * inv;
            let t1 = (self.max[axis] - o) * inv;
            let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            t_enter = t_enter.max(near);
            t_exit = t_exit.min(far);
            if t_enter > t_exit {
                return None;
            }
        }
        Some((t_enter, t_exit))
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}
