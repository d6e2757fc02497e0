//! Ray and pick query value types.

use crate::error::ValidationError;
use glam::DVec3;

/// Pick radius used when a query does not set one.
pub const DEFAULT_PICK_RADIUS: f64 = 0.1;

/// A ray with a unit-length direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: DVec3,
    direction: DVec3,
}

impl Ray {
    /// Create a ray, normalizing `direction`.
    pub fn new(origin: DVec3, direction: DVec3) -> Result<Self, ValidationError> {
        if !origin.is_finite() || !direction.is_finite() {
            return Err(ValidationError::NonFinite);
        }
        let direction = direction
            .try_normalize()
            .ok_or(ValidationError::ZeroDirection)?;
        Ok(Self { origin, direction })
    }

    /// Ray from `start` through `end`.
    pub fn through(start: DVec3, end: DVec3) -> Result<Self, ValidationError> {
        Self::new(start, end - start)
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    /// Point at parameter `t` along the ray.
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Parameter of the closest point on the ray line to `p`, and the
    /// perpendicular distance from `p` to the line.
    pub fn closest_approach(&self, p: DVec3) -> (f64, f64) {
        let v = p - self.origin;
        let t = v.dot(self.direction);
        let perpendicular = (v - self.direction * t).length();
        (t, perpendicular)
    }
}

/// Limits of a pick query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickQuery {
    /// Largest accepted ray parameter. Infinite by default.
    pub max_distance: f64,
    /// Largest accepted perpendicular distance from the ray.
    pub pick_radius: f64,
}

impl PickQuery {
    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn with_pick_radius(mut self, pick_radius: f64) -> Self {
        self.pick_radius = pick_radius;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.pick_radius >= 0.0) || !self.pick_radius.is_finite() {
            return Err(ValidationError::BadRadius(self.pick_radius));
        }
        if !(self.max_distance >= 0.0) {
            return Err(ValidationError::BadDistance(self.max_distance));
        }
        Ok(())
    }
}

impl Default for PickQuery {
    fn default() -> Self {
        Self {
            max_distance: f64::INFINITY,
            pick_radius: DEFAULT_PICK_RADIUS,
        }
    }
}

/// Outcome of a pick query.
///
/// On a miss, `position` and `distance` describe the clamped extent of the
/// ray that was searched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub found: bool,
    pub position: DVec3,
    /// Ray parameter of the hit (or of the searched extent on a miss).
    pub distance: f64,
    /// Store index of the picked point.
    pub point_index: Option<usize>,
}

impl HitResult {
    pub fn hit(position: DVec3, distance: f64, point_index: usize) -> Self {
        Self {
            found: true,
            position,
            distance,
            point_index: Some(point_index),
        }
    }

    pub fn miss(ray: &Ray, extent: f64) -> Self {
        Self {
            found: false,
            position: ray.at(extent),
            distance: extent,
            point_index: None,
        }
    }
}
