//! Pick dispatch for scene objects.
//!
//! A scene object opts into point picking through its [`PickMode`]. Objects
//! in point mode are resolved against their LOD index; everything else falls
//! back to a ray test against the object's bounding box.

use crate::error::ValidationError;
use crate::index::LodIndex;
use crate::intersect::RayIntersector;
use crate::ray::{HitResult, PickQuery, Ray};
use cloudlod_data::Bounds;

/// How a pickable object is intersected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickMode {
    /// Nearest retained point along the ray.
    Points,
    /// Entry point of the ray into the object's bounds.
    #[default]
    Bounds,
}

/// A pickable object: its LOD index plus the mode it is picked with.
#[derive(Debug, Clone, Copy)]
pub struct PickTarget<'a> {
    pub index: &'a LodIndex,
    pub mode: PickMode,
}

impl<'a> PickTarget<'a> {
    pub fn new(index: &'a LodIndex, mode: PickMode) -> Self {
        Self { index, mode }
    }

    pub fn points(index: &'a LodIndex) -> Self {
        Self::new(index, PickMode::Points)
    }

    /// Intersect the ray with this object according to its mode.
    pub fn pick(&self, ray: &Ray, query: &PickQuery) -> Result<HitResult, ValidationError> {
        match self.mode {
            PickMode::Points => RayIntersector::new(self.index).query(ray, query),
            PickMode::Bounds => {
                query.validate()?;
                if self.index.is_empty() {
                    return Err(ValidationError::EmptyIndex);
                }
                Ok(pick_bounds(&self.index.layout().bounds(), ray, query))
            }
        }
    }
}

fn pick_bounds(bounds: &Bounds, ray: &Ray, query: &PickQuery) -> HitResult {
    match bounds.ray_span(ray.origin(), ray.direction().recip()) {
        Some((t_enter, _)) if t_enter <= query.max_distance => HitResult {
            found: true,
            position: ray.at(t_enter),
            distance: t_enter,
            point_index: None,
        },
        Some((_, t_exit)) => HitResult::miss(ray, t_exit.min(query.max_distance)),
        None => HitResult::miss(ray, 0.0),
    }
}
