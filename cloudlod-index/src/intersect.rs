//! Nearest-along-ray point picking over an LOD index.

use crate::error::ValidationError;
use crate::grid::GridLayout;
use crate::index::{CellEntry, GridCell, LodIndex};
use crate::ray::{HitResult, PickQuery, Ray};
use cloudlod_data::Bounds;
use glam::{DVec3, IVec3};
use ordered_float::OrderedFloat;
use std::collections::HashSet;
use tracing::debug;

/// Cells crossed by a ray, in near-to-far order.
///
/// Yields each cell with the ray parameter at which the ray enters it.
#[derive(Debug, Clone)]
pub struct GridWalk {
    dims: IVec3,
    cell: IVec3,
    step: IVec3,
    t_max: DVec3,
    t_delta: DVec3,
    t_enter: f64,
    t_end: f64,
    remaining: usize,
    done: bool,
}

impl GridWalk {
    /// Start walking `layout` along `ray`, stopping past parameter `limit`.
    pub fn new(layout: &GridLayout, ray: &Ray, limit: f64) -> Self {
        let origin = ray.origin();
        let dir = ray.direction();
        let span = layout.bounds().ray_span(origin, dir.recip());

        let Some((t_start, t_exit)) = span.filter(|(t0, _)| *t0 <= limit) else {
            return Self {
                dims: layout.dims,
                cell: IVec3::ZERO,
                step: IVec3::ZERO,
                t_max: DVec3::INFINITY,
                t_delta: DVec3::INFINITY,
                t_enter: 0.0,
                t_end: 0.0,
                remaining: 0,
                done: true,
            };
        };

        let cell = layout.cell_of(ray.at(t_start));
        let mut step = IVec3::ZERO;
        let mut t_max = DVec3::INFINITY;
        let mut t_delta = DVec3::INFINITY;
        for axis in 0..3 {
            let d = dir[axis];
            if d > 0.0 {
                step[axis] = 1;
                let boundary = layout.origin[axis] + (cell[axis] + 1) as f64 * layout.cell_size;
                t_max[axis] = (boundary - origin[axis]) / d;
                t_delta[axis] = layout.cell_size / d;
            } else if d < 0.0 {
                step[axis] = -1;
                let boundary = layout.origin[axis] + cell[axis] as f64 * layout.cell_size;
                t_max[axis] = (boundary - origin[axis]) / d;
                t_delta[axis] = -layout.cell_size / d;
            }
        }

        Self {
            dims: layout.dims,
            cell,
            step,
            t_max,
            t_delta,
            t_enter: t_start,
            t_end: t_exit.min(limit),
            // A straight walk can never cross more cells than this.
            remaining: (layout.dims.x + layout.dims.y + layout.dims.z) as usize + 1,
            done: false,
        }
    }
}

impl Iterator for GridWalk {
    type Item = (IVec3, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = (self.cell, self.t_enter);

        let axis = if self.t_max.x <= self.t_max.y && self.t_max.x <= self.t_max.z {
            0
        } else if self.t_max.y <= self.t_max.z {
            1
        } else {
            2
        };
        let t_next = self.t_max[axis];
        if !t_next.is_finite() || t_next > self.t_end {
            self.done = true;
        } else {
            self.cell[axis] += self.step[axis];
            self.t_enter = t_next;
            self.t_max[axis] += self.t_delta[axis];
            if self.cell[axis] < 0 || self.cell[axis] >= self.dims[axis] {
                self.done = true;
            }
        }
        Some(current)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    t: f64,
    perpendicular: f64,
    entry: CellEntry,
}

impl Candidate {
    fn key(&self) -> (OrderedFloat<f64>, OrderedFloat<f64>, usize) {
        (
            OrderedFloat(self.t),
            OrderedFloat(self.perpendicular),
            self.entry.index,
        )
    }
}

/// Answers pick queries against a built index.
///
/// Holds only a shared borrow, so any number of intersectors may query the
/// same index at once.
#[derive(Debug, Clone, Copy)]
pub struct RayIntersector<'a> {
    index: &'a LodIndex,
}

impl<'a> RayIntersector<'a> {
    pub fn new(index: &'a LodIndex) -> Self {
        Self { index }
    }

    /// Find the retained point closest to the ray origin along the ray that
    /// lies within `pick_radius` of the ray and no farther than
    /// `max_distance` along it.
    ///
    /// Cells are visited near to far together with the neighbors a pick
    /// radius can reach. The walk stops once no later cell can hold a point
    /// with a smaller ray parameter than the best candidate. When the
    /// neighborhood would cover at least as many cells as the index holds,
    /// every occupied cell is scanned once instead.
    pub fn query(&self, ray: &Ray, query: &PickQuery) -> Result<HitResult, ValidationError> {
        query.validate()?;
        if self.index.is_empty() {
            return Err(ValidationError::EmptyIndex);
        }

        let (best, scanned) = self.search(ray, query);
        debug!("Pick scanned {} cells", scanned);

        let layout = self.index.layout();
        Ok(match best {
            Some(c) => HitResult::hit(c.entry.position, c.t, c.entry.index),
            None => {
                let exit = layout
                    .bounds()
                    .ray_span(ray.origin(), ray.direction().recip())
                    .map_or(0.0, |(_, t_exit)| t_exit);
                HitResult::miss(ray, exit.min(query.max_distance))
            }
        })
    }

    /// Best candidate and the number of cells inspected.
    fn search(&self, ray: &Ray, query: &PickQuery) -> (Option<Candidate>, usize) {
        let layout = self.index.layout();
        let ring = neighbor_ring(layout, query.pick_radius);
        let span = IVec3::splat(2 * ring + 1).min(layout.dims);
        let neighborhood = span.as_dvec3().element_product();

        let mut best: Option<Candidate> = None;
        if neighborhood >= self.index.cells().len() as f64 {
            for cell in self.index.cells() {
                self.scan_cell(cell, ray, query, &mut best);
            }
            return (best, self.index.cells().len());
        }

        let reach = (ring as f64 + 1.0) * layout.cell_size * 3f64.sqrt();
        // Walk a grid grown by the neighborhood so rays passing just outside
        // the cloud still reach points within the pick radius.
        let walk_layout = layout.padded(ring);
        let shift = IVec3::splat(ring);
        let last = layout.dims - IVec3::ONE;
        let mut visited: HashSet<usize> = HashSet::new();

        for (walk_cell, t_enter) in GridWalk::new(&walk_layout, ray, query.max_distance) {
            if let Some(found) = &best {
                if t_enter - reach > found.t {
                    break;
                }
            }
            let center = walk_cell - shift;
            let lo = (center - shift).max(IVec3::ZERO);
            let hi = (center + shift).min(last);

            for z in lo.z..=hi.z {
                for y in lo.y..=hi.y {
                    for x in lo.x..=hi.x {
                        let coord = IVec3::new(x, y, z);
                        if !visited.insert(layout.linear(coord)) {
                            continue;
                        }
                        if let Some(cell) = self.index.cell_at(coord) {
                            self.scan_cell(cell, ray, query, &mut best);
                        }
                    }
                }
            }
        }
        (best, visited.len())
    }

    fn scan_cell(
        &self,
        cell: &GridCell,
        ray: &Ray,
        query: &PickQuery,
        best: &mut Option<Candidate>,
    ) {
        let pad = DVec3::splat(query.pick_radius);
        let retained = cell.retained_bounds;
        let padded = Bounds::from_corners(retained.min - pad, retained.max + pad);
        if padded.ray_span(ray.origin(), ray.direction().recip()).is_none() {
            return;
        }

        for entry in &cell.entries {
            let (t, perpendicular) = ray.closest_approach(entry.position);
            if t < 0.0 || t > query.max_distance || perpendicular > query.pick_radius {
                continue;
            }
            let candidate = Candidate {
                t,
                perpendicular,
                entry: *entry,
            };
            if best.is_none_or(|b| candidate.key() < b.key()) {
                *best = Some(candidate);
            }
        }
    }
}

/// Cells a pick radius can reach on each side, capped at the grid size.
fn neighbor_ring(layout: &GridLayout, pick_radius: f64) -> i32 {
    let cap = layout.dims.max_element();
    let ring = (pick_radius / layout.cell_size).ceil();
    if ring >= cap as f64 { cap } else { ring as i32 }
}
