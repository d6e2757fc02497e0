//! Uniform grid layout over a point cloud's bounding box.

use cloudlod_data::Bounds;
use glam::{DVec3, IVec3};

/// Upper bound on grid cells, whatever the capacity hint says.
pub const MAX_CELLS: usize = 1 << 22;

/// Cube cells of a fixed edge length covering a bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// Minimum corner of cell `(0, 0, 0)`.
    pub origin: DVec3,
    /// Edge length of every cell.
    pub cell_size: f64,
    /// Number of cells along each axis, all at least 1.
    pub dims: IVec3,
}

impl GridLayout {
    /// Pick a cell size so that about `target_cells` cells cover `bounds`.
    ///
    /// The edge is the bounding box diagonal divided by the cube root of the
    /// cell count. Flat or single-point boxes get one cell on each collapsed
    /// axis. The result never has more than [`MAX_CELLS`] cells.
    pub fn fit(bounds: &Bounds, target_cells: usize) -> Self {
        if bounds.is_empty() {
            return Self {
                origin: DVec3::ZERO,
                cell_size: 1.0,
                dims: IVec3::ONE,
            };
        }

        let target = target_cells.clamp(1, MAX_CELLS) as f64;
        // Half extents stay finite for any pair of finite corners.
        let half = bounds.max * 0.5 - bounds.min * 0.5;
        let edge = scaled_length(half) / target.cbrt() * 2.0;
        let mut cell_size = if edge == f64::INFINITY {
            f64::MAX
        } else if edge > 0.0 {
            edge
        } else {
            1.0
        };

        let mut dims = cells_spanning(half, cell_size);
        while dims.as_dvec3().element_product() > MAX_CELLS as f64 {
            cell_size *= 1.25;
            dims = cells_spanning(half, cell_size);
        }

        Self {
            origin: bounds.min,
            cell_size,
            dims,
        }
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
    }

    /// The box covered by all cells.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_corners(self.origin, self.origin + self.dims.as_dvec3() * self.cell_size)
    }

    /// Cell containing a position, clamped into the grid.
    pub fn cell_of(&self, p: DVec3) -> IVec3 {
        let rel = ((p - self.origin) / self.cell_size).floor();
        let max = (self.dims - IVec3::ONE).as_dvec3();
        rel.clamp(DVec3::ZERO, max).as_ivec3()
    }

    pub fn in_range(&self, cell: IVec3) -> bool {
        cell.cmpge(IVec3::ZERO).all() && cell.cmplt(self.dims).all()
    }

    /// Row-major linear id of an in-range cell.
    pub fn linear(&self, cell: IVec3) -> usize {
        let (x, y, z) = (cell.x as usize, cell.y as usize, cell.z as usize);
        (z * self.dims.y as usize + y) * self.dims.x as usize + x
    }

    /// The same grid grown by `cells` extra cells on every side.
    pub fn padded(&self, cells: i32) -> Self {
        Self {
            origin: self.origin - DVec3::splat(cells as f64 * self.cell_size),
            cell_size: self.cell_size,
            dims: self.dims + IVec3::splat(2 * cells),
        }
    }

    /// Spatial extent of a single cell.
    pub fn cell_bounds(&self, cell: IVec3) -> Bounds {
        let min = self.origin + cell.as_dvec3() * self.cell_size;
        Bounds::from_corners(min, min + DVec3::splat(self.cell_size))
    }
}

/// Length of `v` without overflowing on huge components.
fn scaled_length(v: DVec3) -> f64 {
    let scale = v.abs().max_element();
    if scale > 0.0 && scale.is_finite() {
        scale * (v / scale).length()
    } else {
        v.length()
    }
}

/// Cells of size `cell_size` needed to span twice `half` on each axis.
fn cells_spanning(half: DVec3, cell_size: f64) -> IVec3 {
    (half / cell_size * 2.0)
        .ceil()
        .clamp(DVec3::ONE, DVec3::splat(MAX_CELLS as f64))
        .as_ivec3()
        .max(IVec3::ONE)
}
