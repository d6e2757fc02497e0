//! LOD index construction.
//!
//! The index partitions space into a uniform grid and keeps, per cell, the
//! points that survive the decimation stride of their distance bucket. A
//! point is kept when its sequential position among all points of its cell
//! (in store order) is a multiple of its stride, so the same inputs always
//! produce the same index.

use crate::error::ConfigError;
use crate::grid::GridLayout;
use crate::lod::{BucketTable, LodSpec};
use cloudlod_data::{Bounds, PointStore};
use glam::{DVec3, IVec3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Cell count used when the capacity hint is zero.
pub const DEFAULT_CELL_COUNT: usize = 4096;

/// Positions per parallel work unit when computing bounds.
const BOUNDS_CHUNK_POINTS: usize = 25_000;

/// Build-time settings for an LOD index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexConfig {
    /// Point that bucket distances are measured from.
    pub reference: DVec3,
    /// Cell count to aim for when the LOD options give no capacity.
    pub default_cell_count: usize,
}

impl IndexConfig {
    pub fn with_reference(mut self, reference: DVec3) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_default_cell_count(mut self, count: usize) -> Self {
        self.default_cell_count = count;
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            reference: DVec3::ZERO,
            default_cell_count: DEFAULT_CELL_COUNT,
        }
    }
}

/// A retained point: its store index and a copy of its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellEntry {
    pub index: usize,
    pub position: DVec3,
}

/// One non-empty grid cell.
#[derive(Debug, Clone)]
pub struct GridCell {
    pub coord: IVec3,
    /// Spatial extent of the cell.
    pub bounds: Bounds,
    /// Tight box around the retained points, used for ray rejection.
    pub retained_bounds: Bounds,
    /// Number of store points that fell in this cell before decimation.
    pub point_count: usize,
    pub entries: Vec<CellEntry>,
}

impl GridCell {
    fn new(coord: IVec3, bounds: Bounds) -> Self {
        Self {
            coord,
            bounds,
            retained_bounds: Bounds::new(),
            point_count: 0,
            entries: Vec::new(),
        }
    }
}

/// Immutable grid of decimated point subsets.
#[derive(Debug, Clone)]
pub struct LodIndex {
    layout: GridLayout,
    spec: LodSpec,
    reference: DVec3,
    source_len: usize,
    cells: Vec<GridCell>,
    /// Linear cell id -> position in `cells`.
    slots: Vec<Option<u32>>,
}

impl LodIndex {
    /// Build an index over every point of `store`.
    ///
    /// Fails only when the bucket list contains overlapping ranges. An empty
    /// store yields an index with zero cells.
    #[tracing::instrument(skip_all, fields(points = store.len()))]
    pub fn build(
        store: &PointStore,
        spec: &LodSpec,
        config: &IndexConfig,
    ) -> Result<Self, ConfigError> {
        let table = BucketTable::new(spec)?;
        let positions: Vec<DVec3> = store.iter().map(|p| p.position).collect();

        if positions.is_empty() {
            debug!("Empty store, building index with no cells");
            return Ok(Self {
                layout: GridLayout::fit(&Bounds::new(), 1),
                spec: spec.clone(),
                reference: config.reference,
                source_len: 0,
                cells: Vec::new(),
                slots: Vec::new(),
            });
        }

        let bounds = positions
            .par_chunks(BOUNDS_CHUNK_POINTS)
            .map(|chunk| Bounds::from_positions(chunk))
            .reduce_with(|a, b| a.merge(&b))
            .unwrap_or_default();

        let target_cells = if spec.capacity == 0 {
            config.default_cell_count
        } else {
            spec.capacity
        };
        if target_cells > crate::grid::MAX_CELLS {
            warn!(
                "Capacity hint {} exceeds the grid limit, clamping to {} cells",
                target_cells,
                crate::grid::MAX_CELLS
            );
        }
        let layout = GridLayout::fit(&bounds, target_cells);
        debug!(
            "Grid {:?} cells of size {:.4} over {:?}",
            layout.dims, layout.cell_size, bounds
        );

        // Cell and stride per point are independent of each other.
        let reference = config.reference;
        let classified: Vec<(usize, u32)> = positions
            .par_iter()
            .map(|p| {
                let cell = layout.linear(layout.cell_of(*p));
                (cell, table.stride_at(p.distance(reference)))
            })
            .collect();

        // Keep decisions depend on store order within a cell.
        let mut slots: Vec<Option<u32>> = vec![None; layout.cell_count()];
        let mut cells: Vec<GridCell> = Vec::new();
        for (index, (&(linear, stride), position)) in
            classified.iter().zip(positions.iter()).enumerate()
        {
            let slot = match slots[linear] {
                Some(slot) => slot as usize,
                None => {
                    let coord = layout.cell_of(*position);
                    cells.push(GridCell::new(coord, layout.cell_bounds(coord)));
                    let slot = cells.len() - 1;
                    slots[linear] = Some(slot as u32);
                    slot
                }
            };

            let cell = &mut cells[slot];
            let sequence = cell.point_count;
            cell.point_count += 1;
            if sequence % stride as usize == 0 {
                cell.retained_bounds.update(*position);
                cell.entries.push(CellEntry {
                    index,
                    position: *position,
                });
            }
        }

        let index = Self {
            layout,
            spec: spec.clone(),
            reference,
            source_len: positions.len(),
            cells,
            slots,
        };
        info!(
            "Built LOD index: {} of {} points retained in {} cells",
            index.retained_count(),
            index.source_len,
            index.cells.len()
        );
        Ok(index)
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn spec(&self) -> &LodSpec {
        &self.spec
    }

    pub fn reference(&self) -> DVec3 {
        self.reference
    }

    /// Number of points in the store the index was built from.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Non-empty cells, in order of first appearance in the store.
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cell at grid coordinate `coord`, if it holds any points.
    pub fn cell_at(&self, coord: IVec3) -> Option<&GridCell> {
        if self.cells.is_empty() || !self.layout.in_range(coord) {
            return None;
        }
        self.slots[self.layout.linear(coord)].map(|slot| &self.cells[slot as usize])
    }

    /// Total retained points over all cells.
    pub fn retained_count(&self) -> usize {
        self.cells.iter().map(|c| c.entries.len()).sum()
    }

    /// Store indices of every retained point, sorted.
    pub fn active_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .cells
            .iter()
            .flat_map(|c| c.entries.iter().map(|e| e.index))
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Store indices of retained points inside `region`, sorted.
    ///
    /// Only the cells overlapping the region are visited.
    pub fn active_in(&self, region: &Bounds) -> Vec<usize> {
        if self.cells.is_empty() || region.is_empty() {
            return Vec::new();
        }
        let lo = self.layout.cell_of(region.min);
        let hi = self.layout.cell_of(region.max);

        let mut indices = Vec::new();
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let Some(cell) = self.cell_at(IVec3::new(x, y, z)) else {
                        continue;
                    };
                    indices.extend(
                        cell.entries
                            .iter()
                            .filter(|e| region.contains(e.position))
                            .map(|e| e.index),
                    );
                }
            }
        }
        indices.sort_unstable();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::LodBucket;
    use cloudlod_data::Point;

    /// A jittered lattice of `n^3` points spanning `[0, size]`.
    fn lattice(n: usize, size: f64) -> PointStore {
        let step = size / (n.max(2) - 1) as f64;
        let mut points = Vec::with_capacity(n * n * n);
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    let jitter = ((x * 7 + y * 13 + z * 3) % 5) as f64 * 0.01;
                    points.push(Point::white(DVec3::new(
                        x as f64 * step + jitter,
                        y as f64 * step,
                        z as f64 * step - jitter,
                    )));
                }
            }
        }
        PointStore::from_points(&points)
    }

    #[test]
    fn test_no_decimation_keeps_everything() {
        let store = lattice(10, 50.0);
        let index = LodIndex::build(&store, &LodSpec::full_detail(64), &IndexConfig::default()).unwrap();
        assert_eq!(index.retained_count(), store.len());
        assert_eq!(index.active_indices(), (0..store.len()).collect::<Vec<_>>());
        let total: usize = index.cells().iter().map(|c| c.point_count).sum();
        assert_eq!(total, store.len());
    }

    #[test]
    fn test_single_bucket_retains_ceil_per_cell() {
        let store = lattice(12, 30.0);
        let spec = LodSpec::full_detail(27).with_bucket(LodBucket::new(0.0, f64::INFINITY, 4));
        let index = LodIndex::build(&store, &spec, &IndexConfig::default()).unwrap();
        for cell in index.cells() {
            assert_eq!(cell.entries.len(), cell.point_count.div_ceil(4));
        }
        assert!(index.retained_count() < store.len());
    }

    #[test]
    fn test_build_is_deterministic() {
        let store = lattice(8, 20.0);
        let spec = LodSpec::parse("100 10:1000:6 0:10:2").unwrap();
        let config = IndexConfig::default().with_reference(DVec3::new(5.0, 5.0, 5.0));
        let a = LodIndex::build(&store, &spec, &config).unwrap();
        let b = LodIndex::build(&store, &spec, &config).unwrap();
        assert_eq!(a.active_indices(), b.active_indices());
        assert_eq!(a.cells().len(), b.cells().len());
    }

    #[test]
    fn test_distance_buckets_change_density() {
        // Two clusters, one near the origin and one far from it.
        let mut points = Vec::new();
        for i in 0..100 {
            let f = i as f64 * 0.01;
            points.push(Point::white(DVec3::new(f, 0.0, 0.0)));
            points.push(Point::white(DVec3::new(100.0 + f, 0.0, 0.0)));
        }
        let store = PointStore::from_points(&points);
        let spec = LodSpec::parse("8 50:inf:10").unwrap();
        let index = LodIndex::build(&store, &spec, &IndexConfig::default()).unwrap();

        let near = index.active_in(&Bounds::from_corners(DVec3::splat(-1.0), DVec3::new(2.0, 1.0, 1.0)));
        let far = index.active_in(&Bounds::from_corners(DVec3::new(99.0, -1.0, -1.0), DVec3::new(102.0, 1.0, 1.0)));
        assert_eq!(near.len(), 100);
        assert!(far.len() < 100);
        assert!(far.len() >= 10);
    }

    #[test]
    fn test_empty_store() {
        let index = LodIndex::build(&PointStore::default(), &LodSpec::full_detail(10), &IndexConfig::default()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.retained_count(), 0);
        assert!(index.cell_at(IVec3::ZERO).is_none());
        assert!(index.active_in(&Bounds::from_corners(DVec3::ZERO, DVec3::ONE)).is_empty());
    }

    #[test]
    fn test_zero_capacity_uses_default_cells() {
        let store = lattice(6, 10.0);
        let config = IndexConfig::default().with_default_cell_count(8);
        let index = LodIndex::build(&store, &LodSpec::full_detail(0), &config).unwrap();
        assert!(index.layout().cell_count() <= 27);
        assert_eq!(index.retained_count(), store.len());
    }

    #[test]
    fn test_overlapping_buckets_rejected() {
        let store = lattice(3, 1.0);
        let spec = LodSpec::parse("10 0:10:2 5:20:2").unwrap();
        assert!(LodIndex::build(&store, &spec, &IndexConfig::default()).is_err());
    }

    #[test]
    fn test_cells_contain_their_points() {
        let store = lattice(7, 14.0);
        let index = LodIndex::build(&store, &LodSpec::full_detail(50), &IndexConfig::default()).unwrap();
        for cell in index.cells() {
            assert_eq!(index.cell_at(cell.coord).unwrap().coord, cell.coord);
            for entry in &cell.entries {
                assert_eq!(index.layout().cell_of(entry.position), cell.coord);
                assert_eq!(store.get(entry.index).unwrap().position, entry.position);
            }
        }
    }

    #[test]
    fn test_build_over_extreme_coordinates() {
        let points = [
            Point::white(DVec3::splat(-1e308)),
            Point::white(DVec3::splat(1e308)),
        ];
        let store = PointStore::from_points(&points);
        let spec = LodSpec::parse("10000").unwrap();
        let index = LodIndex::build(&store, &spec, &IndexConfig::default()).unwrap();
        assert!(index.layout().cell_count() <= crate::grid::MAX_CELLS);
        assert_eq!(index.retained_count(), 2);
        assert_eq!(index.cells().len(), 2);
    }
}
