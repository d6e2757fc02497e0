//! Summary statistics over a loaded point cloud.

use crate::record::{RECORD_SIZE, decode_record};
use crate::store::PointStore;
use crate::types::{Bounds, Point};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Records per parallel work unit.
const STATS_CHUNK_POINTS: usize = 25_000;

/// Point count, spatial bounds and per-channel color ranges of a cloud.
///
/// The bounds and color ranges of an empty cloud are left out of the JSON
/// form and restored to their empty values when read back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudStats {
    pub num_points: usize,
    #[serde(default, skip_serializing_if = "Bounds::is_empty")]
    pub bounds: Bounds,
    /// Per-channel minimum of `[r, g, b, a]`.
    #[serde(default = "empty_min", skip_serializing_if = "is_unset")]
    pub rgba_min: [f64; 4],
    /// Per-channel maximum of `[r, g, b, a]`.
    #[serde(default = "empty_max", skip_serializing_if = "is_unset")]
    pub rgba_max: [f64; 4],
}

fn empty_min() -> [f64; 4] {
    [f64::INFINITY; 4]
}

fn empty_max() -> [f64; 4] {
    [f64::NEG_INFINITY; 4]
}

fn is_unset(channels: &[f64; 4]) -> bool {
    channels.iter().any(|c| !c.is_finite())
}

impl CloudStats {
    /// Statistics of an empty cloud.
    pub fn new() -> Self {
        Self {
            num_points: 0,
            bounds: Bounds::new(),
            rgba_min: empty_min(),
            rgba_max: empty_max(),
        }
    }

    /// Compute statistics for every point of a store in parallel chunks.
    pub fn from_store(store: &PointStore) -> Self {
        store
            .as_bytes()
            .par_chunks(RECORD_SIZE * STATS_CHUNK_POINTS)
            .map(|chunk| {
                let mut local = CloudStats::new();
                for record in chunk.chunks_exact(RECORD_SIZE) {
                    local.update(&decode_record(record));
                }
                local
            })
            .reduce_with(|a, b| a.merge(&b))
            .unwrap_or_else(CloudStats::new)
    }

    /// Account for one more point.
    pub fn update(&mut self, point: &Point) {
        self.num_points += 1;
        self.bounds.update(point.position);
        for (channel, value) in point.rgba().into_iter().enumerate() {
            self.rgba_min[channel] = self.rgba_min[channel].min(value);
            self.rgba_max[channel] = self.rgba_max[channel].max(value);
        }
    }

    /// Combine statistics of two disjoint point sets.
    pub fn merge(&self, other: &CloudStats) -> CloudStats {
        let mut merged = *self;
        merged.num_points += other.num_points;
        merged.bounds = self.bounds.merge(&other.bounds);
        for channel in 0..4 {
            merged.rgba_min[channel] = self.rgba_min[channel].min(other.rgba_min[channel]);
            merged.rgba_max[channel] = self.rgba_max[channel].max(other.rgba_max[channel]);
        }
        merged
    }

    /// Render as a JSON summary.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for CloudStats {
    fn default() -> Self {
        Self::new()
    }
}
