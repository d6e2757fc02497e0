//! Distance-bucketed level of detail specification.
//!
//! LOD options are a whitespace separated string: a capacity hint followed
//! by any number of `min:max:stride` buckets, e.g.
//! `"10000 100:1000000:20 20:100:10 6:20:5 0:5:5"`. Each bucket keeps one
//! point out of every `stride` for points whose distance from the reference
//! lies in `[min, max)`.

use crate::error::ConfigError;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A half-open distance interval with a decimation stride.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodBucket {
    pub min: f64,
    pub max: f64,
    pub stride: u32,
}

impl LodBucket {
    pub fn new(min: f64, max: f64, stride: u32) -> Self {
        Self { min, max, stride }
    }

    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.min && distance < self.max
    }

    fn parse(token: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = token.split(':').collect();
        let &[min, max, stride] = parts.as_slice() else {
            return Err(ConfigError::BadToken(token.to_string()));
        };

        let number = |value: &str| ConfigError::BadNumber {
            token: token.to_string(),
            value: value.to_string(),
        };
        let min: f64 = min.parse().map_err(|_| number(min))?;
        let max: f64 = max.parse().map_err(|_| number(max))?;
        let stride: u32 = stride.parse().map_err(|_| number(stride))?;

        if !(min >= 0.0) {
            return Err(ConfigError::NegativeMin(token.to_string()));
        }
        if !(max > min) {
            return Err(ConfigError::EmptyRange(token.to_string()));
        }
        if stride == 0 {
            return Err(ConfigError::ZeroStride(token.to_string()));
        }
        Ok(Self::new(min, max, stride))
    }
}

impl fmt::Display for LodBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.min, self.max, self.stride)
    }
}

/// Parsed LOD options: a capacity hint plus buckets in the order given.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LodSpec {
    /// Planned point budget, used to size the grid. Not a hard cap.
    pub capacity: usize,
    pub buckets: Vec<LodBucket>,
}

impl LodSpec {
    /// Options that keep every point.
    pub fn full_detail(capacity: usize) -> Self {
        Self {
            capacity,
            buckets: Vec::new(),
        }
    }

    pub fn with_bucket(mut self, bucket: LodBucket) -> Self {
        self.buckets.push(bucket);
        self
    }

    /// Parse an options string.
    ///
    /// Buckets are validated one at a time; the first bad token aborts the
    /// whole parse. Gaps and overlaps between buckets are not checked here.
    pub fn parse(options: &str) -> Result<Self, ConfigError> {
        let mut tokens = options.split_whitespace();
        let capacity_token = tokens.next().ok_or(ConfigError::MissingCapacity)?;
        let capacity = capacity_token
            .parse()
            .map_err(|_| ConfigError::BadCapacity(capacity_token.to_string()))?;

        let buckets = tokens.map(LodBucket::parse).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { capacity, buckets })
    }

    /// True when no bucket decimates anything.
    pub fn is_full_detail(&self) -> bool {
        self.buckets.iter().all(|b| b.stride == 1)
    }
}

impl FromStr for LodSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.capacity)?;
        for bucket in &self.buckets {
            write!(f, " {}", bucket)?;
        }
        Ok(())
    }
}

/// Buckets sorted by distance for stride lookup.
///
/// Distances not covered by any bucket get stride 1, except distances past
/// the farthest bucket which extend that bucket to infinity.
#[derive(Debug, Clone, Default)]
pub struct BucketTable {
    buckets: Vec<LodBucket>,
}

impl BucketTable {
    /// Sort the buckets of `spec` and reject overlapping ranges.
    pub fn new(spec: &LodSpec) -> Result<Self, ConfigError> {
        let mut buckets = spec.buckets.clone();
        buckets.sort_by_key(|b| OrderedFloat(b.min));

        for pair in buckets.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.min < a.max {
                return Err(ConfigError::Overlap {
                    first_min: a.min,
                    first_max: a.max,
                    second_min: b.min,
                    second_max: b.max,
                });
            }
        }
        Ok(Self { buckets })
    }

    /// Decimation stride for a point at `distance` from the reference.
    pub fn stride_at(&self, distance: f64) -> u32 {
        let idx = self.buckets.partition_point(|b| b.min <= distance);
        if idx == 0 {
            return 1;
        }
        let bucket = &self.buckets[idx - 1];
        if bucket.contains(distance) || idx == self.buckets.len() {
            bucket.stride
        } else {
            1
        }
    }

    pub fn buckets(&self) -> &[LodBucket] {
        &self.buckets
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
