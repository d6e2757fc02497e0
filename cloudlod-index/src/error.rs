//! Error types for LOD configuration and pick queries.

use thiserror::Error;

/// A malformed LOD options string or bucket layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("LOD options are empty, expected a capacity token")]
    MissingCapacity,

    #[error("invalid capacity '{0}', expected an unsigned integer")]
    BadCapacity(String),

    #[error("invalid bucket '{0}', expected min:max:stride")]
    BadToken(String),

    #[error("invalid number '{value}' in bucket '{token}'")]
    BadNumber { token: String, value: String },

    #[error("bucket '{0}' has a negative minimum distance")]
    NegativeMin(String),

    #[error("bucket '{0}' has max <= min")]
    EmptyRange(String),

    #[error("bucket '{0}' has a zero stride")]
    ZeroStride(String),

    #[error("buckets [{first_min}, {first_max}) and [{second_min}, {second_max}) overlap")]
    Overlap {
        first_min: f64,
        first_max: f64,
        second_min: f64,
        second_max: f64,
    },
}

/// Degenerate query input, rejected before any traversal.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ValidationError {
    #[error("ray direction has zero length")]
    ZeroDirection,

    #[error("ray origin or direction is not finite")]
    NonFinite,

    #[error("pick radius {0} must be a non-negative number")]
    BadRadius(f64),

    #[error("max distance {0} must be a non-negative number")]
    BadDistance(f64),

    #[error("index has no cells to query")]
    EmptyIndex,
}
