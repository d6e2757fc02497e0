//! Error types for point records and stores.

use thiserror::Error;

/// The bytes do not form valid point records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("truncated record: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("length {len} is not a multiple of the {record_size}-byte record size")]
    Misaligned { len: u64, record_size: usize },
}

/// Out-of-range point access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("point index {index} out of range for store of {len} points")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

/// Errors that can occur while opening or writing a point store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Invalid read window: {0}")]
    Window(String),
}
