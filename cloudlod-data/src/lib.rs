//! Cloudlod Data Crate
//!
//! Storage side of the point cloud engine: the fixed-width point record,
//! file-backed point stores and summary statistics over a loaded cloud.
//! This crate knows nothing about spatial indexing or picking.

pub mod error;
pub mod record;
pub mod stats;
pub mod store;
pub mod types;

pub use error::{FormatError, IndexError, StoreError};
pub use record::{RECORD_FIELDS, RECORD_SIZE, decode, encode, encode_into};
pub use stats::CloudStats;
pub use store::{
    POINT_FILE_EXTENSION, Points, PointStore, ReadWindow, StoreOptions, is_point_file,
    write_points,
};
pub use types::{Bounds, Point};
