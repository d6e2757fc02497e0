//! Cloudlod Index Crate
//!
//! Level-of-detail spatial indexing and ray picking over point stores.
//!
//! ## Modules
//!
//! - [`lod`]: LOD options parsing and per-distance stride lookup
//! - [`grid`]: Uniform grid layout sized from a capacity hint
//! - [`index`]: LOD index construction over a point store
//! - [`ray`]: Rays, pick queries and hit results
//! - [`intersect`]: Near-to-far grid walk and nearest-along-ray picking
//! - [`pick`]: Mode-based pick dispatch for scene objects

pub mod error;
pub mod grid;
pub mod index;
pub mod intersect;
pub mod lod;
pub mod pick;
pub mod ray;

pub use error::{ConfigError, ValidationError};
pub use grid::GridLayout;
pub use index::{CellEntry, GridCell, IndexConfig, LodIndex};
pub use intersect::{GridWalk, RayIntersector};
pub use lod::{BucketTable, LodBucket, LodSpec};
pub use pick::{PickMode, PickTarget};
pub use ray::{DEFAULT_PICK_RADIUS, HitResult, PickQuery, Ray};
