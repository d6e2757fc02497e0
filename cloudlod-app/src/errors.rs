//! Error types for the command line front end.

use thiserror::Error;

/// Errors that can end a `cloudlod` run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Point store error: {0}")]
    Store(#[from] cloudlod_data::StoreError),

    #[error("Point lookup error: {0}")]
    Index(#[from] cloudlod_data::IndexError),

    #[error("LOD options error: {0}")]
    Config(#[from] cloudlod_index::ConfigError),

    #[error("Invalid pick: {0}")]
    Validation(#[from] cloudlod_index::ValidationError),

    #[error("Invalid vector '{0}', expected x,y,z")]
    BadVector(String),

    #[error("Unknown pick mode '{0}', expected points or bounds")]
    BadMode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
