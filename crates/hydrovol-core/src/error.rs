//! Error types for hydrovol.
//!
//! The resampling pipeline itself never fails: malformed units fall back to
//! identity scaling, bad cells are dropped, and degenerate ranges are widened.
//! Errors exist only at the seams — the external cell source and options I/O.

use thiserror::Error;

/// The main error type for hydrovol operations.
#[derive(Error, Debug)]
pub enum HydrovolError {
    /// The external cell source failed to enumerate a domain.
    #[error("cell source error in domain {domain}: {message}")]
    CellSource { domain: usize, message: String },

    /// The requested refinement-level range is empty or outside the snapshot.
    #[error("invalid level range [{min}, {max}] (snapshot has [{snap_min}, {snap_max}])")]
    InvalidLevelRange {
        min: u32,
        max: u32,
        snap_min: u32,
        snap_max: u32,
    },

    /// No build has been run yet.
    #[error("no volume built - call build() first")]
    NotBuilt,

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for hydrovol operations.
pub type Result<T> = std::result::Result<T, HydrovolError>;
