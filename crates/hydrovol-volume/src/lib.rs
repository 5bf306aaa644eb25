//! Dense volume construction for hydrovol.
//!
//! This crate turns scattered, variable-resolution [`FieldInstance`]s into
//! dense regular grids:
//! - [`VolumeGrid`] — the cubic density/temperature buffers handed to the
//!   renderer
//! - [`rasterize_flat`] — single-resolution scatter with max-combine
//! - [`composite_levels`] — multi-level compositing with finest-level
//!   priority and boundary smoothing
//!
//! [`FieldInstance`]: hydrovol_core::FieldInstance

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod composite;
pub mod grid;
pub mod rasterize;

pub use composite::{composite_levels, master_resolution, CompositeOutcome, CompositeParams};
pub use grid::VolumeGrid;
pub use rasterize::{rasterize_flat, voxel_box};
