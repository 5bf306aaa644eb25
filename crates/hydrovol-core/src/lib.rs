//! Core abstractions for hydrovol.
//!
//! This crate provides the fundamental types used throughout hydrovol:
//! - The cell data model: [`RawCell`], [`FieldInstance`], [`SnapshotHeader`],
//!   and the [`CellSource`] seam to the external AMR reader
//! - Physical-unit derivation of per-cell fields ([`UnitContext`])
//! - Robust dynamic-range estimation for color mapping ([`RangeAccumulator`])
//! - Configuration options and error types

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Options structs legitimately have many boolean flags
#![allow(clippy::struct_excessive_bools)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod cell;
pub mod error;
pub mod options;
pub mod range;
pub mod units;

pub use cell::{half_extent_for_level, wrap_unit, CellSource, FieldInstance, RawCell, SnapshotHeader};
pub use error::{HydrovolError, Result};
pub use options::PipelineOptions;
pub use range::{RangeAccumulator, RangeParams, ScalarRange};
pub use units::{DensityMode, UnitContext};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3};
