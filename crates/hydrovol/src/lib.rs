//! hydrovol: AMR-to-volume resampling for ray-march rendering.
//!
//! hydrovol turns a sparse, hierarchical set of simulation cells (adaptive
//! mesh refinement, as written by codes like RAMSES) into dense regular
//! volumetric fields — density and temperature — plus robust display ranges
//! for log-space color mapping. The renderer consuming the volumes is an
//! external collaborator; hydrovol hands it read-only buffers and bounds.
//!
//! # Quick Start
//!
//! ```
//! use hydrovol::{HydroPipeline, PipelineOptions, SnapshotHeader, SyntheticSource};
//!
//! // An in-memory stand-in for the on-disk AMR reader.
//! let header = SnapshotHeader {
//!     levelmin: 1,
//!     levelmax: 4,
//!     ..SnapshotHeader::default()
//! };
//! let mut source = SyntheticSource::new(header, 1);
//! source.fill_uniform(0, 4, 4, 2.5, 1.0);
//!
//! let options = PipelineOptions {
//!     base_resolution: 32,
//!     ..PipelineOptions::default()
//! };
//! let mut pipeline = HydroPipeline::with_options(source, options);
//! let result = pipeline.build(1, 4).expect("build");
//!
//! let volume = result.volume();
//! assert!(volume.density().iter().any(|&v| v > 0.0));
//!
//! let range = result.density_range();
//! assert!(range.max > range.min && range.min > 0.0);
//! ```
//!
//! # Architecture
//!
//! One build pass flows through four stages:
//!
//! - A [`CellSource`] yields [`RawCell`]s per spatial domain
//! - A [`UnitContext`] converts each cell to a [`FieldInstance`]
//!   (overdensity or kg/m^3, plus ideal-gas temperature)
//! - A [`RangeAccumulator`] picks robust display ranges in log space
//! - The rasterizer or the adaptive level compositor scatters the
//!   instances into a [`VolumeGrid`]
//!
//! Everything degrades gracefully: bad unit scales fall back to identity,
//! invalid cells are dropped, and degenerate ranges are widened — a build
//! never fails over data content.

mod pipeline;
mod synthetic;

pub use pipeline::{BuildResult, BuildStats, HydroPipeline};
pub use synthetic::SyntheticSource;

// Re-export core types
pub use hydrovol_core::{
    error::{HydrovolError, Result},
    options::PipelineOptions,
    range::{RangeAccumulator, RangeParams, ScalarRange},
    units::{DensityMode, UnitContext},
    CellSource, FieldInstance, RawCell, SnapshotHeader,
};

// Re-export volume types
pub use hydrovol_volume::{
    composite_levels, rasterize_flat, CompositeOutcome, CompositeParams, VolumeGrid,
};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3};
