//! Configuration options for the resampling pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::units::DensityMode;

/// Tunable parameters for one build of the resampling pipeline.
///
/// The quantile and resolution heuristics are a visualization taste choice,
/// not a correctness requirement, so all of them are exposed here rather than
/// hardcoded. The defaults are the tuned values used for RAMSES snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Use percentile-based range selection instead of raw min/max.
    pub use_robust_range: bool,

    /// Low quantile for robust range selection (fraction in [0, 1]).
    pub low_quantile: f32,

    /// High quantile for robust range selection (fraction in [0, 1]).
    pub high_quantile: f32,

    /// Override the quantiles per density mode: looser clipping for
    /// overdensity, a higher top quantile for absolute densities whose
    /// outliers span many more decades.
    pub tune_quantiles_for_mode: bool,

    /// Minimum accepted overdensity (cosmological mode only).
    pub min_overdensity: f32,

    /// Maximum accepted overdensity (cosmological mode only).
    pub max_overdensity: f32,

    /// Stop ingesting cells after this many, bounding build latency
    /// (None = unlimited).
    pub max_cells: Option<u64>,

    /// Build one volume per active level span instead of a single flat grid.
    pub adaptive_resolution: bool,

    /// Grid side length for the flat (non-adaptive) rasterization path.
    pub flat_resolution: u32,

    /// Master grid side length for a single active level; doubles per extra
    /// active level in adaptive mode.
    pub base_resolution: u32,

    /// Absolute ceiling on the master grid side length.
    pub max_resolution: u32,

    /// Instance count past which the resolution ceiling drops to
    /// `budget_resolution` to bound memory and build time.
    pub budget_instances: usize,

    /// Reduced resolution ceiling applied past `budget_instances`.
    pub budget_resolution: u32,

    /// Boundary smoothing runs only when the master resolution is at or
    /// below this value; above it, seams are accepted instead of cost.
    pub smoothing_max_resolution: u32,

    /// Minimum acceptable max/min ratio for a display range; narrower
    /// ranges are widened symmetrically in log space.
    pub min_span_ratio: f32,

    /// Per-side widening factor applied to degenerate ranges.
    pub span_widen_factor: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            use_robust_range: true,
            low_quantile: 0.05,
            high_quantile: 0.95,
            tune_quantiles_for_mode: true,
            min_overdensity: 0.0,
            max_overdensity: 1e12,
            max_cells: Some(16_000_000),
            adaptive_resolution: true,
            flat_resolution: 64,
            base_resolution: 256,
            max_resolution: 2048,
            budget_instances: 4_000_000,
            budget_resolution: 512,
            smoothing_max_resolution: 256,
            min_span_ratio: 1.5,
            span_widen_factor: 10.0,
        }
    }
}

impl PipelineOptions {
    /// Returns the (low, high) quantiles effective for the given mode.
    #[must_use]
    pub fn quantiles_for(&self, mode: DensityMode) -> (f32, f32) {
        if self.tune_quantiles_for_mode {
            match mode {
                DensityMode::Overdensity => (0.02, 0.98),
                DensityMode::Absolute => (0.05, 0.995),
            }
        } else {
            (self.low_quantile, self.high_quantile)
        }
    }

    /// Loads options from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Saves options to a JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_tuned_quantiles() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.quantiles_for(DensityMode::Overdensity), (0.02, 0.98));
        assert_eq!(opts.quantiles_for(DensityMode::Absolute), (0.05, 0.995));

        let untuned = PipelineOptions {
            tune_quantiles_for_mode: false,
            ..PipelineOptions::default()
        };
        assert_eq!(
            untuned.quantiles_for(DensityMode::Overdensity),
            (0.05, 0.95)
        );
    }

    #[test]
    fn test_json_round_trip() {
        let opts = PipelineOptions {
            max_cells: Some(1000),
            ..PipelineOptions::default()
        };
        let text = serde_json::to_string(&opts).unwrap();
        let back: PipelineOptions = serde_json::from_str(&text).unwrap();
        assert_eq!(back.max_cells, Some(1000));
        assert!(back.use_robust_range);
    }
}
