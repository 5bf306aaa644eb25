//! The build pipeline: one synchronous pass from cell source to volume.
//!
//! A build ingests cells domain by domain, converts them to field instances,
//! accumulates range statistics, and rasterizes or composites the result.
//! The previous build's output is replaced wholesale; nothing is updated
//! incrementally.

use hydrovol_core::{
    CellSource, DensityMode, FieldInstance, HydrovolError, PipelineOptions, RangeAccumulator,
    RangeParams, Result, ScalarRange, UnitContext,
};
use hydrovol_volume::{composite_levels, rasterize_flat, CompositeParams, VolumeGrid};

/// Sanity ceiling on refinement levels. Real snapshots stay far below this;
/// it keeps a corrupt header's `levelmax` from driving the per-level
/// allocation. At level 63 the half-extent underflows to zero anyway.
const LEVEL_CEILING: u32 = 63;

/// Counters and choices recorded during one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Cells yielded by the source.
    pub cells_seen: u64,
    /// Cells converted into retained instances.
    pub cells_accepted: u64,
    /// Cells dropped by the validity filter or overdensity window.
    pub cells_rejected: u64,
    /// Non-leaf cells suppressed by the refinement predicate.
    pub cells_skipped_refined: u64,
    /// Domains that failed to enumerate and were skipped.
    pub domains_failed: usize,
    /// Whether ingestion stopped early at the cell budget.
    pub budget_reached: bool,
    /// Chosen volume side length.
    pub resolution: u32,
    /// Whether boundary smoothing ran.
    pub smoothed: bool,
    /// Active (coarsest, finest) levels in the composited volume.
    pub active_span: Option<(u32, u32)>,
}

/// The immutable output of one build, consumed read-only by the renderer.
#[derive(Debug)]
pub struct BuildResult {
    volume: VolumeGrid,
    density_range: ScalarRange,
    temperature_range: ScalarRange,
    mode: DensityMode,
    stats: BuildStats,
}

impl BuildResult {
    /// The density/temperature volume.
    #[must_use]
    pub fn volume(&self) -> &VolumeGrid {
        &self.volume
    }

    /// Display range for density color mapping.
    #[must_use]
    pub fn density_range(&self) -> ScalarRange {
        self.density_range
    }

    /// Display range for temperature color mapping.
    #[must_use]
    pub fn temperature_range(&self) -> ScalarRange {
        self.temperature_range
    }

    /// Density interpretation for this build.
    #[must_use]
    pub fn mode(&self) -> DensityMode {
        self.mode
    }

    /// True when volume densities are dimensionless overdensities.
    #[must_use]
    pub fn is_overdensity(&self) -> bool {
        self.mode == DensityMode::Overdensity
    }

    /// Build counters.
    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

/// The AMR-to-volume resampling pipeline.
///
/// Owns the cell source and the latest [`BuildResult`]. A rebuild (for
/// example after a refinement-level range change) recomputes everything
/// from the source and atomically replaces the previous result.
pub struct HydroPipeline<S: CellSource> {
    source: S,
    options: PipelineOptions,
    result: Option<BuildResult>,
}

impl<S: CellSource> HydroPipeline<S> {
    /// Creates a pipeline with default options.
    pub fn new(source: S) -> Self {
        Self::with_options(source, PipelineOptions::default())
    }

    /// Creates a pipeline with explicit options.
    pub fn with_options(source: S, options: PipelineOptions) -> Self {
        Self {
            source,
            options,
            result: None,
        }
    }

    /// Returns the current options.
    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Replaces the options; takes effect on the next build.
    pub fn set_options(&mut self, options: PipelineOptions) {
        self.options = options;
    }

    /// Coarsest level present in the snapshot.
    #[must_use]
    pub fn default_min_level(&self) -> u32 {
        self.source.header().levelmin
    }

    /// Finest level present in the snapshot.
    #[must_use]
    pub fn default_max_level(&self) -> u32 {
        self.source.header().levelmax
    }

    /// True when this snapshot's densities will be overdensities.
    #[must_use]
    pub fn is_overdensity(&self) -> bool {
        self.source.header().omega_b > 0.0
    }

    /// Returns the latest build result, if any.
    #[must_use]
    pub fn result(&self) -> Option<&BuildResult> {
        self.result.as_ref()
    }

    /// Rescales the density display minimum without rebuilding.
    ///
    /// The minimum is clamped so it can never cross the maximum.
    pub fn scale_min_density(&mut self, factor: f32) -> Result<ScalarRange> {
        let result = self.result.as_mut().ok_or(HydrovolError::NotBuilt)?;
        result.density_range.scale_min(factor);
        Ok(result.density_range)
    }

    /// Runs one full build pass over the inclusive level range.
    ///
    /// The requested maximum is clamped to the snapshot's finest level (and
    /// a sanity ceiling, against corrupt headers). Failing domains are
    /// skipped with a warning; every other degenerate condition is recovered
    /// internally, so a successful return always carries a usable volume and
    /// valid ranges.
    pub fn build(&mut self, min_level: u32, max_level: u32) -> Result<&BuildResult> {
        let header = self.source.header().clone();
        let max_level = max_level.min(header.levelmax).min(LEVEL_CEILING);
        if min_level > max_level {
            return Err(HydrovolError::InvalidLevelRange {
                min: min_level,
                max: max_level,
                snap_min: header.levelmin,
                snap_max: header.levelmax,
            });
        }

        let ctx = UnitContext::from_header(&header, &self.options);
        let mode = ctx.mode();
        let mut stats = BuildStats::default();

        let mut flat: Vec<FieldInstance> = Vec::new();
        let mut by_level: Vec<Vec<FieldInstance>> = vec![Vec::new(); (max_level + 1) as usize];
        let mut density_acc = RangeAccumulator::new();
        let mut temperature_acc = RangeAccumulator::new();

        // Per-domain partitioned accumulation, merged single-threaded below;
        // aggregation is order-independent so domain order does not matter.
        'domains: for domain in 0..self.source.num_domains() {
            let cells = match self.source.cells(domain, min_level, max_level) {
                Ok(cells) => cells,
                Err(e) => {
                    log::warn!("skipping domain {domain}: {e}");
                    stats.domains_failed += 1;
                    continue;
                }
            };

            let mut local: Vec<FieldInstance> = Vec::new();
            for cell in cells {
                stats.cells_seen += 1;

                // Only leaf cells rasterize; a refined cell's volume is
                // covered by its children at the finer level. Cells refined
                // beyond the requested range still count as leaves here.
                if cell.level < max_level
                    && self.source.is_refined(domain, &cell) == Some(true)
                {
                    stats.cells_skipped_refined += 1;
                    continue;
                }

                let Some(inst) = ctx.convert(&cell) else {
                    stats.cells_rejected += 1;
                    continue;
                };
                stats.cells_accepted += 1;
                density_acc.push(inst.density);
                temperature_acc.push(inst.temperature);
                local.push(inst);

                if let Some(max_cells) = self.options.max_cells {
                    if stats.cells_accepted >= max_cells {
                        stats.budget_reached = true;
                        Self::merge(&mut flat, &mut by_level, local);
                        log::info!("cell budget of {max_cells} reached, stopping ingestion");
                        break 'domains;
                    }
                }
            }
            Self::merge(&mut flat, &mut by_level, local);
        }

        let params = RangeParams::from_options(&self.options, mode);
        let density_range = density_acc.estimate(&params);
        let temperature_range = temperature_acc.estimate(&params);

        let volume = if self.options.adaptive_resolution {
            let outcome = composite_levels(
                &by_level,
                &flat,
                &CompositeParams {
                    base_resolution: self.options.base_resolution,
                    max_resolution: self.options.max_resolution,
                    budget_instances: self.options.budget_instances,
                    budget_resolution: self.options.budget_resolution,
                    smoothing_max_resolution: self.options.smoothing_max_resolution,
                    flat_resolution: self.options.flat_resolution,
                },
            );
            stats.smoothed = outcome.smoothed;
            stats.active_span = outcome.active_span;
            outcome.grid
        } else {
            rasterize_flat(&flat, self.options.flat_resolution)
        };
        stats.resolution = volume.resolution();

        log::info!(
            "built {res}^3 volume from levels [{min_level}, {max_level}]: \
             {accepted}/{seen} cells accepted ({rejected} rejected, {skipped} refined), \
             density range [{dmin:e}, {dmax:e}]",
            res = stats.resolution,
            accepted = stats.cells_accepted,
            seen = stats.cells_seen,
            rejected = stats.cells_rejected,
            skipped = stats.cells_skipped_refined,
            dmin = density_range.min,
            dmax = density_range.max,
        );

        Ok(self.result.insert(BuildResult {
            volume,
            density_range,
            temperature_range,
            mode,
            stats,
        }))
    }

    fn merge(
        flat: &mut Vec<FieldInstance>,
        by_level: &mut [Vec<FieldInstance>],
        local: Vec<FieldInstance>,
    ) {
        for inst in local {
            if let Some(list) = by_level.get_mut(inst.level as usize) {
                list.push(inst);
            }
            flat.push(inst);
        }
    }
}
