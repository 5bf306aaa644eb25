//! Robust dynamic-range estimation for color mapping.
//!
//! Display ranges are picked by percentile clipping in log space so a few
//! extreme voxels cannot collapse the whole color map. The estimator must
//! degrade gracefully on pathological inputs: all zeros, a single distinct
//! value, a single sample, or no samples at all. Whatever comes in, the
//! resulting [`ScalarRange`] always satisfies `max > min > 0`, which the
//! renderer relies on for log-space color mapping.

use crate::options::PipelineOptions;
use crate::units::DensityMode;

/// Absolute floor for range bounds; keeps log-space mapping finite.
pub const RANGE_FLOOR: f32 = 1e-30;
/// Minimum max/min ratio enforced on every estimate.
pub const RANGE_MIN_RATIO: f32 = 1.0001;
/// Absolute ceiling for the minimum bound; keeps arithmetic on the bounds
/// finite even for pathological sample magnitudes.
pub const RANGE_CEIL: f32 = 1e30;
/// Fallback display range when no positive samples exist.
pub const DEFAULT_RANGE: (f32, f32) = (1e-30, 1e-24);

/// A display-ready [min, max] range, always `max > min > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarRange {
    pub min: f32,
    pub max: f32,
}

impl ScalarRange {
    /// Rescales the minimum bound multiplicatively, clamped so the range
    /// never inverts: the result stays within `[RANGE_FLOOR, max * 0.999]`.
    ///
    /// For ranges sitting right at the floor, `max * 0.999` can fall below
    /// `RANGE_FLOOR`; the upper clamp bound is lifted to the floor so the
    /// clamp stays ordered.
    pub fn scale_min(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            let hi = (self.max * 0.999).max(RANGE_FLOOR);
            self.min = (self.min * factor).clamp(RANGE_FLOOR, hi);
        }
    }
}

impl Default for ScalarRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_RANGE.0,
            max: DEFAULT_RANGE.1,
        }
    }
}

/// Parameters for one range estimate.
#[derive(Debug, Clone, Copy)]
pub struct RangeParams {
    /// Percentile clipping when true, raw observed min/max when false.
    pub robust: bool,
    pub low_quantile: f32,
    pub high_quantile: f32,
    /// Ranges narrower than this max/min ratio are widened.
    pub min_span_ratio: f32,
    /// Per-side widening factor for degenerate ranges.
    pub widen_factor: f32,
}

impl RangeParams {
    /// Builds params from pipeline options, applying mode-dependent
    /// quantile tuning.
    #[must_use]
    pub fn from_options(options: &PipelineOptions, mode: DensityMode) -> Self {
        let (low_quantile, high_quantile) = options.quantiles_for(mode);
        Self {
            robust: options.use_robust_range,
            low_quantile,
            high_quantile,
            min_span_ratio: options.min_span_ratio,
            widen_factor: options.span_widen_factor,
        }
    }
}

/// Accumulates one scalar field's samples over a build pass.
///
/// Positive samples contribute their natural log to the percentile pool;
/// every finite sample contributes to the non-robust raw min/max.
#[derive(Debug, Clone, Default)]
pub struct RangeAccumulator {
    logs: Vec<f32>,
    raw_min: Option<f32>,
    raw_max: Option<f32>,
}

impl RangeAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of positive samples collected.
    #[must_use]
    pub fn positive_count(&self) -> usize {
        self.logs.len()
    }

    /// Adds one sample. Non-finite samples are ignored entirely.
    pub fn push(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        self.raw_min = Some(self.raw_min.map_or(value, |m| m.min(value)));
        self.raw_max = Some(self.raw_max.map_or(value, |m| m.max(value)));
        if value > 0.0 {
            self.logs.push(value.ln());
        }
    }

    /// Computes the display range from the accumulated samples.
    ///
    /// Sorts the log pool in place; calling again yields the same result.
    pub fn estimate(&mut self, params: &RangeParams) -> ScalarRange {
        let (min, max) = if params.robust {
            if self.logs.is_empty() {
                log::debug!("no positive samples, using default display range");
                DEFAULT_RANGE
            } else {
                self.logs.sort_by(f32::total_cmp);
                let n = self.logs.len();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let ilow = ((params.low_quantile * (n - 1) as f32).floor().max(0.0) as usize)
                    .min(n - 1);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let ihigh = ((params.high_quantile * (n - 1) as f32).ceil().max(0.0) as usize)
                    .min(n - 1);
                let min = self.logs[ilow].exp().max(RANGE_FLOOR);
                let max = self.logs[ihigh].exp().max(min * RANGE_MIN_RATIO);
                (min, max)
            }
        } else {
            match (self.raw_min, self.raw_max) {
                (Some(raw_min), Some(raw_max)) => {
                    let min = raw_min.max(RANGE_FLOOR);
                    let max = raw_max.max(min * RANGE_MIN_RATIO);
                    (min, max)
                }
                _ => DEFAULT_RANGE,
            }
        };

        let widened = Self::widen_if_degenerate(min, max, params);
        Self::clamp_valid(widened.min, widened.max)
    }

    /// Final guard: finite bounds with `max > min > 0`, whatever came in.
    fn clamp_valid(min: f32, max: f32) -> ScalarRange {
        let min = if min.is_finite() { min } else { RANGE_CEIL };
        let min = min.clamp(RANGE_FLOOR, RANGE_CEIL);
        let max = if max.is_finite() { max } else { RANGE_CEIL * RANGE_MIN_RATIO };
        let max = max.clamp(min * RANGE_MIN_RATIO, RANGE_CEIL * RANGE_MIN_RATIO);
        ScalarRange { min, max }
    }

    /// Widens a too-narrow range symmetrically about its log midpoint.
    fn widen_if_degenerate(min: f32, max: f32, params: &RangeParams) -> ScalarRange {
        if max <= min * params.min_span_ratio.max(RANGE_MIN_RATIO) {
            // f64 keeps the geometric mean finite for extreme bounds.
            let center = (f64::from(min) * f64::from(max)).sqrt();
            let widen = f64::from(params.widen_factor);
            #[allow(clippy::cast_possible_truncation)]
            let new_min = ((center / widen) as f32).max(RANGE_FLOOR);
            #[allow(clippy::cast_possible_truncation)]
            let new_max = ((center * widen) as f32).max(new_min * RANGE_MIN_RATIO);
            log::debug!(
                "widened degenerate range [{min:e}, {max:e}] to [{new_min:e}, {new_max:e}]"
            );
            ScalarRange {
                min: new_min,
                max: new_max,
            }
        } else {
            ScalarRange { min, max }
        }
    }
}
