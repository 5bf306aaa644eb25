//! Multi-level compositing into a single master volume.
//!
//! When several refinement levels cover the same region, the master volume
//! must reflect the finest available data in every voxel. Levels are
//! rasterized coarsest to finest with an auxiliary owning-level buffer
//! arbitrating overlaps, followed by a light smoothing pass that softens
//! seams at refinement-level boundaries.

use hydrovol_core::FieldInstance;

use crate::grid::VolumeGrid;
use crate::rasterize::{rasterize_flat, voxel_box};

/// Sentinel for voxels no instance has written yet.
const UNSET: u32 = u32::MAX;

/// Resolution and cost heuristics for one compositing pass.
#[derive(Debug, Clone, Copy)]
pub struct CompositeParams {
    /// Master side length for a single active level.
    pub base_resolution: u32,
    /// Absolute ceiling on the master side length.
    pub max_resolution: u32,
    /// Instance count past which `budget_resolution` caps the grid instead.
    pub budget_instances: usize,
    /// Reduced ceiling applied past `budget_instances`.
    pub budget_resolution: u32,
    /// Smoothing runs only at or below this side length.
    pub smoothing_max_resolution: u32,
    /// Side length of the flat fallback grid when no level is active.
    pub flat_resolution: u32,
}

/// Result of a compositing pass.
#[derive(Debug)]
pub struct CompositeOutcome {
    pub grid: VolumeGrid,
    /// Active (coarsest, finest) levels, None when the span was empty.
    pub active_span: Option<(u32, u32)>,
    /// Whether the boundary smoothing pass ran.
    pub smoothed: bool,
}

/// Picks the master resolution for an active level span.
///
/// Doubles roughly per extra active level, bounded by the absolute ceiling
/// or, past the instance budget, by the reduced ceiling.
#[must_use]
pub fn master_resolution(params: &CompositeParams, span_levels: u32, total_instances: usize) -> u32 {
    let ceiling = if total_instances > params.budget_instances {
        params.budget_resolution
    } else {
        params.max_resolution
    };
    let scaled = u64::from(params.base_resolution.max(1)) << span_levels.min(16);
    #[allow(clippy::cast_possible_truncation)]
    let scaled = scaled.min(u64::from(u32::MAX)) as u32;
    scaled.min(ceiling.max(1))
}

/// Composites per-level instance lists (index = refinement level) into one
/// master volume with finest-level priority.
///
/// Falls back to flat rasterization of `flat_fallback` when no level has
/// instances.
pub fn composite_levels(
    by_level: &[Vec<FieldInstance>],
    flat_fallback: &[FieldInstance],
    params: &CompositeParams,
) -> CompositeOutcome {
    let active: Vec<usize> = by_level
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_empty())
        .map(|(i, _)| i)
        .collect();

    let (Some(&min_active), Some(&max_active)) = (active.first(), active.last()) else {
        log::debug!("no active levels, falling back to flat rasterization");
        return CompositeOutcome {
            grid: rasterize_flat(flat_fallback, params.flat_resolution),
            active_span: None,
            smoothed: false,
        };
    };

    let total: usize = by_level.iter().map(Vec::len).sum();
    #[allow(clippy::cast_possible_truncation)]
    let span = (max_active - min_active) as u32;
    let n = master_resolution(params, span, total);
    let nn = n as usize;

    let mut grid = VolumeGrid::new(n);
    let mut owners = vec![UNSET; nn * nn * nn];
    let (density, temperature) = grid.fields_mut();

    // Coarse to fine; a finer level overwrites, the same level combines by
    // max so voxel contents never depend on instance order.
    for (level, instances) in by_level.iter().enumerate().skip(min_active) {
        #[allow(clippy::cast_possible_truncation)]
        let level = level as u32;
        for inst in instances {
            let (lo, hi) = voxel_box(inst, n);
            for z in lo[2]..=hi[2] {
                for y in lo[1]..=hi[1] {
                    let row = y as usize * nn + z as usize * nn * nn;
                    for x in lo[0]..=hi[0] {
                        let idx = x as usize + row;
                        let owner = owners[idx];
                        if owner == UNSET || owner < level {
                            owners[idx] = level;
                            density[idx] = inst.density;
                            temperature[idx] = inst.temperature;
                        } else if owner == level {
                            density[idx] = density[idx].max(inst.density);
                            temperature[idx] = temperature[idx].max(inst.temperature);
                        }
                    }
                }
            }
        }
    }

    let smoothed = if n <= params.smoothing_max_resolution {
        smooth_level_boundaries(&mut grid, &owners)
    } else {
        log::debug!("skipping boundary smoothing at {n}^3 (cost threshold)");
        false
    };

    log::debug!(
        "composited {total} instances over levels {min_active}..={max_active} into {n}^3 volume"
    );

    #[allow(clippy::cast_possible_truncation)]
    let active_span = Some((min_active as u32, max_active as u32));
    CompositeOutcome {
        grid,
        active_span,
        smoothed,
    }
}

/// Softens seams at refinement-level boundaries.
///
/// For a strided subset of interior voxels that are set, blends 80% of the
/// original value with 20% of the average over set 6-connected neighbors.
/// Reads come from an immutable snapshot so no voxel ever mixes smoothed
/// and unsmoothed sources.
///
/// Returns whether the pass ran; grids too small to have interior voxels
/// are left untouched.
fn smooth_level_boundaries(grid: &mut VolumeGrid, owners: &[u32]) -> bool {
    let n = grid.resolution();
    if n < 3 {
        return false;
    }
    let nn = n as usize;
    let density_snap = grid.density().to_vec();
    let temperature_snap = grid.temperature().to_vec();
    let (density, temperature) = grid.fields_mut();

    let offsets: [isize; 6] = [
        -1,
        1,
        -(nn as isize),
        nn as isize,
        -((nn * nn) as isize),
        (nn * nn) as isize,
    ];

    for z in (1..nn - 1).step_by(2) {
        for y in (1..nn - 1).step_by(2) {
            for x in (1..nn - 1).step_by(2) {
                let idx = x + y * nn + z * nn * nn;
                if owners[idx] == UNSET {
                    continue;
                }
                let mut d_sum = 0.0f32;
                let mut t_sum = 0.0f32;
                let mut count = 0u32;
                for off in offsets {
                    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
                    let nidx = (idx as isize + off) as usize;
                    if owners[nidx] != UNSET {
                        d_sum += density_snap[nidx];
                        t_sum += temperature_snap[nidx];
                        count += 1;
                    }
                }
                if count > 0 {
                    #[allow(clippy::cast_precision_loss)]
                    let inv = 1.0 / count as f32;
                    density[idx] = 0.8 * density_snap[idx] + 0.2 * d_sum * inv;
                    temperature[idx] = 0.8 * temperature_snap[idx] + 0.2 * t_sum * inv;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn params() -> CompositeParams {
        CompositeParams {
            base_resolution: 8,
            max_resolution: 64,
            budget_instances: 1000,
            budget_resolution: 16,
            smoothing_max_resolution: 0, // keep voxel values exact by default
            flat_resolution: 8,
        }
    }

    fn inst(center: Vec3, level: u32, density: f32) -> FieldInstance {
        FieldInstance::new(center, level, density, density * 10.0)
    }

    fn by_level(instances: &[FieldInstance]) -> Vec<Vec<FieldInstance>> {
        let max = instances.iter().map(|i| i.level).max().unwrap_or(0) as usize;
        let mut lists = vec![Vec::new(); max + 1];
        for i in instances {
            lists[i.level as usize].push(*i);
        }
        lists
    }

    #[test]
    fn test_empty_span_falls_back_to_flat() {
        let out = composite_levels(&[], &[], &params());
        assert!(out.active_span.is_none());
        assert!(!out.smoothed);
        assert_eq!(out.grid.resolution(), 8);
        assert!(out.grid.density().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_fine_level_wins_regardless_of_order() {
        let coarse = inst(Vec3::splat(0.5), 1, 100.0);
        let fine = inst(Vec3::splat(0.5), 4, 1.0);
        let lists = by_level(&[coarse, fine]);

        let out = composite_levels(&lists, &[], &params());
        let n = out.grid.resolution();
        let c = n / 2;
        // The voxel under the fine instance holds the fine value even though
        // the coarse instance wrote a larger one.
        assert_eq!(out.grid.density_at(c, c, c), 1.0);

        // And coarse-only voxels still hold the coarse value.
        assert_eq!(out.grid.density_at(c - 3, c - 3, c - 3), 100.0);
    }

    #[test]
    fn test_same_level_overlap_is_order_independent() {
        let a = inst(Vec3::splat(0.5), 2, 3.0);
        let b = inst(Vec3::splat(0.5), 2, 9.0);
        let fwd = vec![Vec::new(), Vec::new(), vec![a, b]];
        let rev = vec![Vec::new(), Vec::new(), vec![b, a]];

        let out_f = composite_levels(&fwd, &[], &params());
        let out_r = composite_levels(&rev, &[], &params());
        assert_eq!(out_f.grid, out_r.grid);
        assert_eq!(out_f.active_span, Some((2, 2)));
    }

    #[test]
    fn test_master_resolution_doubles_and_caps() {
        let p = params();
        assert_eq!(master_resolution(&p, 0, 0), 8);
        assert_eq!(master_resolution(&p, 1, 0), 16);
        assert_eq!(master_resolution(&p, 2, 0), 32);
        // Absolute ceiling.
        assert_eq!(master_resolution(&p, 5, 0), 64);
        // Reduced ceiling past the instance budget.
        assert_eq!(master_resolution(&p, 5, 2000), 16);
    }

    #[test]
    fn test_smoothing_respects_cost_threshold() {
        let a = inst(Vec3::splat(0.5), 0, 4.0);
        let lists = by_level(&[a]);

        let out = composite_levels(&lists, &[], &params());
        assert!(!out.smoothed);

        let p = CompositeParams {
            smoothing_max_resolution: 256,
            ..params()
        };
        let out = composite_levels(&lists, &[], &p);
        assert!(out.smoothed);
    }

    #[test]
    fn test_smoothing_not_reported_on_tiny_grids() {
        // A 2^3 master grid has no interior voxels to smooth; the outcome
        // must not claim the pass ran.
        let a = inst(Vec3::splat(0.5), 0, 4.0);
        let lists = by_level(&[a]);
        let p = CompositeParams {
            base_resolution: 2,
            smoothing_max_resolution: 256,
            ..params()
        };
        let out = composite_levels(&lists, &[], &p);
        assert_eq!(out.grid.resolution(), 2);
        assert!(!out.smoothed);
    }

    #[test]
    fn test_smoothing_preserves_uniform_regions() {
        // A uniform block: every set voxel's neighbors carry the same value,
        // so the 80/20 blend must leave it unchanged.
        let a = inst(Vec3::splat(0.5), 0, 4.0);
        let lists = by_level(&[a]);
        let p = CompositeParams {
            smoothing_max_resolution: 256,
            ..params()
        };
        let out = composite_levels(&lists, &[], &p);
        let n = out.grid.resolution();
        let c = n / 2;
        let v = out.grid.density_at(c, c, c);
        assert!((v - 4.0).abs() < 1e-5 || v == 0.0);
    }

    #[test]
    fn test_determinism_bit_identical() {
        let instances: Vec<FieldInstance> = (0..50)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f32 / 50.0;
                inst(Vec3::new(t, 1.0 - t, 0.5), 2 + (i % 3), 1.0 + t)
            })
            .collect();
        let lists = by_level(&instances);
        let out_a = composite_levels(&lists, &[], &params());
        let out_b = composite_levels(&lists, &[], &params());
        assert_eq!(out_a.grid, out_b.grid);
    }
}
