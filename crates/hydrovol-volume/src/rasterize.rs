//! Scatter rasterization of field instances into a dense grid.
//!
//! Each instance is an axis-aligned box in normalized coordinates. It fills
//! every voxel its box covers, and overlapping contributions combine by
//! per-voxel maximum, never averaging, so rare high-density cells stay
//! visible among low-density neighbors.

use hydrovol_core::FieldInstance;

use crate::grid::VolumeGrid;

/// Inclusive voxel bounding box of an instance on an `n`-sided grid.
///
/// Voxel `i` spans `[i, i+1)` in voxel space, so the inclusive upper index
/// is `ceil(hi) - 1`: a box exactly filling one voxel maps to that voxel
/// alone. The clamp guarantees `min <= max` per axis, so a box that
/// degenerates to zero voxels (or falls outside the grid) still writes its
/// nearest voxel.
#[must_use]
pub fn voxel_box(inst: &FieldInstance, n: u32) -> ([u32; 3], [u32; 3]) {
    #[allow(clippy::cast_precision_loss)]
    let nf = n as f32;
    let gh = inst.half_extent * nf;
    let mut lo = [0u32; 3];
    let mut hi = [0u32; 3];
    for (axis, (l, h)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
        let g = inst.center[axis] * nf;
        #[allow(clippy::cast_possible_truncation)]
        let min = ((g - gh).floor() as i64).clamp(0, i64::from(n) - 1);
        #[allow(clippy::cast_possible_truncation)]
        let max = ((g + gh).ceil() as i64 - 1)
            .clamp(0, i64::from(n) - 1)
            .max(min);
        #[allow(clippy::cast_sign_loss)]
        {
            *l = min as u32;
            *h = max as u32;
        }
    }
    (lo, hi)
}

/// Rasterizes instances into a fresh grid of side length `resolution`.
pub fn rasterize_flat(instances: &[FieldInstance], resolution: u32) -> VolumeGrid {
    let mut grid = VolumeGrid::new(resolution);
    let n = grid.resolution();
    let nn = n as usize;
    let (density, temperature) = grid.fields_mut();

    for inst in instances {
        let (lo, hi) = voxel_box(inst, n);
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                let row = y as usize * nn + z as usize * nn * nn;
                for x in lo[0]..=hi[0] {
                    let idx = x as usize + row;
                    density[idx] = density[idx].max(inst.density);
                    temperature[idx] = temperature[idx].max(inst.temperature);
                }
            }
        }
    }

    log::debug!(
        "rasterized {} instances into {n}^3 volume",
        instances.len()
    );
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn inst(center: Vec3, half: f32, density: f32, temperature: f32) -> FieldInstance {
        FieldInstance {
            center,
            half_extent: half,
            density,
            temperature,
            level: 0,
        }
    }

    #[test]
    fn test_single_voxel_round_trip() {
        // Half-extent covering exactly one voxel on an 8-grid.
        let n = 8;
        let i = inst(
            Vec3::new(3.5 / 8.0, 4.5 / 8.0, 5.5 / 8.0),
            0.5 / 8.0,
            7.0,
            300.0,
        );
        let grid = rasterize_flat(&[i], n);

        let mut nonzero = 0;
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let d = grid.density_at(x, y, z);
                    if d != 0.0 {
                        nonzero += 1;
                        assert_eq!((x, y, z), (3, 4, 5));
                        assert_eq!(d, 7.0);
                        assert_eq!(grid.temperature_at(x, y, z), 300.0);
                    }
                }
            }
        }
        assert_eq!(nonzero, 1);
    }

    #[test]
    fn test_overlap_combines_by_max() {
        let a = inst(Vec3::splat(0.5), 0.3, 2.0, 100.0);
        let b = inst(Vec3::splat(0.5), 0.3, 5.0, 50.0);
        let fwd = rasterize_flat(&[a, b], 4);
        let rev = rasterize_flat(&[b, a], 4);
        assert_eq!(fwd, rev);
        assert_eq!(fwd.density_at(2, 2, 2), 5.0);
        assert_eq!(fwd.temperature_at(2, 2, 2), 100.0);
    }

    #[test]
    fn test_out_of_box_instance_clamps_to_boundary() {
        // Not wrapped by construction here; the rasterizer must clamp.
        let i = inst(Vec3::new(1.5, 0.625, 0.625), 0.01, 3.0, 1.0);
        let grid = rasterize_flat(&[i], 4);
        assert_eq!(grid.density_at(3, 2, 2), 3.0);
        let total: f32 = grid.density().iter().sum();
        assert_eq!(total, 3.0);
    }

    #[test]
    fn test_degenerate_box_writes_one_voxel() {
        let i = inst(Vec3::new(0.5, 0.5, 0.5), 0.0, 1.0, 1.0);
        let grid = rasterize_flat(&[i], 4);
        let written = grid.density().iter().filter(|&&v| v != 0.0).count();
        assert!(written >= 1);
    }

    #[test]
    fn test_coarse_instance_fills_covered_voxels() {
        // A level-0 box (half 0.25) centered mid-box covers half the grid span.
        let i = inst(Vec3::splat(0.5), 0.25, 1.0, 1.0);
        let grid = rasterize_flat(&[i], 8);
        // Spans [2, 6) in voxel space: voxels 2..=5 per axis.
        for z in 0..8 {
            for y in 0..8 {
                for x in 0..8 {
                    let inside = (2..=5).contains(&x) && (2..=5).contains(&y) && (2..=5).contains(&z);
                    let expected = if inside { 1.0 } else { 0.0 };
                    assert_eq!(grid.density_at(x, y, z), expected);
                }
            }
        }
    }
}
