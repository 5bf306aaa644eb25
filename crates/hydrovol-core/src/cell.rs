//! Data model for hierarchical simulation cells.
//!
//! A [`CellSource`] is the seam to the on-disk AMR reader: it enumerates
//! [`RawCell`]s per spatial domain and exposes the snapshot header. The
//! pipeline converts raw cells into retained [`FieldInstance`]s.

use glam::Vec3;

use crate::error::Result;

/// Snapshot-wide physical parameters, read once from the snapshot header.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotHeader {
    /// Cosmological expansion factor `a`.
    pub aexp: f64,
    /// Baryon density parameter. Zero or negative means non-cosmological.
    pub omega_b: f64,
    /// Matter density parameter.
    pub omega_m: f64,
    /// Hubble constant in km/s/Mpc.
    pub h0: f64,
    /// Code-to-physical density scale (kg/m^3 per code unit). May be zero
    /// or non-finite for non-cosmological runs.
    pub unit_d: f64,
    /// Code-to-physical length scale (m per code unit).
    pub unit_l: f64,
    /// Code-to-physical time scale (s per code unit).
    pub unit_t: f64,
    /// Simulation box length in code units.
    pub boxlen: f64,
    /// Coarsest refinement level present in the snapshot.
    pub levelmin: u32,
    /// Finest refinement level present in the snapshot.
    pub levelmax: u32,
    /// Number of spatial domains (one per writer CPU).
    pub ncpu: usize,
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self {
            aexp: 1.0,
            omega_b: 0.0,
            omega_m: 0.0,
            h0: 70.0,
            unit_d: 1.0,
            unit_l: 1.0,
            unit_t: 1.0,
            boxlen: 1.0,
            levelmin: 1,
            levelmax: 1,
            ncpu: 1,
        }
    }
}

/// One hierarchical cell as yielded by the cell source, in code units.
///
/// Ephemeral: consumed once per build pass and not retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCell {
    /// Cell center in normalized box coordinates. Nominally in [0,1)^3 but
    /// may sit outside near periodic boundaries; the pipeline wraps it.
    pub center: Vec3,
    /// Refinement level, 0 = coarsest.
    pub level: u32,
    /// Raw density sample in code units.
    pub density: f32,
    /// Raw pressure sample in code units.
    pub pressure: f32,
}

/// A derived, retained field sample: one axis-aligned box with converted
/// scalar values, ready for rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldInstance {
    /// Center wrapped into [0,1)^3.
    pub center: Vec3,
    /// Half edge length in normalized box coordinates.
    pub half_extent: f32,
    /// Converted density: dimensionless overdensity or kg/m^3.
    pub density: f32,
    /// Gas temperature in Kelvin.
    pub temperature: f32,
    /// Source refinement level.
    pub level: u32,
}

impl FieldInstance {
    /// Creates an instance at `center`, wrapping the position into [0,1)^3
    /// and deriving the half-extent from the refinement level.
    #[must_use]
    pub fn new(center: Vec3, level: u32, density: f32, temperature: f32) -> Self {
        Self {
            center: wrap_unit(center),
            half_extent: half_extent_for_level(level),
            density,
            temperature,
            level,
        }
    }
}

/// Half edge length of a child cell at `level`, in unit-box coordinates.
#[must_use]
pub fn half_extent_for_level(level: u32) -> f32 {
    let exp = i32::try_from(level).map_or(i32::MAX, |l| l.saturating_add(1));
    0.5 / 2.0_f32.powi(exp)
}

/// Wraps a normalized position into [0,1)^3.
///
/// AMR centers near periodic box boundaries can come in offset by an integer
/// box length; `v - floor(v)` folds them back.
#[must_use]
pub fn wrap_unit(v: Vec3) -> Vec3 {
    v - v.floor()
}

/// Seam to the external hierarchical-cell reader.
///
/// Implementations enumerate cells per spatial domain; the pipeline drives
/// one pass over all domains per build. The optional [`CellSource::is_refined`]
/// predicate lets sources with leaf metadata suppress non-leaf cells; sources
/// without it return `None` and every cell is treated as a leaf.
pub trait CellSource {
    /// Returns the snapshot header.
    fn header(&self) -> &SnapshotHeader;

    /// Returns the number of spatial domains.
    fn num_domains(&self) -> usize;

    /// Enumerates the cells of one domain within an inclusive level range.
    ///
    /// Domains are indexed from 0. The returned iterator may stream from
    /// disk; the pipeline may drop it early when its cell budget is reached.
    fn cells(
        &self,
        domain: usize,
        min_level: u32,
        max_level: u32,
    ) -> Result<Box<dyn Iterator<Item = RawCell> + '_>>;

    /// Returns whether `cell` is further refined at a higher level.
    ///
    /// `None` means the source cannot tell (missing leaf metadata); the
    /// pipeline then treats the cell as a leaf rather than erroring.
    fn is_refined(&self, domain: usize, cell: &RawCell) -> Option<bool> {
        let _ = (domain, cell);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_extent_halves_per_level() {
        assert!((half_extent_for_level(0) - 0.25).abs() < 1e-7);
        assert!((half_extent_for_level(1) - 0.125).abs() < 1e-7);
        for level in 0..10 {
            let coarse = half_extent_for_level(level);
            let fine = half_extent_for_level(level + 1);
            assert!((coarse - 2.0 * fine).abs() < 1e-7);
        }
    }

    #[test]
    fn test_wrap_unit() {
        let w = wrap_unit(Vec3::new(1.25, -0.25, 0.5));
        assert!((w.x - 0.25).abs() < 1e-6);
        assert!((w.y - 0.75).abs() < 1e-6);
        assert!((w.z - 0.5).abs() < 1e-6);

        let w = wrap_unit(Vec3::new(3.5, 0.0, 0.999));
        assert!((w.x - 0.5).abs() < 1e-6);
        assert!(w.y.abs() < 1e-6);
        assert!(w.cmplt(Vec3::ONE).all());
        assert!(w.cmpge(Vec3::ZERO).all());
    }

    #[test]
    fn test_instance_wraps_center() {
        let inst = FieldInstance::new(Vec3::new(1.1, 0.5, 0.5), 3, 1.0, 10.0);
        assert!((inst.center.x - 0.1).abs() < 1e-6);
        assert!((inst.half_extent - 0.5 / 16.0).abs() < 1e-7);
        assert_eq!(inst.level, 3);
    }
}
