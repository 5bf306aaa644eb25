//! An in-memory cell source for tests and demos.

use std::collections::HashSet;

use glam::Vec3;
use hydrovol_core::{CellSource, HydrovolError, RawCell, Result, SnapshotHeader};

/// A [`CellSource`] backed by in-memory cell lists, one per domain.
///
/// Useful for exercising the pipeline without a snapshot on disk. Levels
/// can be marked as refined to exercise leaf filtering.
pub struct SyntheticSource {
    header: SnapshotHeader,
    domains: Vec<Vec<RawCell>>,
    refined_levels: HashSet<u32>,
}

impl SyntheticSource {
    /// Creates an empty source with `num_domains` domains.
    #[must_use]
    pub fn new(header: SnapshotHeader, num_domains: usize) -> Self {
        Self {
            header,
            domains: vec![Vec::new(); num_domains.max(1)],
            refined_levels: HashSet::new(),
        }
    }

    /// Adds one cell to a domain.
    ///
    /// # Panics
    /// Panics if `domain` is out of range.
    pub fn add_cell(&mut self, domain: usize, cell: RawCell) -> &mut Self {
        self.domains[domain].push(cell);
        self
    }

    /// Fills a domain with a uniform `m`^3 grid of cells at `level`, all
    /// carrying the same density and pressure.
    pub fn fill_uniform(
        &mut self,
        domain: usize,
        level: u32,
        m: u32,
        density: f32,
        pressure: f32,
    ) -> &mut Self {
        #[allow(clippy::cast_precision_loss)]
        let inv = 1.0 / m.max(1) as f32;
        for k in 0..m {
            for j in 0..m {
                for i in 0..m {
                    #[allow(clippy::cast_precision_loss)]
                    let center = Vec3::new(
                        (i as f32 + 0.5) * inv,
                        (j as f32 + 0.5) * inv,
                        (k as f32 + 0.5) * inv,
                    );
                    self.add_cell(
                        domain,
                        RawCell {
                            center,
                            level,
                            density,
                            pressure,
                        },
                    );
                }
            }
        }
        self
    }

    /// Marks every cell at `level` as further refined.
    pub fn mark_level_refined(&mut self, level: u32) -> &mut Self {
        self.refined_levels.insert(level);
        self
    }
}

impl CellSource for SyntheticSource {
    fn header(&self) -> &SnapshotHeader {
        &self.header
    }

    fn num_domains(&self) -> usize {
        self.domains.len()
    }

    fn cells(
        &self,
        domain: usize,
        min_level: u32,
        max_level: u32,
    ) -> Result<Box<dyn Iterator<Item = RawCell> + '_>> {
        let cells = self
            .domains
            .get(domain)
            .ok_or_else(|| HydrovolError::CellSource {
                domain,
                message: "domain out of range".to_string(),
            })?;
        Ok(Box::new(
            cells
                .iter()
                .copied()
                .filter(move |c| (min_level..=max_level).contains(&c.level)),
        ))
    }

    fn is_refined(&self, _domain: usize, cell: &RawCell) -> Option<bool> {
        if self.refined_levels.contains(&cell.level) {
            Some(true)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        let mut src = SyntheticSource::new(SnapshotHeader::default(), 1);
        src.fill_uniform(0, 2, 2, 1.0, 1.0);
        src.fill_uniform(0, 5, 2, 2.0, 1.0);

        let lvl2: Vec<_> = src.cells(0, 2, 2).unwrap().collect();
        assert_eq!(lvl2.len(), 8);
        assert!(lvl2.iter().all(|c| c.level == 2));

        let all: Vec<_> = src.cells(0, 0, 10).unwrap().collect();
        assert_eq!(all.len(), 16);
    }

    #[test]
    fn test_bad_domain_errors() {
        let src = SyntheticSource::new(SnapshotHeader::default(), 2);
        assert!(src.cells(5, 0, 10).is_err());
    }

    #[test]
    fn test_refined_marking() {
        let mut src = SyntheticSource::new(SnapshotHeader::default(), 1);
        src.fill_uniform(0, 3, 1, 1.0, 1.0);
        let cell = src.cells(0, 0, 10).unwrap().next().unwrap();
        assert_eq!(src.is_refined(0, &cell), None);
        src.mark_level_refined(3);
        let cell = src.cells(0, 0, 10).unwrap().next().unwrap();
        assert_eq!(src.is_refined(0, &cell), Some(true));
    }
}
