//! Dense regular volume buffers.

use glam::UVec3;

/// A cubic regular grid with co-resident density and temperature fields.
///
/// `VolumeGrid` spans the normalized box [0,1]^3 with `resolution` voxels
/// per axis. It is allocated fresh for each build, fully overwritten, and
/// handed to the renderer read-only; the next build replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGrid {
    resolution: u32,
    density: Vec<f32>,
    temperature: Vec<f32>,
}

impl VolumeGrid {
    /// Allocates a zero-filled grid of side length `resolution`.
    #[must_use]
    pub fn new(resolution: u32) -> Self {
        let resolution = resolution.max(1);
        let n = resolution as usize;
        Self {
            resolution,
            density: vec![0.0; n * n * n],
            temperature: vec![0.0; n * n * n],
        }
    }

    /// Returns the side length in voxels.
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Returns the total number of voxels.
    #[must_use]
    pub fn num_voxels(&self) -> usize {
        self.density.len()
    }

    /// Flattens a 3D voxel index to a linear index (x fastest).
    #[must_use]
    pub fn flatten_index(&self, x: u32, y: u32, z: u32) -> usize {
        let n = self.resolution as usize;
        x as usize + y as usize * n + z as usize * n * n
    }

    /// Unflattens a linear index to a 3D voxel index.
    #[must_use]
    pub fn unflatten_index(&self, idx: usize) -> UVec3 {
        let n = self.resolution as usize;
        #[allow(clippy::cast_possible_truncation)]
        UVec3::new(
            (idx % n) as u32,
            ((idx / n) % n) as u32,
            (idx / (n * n)) as u32,
        )
    }

    /// Returns the density field.
    #[must_use]
    pub fn density(&self) -> &[f32] {
        &self.density
    }

    /// Returns the temperature field.
    #[must_use]
    pub fn temperature(&self) -> &[f32] {
        &self.temperature
    }

    /// Returns the density field as bytes, for GPU texture upload.
    #[must_use]
    pub fn density_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.density)
    }

    /// Returns the temperature field as bytes, for GPU texture upload.
    #[must_use]
    pub fn temperature_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.temperature)
    }

    /// Gets the density at a 3D voxel index.
    #[must_use]
    pub fn density_at(&self, x: u32, y: u32, z: u32) -> f32 {
        self.density[self.flatten_index(x, y, z)]
    }

    /// Gets the temperature at a 3D voxel index.
    #[must_use]
    pub fn temperature_at(&self, x: u32, y: u32, z: u32) -> f32 {
        self.temperature[self.flatten_index(x, y, z)]
    }

    /// Mutable access to both fields during construction.
    pub(crate) fn fields_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.density, &mut self.temperature)
    }
}
