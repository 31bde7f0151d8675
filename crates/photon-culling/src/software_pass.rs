//! CPU rendition of the cluster-key pass
//!
//! Takes a linear depth buffer (distance along the view direction, bottom row
//! first) and ORs `1 << slice` into the key of each pixel's tile, exactly as
//! the GPU pass does with its blend state. Used by the demos and tests in
//! place of a GPU readback.

use crate::cluster_key::{ClusterKeyImage, ClusterKeySource, ReadbackStatus};
use glam::{UVec2, Vec2, Vec3};
use photon_core::{Camera, ClusterGrid, PhotonError, ProjectionParams, ReadbackMode, Result};

pub struct SoftwareClusterKeyPass {
    grid: ClusterGrid,
    viewport: UVec2,
    params: ProjectionParams,
    depth: Vec<f32>,
}

impl SoftwareClusterKeyPass {
    /// New pass with an empty (infinitely far) depth buffer.
    pub fn new(grid: ClusterGrid, viewport: UVec2, params: ProjectionParams) -> Self {
        Self {
            grid,
            viewport,
            params,
            depth: vec![f32::INFINITY; viewport.x as usize * viewport.y as usize],
        }
    }

    pub fn for_camera(grid: ClusterGrid, camera: &Camera) -> Result<Self> {
        let params = ProjectionParams::new(camera.near_plane, camera.far_plane, grid.depth_slices)?;
        Ok(Self::new(grid, camera.viewport, params))
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    pub fn params(&self) -> &ProjectionParams {
        &self.params
    }

    pub fn set_params(&mut self, params: ProjectionParams) {
        self.params = params;
    }

    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    pub fn depth_mut(&mut self) -> &mut [f32] {
        &mut self.depth
    }

    pub fn set_depth(&mut self, depth: Vec<f32>) -> Result<()> {
        let expected = self.viewport.x as usize * self.viewport.y as usize;
        if depth.len() != expected {
            return Err(PhotonError::InvalidConfiguration(format!(
                "depth buffer has {} pixels, viewport {}x{} needs {}",
                depth.len(),
                self.viewport.x,
                self.viewport.y,
                expected
            )));
        }
        self.depth = depth;
        Ok(())
    }

    pub fn clear_depth(&mut self) {
        self.depth.fill(f32::INFINITY);
    }

    /// Fill the depth buffer by casting one ray per pixel centre.
    ///
    /// `hit` receives the ray origin and unit direction and returns the hit
    /// distance along the ray, if any.
    pub fn trace_depth<F>(&mut self, camera: &Camera, hit: F)
    where
        F: Fn(Vec3, Vec3) -> Option<f32>,
    {
        let basis = camera.basis();
        let tan = camera.tan_half_fov();
        let size = self.viewport.as_vec2();
        let width = self.viewport.x as usize;

        for (i, depth) in self.depth.iter_mut().enumerate() {
            let pixel = Vec2::new((i % width) as f32 + 0.5, (i / width) as f32 + 0.5);
            let ndc = pixel / size * 2.0 - Vec2::ONE;
            let dir = (basis.forward + basis.right * (ndc.x * tan.x) + basis.up * (ndc.y * tan.y)).normalize();
            *depth = match hit(basis.origin, dir) {
                Some(t) if t >= 0.0 => t * dir.dot(basis.forward),
                _ => f32::INFINITY,
            };
        }
    }

    /// OR this frame's keys into `image`, which the frame reset left cleared.
    pub fn classify(&self, image: &mut ClusterKeyImage) -> Result<()> {
        if !image.matches(&self.grid) {
            return Err(PhotonError::InvalidConfiguration(format!(
                "key image is {}x{}, grid has {}x{} tiles",
                image.width(),
                image.height(),
                self.grid.tiles_x,
                self.grid.tiles_y
            )));
        }

        let width = self.viewport.x.max(1) as usize;
        for (i, &depth) in self.depth.iter().enumerate() {
            let Some(slice) = self.params.slice_index(depth) else {
                continue;
            };
            let px = (i % width) as f32 + 0.5;
            let py = (i / width) as f32 + 0.5;
            let tile = self.grid.tile_of_pixel(px, py, self.viewport);
            image.or_mask(tile.x, tile.y, 1 << slice);
        }
        image.set_produced_with(Some(self.params));
        Ok(())
    }
}

impl ClusterKeySource for SoftwareClusterKeyPass {
    fn read_into(&mut self, image: &mut ClusterKeyImage, _mode: ReadbackMode) -> Result<ReadbackStatus> {
        self.classify(image)?;
        Ok(ReadbackStatus::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new_perspective(60f32.to_radians(), UVec2::new(64, 64), 1.0, 100.0)
    }

    #[test]
    fn test_empty_depth_produces_no_keys() {
        let grid = ClusterGrid::default();
        let pass = SoftwareClusterKeyPass::for_camera(grid, &camera()).unwrap();
        let mut image = ClusterKeyImage::new(&grid);
        pass.classify(&mut image).unwrap();
        assert!(image.is_clear());
        assert!(image.produced_with().is_some());
    }

    #[test]
    fn test_wall_marks_single_slice_everywhere() {
        let grid = ClusterGrid::default();
        let camera = camera();
        let mut pass = SoftwareClusterKeyPass::for_camera(grid, &camera).unwrap();
        // Flat wall facing the camera: every pixel has depth 12.
        pass.trace_depth(&camera, |origin, dir| {
            let t = (-12.0 - origin.z) / dir.z;
            (t > 0.0).then_some(t)
        });
        let slice = pass.params().slice_index(12.0).unwrap();

        let mut image = ClusterKeyImage::new(&grid);
        pass.classify(&mut image).unwrap();
        for y in 0..grid.tiles_y {
            for x in 0..grid.tiles_x {
                assert_eq!(image.occupied_slices(x, y), 1 << slice);
            }
        }
    }

    #[test]
    fn test_pixels_beyond_far_are_ignored() {
        let grid = ClusterGrid::new(2, 2, 16);
        let camera = camera();
        let mut pass = SoftwareClusterKeyPass::for_camera(grid, &camera).unwrap();
        pass.depth_mut().fill(250.0);
        pass.depth_mut()[0] = 0.5;
        let mut image = ClusterKeyImage::new(&grid);
        pass.classify(&mut image).unwrap();
        assert!(image.is_clear());
    }

    #[test]
    fn test_rejects_mismatched_image() {
        let grid = ClusterGrid::default();
        let pass = SoftwareClusterKeyPass::for_camera(grid, &camera()).unwrap();
        let mut image = ClusterKeyImage::new(&ClusterGrid::new(4, 4, 16));
        assert!(pass.classify(&mut image).is_err());
    }
}
