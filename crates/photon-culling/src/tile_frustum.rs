//! Per-tile and per-cluster sub-frusta
//!
//! The near plane of the camera is split into `tiles_x * tiles_y` equal
//! rectangles. Each tile's four side planes pass through the eye and two
//! adjacent rectangle corners; a cluster adds the near and far planes of its
//! depth slice. All planes point inward and have unit-length normals.

use glam::{Vec2, Vec3, Vec4};
use photon_core::{plane_equation, plane_from_normal_point, Camera, CameraBasis, ClusterGrid, Frustum, ProjectionParams};

pub struct TileFrustumBuilder {
    basis: CameraBasis,
    front: Vec3,
    tile_extent: Vec2,
    grid: ClusterGrid,
    boundaries: Vec<f32>,
}

impl TileFrustumBuilder {
    pub fn new(camera: &Camera, grid: ClusterGrid, params: &ProjectionParams) -> Self {
        let basis = camera.basis();
        let tan = camera.tan_half_fov();
        let near = camera.near_plane;
        let near_extent = 2.0 * near * tan;
        Self {
            front: basis.forward * near,
            basis,
            tile_extent: near_extent / Vec2::new(grid.tiles_x as f32, grid.tiles_y as f32),
            grid,
            boundaries: params.boundaries(),
        }
    }

    pub fn grid(&self) -> ClusterGrid {
        self.grid
    }

    /// Linear depths of the slice boundaries, `depth_slices + 1` values.
    pub fn boundaries(&self) -> &[f32] {
        &self.boundaries
    }

    /// Left, right, bottom and top planes of tile `(x, y)`.
    pub fn side_planes(&self, x: u32, y: u32) -> [Vec4; 4] {
        let CameraBasis { origin, right, up, .. } = self.basis;
        let half = Vec2::new(self.grid.tiles_x as f32, self.grid.tiles_y as f32) * 0.5;
        let x0 = (x as f32 - half.x) * self.tile_extent.x;
        let x1 = x0 + self.tile_extent.x;
        let y0 = (y as f32 - half.y) * self.tile_extent.y;
        let y1 = y0 + self.tile_extent.y;

        let l = origin + self.front + right * x0;
        let r = origin + self.front + right * x1;
        let d = up * y0;
        let u = up * y1;

        [
            plane_equation(origin, l + d, l + u),
            plane_equation(origin, r + u, r + d),
            plane_equation(origin, r + d, l + d),
            plane_equation(origin, l + u, r + u),
        ]
    }

    /// Near and far planes bounding depth slice `slice`.
    pub fn slice_planes(&self, slice: u32) -> (Vec4, Vec4) {
        let CameraBasis { origin, forward, .. } = self.basis;
        let near = self.boundaries[slice as usize];
        let far = self.boundaries[slice as usize + 1];
        (
            plane_from_normal_point(forward, origin + forward * near),
            plane_from_normal_point(-forward, origin + forward * far),
        )
    }

    pub fn cluster_frustum(&self, sides: &[Vec4; 4], slice: u32) -> Frustum {
        let (near, far) = self.slice_planes(slice);
        let frustum = Frustum::from_planes(sides[0], sides[1], sides[2], sides[3], near, far);
        debug_assert!(frustum.near_far_unit_length(1e-4));
        frustum
    }

    /// Sub-frustum of cluster `(x, y, slice)`.
    pub fn cluster(&self, x: u32, y: u32, slice: u32) -> Frustum {
        self.cluster_frustum(&self.side_planes(x, y), slice)
    }
}
