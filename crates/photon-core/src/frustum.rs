use crate::error::Result;
use crate::plane::{intersect_three_planes, normalize_plane};
use glam::{Mat4, Vec3, Vec4};

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;
pub const BOTTOM: usize = 2;
pub const TOP: usize = 3;
pub const NEAR: usize = 4;
pub const FAR: usize = 5;

/// Six inward-facing half-spaces: left, right, bottom, top, near, far.
///
/// Planes built by [`Frustum::from_matrix`] are not unit length; call
/// [`Frustum::normalized`] before relying on metric distances (the sphere
/// test does).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract planes from a projection * view matrix with OpenGL clip depth
    /// (`-w <= z <= w`).
    pub fn from_matrix(matrix: Mat4) -> Self {
        let mut planes = Self::side_planes(matrix);
        planes[NEAR] = matrix.row(3) + matrix.row(2);
        planes[FAR] = matrix.row(3) - matrix.row(2);
        Self { planes }
    }

    /// Same as [`Frustum::from_matrix`] for `0 <= z <= w` clip depth
    /// (`Mat4::perspective_rh` and friends).
    pub fn from_matrix_zero_to_one(matrix: Mat4) -> Self {
        let mut planes = Self::side_planes(matrix);
        planes[NEAR] = matrix.row(2);
        planes[FAR] = matrix.row(3) - matrix.row(2);
        Self { planes }
    }

    fn side_planes(matrix: Mat4) -> [Vec4; 6] {
        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = matrix.row(3) + matrix.row(0);
        planes[RIGHT] = matrix.row(3) - matrix.row(0);
        planes[BOTTOM] = matrix.row(3) + matrix.row(1);
        planes[TOP] = matrix.row(3) - matrix.row(1);
        planes
    }

    pub fn from_planes(
        left: Vec4,
        right: Vec4,
        bottom: Vec4,
        top: Vec4,
        near: Vec4,
        far: Vec4,
    ) -> Self {
        Self {
            planes: [left, right, bottom, top, near, far],
        }
    }

    pub fn normalized(mut self) -> Self {
        for plane in &mut self.planes {
            *plane = normalize_plane(*plane);
        }
        self
    }

    /// Normalize only left/right/bottom/top.
    pub fn normalize_sides(mut self) -> Self {
        for plane in &mut self.planes[..NEAR] {
            *plane = normalize_plane(*plane);
        }
        self
    }

    pub fn left(&self) -> Vec4 {
        self.planes[LEFT]
    }

    pub fn right(&self) -> Vec4 {
        self.planes[RIGHT]
    }

    pub fn bottom(&self) -> Vec4 {
        self.planes[BOTTOM]
    }

    pub fn top(&self) -> Vec4 {
        self.planes[TOP]
    }

    pub fn near(&self) -> Vec4 {
        self.planes[NEAR]
    }

    pub fn far(&self) -> Vec4 {
        self.planes[FAR]
    }

    /// Inclusive sphere test: a sphere exactly tangent to a plane counts as
    /// intersecting.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let center = center.extend(1.0);
        for plane in &self.planes {
            if plane.dot(center) < -radius {
                return false;
            }
        }
        true
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.intersects_sphere(point, 0.0)
    }

    /// Whether the near and far plane normals are unit length within `eps`.
    pub fn near_far_unit_length(&self, eps: f32) -> bool {
        (self.near().truncate().length() - 1.0).abs() <= eps
            && (self.far().truncate().length() - 1.0).abs() <= eps
    }

    /// Corner points, near face first: lb, rb, rt, lt.
    pub fn corners(&self) -> Result<[Vec3; 8]> {
        let p = &self.planes;
        Ok([
            intersect_three_planes(p[LEFT], p[BOTTOM], p[NEAR])?,
            intersect_three_planes(p[RIGHT], p[BOTTOM], p[NEAR])?,
            intersect_three_planes(p[RIGHT], p[TOP], p[NEAR])?,
            intersect_three_planes(p[LEFT], p[TOP], p[NEAR])?,
            intersect_three_planes(p[LEFT], p[BOTTOM], p[FAR])?,
            intersect_three_planes(p[RIGHT], p[BOTTOM], p[FAR])?,
            intersect_three_planes(p[RIGHT], p[TOP], p[FAR])?,
            intersect_three_planes(p[LEFT], p[TOP], p[FAR])?,
        ])
    }
}
