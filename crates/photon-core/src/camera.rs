use crate::frustum::Frustum;
use glam::{Mat3, Mat4, Quat, UVec2, Vec2, Vec3};

/// Per-frame camera parameters supplied by the application.
///
/// The projection uses OpenGL clip depth (`Mat4::perspective_rh_gl`), which
/// is what the depth and cluster-key passes are written against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    /// Framebuffer size in pixels.
    pub viewport: UVec2,
}

/// World-space camera frame: eye position plus unit basis vectors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraBasis {
    pub origin: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl Camera {
    pub fn new_perspective(fov_y: f32, viewport: UVec2, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y,
            near_plane: near,
            far_plane: far,
            viewport,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.viewport.x.max(1) as f32 / self.viewport.y.max(1) as f32
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect_ratio(), self.near_plane, self.far_plane)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Camera frustum in world space with unit-length planes.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.view_projection_matrix()).normalized()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn basis(&self) -> CameraBasis {
        CameraBasis {
            origin: self.position,
            right: self.right(),
            up: self.up(),
            forward: self.forward(),
        }
    }

    /// `tan(fov / 2)` horizontally and vertically.
    pub fn tan_half_fov(&self) -> Vec2 {
        let tan_y = (0.5 * self.fov_y).tan();
        Vec2::new(tan_y * self.aspect_ratio(), tan_y)
    }

    /// Distance along the view direction, the depth the slices are defined on.
    pub fn linear_depth(&self, point: Vec3) -> f32 {
        (point - self.position).dot(self.forward())
    }

    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        let mat3 = Mat3::from_cols(right, up, -forward);
        self.rotation = Quat::from_mat3(&mat3);
    }

    pub fn set_viewport(&mut self, viewport: UVec2) {
        self.viewport = viewport;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(45f32.to_radians(), UVec2::new(1280, 720), 0.1, 500.0)
    }
}
