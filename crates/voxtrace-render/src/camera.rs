//! Camera and per-pixel ray generation.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use voxtrace_core::Ray;

/// Pinhole camera.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Create a new camera.
    pub fn new(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let direction = (target - position).normalize();
        Self {
            position,
            direction,
            up,
            fov,
            aspect,
            near,
            far,
        }
    }

    /// Set the camera position.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Look at a target position.
    pub fn look_at(&mut self, target: Vec3) {
        self.direction = (target - self.position).normalize();
    }

    /// Set the aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Orthonormal `(forward, right, up)` frame.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = self.direction.normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// Ray through a normalised image coordinate, `(0, 0)` top-left and
    /// `(1, 1)` bottom-right.
    pub fn ray_for_uv(&self, uv: Vec2) -> Ray {
        let (forward, right, up) = self.basis();
        let half_height = (self.fov * 0.5).tan();
        let half_width = half_height * self.aspect;
        let direction = forward
            + right * ((2.0 * uv.x - 1.0) * half_width)
            + up * ((1.0 - 2.0 * uv.y) * half_height);
        Ray::new(self.position, direction)
    }

    /// Ray through the center of pixel `(x, y)` of a `width` x `height` image.
    pub fn ray_for_pixel(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let uv = Vec2::new(
            (x as f32 + 0.5) / width as f32,
            (y as f32 + 0.5) / height as f32,
        );
        self.ray_for_uv(uv)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Get the view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn inverse_view_projection_matrix(&self) -> Mat4 {
        self.view_projection_matrix().inverse()
    }
}

/// Ray from `position` through the far-plane point under `ndc` (y up).
pub fn ray_from_inverse_view_projection(inverse_vp: Mat4, position: Vec3, ndc: Vec2) -> Ray {
    let far = inverse_vp * ndc.extend(1.0).extend(1.0);
    Ray::new(position, far.xyz() / far.w - position)
}
