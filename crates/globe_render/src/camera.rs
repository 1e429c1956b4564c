//! Perspective camera looking at a target
//!
//! Builds view and projection matrices for the GPU and converts between
//! screen pixels, normalized device coordinates and world-space rays for
//! picking.

use globe_input::{OrbitCamera, ScreenProjector};
use globe_math::{mat4, Mat4, Ray, Vec3};

/// A right-handed perspective camera
#[derive(Clone, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Width / height of the viewport
    pub aspect: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45.0,
            near: 0.1,
            far: 1000.0,
            aspect: 1.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_fov(mut self, fov_y_degrees: f32) -> Self {
        self.fov_y = fov_y_degrees;
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Update the aspect ratio from a viewport size in pixels
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn distance_to_target(&self) -> f32 {
        self.position.distance(self.target)
    }

    pub fn view_matrix(&self) -> Mat4 {
        mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        mat4::perspective_rh(self.fov_y.to_radians(), self.aspect, self.near, self.far)
    }

    /// projection * view
    pub fn view_projection(&self) -> Mat4 {
        mat4::mul(self.projection_matrix(), self.view_matrix())
    }

    /// Pixel position to NDC: x right in [-1, 1], y up in [-1, 1]
    pub fn ndc_from_pixels(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
        let w = width.max(1.0);
        let h = height.max(1.0);
        ((x / w) * 2.0 - 1.0, -(y / h) * 2.0 + 1.0)
    }

    /// World-space ray through an NDC position
    ///
    /// Returns `None` if the camera is degenerate (target on the eye).
    pub fn ray_from_ndc(&self, ndc: (f32, f32)) -> Option<Ray> {
        let forward = (self.target - self.position).try_normalized(1e-12)?;
        let right = forward
            .cross(self.up)
            .try_normalized(1e-12)
            .unwrap_or_else(|| forward.any_perpendicular());
        let up = right.cross(forward);

        let tan_half = (self.fov_y.to_radians() * 0.5).tan();
        let dir = forward + right * (ndc.0 * tan_half * self.aspect) + up * (ndc.1 * tan_half);
        Ray::new(self.position, dir)
    }

    /// NDC position of a world point, `None` when behind the camera
    pub fn project(&self, point: Vec3) -> Option<(f32, f32)> {
        let clip = mat4::transform_point(self.view_projection(), point)?;
        Some((clip.x, clip.y))
    }
}

impl OrbitCamera for PerspectiveCamera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn target(&self) -> Vec3 {
        self.target
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }
}

impl ScreenProjector for PerspectiveCamera {
    fn project(&self, point: Vec3) -> Option<(f32, f32)> {
        PerspectiveCamera::project(self, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let camera = PerspectiveCamera::default();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.fov_y, 45.0);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
    }

    #[test]
    fn test_ndc_from_pixels() {
        assert_eq!(PerspectiveCamera::ndc_from_pixels(0.0, 0.0, 800.0, 600.0), (-1.0, 1.0));
        assert_eq!(PerspectiveCamera::ndc_from_pixels(400.0, 300.0, 800.0, 600.0), (0.0, 0.0));
        assert_eq!(PerspectiveCamera::ndc_from_pixels(800.0, 600.0, 800.0, 600.0), (1.0, -1.0));
    }

    #[test]
    fn test_center_ray_hits_target() {
        let camera = PerspectiveCamera::default();
        let ray = camera.ray_from_ndc((0.0, 0.0)).unwrap();
        assert_eq!(ray.origin, camera.position);
        assert!((ray.dir - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_project_inverts_ray() {
        let mut camera = PerspectiveCamera::default();
        camera.set_viewport(1600, 900);
        for ndc in [(0.5, 0.25), (-0.8, 0.6), (0.0, -0.9)] {
            let ray = camera.ray_from_ndc(ndc).unwrap();
            let (x, y) = camera.project(ray.at(3.0)).unwrap();
            assert!((x - ndc.0).abs() < 1e-4, "{:?} -> {}", ndc, x);
            assert!((y - ndc.1).abs() < 1e-4, "{:?} -> {}", ndc, y);
        }
    }

    #[test]
    fn test_project_behind_camera() {
        let camera = PerspectiveCamera::default();
        assert!(camera.project(Vec3::new(0.0, 0.0, 10.0)).is_none());
        let center = camera.project(Vec3::ZERO).unwrap();
        assert!(center.0.abs() < 1e-6 && center.1.abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_camera_has_no_ray() {
        let camera = PerspectiveCamera::default().with_position(Vec3::ZERO);
        assert!(camera.ray_from_ndc((0.0, 0.0)).is_none());
    }
}
