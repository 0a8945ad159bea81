//! Orbiting camera for the main view.

use glam::{Mat4, Vec3};

use pantilt_core::{CameraPose, Lens};

/// A 3D camera for viewing the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Camera {
    /// Creates a new camera looking at the gimbal from behind and above.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(-3.5, 2.5, -5.0),
            target: Vec3::new(0.0, 1.0, 0.0),
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_3, // 60 degrees
            aspect_ratio,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Sets the aspect ratio.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.lens().projection_matrix()
    }

    /// Lens parameters of this camera.
    #[must_use]
    pub fn lens(&self) -> Lens {
        Lens {
            fov_y: self.fov,
            aspect: self.aspect_ratio,
            near: self.near,
            far: self.far,
        }
    }

    /// The camera as a pose the render engine can draw from.
    #[must_use]
    pub fn pose(&self) -> CameraPose {
        CameraPose::new(self.view_matrix().inverse(), self.lens())
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Returns the camera's right direction.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize()
    }

    /// Orbits the camera around the target.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        let radius = (self.position - self.target).length();
        let mut theta = (self.position.x - self.target.x).atan2(self.position.z - self.target.z);
        let mut phi = ((self.position.y - self.target.y) / radius).acos();

        theta -= delta_x;
        phi = (phi - delta_y).clamp(0.01, std::f32::consts::PI - 0.01);

        self.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
    }

    /// Pans the camera.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let right = self.right();
        let up = self.up;
        let offset = right * delta_x + up * delta_y;
        self.position += offset;
        self.target += offset;
    }

    /// Moves toward or away from the target.
    pub fn zoom(&mut self, delta: f32) {
        let direction = self.forward();
        let distance = (self.position - self.target).length();
        let new_distance = (distance - delta).max(0.1);
        self.position = self.target - direction * new_distance;
    }

    /// Sets the field of view in radians.
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(0.1, std::f32::consts::PI - 0.1);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_matches_view_matrix() {
        let camera = Camera::new(1.5);
        let pose = camera.pose();
        assert!(pose.view_matrix().abs_diff_eq(camera.view_matrix(), 1e-5));
        assert!((pose.position() - camera.position).length() < 1e-5);
        assert!((pose.lens.aspect - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_orbit_keeps_radius() {
        let mut camera = Camera::new(1.0);
        let radius = camera.position.distance(camera.target);
        camera.orbit(0.4, -0.2);
        assert!((camera.position.distance(camera.target) - radius).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_in_decreases_distance() {
        let mut camera = Camera::new(1.0);
        let initial = camera.position.distance(camera.target);
        camera.zoom(1.0);
        assert!(camera.position.distance(camera.target) < initial);
    }

    #[test]
    fn test_zoom_never_crosses_target() {
        let mut camera = Camera::new(1.0);
        camera.zoom(1000.0);
        assert!(camera.position.distance(camera.target) >= 0.1 - 1e-5);
    }

    #[test]
    fn test_set_fov_clamping() {
        let mut camera = Camera::new(1.0);
        camera.set_fov(0.0);
        assert!(camera.fov >= 0.1);
        camera.set_fov(std::f32::consts::PI);
        assert!(camera.fov < std::f32::consts::PI);
    }
}
