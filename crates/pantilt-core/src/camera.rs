//! Camera poses handed to the render engine.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Perspective lens parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lens {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Lens {
    /// Creates a lens from a vertical field of view in degrees.
    #[must_use]
    pub fn from_degrees(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Returns the projection matrix (right-handed, depth in `[0, 1]`).
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}

impl Default for Lens {
    fn default() -> Self {
        Self::from_degrees(60.0, 1.0, 0.01, 100.0)
    }
}

/// A camera placed in the world.
///
/// The camera looks down its local -Z axis with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Camera-to-world transform.
    pub world: Mat4,
    /// Projection parameters.
    pub lens: Lens,
}

impl CameraPose {
    #[must_use]
    pub fn new(world: Mat4, lens: Lens) -> Self {
        Self { world, lens }
    }

    /// Builds a pose looking from `eye` towards `target`.
    #[must_use]
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3, lens: Lens) -> Self {
        Self {
            world: Mat4::look_at_rh(eye, target, up).inverse(),
            lens,
        }
    }

    /// Camera position in world space.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }

    /// Viewing direction in world space.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.world.transform_vector3(Vec3::NEG_Z).normalize()
    }

    /// Up direction in world space.
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.world.transform_vector3(Vec3::Y).normalize()
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.world.inverse()
    }

    /// Returns the projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.lens.projection_matrix()
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_at_roundtrip() {
        let pose = CameraPose::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, Lens::default());
        assert!((pose.position() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
        assert!((pose.forward() - Vec3::NEG_Z).length() < 1e-5);
        assert!((pose.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_target_projects_to_center() {
        let pose = CameraPose::look_at(Vec3::new(3.0, 1.0, 2.0), Vec3::ZERO, Vec3::Y, Lens::default());
        let clip = pose.view_projection_matrix() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_lens_degrees() {
        let lens = Lens::from_degrees(90.0, 1.5, 0.1, 10.0);
        assert!((lens.fov_y - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
