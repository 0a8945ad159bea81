//! Two-axis pan/tilt mechanism model.
//!
//! The mechanism stores commanded joint speeds exactly as given and only
//! saturates them when integrating. A speed above the limit is therefore
//! re-applied, and re-clamped, on every tick until it is overwritten.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraPose, Lens};
use crate::error::{PantiltError, Result};
use crate::joint_chain::{BodyId, Joint, JointChain, Transform};

/// Default joint speed limit in radians per second.
pub const DEFAULT_MAX_SPEED: f32 = 0.5;

/// Physical layout of the gimbal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GimbalGeometry {
    /// Height of the pan joint above the base origin.
    pub base_height: f32,
    /// Height of the tilt joint above the pan joint.
    pub tilt_height: f32,
    /// Camera position in the tilt body's frame.
    pub camera_offset: Vec3,
    /// Camera yaw in the tilt body's frame, in degrees.
    pub camera_yaw_deg: f32,
}

impl Default for GimbalGeometry {
    fn default() -> Self {
        Self {
            base_height: 1.0,
            tilt_height: 0.35,
            camera_offset: Vec3::new(0.3, 0.0, 0.0),
            camera_yaw_deg: -90.0,
        }
    }
}

/// Handles to the bodies of a gimbal, resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GimbalBodies {
    pub base: BodyId,
    pub pan: BodyId,
    pub tilt: BodyId,
    pub camera: BodyId,
}

/// Kinematic state of the gimbal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MechanismState {
    /// Accumulated pan angle in radians, never wrapped.
    pub pan_angle: f32,
    /// Accumulated tilt angle in radians, never wrapped.
    pub tilt_angle: f32,
    /// Commanded pan speed in radians per second, stored unclamped.
    pub pan_speed: f32,
    /// Commanded tilt speed in radians per second, stored unclamped.
    pub tilt_speed: f32,
    /// Speed ceiling applied at integration time.
    pub max_speed: f32,
}

/// A pan/tilt gimbal carrying a camera.
#[derive(Debug, Clone)]
pub struct MechanismModel {
    state: MechanismState,
    chain: JointChain,
    bodies: GimbalBodies,
    lens: Lens,
}

impl MechanismModel {
    /// Builds the joint chain for `geometry`.
    ///
    /// # Errors
    /// Returns [`PantiltError::InvalidOption`] if `max_speed` is negative or
    /// not finite.
    pub fn new(max_speed: f32, geometry: GimbalGeometry, lens: Lens) -> Result<Self> {
        if !max_speed.is_finite() || max_speed < 0.0 {
            return Err(PantiltError::InvalidOption {
                name: "max_speed",
                reason: format!("must be a finite non-negative speed, got {max_speed}"),
            });
        }

        let mut chain = JointChain::new();
        let base = chain.add_root("base", Transform::identity());
        let pan = chain.attach(
            base,
            "pan",
            Transform::from_translation(Vec3::new(0.0, geometry.base_height, 0.0)),
            Joint::PAN,
        );
        let tilt = chain.attach(
            pan,
            "tilt",
            Transform::from_translation(Vec3::new(0.0, geometry.tilt_height, 0.0)),
            Joint::TILT,
        );
        let camera = chain.attach(
            tilt,
            "camera",
            Transform::from_translation(geometry.camera_offset)
                .with_rotation(Quat::from_rotation_y(geometry.camera_yaw_deg.to_radians())),
            Joint::Fixed,
        );

        Ok(Self {
            state: MechanismState {
                pan_angle: 0.0,
                tilt_angle: 0.0,
                pan_speed: 0.0,
                tilt_speed: 0.0,
                max_speed,
            },
            chain,
            bodies: GimbalBodies {
                base,
                pan,
                tilt,
                camera,
            },
            lens,
        })
    }

    /// Stores a commanded pan speed without validation.
    pub fn set_pan_speed(&mut self, rad_per_sec: f32) {
        self.state.pan_speed = rad_per_sec;
    }

    /// Stores a commanded tilt speed without validation.
    pub fn set_tilt_speed(&mut self, rad_per_sec: f32) {
        self.state.tilt_speed = rad_per_sec;
    }

    /// Integrates both joints over `dt` seconds.
    ///
    /// Each axis advances by its stored speed clamped to `max_speed`. A
    /// non-positive or non-finite `dt` leaves the angles unchanged.
    pub fn update(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            log::trace!("skipping integration step with dt = {dt}");
            return;
        }
        let max = self.state.max_speed;
        self.state.pan_angle += self.state.pan_speed.clamp(-max, max) * dt;
        self.state.tilt_angle += self.state.tilt_speed.clamp(-max, max) * dt;
    }

    #[must_use]
    pub fn pan_angle(&self) -> f32 {
        self.state.pan_angle
    }

    #[must_use]
    pub fn tilt_angle(&self) -> f32 {
        self.state.tilt_angle
    }

    #[must_use]
    pub fn pan_speed(&self) -> f32 {
        self.state.pan_speed
    }

    #[must_use]
    pub fn tilt_speed(&self) -> f32 {
        self.state.tilt_speed
    }

    #[must_use]
    pub fn max_speed(&self) -> f32 {
        self.state.max_speed
    }

    /// Snapshot of the kinematic state.
    #[must_use]
    pub fn state(&self) -> MechanismState {
        self.state
    }

    /// The body handles of this gimbal.
    #[must_use]
    pub fn bodies(&self) -> GimbalBodies {
        self.bodies
    }

    /// The underlying joint chain.
    #[must_use]
    pub fn chain(&self) -> &JointChain {
        &self.chain
    }

    /// The camera lens.
    #[must_use]
    pub fn lens(&self) -> Lens {
        self.lens
    }

    fn joint_angle(&self, id: BodyId) -> f32 {
        if id == self.bodies.pan {
            self.state.pan_angle
        } else if id == self.bodies.tilt {
            self.state.tilt_angle
        } else {
            0.0
        }
    }

    /// World transform of one body at the current joint angles.
    #[must_use]
    pub fn body_transform(&self, id: BodyId) -> Mat4 {
        self.chain.world_transform(id, |b| self.joint_angle(b))
    }

    /// World transforms of every body, indexed by [`BodyId::index`].
    #[must_use]
    pub fn body_transforms(&self) -> Vec<Mat4> {
        self.chain.world_transforms(|b| self.joint_angle(b))
    }

    /// Pose of the gimbal camera derived from the joint chain.
    #[must_use]
    pub fn camera_pose(&self) -> CameraPose {
        CameraPose::new(self.body_transform(self.bodies.camera), self.lens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    fn gimbal() -> MechanismModel {
        MechanismModel::new(DEFAULT_MAX_SPEED, GimbalGeometry::default(), Lens::default()).unwrap()
    }

    #[test]
    fn test_rejects_bad_max_speed() {
        let geometry = GimbalGeometry::default();
        assert!(MechanismModel::new(-0.1, geometry, Lens::default()).is_err());
        assert!(MechanismModel::new(f32::NAN, geometry, Lens::default()).is_err());
        assert!(MechanismModel::new(0.0, geometry, Lens::default()).is_ok());
    }

    #[test]
    fn test_chain_layout() {
        let mut m = gimbal();
        let bodies = m.bodies();
        let chain = m.chain();
        assert_eq!(chain.len(), 4);

        // every parent comes before its child
        for (id, body) in chain.iter() {
            if let Some(parent) = body.parent() {
                assert!(parent.index() < id.index(), "{} before its parent", body.label());
            }
        }
        assert_eq!(chain.body(bodies.base).unwrap().parent(), None);
        assert_eq!(chain.body(bodies.pan).unwrap().parent(), Some(bodies.base));
        assert_eq!(chain.body(bodies.tilt).unwrap().parent(), Some(bodies.pan));
        assert_eq!(chain.body(bodies.camera).unwrap().parent(), Some(bodies.tilt));
        assert!(matches!(chain.body(bodies.pan).unwrap().joint(), Joint::Revolute { .. }));
        assert!(matches!(chain.body(bodies.camera).unwrap().joint(), Joint::Fixed));

        m.set_pan_speed(0.4);
        m.set_tilt_speed(0.2);
        m.update(1.0);
        let (pan, tilt) = (m.pan_angle(), m.tilt_angle());
        let world = m.chain().world_transform(bodies.camera, |b| {
            if b == bodies.pan {
                pan
            } else if b == bodies.tilt {
                tilt
            } else {
                0.0
            }
        });
        let pose = m.camera_pose();
        assert!(world.abs_diff_eq(pose.world, 1e-6));
    }

    #[test]
    fn test_set_speed_stores_raw_value() {
        let mut m = gimbal();
        m.set_pan_speed(3.0);
        m.set_tilt_speed(-7.5);
        assert_eq!(m.pan_speed(), 3.0);
        assert_eq!(m.tilt_speed(), -7.5);
    }

    #[test]
    fn test_update_below_limit_is_linear() {
        let mut m = gimbal();
        m.set_pan_speed(0.25);
        m.set_tilt_speed(-0.1);
        m.update(0.5);
        assert_eq!(m.pan_angle(), 0.25 * 0.5);
        assert_eq!(m.tilt_angle(), -0.1 * 0.5);
    }

    #[test]
    fn test_clamped_every_tick_not_at_set_time() {
        let mut m = gimbal();
        m.set_pan_speed(10.0);
        m.set_tilt_speed(-10.0);
        for _ in 0..4 {
            m.update(0.25);
        }
        assert!((m.pan_angle() - 0.5).abs() < 1e-6);
        assert!((m.tilt_angle() + 0.5).abs() < 1e-6);
        // The stored command is still the raw value.
        assert_eq!(m.pan_speed(), 10.0);
    }

    #[test]
    fn test_non_positive_dt_is_noop() {
        let mut m = gimbal();
        m.set_pan_speed(0.3);
        m.update(0.0);
        m.update(-0.1);
        m.update(f32::NAN);
        assert_eq!(m.pan_angle(), 0.0);
        assert_eq!(m.tilt_angle(), 0.0);
    }

    #[test]
    fn test_angles_do_not_wrap() {
        let mut m = gimbal();
        m.set_pan_speed(DEFAULT_MAX_SPEED);
        for _ in 0..100 {
            m.update(1.0);
        }
        assert!(m.pan_angle() > std::f32::consts::TAU);
    }

    #[test]
    fn test_camera_looks_along_x_at_rest() {
        let m = gimbal();
        let pose = m.camera_pose();
        assert!((pose.forward() - Vec3::X).length() < 1e-5);
        assert!((pose.position() - Vec3::new(0.3, 1.35, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_pan_rotates_camera_about_vertical() {
        let mut m = gimbal();
        m.set_pan_speed(DEFAULT_MAX_SPEED);
        // Quarter turn at the speed limit.
        m.update(FRAC_PI_2 / DEFAULT_MAX_SPEED);
        let pose = m.camera_pose();
        assert!((pose.forward() - Vec3::NEG_Z).length() < 1e-4);
        assert!((pose.position().y - 1.35).abs() < 1e-5);
    }

    #[test]
    fn test_tilt_pitches_camera() {
        let mut m = gimbal();
        m.set_tilt_speed(DEFAULT_MAX_SPEED);
        m.update(0.4);
        let forward = m.camera_pose().forward();
        assert!(forward.y > 0.0, "positive tilt should pitch the camera up");
        assert!(forward.z.abs() < 1e-5);
    }

    #[test]
    fn test_camera_pose_matches_chain() {
        let mut m = gimbal();
        m.set_pan_speed(0.2);
        m.set_tilt_speed(0.1);
        m.update(1.0);
        let all = m.body_transforms();
        let camera = m.bodies().camera;
        assert!(all[camera.index()].abs_diff_eq(m.camera_pose().world, 1e-6));
    }

    proptest! {
        #[test]
        fn update_is_saturating_linear(speed in -5.0f32..5.0, dt in 0.0001f32..1.0) {
            let mut m = gimbal();
            m.set_pan_speed(speed);
            m.set_tilt_speed(-speed);
            m.update(dt);
            let effective = speed.clamp(-DEFAULT_MAX_SPEED, DEFAULT_MAX_SPEED);
            prop_assert_eq!(m.pan_angle(), effective * dt);
            prop_assert_eq!(m.tilt_angle(), -effective * dt);
        }

        #[test]
        fn constant_overspeed_accumulates_at_limit(
            speed in 0.5001f32..50.0,
            dt in 0.001f32..0.1,
            ticks in 1usize..200,
        ) {
            let mut m = gimbal();
            m.set_pan_speed(speed);
            for _ in 0..ticks {
                m.update(dt);
            }
            #[allow(clippy::cast_precision_loss)]
            let expected = DEFAULT_MAX_SPEED * dt * ticks as f32;
            prop_assert!((m.pan_angle() - expected).abs() <= expected * 1e-4);
        }
    }
}
