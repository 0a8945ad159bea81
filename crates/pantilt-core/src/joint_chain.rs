//! Parent/child body tree for articulated mechanisms.
//!
//! Bodies live in a flat arena and refer to their parent by [`BodyId`].
//! Parents are always inserted before their children, so a single forward
//! pass over the arena is enough to compose world transforms.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A rigid transformation represented as separate components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation component.
    pub translation: Vec3,
    /// Rotation component as a quaternion.
    pub rotation: Quat,
    /// Scale component.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates a transform from a translation.
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Creates a transform from a rotation.
    #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    /// Sets the rotation, keeping translation and scale.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Converts this transform to a Mat4.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Handle to a body in a [`JointChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(usize);

impl BodyId {
    /// Index of the body in its chain.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a body moves relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Joint {
    /// Rigidly attached.
    Fixed,
    /// Rotates about `axis` (in the body's own frame) by the joint angle.
    Revolute { axis: Vec3 },
}

impl Joint {
    /// Revolute joint about the vertical axis.
    pub const PAN: Joint = Joint::Revolute { axis: Vec3::Y };
    /// Revolute joint about the lateral axis.
    pub const TILT: Joint = Joint::Revolute { axis: Vec3::Z };

    /// Rotation produced by this joint at `angle` radians.
    #[must_use]
    pub fn rotation(self, angle: f32) -> Quat {
        match self {
            Joint::Fixed => Quat::IDENTITY,
            Joint::Revolute { axis } => Quat::from_axis_angle(axis.normalize(), angle),
        }
    }
}

/// A single rigid body in the chain.
#[derive(Debug, Clone)]
pub struct Body {
    label: &'static str,
    parent: Option<BodyId>,
    offset: Transform,
    joint: Joint,
}

impl Body {
    /// Human readable label used in logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub fn parent(&self) -> Option<BodyId> {
        self.parent
    }

    /// Placement of the joint frame relative to the parent body.
    #[must_use]
    pub fn offset(&self) -> Transform {
        self.offset
    }

    #[must_use]
    pub fn joint(&self) -> Joint {
        self.joint
    }

    /// Transform of this body relative to its parent at the given joint angle.
    #[must_use]
    pub fn local_matrix(&self, angle: f32) -> Mat4 {
        self.offset.to_matrix() * Mat4::from_quat(self.joint.rotation(angle))
    }
}

/// An arena-backed tree of bodies.
#[derive(Debug, Clone, Default)]
pub struct JointChain {
    bodies: Vec<Body>,
}

impl JointChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a body with no parent.
    pub fn add_root(&mut self, label: &'static str, offset: Transform) -> BodyId {
        self.push(Body {
            label,
            parent: None,
            offset,
            joint: Joint::Fixed,
        })
    }

    /// Attaches a body to `parent`.
    ///
    /// # Panics
    /// Panics if `parent` does not belong to this chain.
    pub fn attach(
        &mut self,
        parent: BodyId,
        label: &'static str,
        offset: Transform,
        joint: Joint,
    ) -> BodyId {
        assert!(parent.0 < self.bodies.len(), "parent body out of range");
        self.push(Body {
            label,
            parent: Some(parent),
            offset,
            joint,
        })
    }

    fn push(&mut self, body: Body) -> BodyId {
        let id = BodyId(self.bodies.len());
        self.bodies.push(body);
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.0)
    }

    /// Iterates over all bodies with their handles, parents first.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    /// World transform of a single body.
    ///
    /// `angle_of` supplies the current joint angle for each body; it is only
    /// consulted for revolute joints.
    #[must_use]
    pub fn world_transform(&self, id: BodyId, angle_of: impl Fn(BodyId) -> f32) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let body = &self.bodies[current.0];
            matrix = body.local_matrix(angle_of(current)) * matrix;
            cursor = body.parent;
        }
        matrix
    }

    /// World transforms of every body, indexed by [`BodyId::index`].
    #[must_use]
    pub fn world_transforms(&self, angle_of: impl Fn(BodyId) -> f32) -> Vec<Mat4> {
        let mut out: Vec<Mat4> = Vec::with_capacity(self.bodies.len());
        for (i, body) in self.bodies.iter().enumerate() {
            let local = body.local_matrix(angle_of(BodyId(i)));
            let world = match body.parent {
                Some(parent) => out[parent.0] * local,
                None => local,
            };
            out.push(world);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn two_link() -> (JointChain, BodyId, BodyId, BodyId) {
        let mut chain = JointChain::new();
        let base = chain.add_root("base", Transform::identity());
        let arm = chain.attach(
            base,
            "arm",
            Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            Joint::PAN,
        );
        let tip = chain.attach(
            arm,
            "tip",
            Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            Joint::Fixed,
        );
        (chain, base, arm, tip)
    }

    #[test]
    fn test_parents_precede_children() {
        let (chain, base, arm, tip) = two_link();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.body(arm).unwrap().parent(), Some(base));
        assert_eq!(chain.body(tip).unwrap().parent(), Some(arm));
        for (id, body) in chain.iter() {
            if let Some(parent) = body.parent() {
                assert!(parent < id);
            }
        }
    }

    #[test]
    fn test_world_transform_composes_rotation() {
        let (chain, _, arm, tip) = two_link();
        let angle_of = |id: BodyId| if id == arm { FRAC_PI_2 } else { 0.0 };

        let tip_pos = chain.world_transform(tip, angle_of).transform_point3(Vec3::ZERO);
        // +X rotated a quarter turn about +Y lands on -Z.
        assert!((tip_pos - Vec3::new(0.0, 1.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_world_transforms_match_single_lookup() {
        let (chain, _, arm, _) = two_link();
        let angle_of = |id: BodyId| if id == arm { 0.3 } else { 0.0 };
        let all = chain.world_transforms(angle_of);
        for (id, _) in chain.iter() {
            let single = chain.world_transform(id, angle_of);
            assert!(all[id.index()].abs_diff_eq(single, 1e-6));
        }
    }

    #[test]
    fn test_fixed_joint_ignores_angle() {
        assert_eq!(Joint::Fixed.rotation(1.0), Quat::IDENTITY);
    }
}
