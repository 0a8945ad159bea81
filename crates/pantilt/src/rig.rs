//! Scene construction for the gimbal and its surroundings.

use glam::{Mat4, Quat, Vec3};

use pantilt_core::{BodyId, MechanismModel, Result, SimOptions};
use pantilt_render::{AssetLoader, GpuRenderer, ItemId, Mesh, RenderEngine, Scene};

const BASE_COLOR: Vec3 = Vec3::new(0.35, 0.35, 0.4);
const PAN_COLOR: Vec3 = Vec3::new(0.85, 0.45, 0.15);
const TILT_COLOR: Vec3 = Vec3::new(0.2, 0.2, 0.22);
const FRUSTUM_COLOR: Vec3 = Vec3::new(1.0, 0.85, 0.1);
const GRID_COLOR: Vec3 = Vec3::new(0.45, 0.45, 0.45);
const FIGURE_COLORS: [Vec3; 4] = [
    Vec3::new(0.2, 0.45, 0.8),
    Vec3::new(0.75, 0.2, 0.25),
    Vec3::new(0.25, 0.65, 0.3),
    Vec3::new(0.6, 0.35, 0.7),
];

/// Distance of the target figures from the gimbal axis.
pub const FIGURE_RING_RADIUS: f32 = 4.0;

/// Depth of the frustum wireframe in front of the gimbal camera.
pub const FRUSTUM_DEPTH: f32 = 0.6;

/// The populated scene plus which items follow which gimbal bodies.
#[derive(Debug)]
pub struct Rig {
    scene: Scene,
    bindings: Vec<(BodyId, ItemId)>,
    frustum: ItemId,
}

impl Rig {
    /// Builds the scene for `mechanism`.
    ///
    /// Gimbal parts with a configured mesh path are loaded through `loader`
    /// and scaled by `assets.gimbal_scale`; the rest are procedural boxes.
    /// Target figures are placed on a ring around the gimbal facing it.
    pub fn build(
        options: &SimOptions,
        mechanism: &MechanismModel,
        loader: &mut AssetLoader,
    ) -> Result<Self> {
        let geometry = options.gimbal;
        let bodies = mechanism.bodies();
        let assets = &options.assets;
        let mut scene = Scene::new();
        let mut bindings = Vec::new();

        scene.add("ground", Mesh::grid(10.0, 20, GRID_COLOR), Mat4::IDENTITY);

        let base = part_mesh(loader, assets.base.as_deref(), assets.gimbal_scale, BASE_COLOR, || {
            Mesh::centered_box(
                Vec3::new(0.0, geometry.base_height * 0.5, 0.0),
                Vec3::new(0.3, geometry.base_height, 0.3),
                BASE_COLOR,
            )
        })?;
        let pan = part_mesh(loader, assets.pan.as_deref(), assets.gimbal_scale, PAN_COLOR, || {
            Mesh::centered_box(
                Vec3::new(0.0, geometry.tilt_height * 0.5, 0.0),
                Vec3::new(0.22, geometry.tilt_height, 0.22),
                PAN_COLOR,
            )
        })?;
        let tilt = part_mesh(loader, assets.tilt.as_deref(), assets.gimbal_scale, TILT_COLOR, || {
            let pad = Vec3::splat(0.07);
            Mesh::cuboid(
                geometry.camera_offset.min(Vec3::ZERO) - pad,
                geometry.camera_offset.max(Vec3::ZERO) + pad,
                TILT_COLOR,
            )
        })?;

        for (label, body, mesh) in [("base", bodies.base, base), ("pan", bodies.pan, pan), ("tilt", bodies.tilt, tilt)] {
            let item = scene.add(label, mesh, mechanism.body_transform(body));
            bindings.push((body, item));
        }

        let frustum = scene.add(
            "gimbal frustum",
            Mesh::frustum_wireframe(&mechanism.lens(), FRUSTUM_DEPTH, FRUSTUM_COLOR),
            mechanism.body_transform(bodies.camera),
        );
        bindings.push((bodies.camera, frustum));

        for (i, color) in FIGURE_COLORS.iter().enumerate() {
            let figure = match assets.target.as_deref() {
                Some(path) => loader.load_obj(path, *color)?,
                None => Mesh::figure(*color),
            };
            scene.add(format!("figure {i}"), figure, figure_transform(i, FIGURE_COLORS.len()));
        }

        log::info!("scene built with {} items", scene.len());
        Ok(Self {
            scene,
            bindings,
            frustum,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn frustum(&self) -> ItemId {
        self.frustum
    }

    pub fn bindings(&self) -> &[(BodyId, ItemId)] {
        &self.bindings
    }

    /// Hands the scene to a GPU renderer with the body bindings in place.
    pub fn into_renderer(self, engine: RenderEngine) -> GpuRenderer {
        let mut renderer = GpuRenderer::new(engine, self.scene);
        renderer.set_frustum_item(self.frustum);
        for (body, item) in self.bindings {
            renderer.bind_body(body, item);
        }
        renderer
    }
}

fn part_mesh(
    loader: &mut AssetLoader,
    path: Option<&str>,
    scale: f32,
    color: Vec3,
    fallback: impl FnOnce() -> Mesh,
) -> Result<Mesh> {
    match path {
        Some(path) => {
            let mut mesh = loader.load_obj(path, color)?;
            mesh.scale(scale);
            Ok(mesh)
        }
        None => Ok(fallback()),
    }
}

/// Places figure `index` of `count` on the ring, turned to face the axis.
///
/// The first figure stands on +X, in view of the gimbal camera at rest;
/// the rest follow in the direction of positive pan.
fn figure_transform(index: usize, count: usize) -> Mat4 {
    #[allow(clippy::cast_precision_loss)]
    let angle = std::f32::consts::TAU * index as f32 / count as f32;
    let position = Quat::from_rotation_y(angle) * Vec3::X * FIGURE_RING_RADIUS;
    let facing = -position.normalize();
    // figures face -X in their own frame
    let yaw = facing.z.atan2(-facing.x);
    Mat4::from_rotation_translation(Quat::from_rotation_y(yaw), position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantilt_core::Lens;

    fn build() -> (Rig, MechanismModel) {
        let options = SimOptions::default();
        let mechanism =
            MechanismModel::new(options.max_speed, options.gimbal, options.virtual_lens()).unwrap();
        let mut loader = AssetLoader::new();
        (Rig::build(&options, &mechanism, &mut loader).unwrap(), mechanism)
    }

    #[test]
    fn test_all_moving_bodies_are_bound() {
        let (rig, mechanism) = build();
        let bodies = mechanism.bodies();
        let bound: Vec<BodyId> = rig.bindings().iter().map(|(b, _)| *b).collect();
        for body in [bodies.base, bodies.pan, bodies.tilt, bodies.camera] {
            assert!(bound.contains(&body));
        }
        assert!(rig.bindings().iter().any(|&(b, i)| b == bodies.camera && i == rig.frustum()));
    }

    #[test]
    fn test_figures_face_the_axis() {
        for i in 0..4 {
            let m = figure_transform(i, 4);
            let position = m.transform_point3(Vec3::ZERO);
            let facing = m.transform_vector3(-Vec3::X);
            assert!((position.length() - FIGURE_RING_RADIUS).abs() < 1e-4);
            assert!(facing.dot(-position.normalize()) > 0.999);
        }
    }

    #[test]
    fn test_first_figure_is_in_view_at_rest() {
        let (_, mechanism) = build();
        let pose = mechanism.camera_pose();
        let to_figure = (Vec3::new(FIGURE_RING_RADIUS, 1.2, 0.0) - pose.position()).normalize();
        let half_fov = Lens::default().fov_y * 0.5;
        assert!(pose.forward().dot(to_figure) > half_fov.cos());
    }

    #[test]
    fn test_missing_asset_fails_build() {
        let mut options = SimOptions::default();
        options.assets.base = Some("/nonexistent/base.obj".to_string());
        let mechanism =
            MechanismModel::new(options.max_speed, options.gimbal, options.virtual_lens()).unwrap();
        let mut loader = AssetLoader::new();
        assert!(Rig::build(&options, &mechanism, &mut loader).is_err());
    }
}
