//! Scene store: meshes placed in the world, flattened for drawing.

use std::ops::Range;

use glam::{Mat4, Vec3};

use crate::geometry::{Mesh, Topology, Vertex};

/// Handle to an item in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub(crate) usize);

/// A mesh with a world transform.
#[derive(Debug, Clone)]
pub struct SceneItem {
    pub label: String,
    pub mesh: Mesh,
    pub world: Mat4,
    pub visible: bool,
}

/// Where one item's vertices live inside a [`SceneBatches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpan {
    pub id: ItemId,
    pub triangles: Range<u32>,
    pub lines: Range<u32>,
}

/// World-space vertex lists ready for upload.
///
/// Triangles are expanded (three vertices each) and shaded, lines are
/// expanded to two vertices per segment. Every item is present, hidden or
/// not; visibility is applied per draw by skipping spans.
#[derive(Debug, Clone, Default)]
pub struct SceneBatches {
    pub triangles: Vec<Vertex>,
    pub lines: Vec<Vertex>,
    pub spans: Vec<ItemSpan>,
}

/// A flat list of meshes placed in the world.
#[derive(Debug, Clone)]
pub struct Scene {
    items: Vec<SceneItem>,
    light_dir: Vec3,
    revision: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            light_dir: Vec3::new(-0.4, 1.0, -0.3).normalize(),
            revision: 0,
        }
    }

    /// Adds a visible mesh at `world`.
    pub fn add(&mut self, label: impl Into<String>, mesh: Mesh, world: Mat4) -> ItemId {
        let label = label.into();
        log::debug!("adding scene item '{label}' ({} primitives)", mesh.primitive_count());
        self.items.push(SceneItem {
            label,
            mesh,
            world,
            visible: true,
        });
        self.revision += 1;
        ItemId(self.items.len() - 1)
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&SceneItem> {
        self.items.get(id.0)
    }

    /// Moves an item. Setting the transform it already has changes nothing.
    pub fn set_transform(&mut self, id: ItemId, world: Mat4) {
        if let Some(item) = self.items.get_mut(id.0) {
            if item.world != world {
                item.world = world;
                self.revision += 1;
            }
        }
    }

    /// Counter bumped whenever the geometry returned by [`Scene::batches`]
    /// changes. Visibility does not count.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Shows or hides an item.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) {
        if let Some(item) = self.items.get_mut(id.0) {
            item.visible = visible;
        }
    }

    #[must_use]
    pub fn is_visible(&self, id: ItemId) -> bool {
        self.items.get(id.0).is_some_and(|item| item.visible)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Spans of `batches` whose items are currently visible.
    pub fn visible_spans<'a>(
        &'a self,
        batches: &'a SceneBatches,
    ) -> impl Iterator<Item = &'a ItemSpan> + 'a {
        batches.spans.iter().filter(move |span| self.is_visible(span.id))
    }

    /// Flattens all items into world-space vertex lists.
    #[must_use]
    pub fn batches(&self) -> SceneBatches {
        let mut out = SceneBatches::default();
        for (index, item) in self.items.iter().enumerate() {
            let triangles_start = vertex_index(out.triangles.len());
            let lines_start = vertex_index(out.lines.len());
            let mesh = &item.mesh;
            let world = |i: u32| -> Option<(Vec3, Vec3)> {
                let v = mesh.vertices.get(i as usize)?;
                Some((
                    item.world.transform_point3(Vec3::from(v.position)),
                    Vec3::from(v.color),
                ))
            };
            match mesh.topology {
                Topology::Triangles => {
                    for tri in mesh.indices.chunks_exact(3) {
                        let (Some(a), Some(b), Some(c)) = (world(tri[0]), world(tri[1]), world(tri[2])) else {
                            continue;
                        };
                        let normal = (b.0 - a.0).cross(c.0 - a.0).normalize_or_zero();
                        let shade = 0.35 + 0.65 * normal.dot(self.light_dir).abs();
                        out.triangles.extend(
                            [a, b, c]
                                .into_iter()
                                .map(|(p, color)| Vertex::new(p, color * shade)),
                        );
                    }
                }
                Topology::Lines => {
                    for seg in mesh.indices.chunks_exact(2) {
                        let (Some(a), Some(b)) = (world(seg[0]), world(seg[1])) else {
                            continue;
                        };
                        out.lines.push(Vertex::new(a.0, a.1));
                        out.lines.push(Vertex::new(b.0, b.1));
                    }
                }
            }
            out.spans.push(ItemSpan {
                id: ItemId(index),
                triangles: triangles_start..vertex_index(out.triangles.len()),
                lines: lines_start..vertex_index(out.lines.len()),
            });
        }
        out
    }
}

fn vertex_index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// The last flattened geometry of a scene, rebuilt only when the scene's
/// revision moves.
#[derive(Debug, Default)]
pub struct BatchCache {
    revision: Option<u64>,
    batches: SceneBatches,
}

impl BatchCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds from `scene` if it changed since the last call. Returns
    /// whether a rebuild happened.
    pub fn refresh(&mut self, scene: &Scene) -> bool {
        if self.revision == Some(scene.revision()) {
            return false;
        }
        self.batches = scene.batches();
        self.revision = Some(scene.revision());
        log::trace!(
            "rebuilt scene batches: {} triangle and {} line vertices",
            self.batches.triangles.len(),
            self.batches.lines.len()
        );
        true
    }

    #[must_use]
    pub fn batches(&self) -> &SceneBatches {
        &self.batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_items_are_skipped() {
        let mut scene = Scene::new();
        let cube = scene.add("cube", Mesh::cuboid(Vec3::ZERO, Vec3::ONE, Vec3::ONE), Mat4::IDENTITY);
        let grid = scene.add("grid", Mesh::grid(1.0, 2, Vec3::ONE), Mat4::IDENTITY);

        let batches = scene.batches();
        assert_eq!(batches.triangles.len(), 36);
        assert_eq!(batches.lines.len(), 12);
        assert_eq!(
            batches.spans,
            vec![
                ItemSpan { id: cube, triangles: 0..36, lines: 0..0 },
                ItemSpan { id: grid, triangles: 36..36, lines: 0..12 },
            ]
        );

        scene.set_visible(grid, false);
        assert!(!scene.is_visible(grid));
        assert!(scene.is_visible(cube));
        let visible: Vec<ItemId> = scene.visible_spans(&batches).map(|span| span.id).collect();
        assert_eq!(visible, vec![cube]);
    }

    #[test]
    fn test_revision_tracks_geometry_only() {
        let mut scene = Scene::new();
        let id = scene.add("cube", Mesh::cuboid(Vec3::ZERO, Vec3::ONE, Vec3::ONE), Mat4::IDENTITY);
        let after_add = scene.revision();

        scene.set_visible(id, false);
        scene.set_transform(id, Mat4::IDENTITY);
        assert_eq!(scene.revision(), after_add);

        scene.set_transform(id, Mat4::from_translation(Vec3::X));
        assert_eq!(scene.revision(), after_add + 1);
    }

    #[test]
    fn test_batch_cache_rebuilds_on_change_only() {
        let mut scene = Scene::new();
        let id = scene.add("cube", Mesh::cuboid(Vec3::ZERO, Vec3::ONE, Vec3::ONE), Mat4::IDENTITY);
        let mut cache = BatchCache::new();

        assert!(cache.refresh(&scene));
        assert!(!cache.refresh(&scene));

        // Toggling visibility, as a capture does around the offscreen pass,
        // reuses the cached geometry.
        scene.set_visible(id, false);
        scene.set_visible(id, true);
        assert!(!cache.refresh(&scene));

        scene.set_transform(id, Mat4::from_translation(Vec3::Y));
        assert!(cache.refresh(&scene));
        assert!(cache.batches().triangles.iter().all(|v| v.position[1] >= 1.0 - 1e-6));
    }

    #[test]
    fn test_transform_applied() {
        let mut scene = Scene::new();
        let id = scene.add("frustum", Mesh::grid(1.0, 1, Vec3::ONE), Mat4::IDENTITY);
        scene.set_transform(id, Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
        assert!(scene.batches().lines.iter().all(|v| (v.position[1] - 5.0).abs() < 1e-6));
    }

    #[test]
    fn test_shading_stays_in_range() {
        let mut scene = Scene::new();
        scene.add("cube", Mesh::cuboid(Vec3::ZERO, Vec3::ONE, Vec3::ONE), Mat4::IDENTITY);
        for v in scene.batches().triangles {
            assert!(v.color.iter().all(|&c| (0.35..=1.0 + 1e-6).contains(&c)));
        }
    }
}
