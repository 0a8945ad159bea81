//! GPU-backed [`SceneRenderer`].

use pantilt_core::{
    BodyId, CameraPose, MechanismModel, PantiltError, RenderTarget, Resolution, Result, RowOrder,
    SceneRenderer, VirtualFrame,
};

use crate::engine::RenderEngine;
use crate::scene::{BatchCache, ItemId, ItemSpan, Scene};

/// Draws a [`Scene`] with a [`RenderEngine`].
///
/// Vertex data is uploaded again only when the scene geometry changes.
/// Visibility toggles just change which spans get drawn.
pub struct GpuRenderer {
    engine: RenderEngine,
    scene: Scene,
    cache: BatchCache,
    frustum: Option<ItemId>,
    bindings: Vec<(BodyId, ItemId)>,
}

impl GpuRenderer {
    #[must_use]
    pub fn new(engine: RenderEngine, scene: Scene) -> Self {
        Self {
            engine,
            scene,
            cache: BatchCache::new(),
            frustum: None,
            bindings: Vec::new(),
        }
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut RenderEngine {
        &mut self.engine
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Marks the scene item drawn as the gimbal camera's frustum.
    pub fn set_frustum_item(&mut self, id: ItemId) {
        self.frustum = Some(id);
    }

    /// Makes `item` follow the world transform of `body`.
    pub fn bind_body(&mut self, body: BodyId, item: ItemId) {
        self.bindings.push((body, item));
    }

    /// Whether the frustum item is currently drawn.
    pub fn frustum_visible(&self) -> bool {
        self.frustum.is_some_and(|id| self.scene.is_visible(id))
    }
}

impl SceneRenderer for GpuRenderer {
    fn sync_mechanism(&mut self, mechanism: &MechanismModel) {
        for &(body, item) in &self.bindings {
            self.scene
                .set_transform(item, mechanism.body_transform(body));
        }
    }

    fn set_frustum_visible(&mut self, visible: bool) {
        if let Some(id) = self.frustum {
            self.scene.set_visible(id, visible);
        }
    }

    fn set_size(&mut self, size: Resolution) -> Result<()> {
        self.engine.set_size(size);
        Ok(())
    }

    fn size(&self) -> Resolution {
        self.engine.size()
    }

    fn render(&mut self, pose: &CameraPose, target: RenderTarget) -> Result<()> {
        if self.cache.refresh(&self.scene) {
            self.engine.upload_scene(self.cache.batches());
        }
        let spans: Vec<ItemSpan> = self
            .scene
            .visible_spans(self.cache.batches())
            .cloned()
            .collect();
        self.engine
            .render(pose.view_projection_matrix(), &spans, target)?;
        Ok(())
    }

    fn read_pixels(&mut self, frame: &mut VirtualFrame) -> Result<()> {
        let (size, rgba) = self.engine.read_offscreen()?;
        pack_bottom_up(size, &rgba, frame)
    }
}

/// Writes top-down RGBA8 rows into `frame` bottom row first, in the frame's
/// pixel format.
pub fn pack_bottom_up(size: Resolution, rgba: &[u8], frame: &mut VirtualFrame) -> Result<()> {
    if frame.resolution() != Some(size) || rgba.len() != size.pixel_count() * 4 {
        return Err(PantiltError::FrameSizeMismatch {
            expected_width: frame.width(),
            expected_height: frame.height(),
            actual_width: size.width(),
            actual_height: size.height(),
        });
    }

    let format = frame.format();
    let src_stride = size.width() as usize * 4;
    for (i, src) in rgba.chunks_exact(src_stride).rev().enumerate() {
        if let Some(dst) = frame.row_mut(i) {
            format.pack_rgba_row(src, dst);
        }
    }
    frame.set_row_order(RowOrder::BottomUp);
    Ok(())
}
