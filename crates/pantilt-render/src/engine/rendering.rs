use std::ops::Range;

use pantilt_core::{RenderTarget, Resolution};

use super::textures::{aligned_bytes_per_row, ColorTarget};
use super::{RenderEngine, OFFSCREEN_FORMAT};
use crate::error::{RenderError, RenderResult};
use crate::scene::{ItemSpan, SceneBatches};

impl RenderEngine {
    /// Replaces the scene vertex data drawn by [`RenderEngine::render`].
    ///
    /// Buffers are rewritten in place and only grow when the data outgrows
    /// them.
    pub fn upload_scene(&mut self, batches: &SceneBatches) {
        self.scene_triangles.write(
            &self.device,
            &self.queue,
            &batches.triangles,
            "scene triangles",
        );
        self.scene_lines
            .write(&self.device, &self.queue, &batches.lines, "scene lines");
        log::trace!(
            "uploaded {} triangle and {} line vertices",
            batches.triangles.len(),
            batches.lines.len()
        );
    }

    /// Draws the uploaded scene into `target` with the given camera matrix.
    ///
    /// Only the vertex ranges listed in `spans` are drawn. The primary target
    /// must be drawn at its own size. The offscreen target follows the
    /// active size and is recreated when it changes. A lost or outdated
    /// window surface is reconfigured and the frame is skipped.
    pub fn render(
        &mut self,
        view_proj: glam::Mat4,
        spans: &[ItemSpan],
        target: RenderTarget,
    ) -> RenderResult<()> {
        self.update_camera_uniforms(view_proj);

        match target {
            RenderTarget::Primary => {
                if self.size != self.primary_size {
                    return Err(RenderError::SizeMismatch {
                        target: "primary",
                        expected: self.primary_size,
                        actual: self.size,
                    });
                }
                self.render_primary(spans)
            }
            RenderTarget::Offscreen => {
                self.ensure_offscreen(self.size);
                let Some(offscreen) = self.offscreen.as_ref() else {
                    return Err(RenderError::NoOffscreenTarget);
                };
                self.draw(
                    &offscreen.view,
                    &offscreen.depth.view,
                    false,
                    spans,
                    "offscreen pass",
                );
                self.offscreen_rendered = true;
                Ok(())
            }
        }
    }

    fn render_primary(&mut self, spans: &[ItemSpan]) -> RenderResult<()> {
        let Some(surface) = self.surface.as_ref() else {
            let Some(primary) = self.headless_primary.as_ref() else {
                return Err(RenderError::SurfaceLost);
            };
            self.draw(
                &primary.view,
                &self.primary_depth.view,
                true,
                spans,
                "primary pass",
            );
            return Ok(());
        };

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                return Err(RenderError::OutOfMemory);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout");
                return Ok(());
            }
            Err(wgpu::SurfaceError::Other) => {
                log::warn!("Surface error: other");
                return Ok(());
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.draw(&view, &self.primary_depth.view, true, spans, "primary pass");
        output.present();
        Ok(())
    }

    fn ensure_offscreen(&mut self, size: Resolution) {
        if self.offscreen.as_ref().is_some_and(|t| t.size == size) {
            return;
        }
        log::debug!("creating offscreen target {size}");
        self.offscreen = Some(ColorTarget::new(
            &self.device,
            size,
            OFFSCREEN_FORMAT,
            "offscreen target",
        ));
        self.offscreen_rendered = false;
    }

    fn draw(
        &self,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        primary: bool,
        spans: &[ItemSpan],
        label: &str,
    ) {
        let pipelines = if primary {
            &self.primary_pipelines
        } else {
            &self.offscreen_pipelines
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            if let Some(buffer) = self.scene_triangles.buffer() {
                render_pass.set_pipeline(&pipelines.triangles);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                for range in drawable(spans, self.scene_triangles.len(), |s| &s.triangles) {
                    render_pass.draw(range, 0..1);
                }
            }
            if let Some(buffer) = self.scene_lines.buffer() {
                render_pass.set_pipeline(&pipelines.lines);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                for range in drawable(spans, self.scene_lines.len(), |s| &s.lines) {
                    render_pass.draw(range, 0..1);
                }
            }

            if primary {
                self.inset.draw(&mut render_pass, self.primary_size);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Reads the offscreen target back as tightly packed RGBA8 rows, top row
    /// first.
    pub fn read_offscreen(&self) -> RenderResult<(Resolution, Vec<u8>)> {
        let target = self
            .offscreen
            .as_ref()
            .filter(|_| self.offscreen_rendered)
            .ok_or(RenderError::NoOffscreenTarget)?;
        self.read_texture(target, "offscreen")
    }

    /// Reads the headless primary target back as tightly packed RGBA8 rows,
    /// top row first.
    ///
    /// A window surface cannot be read back.
    pub fn read_primary(&self) -> RenderResult<(Resolution, Vec<u8>)> {
        let target = self
            .headless_primary
            .as_ref()
            .ok_or(RenderError::PrimaryNotReadable)?;
        self.read_texture(target, "primary")
    }

    fn read_texture(
        &self,
        target: &ColorTarget,
        label: &str,
    ) -> RenderResult<(Resolution, Vec<u8>)> {
        let width = target.size.width();
        let height = target.size.height();
        let bytes_per_row = aligned_bytes_per_row(width);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} readback buffer")),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("{label} copy encoder")),
            });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        // Map buffer and read data
        let buffer_slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|_| RenderError::BufferMapFailed)?
            .map_err(|_| RenderError::BufferMapFailed)?;

        // Copy data, removing row padding
        let data = buffer_slice.get_mapped_range();
        let row_bytes = width as usize * 4;
        let mut result = Vec::with_capacity(row_bytes * height as usize);
        for row in data.chunks_exact(bytes_per_row as usize) {
            result.extend_from_slice(&row[..row_bytes]);
        }

        drop(data);
        buffer.unmap();

        Ok((target.size, result))
    }
}

/// Non-empty vertex ranges of `spans` that fit in a buffer of `len` vertices.
fn drawable<'a>(
    spans: &'a [ItemSpan],
    len: u32,
    range: impl Fn(&'a ItemSpan) -> &'a Range<u32> + 'a,
) -> impl Iterator<Item = Range<u32>> + 'a {
    spans
        .iter()
        .map(range)
        .filter(move |r| !r.is_empty() && r.end <= len)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ItemId;

    fn span(id: usize, triangles: Range<u32>, lines: Range<u32>) -> ItemSpan {
        ItemSpan {
            id: ItemId(id),
            triangles,
            lines,
        }
    }

    #[test]
    fn test_drawable_skips_empty_and_stale_ranges() {
        let spans = [
            span(0, 0..36, 0..0),
            span(1, 36..36, 0..24),
            span(2, 36..72, 24..30),
        ];
        let triangles: Vec<_> = drawable(&spans, 72, |s| &s.triangles).collect();
        assert_eq!(triangles, vec![0..36, 36..72]);

        // uploaded data is shorter than the spans describe
        let lines: Vec<_> = drawable(&spans, 24, |s| &s.lines).collect();
        assert_eq!(lines, vec![0..24]);
    }
}
