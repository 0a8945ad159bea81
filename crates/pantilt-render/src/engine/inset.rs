//! Live view of the gimbal feed, drawn over a corner of the primary target.

use pantilt_core::Resolution;

use super::{DEPTH_FORMAT, OFFSCREEN_FORMAT};

/// Gap between the inset and the edges of the primary target, in pixels.
const INSET_MARGIN: u32 = 16;

/// Pixel rectangle of the inset inside the primary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsetViewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl InsetViewport {
    /// Whether pixel `(x, y)` of the primary target lies inside the inset.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x..self.x + self.width).contains(&x) && (self.y..self.y + self.height).contains(&y)
    }
}

/// Places an image of size `image` in the bottom-right corner of `primary`.
///
/// The inset is a third of the primary height, keeps the image aspect and
/// never takes more than half the primary width.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn inset_viewport(primary: Resolution, image: Resolution) -> InsetViewport {
    let aspect = image.aspect();
    let mut height = (primary.height() / 3).max(1);
    let mut width = ((height as f32 * aspect).round() as u32).max(1);
    let max_width = (primary.width() / 2).max(1);
    if width > max_width {
        width = max_width;
        height = ((width as f32 / aspect).round() as u32).max(1);
    }
    InsetViewport {
        x: primary.width().saturating_sub(width + INSET_MARGIN),
        y: primary.height().saturating_sub(height + INSET_MARGIN),
        width,
        height,
    }
}

struct InsetImage {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: Resolution,
}

/// Pipeline and texture for the inset.
pub(crate) struct InsetPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    image: Option<InsetImage>,
}

impl InsetPass {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("inset bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("inset sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("inset shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/inset.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("inset pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("inset pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            // drawn over the scene regardless of depth
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            layout,
            sampler,
            image: None,
        }
    }

    /// Copies top-down RGBA8 pixels into the inset texture, recreating it
    /// when the size changes.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: Resolution,
        rgba: &[u8],
    ) {
        if self.image.as_ref().map_or(true, |image| image.size != size) {
            self.image = Some(self.create_image(device, size));
        }
        let Some(image) = &self.image else {
            return;
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &image.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width() * 4),
                rows_per_image: Some(size.height()),
            },
            wgpu::Extent3d {
                width: size.width(),
                height: size.height(),
                depth_or_array_layers: 1,
            },
        );
    }

    fn create_image(&self, device: &wgpu::Device, size: Resolution) -> InsetImage {
        log::debug!("creating inset texture {size}");
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("inset texture"),
            size: wgpu::Extent3d {
                width: size.width(),
                height: size.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("inset bind group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        InsetImage {
            texture,
            bind_group,
            size,
        }
    }

    pub fn clear(&mut self) {
        self.image = None;
    }

    pub fn size(&self) -> Option<Resolution> {
        self.image.as_ref().map(|image| image.size)
    }

    /// Draws the inset into `pass`, which must target a primary-sized view.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, primary: Resolution) {
        let Some(image) = &self.image else {
            return;
        };
        let viewport = inset_viewport(primary, image.size);
        #[allow(clippy::cast_precision_loss)]
        pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &image.bind_group, &[]);
        pass.draw(0..6, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(width: u32, height: u32) -> Resolution {
        Resolution::new(width, height).unwrap()
    }

    #[test]
    fn test_square_feed_in_bottom_right() {
        let viewport = inset_viewport(res(1280, 720), res(640, 640));
        assert_eq!(
            viewport,
            InsetViewport {
                x: 1280 - 240 - 16,
                y: 720 - 240 - 16,
                width: 240,
                height: 240,
            }
        );
    }

    #[test]
    fn test_wide_feed_limited_to_half_width() {
        let viewport = inset_viewport(res(100, 300), res(400, 100));
        assert_eq!(viewport.width, 50);
        assert_eq!(viewport.height, 13);
        assert!(viewport.x + viewport.width <= 100);
    }

    #[test]
    fn test_tiny_primary_stays_inside() {
        let viewport = inset_viewport(res(4, 4), res(640, 640));
        assert_eq!((viewport.x, viewport.y), (0, 0));
        assert!(viewport.width >= 1 && viewport.height >= 1);
        assert!(viewport.contains(0, 0));
    }
}
