//! The rendering engine.

mod inset;
mod pipelines;
mod rendering;
mod textures;

use std::sync::Arc;

use pantilt_core::Resolution;

use crate::buffer::{create_uniform_buffer, update_uniform_buffer, DynamicVertexBuffer};
use crate::error::{RenderError, RenderResult};
use inset::InsetPass;
use pipelines::ScenePipelines;
use textures::{ColorTarget, DepthTarget};

pub use inset::{inset_viewport, InsetViewport};

/// Color format of the offscreen (gimbal camera) target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Depth format shared by all targets.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Camera uniforms for GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// The main rendering engine backed by wgpu.
///
/// Owns two targets: the primary one (a window surface, or a plain texture
/// when headless) and an offscreen color target with readback support. Only
/// one viewport size is active at a time; rendering to a target whose size
/// differs from the active size is an error.
///
/// Scene vertices live in persistent buffers filled by
/// [`RenderEngine::upload_scene`]. An optional inset image is drawn over the
/// bottom-right corner of the primary target.
pub struct RenderEngine {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
    /// The window surface, if any.
    pub surface: Option<wgpu::Surface<'static>>,
    /// Surface configuration (also describes the headless primary target).
    pub surface_config: wgpu::SurfaceConfiguration,
    /// Clear color of both targets.
    pub clear_color: wgpu::Color,
    primary_size: Resolution,
    size: Resolution,
    primary_depth: DepthTarget,
    headless_primary: Option<ColorTarget>,
    offscreen: Option<ColorTarget>,
    offscreen_rendered: bool,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    primary_pipelines: ScenePipelines,
    offscreen_pipelines: ScenePipelines,
    scene_triangles: DynamicVertexBuffer,
    scene_lines: DynamicVertexBuffer,
    inset: InsetPass,
}

impl RenderEngine {
    /// Creates a new windowed render engine.
    pub async fn new_windowed(window: Arc<winit::window::Window>) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = request_device(&adapter, "pantilt device").await?;

        let size = window.inner_size();
        let primary = Resolution::new(size.width.max(1), size.height.max(1))
            .map_err(|_| RenderError::SurfaceConfigurationFailed)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: primary.width(),
            height: primary.height(),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        log::info!(
            "windowed engine on {} ({surface_format:?}, {primary})",
            adapter.get_info().name
        );

        Ok(Self::from_parts(
            instance,
            adapter,
            device,
            queue,
            Some(surface),
            surface_config,
            primary,
        ))
    }

    /// Creates a new headless render engine whose primary target is a texture.
    pub async fn new_headless(primary: Resolution) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = request_device(&adapter, "pantilt device (headless)").await?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: OFFSCREEN_FORMAT,
            width: primary.width(),
            height: primary.height(),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        log::info!("headless engine on {} ({primary})", adapter.get_info().name);

        Ok(Self::from_parts(
            instance,
            adapter,
            device,
            queue,
            None,
            surface_config,
            primary,
        ))
    }

    fn from_parts(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<wgpu::Surface<'static>>,
        surface_config: wgpu::SurfaceConfiguration,
        primary: Resolution,
    ) -> Self {
        let camera_buffer =
            create_uniform_buffer(&device, &CameraUniforms::default(), Some("camera uniforms"));

        let camera_bind_group_layout = pipelines::camera_bind_group_layout(&device);
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera bind group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let primary_pipelines =
            ScenePipelines::new(&device, &camera_bind_group_layout, surface_config.format);
        let offscreen_pipelines =
            ScenePipelines::new(&device, &camera_bind_group_layout, OFFSCREEN_FORMAT);

        let inset = InsetPass::new(&device, surface_config.format);

        let primary_depth = DepthTarget::new(&device, primary, "primary depth");
        let headless_primary = surface.is_none().then(|| {
            ColorTarget::new(&device, primary, surface_config.format, "headless primary")
        });

        Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            clear_color: wgpu::Color {
                r: 0.58,
                g: 0.68,
                b: 0.82,
                a: 1.0,
            },
            primary_size: primary,
            size: primary,
            primary_depth,
            headless_primary,
            offscreen: None,
            offscreen_rendered: false,
            camera_buffer,
            camera_bind_group,
            primary_pipelines,
            offscreen_pipelines,
            scene_triangles: DynamicVertexBuffer::new(),
            scene_lines: DynamicVertexBuffer::new(),
            inset,
        }
    }

    /// Resizes the primary target (window resize).
    pub fn resize(&mut self, primary: Resolution) {
        let was_primary = self.size == self.primary_size;
        self.primary_size = primary;
        self.surface_config.width = primary.width();
        self.surface_config.height = primary.height();

        if let Some(ref surface) = self.surface {
            surface.configure(&self.device, &self.surface_config);
        } else {
            self.headless_primary = Some(ColorTarget::new(
                &self.device,
                primary,
                self.surface_config.format,
                "headless primary",
            ));
        }
        self.primary_depth = DepthTarget::new(&self.device, primary, "primary depth");

        if was_primary {
            self.size = primary;
        }
        log::debug!("primary target resized to {primary}");
    }

    /// Sets the active viewport size.
    pub fn set_size(&mut self, size: Resolution) {
        self.size = size;
    }

    /// Returns the active viewport size.
    pub fn size(&self) -> Resolution {
        self.size
    }

    /// Returns the primary target size.
    pub fn primary_size(&self) -> Resolution {
        self.primary_size
    }

    /// Sets the clear color from linear RGB.
    pub fn set_clear_color(&mut self, rgb: glam::Vec3) {
        self.clear_color = wgpu::Color {
            r: f64::from(rgb.x),
            g: f64::from(rgb.y),
            b: f64::from(rgb.z),
            a: 1.0,
        };
    }

    /// Replaces the inset image with `rgba`, tightly packed RGBA8 rows of
    /// `size`, top row first.
    pub fn upload_inset(&mut self, size: Resolution, rgba: &[u8]) -> RenderResult<()> {
        let expected = size.pixel_count() * 4;
        if rgba.len() != expected {
            return Err(RenderError::ImageDataLength {
                expected,
                actual: rgba.len(),
            });
        }
        self.inset.upload(&self.device, &self.queue, size, rgba);
        Ok(())
    }

    /// Size of the current inset image, if one is shown.
    pub fn inset_size(&self) -> Option<Resolution> {
        self.inset.size()
    }

    /// Stops drawing the inset.
    pub fn clear_inset(&mut self) {
        self.inset.clear();
    }

    /// Writes the camera matrix used by the next render.
    pub fn update_camera_uniforms(&self, view_proj: glam::Mat4) {
        let uniforms = CameraUniforms {
            view_proj: view_proj.to_cols_array_2d(),
        };
        update_uniform_buffer(&self.queue, &self.camera_buffer, &uniforms);
    }
}

async fn request_device(
    adapter: &wgpu::Adapter,
    label: &str,
) -> RenderResult<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        })
        .await?;
    Ok((device, queue))
}
