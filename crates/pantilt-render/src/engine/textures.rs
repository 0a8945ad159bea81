use pantilt_core::Resolution;

use super::DEPTH_FORMAT;

fn extent(size: Resolution) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width(),
        height: size.height(),
        depth_or_array_layers: 1,
    }
}

/// A depth buffer for one render target.
pub(crate) struct DepthTarget {
    #[allow(dead_code)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthTarget {
    pub fn new(device: &wgpu::Device, size: Resolution, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// A color texture with its own depth buffer that can be copied out.
pub(crate) struct ColorTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth: DepthTarget,
    pub size: Resolution,
}

impl ColorTarget {
    pub fn new(
        device: &wgpu::Device,
        size: Resolution,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = DepthTarget::new(device, size, label);
        Self {
            texture,
            view,
            depth,
            size,
        }
    }
}

/// Calculates bytes per row with proper alignment for wgpu buffer copies.
pub(crate) fn aligned_bytes_per_row(width: u32) -> u32 {
    let bytes_per_pixel = 4u32; // RGBA8
    let unaligned = width * bytes_per_pixel;
    unaligned.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
        assert_eq!(aligned_bytes_per_row(640), 2560);
        assert_eq!(aligned_bytes_per_row(1), 256);
    }
}
