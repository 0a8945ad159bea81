//! GPU buffer helpers.

use wgpu::util::DeviceExt;

/// A vertex buffer that is rewritten in place and only reallocated when the
/// data outgrows it.
#[derive(Debug, Default)]
pub struct DynamicVertexBuffer {
    buffer: Option<wgpu::Buffer>,
    len: u32,
}

impl DynamicVertexBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with `data`.
    pub fn write<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
        label: &str,
    ) {
        self.len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        if data.is_empty() {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let needed = bytes.len() as wgpu::BufferAddress;
        let capacity = self.buffer.as_ref().map_or(0, wgpu::Buffer::size);
        if capacity < needed {
            let size = grown_capacity(capacity, needed);
            log::debug!("allocating {size} bytes for {label}");
            self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        if let Some(buffer) = &self.buffer {
            queue.write_buffer(buffer, 0, bytes);
        }
    }

    /// The buffer, if anything has been written to it.
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref().filter(|_| self.len > 0)
    }

    /// Number of elements last written.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Next buffer size able to hold `needed` bytes, doubling from `current`.
fn grown_capacity(current: u64, needed: u64) -> u64 {
    let mut size = current.max(wgpu::COPY_BUFFER_ALIGNMENT * 64);
    while size < needed {
        size *= 2;
    }
    size
}

/// Creates a uniform buffer from data.
pub fn create_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &T,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::bytes_of(data),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Overwrites a uniform buffer.
pub fn update_uniform_buffer<T: bytemuck::Pod>(queue: &wgpu::Queue, buffer: &wgpu::Buffer, data: &T) {
    queue.write_buffer(buffer, 0, bytemuck::bytes_of(data));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grown_capacity() {
        assert_eq!(grown_capacity(0, 24), 256);
        assert_eq!(grown_capacity(256, 257), 512);
        assert_eq!(grown_capacity(1024, 5000), 8192);
        assert_eq!(grown_capacity(4096, 100), 4096);
    }
}
