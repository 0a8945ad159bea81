//! Rendering error types.

use thiserror::Error;

use pantilt_core::{PantiltError, Resolution};

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    /// The surface reports no usable format.
    #[error("surface configuration failed")]
    SurfaceConfigurationFailed,

    /// A render pass was issued with a viewport that does not fit its target.
    #[error("viewport {actual} does not match {target} target size {expected}")]
    SizeMismatch {
        target: &'static str,
        expected: Resolution,
        actual: Resolution,
    },

    /// Pixels were requested before anything was rendered offscreen.
    #[error("offscreen target has not been rendered")]
    NoOffscreenTarget,

    /// GPU buffer mapping failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    /// Surface lost.
    #[error("surface lost")]
    SurfaceLost,

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Only a headless primary target can be read back.
    #[error("primary target is a window surface and cannot be read")]
    PrimaryNotReadable,

    /// Image bytes do not match the declared size.
    #[error("image data has {actual} bytes, expected {expected}")]
    ImageDataLength { expected: usize, actual: usize },
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for PantiltError {
    fn from(err: RenderError) -> Self {
        PantiltError::Render(err.to_string())
    }
}
