//! Rendering backend for pantilt-rs.
//!
//! This crate provides the wgpu-based rendering engine, including:
//! - GPU resource management (buffers, textures, pipelines)
//! - An offscreen target with pixel readback for the gimbal camera
//! - An inset showing the gimbal feed on the primary target
//! - A flat scene store with procedural and OBJ-loaded meshes
//! - The orbiting main-view camera

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod buffer;
pub mod camera;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod renderer;
pub mod scene;
pub mod screenshot;

pub use camera::Camera;
pub use engine::{inset_viewport, CameraUniforms, InsetViewport, RenderEngine};
pub use error::{RenderError, RenderResult};
pub use geometry::{Mesh, Topology, Vertex};
pub use loader::AssetLoader;
pub use renderer::GpuRenderer;
pub use scene::{BatchCache, ItemId, ItemSpan, Scene, SceneBatches, SceneItem};
pub use screenshot::{frame_to_rgba, save_image, ScreenshotError};
