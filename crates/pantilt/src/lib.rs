//! pantilt-rs: a pan-tilt gimbal camera simulator.
//!
//! A camera sits on a two-joint gimbal and pans back and forth following a
//! sinusoidal speed profile. Every other tick the scene is rendered from the
//! gimbal camera into an offscreen buffer, read back, flipped to display row
//! order and handed to a [`FrameSink`]. Every tick the scene is also drawn
//! from an orbiting main camera, either into a window or into a headless
//! target.
//!
//! # Quick Start
//!
//! ```no_run
//! use pantilt::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!     let options = SimOptions::default();
//!
//!     // Write every tenth gimbal frame to ./captures/session_<timestamp>/
//!     let sink = ImageSequenceSink::new("captures", 10)?;
//!     run(options, Box::new(sink))
//! }
//! ```
//!
//! # Live preview
//!
//! A [`PreviewSink`] keeps the newest gimbal frame for display;
//! [`run_with_preview`] draws it as an inset over the main view. Combine it
//! with other sinks through a [`FanoutSink`].
//!
//! # Headless
//!
//! [`run_headless`] drives a fixed number of ticks with a fixed time step,
//! for batch capture and tests.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![cfg_attr(test, allow(clippy::float_cmp))]

mod app;
mod clock;
mod headless;
mod rig;
mod simulation;
mod sink;

pub use app::{run, run_with_preview, App};
pub use clock::FrameClock;
pub use headless::run_headless;
pub use rig::{Rig, FIGURE_RING_RADIUS, FRUSTUM_DEPTH};
pub use simulation::{Simulation, TickReport};
pub use sink::{
    FanoutSink, ImageSequenceSink, NullSink, PreviewHandle, PreviewImage, PreviewSink,
    RecordingSink,
};

// Re-export core types
pub use pantilt_core::{
    transcode, AssetOptions, BodyId, CameraPose, CaptureScheduler, FrameSink, GimbalBodies,
    GimbalGeometry, Lens, Mat4, MechanismModel, MechanismState, PantiltError, PixelFormat, Quat,
    RenderTarget, Resolution, Result, RowOrder, SceneRenderer, SimOptions, SpeedProfile,
    TickCounter, Vec3, VirtualFrame,
};

// Re-export render types
pub use pantilt_render::{
    inset_viewport, AssetLoader, Camera, GpuRenderer, InsetViewport, ItemId, Mesh, RenderEngine,
    RenderError, Scene,
};

/// Installs `env_logger` unless a logger is already set.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
