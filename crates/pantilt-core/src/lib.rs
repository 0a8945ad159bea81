//! Core model for pantilt-rs.
//!
//! This crate holds everything about the gimbal rig that does not touch the
//! GPU or a window:
//! - [`MechanismModel`] for the pan/tilt joints and the camera they carry
//! - [`SpeedProfile`] for the sinusoidal pan command
//! - [`CaptureScheduler`] for the alternating offscreen capture
//! - [`transcode`] for converting read-back frames to display row order
//! - the [`SceneRenderer`] and [`FrameSink`] traits the host implements

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Angle and pixel tests compare exact values on purpose
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod camera;
pub mod capture;
pub mod error;
pub mod frame;
pub mod joint_chain;
pub mod mechanism;
pub mod options;
pub mod speed_profile;
pub mod transcode;

pub use camera::{CameraPose, Lens};
pub use capture::{CaptureScheduler, FrameSink, RenderTarget, SceneRenderer, TickCounter};
pub use error::{PantiltError, Result};
pub use frame::{PixelFormat, Resolution, RowOrder, VirtualFrame};
pub use joint_chain::{Body, BodyId, Joint, JointChain, Transform};
pub use mechanism::{GimbalBodies, GimbalGeometry, MechanismModel, MechanismState};
pub use options::{AssetOptions, SimOptions};
pub use speed_profile::SpeedProfile;

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec3};
