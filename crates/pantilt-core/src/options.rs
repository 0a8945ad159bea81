//! Configuration options for the gimbal rig.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::Lens;
use crate::error::{PantiltError, Result};
use crate::frame::{PixelFormat, Resolution};
use crate::mechanism::{GimbalGeometry, DEFAULT_MAX_SPEED};
use crate::speed_profile::{SpeedProfile, DEFAULT_AMPLITUDE_DEG, DEFAULT_FREQUENCY_HZ};

/// Optional mesh files for the scene.
///
/// Paths are passed through to the asset loader untouched. Parts without a
/// path are drawn with procedural geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetOptions {
    /// Mesh for the fixed base.
    pub base: Option<String>,
    /// Mesh for the pan body.
    pub pan: Option<String>,
    /// Mesh for the tilt body.
    pub tilt: Option<String>,
    /// Mesh for the figure the gimbal camera looks at.
    pub target: Option<String>,
    /// Uniform scale applied to loaded gimbal meshes.
    pub gimbal_scale: f32,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            base: None,
            pan: None,
            tilt: None,
            target: None,
            gimbal_scale: 1.0,
        }
    }
}

/// Options fixed at construction of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Size of the gimbal camera's offscreen buffer.
    pub virtual_resolution: Resolution,

    /// Size of the primary window (or headless primary target).
    pub primary_resolution: Resolution,

    /// Joint speed limit in radians per second.
    pub max_speed: f32,

    /// Pan oscillation amplitude in degrees.
    pub amplitude_deg: f64,

    /// Pan oscillation frequency in hertz.
    pub frequency_hz: f64,

    /// Channel order of captured frames.
    pub pixel_format: PixelFormat,

    /// Gimbal dimensions.
    pub gimbal: GimbalGeometry,

    /// Gimbal camera vertical field of view in degrees.
    pub virtual_fov_deg: f32,

    /// Gimbal camera near clipping plane.
    pub virtual_near: f32,

    /// Gimbal camera far clipping plane.
    pub virtual_far: f32,

    /// Clear color of both render targets.
    pub background_color: Vec3,

    /// Mesh files.
    pub assets: AssetOptions,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            virtual_resolution: Resolution::DEFAULT_VIRTUAL,
            primary_resolution: Resolution::DEFAULT_PRIMARY,
            max_speed: DEFAULT_MAX_SPEED,
            amplitude_deg: DEFAULT_AMPLITUDE_DEG,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            pixel_format: PixelFormat::Bgr8,
            gimbal: GimbalGeometry::default(),
            virtual_fov_deg: 60.0,
            virtual_near: 0.01,
            virtual_far: 100.0,
            background_color: Vec3::new(0.58, 0.68, 0.82),
            assets: AssetOptions::default(),
        }
    }
}

impl SimOptions {
    /// Parses options from a JSON string. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::info!("loading options from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    /// Serializes the options as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks value ranges that the types alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.max_speed.is_finite() || self.max_speed < 0.0 {
            return Err(invalid("max_speed", "must be finite and non-negative"));
        }
        if !self.amplitude_deg.is_finite() {
            return Err(invalid("amplitude_deg", "must be finite"));
        }
        if !self.frequency_hz.is_finite() {
            return Err(invalid("frequency_hz", "must be finite"));
        }
        if !(self.virtual_fov_deg > 0.0 && self.virtual_fov_deg < 180.0) {
            return Err(invalid("virtual_fov_deg", "must be in (0, 180)"));
        }
        if !(self.virtual_near > 0.0 && self.virtual_far > self.virtual_near) {
            return Err(invalid("virtual_near", "require 0 < virtual_near < virtual_far"));
        }
        if !(self.assets.gimbal_scale > 0.0) {
            return Err(invalid("assets.gimbal_scale", "must be positive"));
        }
        Ok(())
    }

    /// The pan speed profile described by these options.
    #[must_use]
    pub fn speed_profile(&self) -> SpeedProfile {
        SpeedProfile::new(self.amplitude_deg, self.frequency_hz)
    }

    /// The gimbal camera lens, with aspect taken from the virtual resolution.
    #[must_use]
    pub fn virtual_lens(&self) -> Lens {
        Lens::from_degrees(
            self.virtual_fov_deg,
            self.virtual_resolution.aspect(),
            self.virtual_near,
            self.virtual_far,
        )
    }
}

fn invalid(name: &'static str, reason: &str) -> PantiltError {
    PantiltError::InvalidOption {
        name,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SimOptions::default();
        assert_eq!(options.virtual_resolution.width(), 640);
        assert_eq!(options.virtual_resolution.height(), 640);
        assert_eq!(options.max_speed, 0.5);
        assert_eq!(options.amplitude_deg, 90.0);
        assert_eq!(options.frequency_hz, 0.05);
        assert_eq!(options.pixel_format, PixelFormat::Bgr8);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = SimOptions::from_json_str(r#"{ "max_speed": 1.5, "pixel_format": "Rgba8" }"#).unwrap();
        assert_eq!(options.max_speed, 1.5);
        assert_eq!(options.pixel_format, PixelFormat::Rgba8);
        assert_eq!(options.frequency_hz, 0.05);
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let err = SimOptions::from_json_str(r#"{ "virtual_resolution": [0, 640] }"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(SimOptions::from_json_str(r#"{ "max_speed": -1.0 }"#).is_err());
        assert!(SimOptions::from_json_str(r#"{ "virtual_fov_deg": 0.0 }"#).is_err());
        assert!(SimOptions::from_json_str(r#"{ "virtual_near": 2.0, "virtual_far": 1.0 }"#).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let options = SimOptions::default();
        let json = options.to_json_string().unwrap();
        let back = SimOptions::from_json_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_virtual_lens_aspect() {
        let mut options = SimOptions::default();
        options.virtual_resolution = Resolution::new(800, 400).unwrap();
        assert!((options.virtual_lens().aspect - 2.0).abs() < 1e-6);
    }
}
