//! Sinusoidal speed commands for the pan joint.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// Default oscillation amplitude in degrees.
pub const DEFAULT_AMPLITUDE_DEG: f64 = 90.0;
/// Default oscillation frequency in hertz.
pub const DEFAULT_FREQUENCY_HZ: f64 = 0.05;

/// Velocity command that makes a joint follow `A·sin(2π·f·t)` in position.
///
/// The profile has no state besides its parameters: the caller supplies the
/// elapsed time, and restarting the motion is a matter of passing `t = 0`
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedProfile {
    /// Position amplitude in degrees.
    pub amplitude_deg: f64,
    /// Oscillation frequency in hertz.
    pub frequency_hz: f64,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self::new(DEFAULT_AMPLITUDE_DEG, DEFAULT_FREQUENCY_HZ)
    }
}

impl SpeedProfile {
    #[must_use]
    pub fn new(amplitude_deg: f64, frequency_hz: f64) -> Self {
        Self {
            amplitude_deg,
            frequency_hz,
        }
    }

    /// Commanded speed at time `t` seconds, in degrees per second.
    ///
    /// `2π·f·A·cos(2π·f·t)`
    #[must_use]
    pub fn speed_deg(&self, t: f64) -> f64 {
        let omega = TAU * self.frequency_hz;
        omega * self.amplitude_deg * (omega * t).cos()
    }

    /// Commanded speed at time `t` seconds, in radians per second.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn speed_rad(&self, t: f64) -> f32 {
        self.speed_deg(t).to_radians() as f32
    }

    /// Position the speed command integrates to, in degrees.
    #[must_use]
    pub fn position_deg(&self, t: f64) -> f64 {
        self.amplitude_deg * (TAU * self.frequency_hz * t).sin()
    }

    /// Period in seconds, or `None` for a zero frequency.
    #[must_use]
    pub fn period(&self) -> Option<f64> {
        (self.frequency_hz != 0.0).then(|| 1.0 / self.frequency_hz.abs())
    }

    /// Largest speed the profile ever commands, in degrees per second.
    #[must_use]
    pub fn peak_speed_deg(&self) -> f64 {
        (TAU * self.frequency_hz * self.amplitude_deg).abs()
    }
}
