//! Error types for pantilt-rs.

use thiserror::Error;

/// The main error type for pantilt-rs operations.
#[derive(Error, Debug)]
pub enum PantiltError {
    /// A resolution with a zero dimension was requested.
    #[error("invalid resolution {width}x{height}: both dimensions must be positive")]
    InvalidResolution { width: u32, height: u32 },

    /// A frame did not match the size of the buffer it was read from.
    #[error("frame size mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    FrameSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// A configuration value is out of range.
    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },

    /// Rendering error reported by the render engine.
    #[error("render error: {0}")]
    Render(String),

    /// An asset could not be loaded.
    #[error("failed to load asset '{path}': {reason}")]
    AssetLoad { path: String, reason: String },

    /// The display sink rejected a frame.
    #[error("display sink error: {0}")]
    Sink(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for pantilt-rs operations.
pub type Result<T> = std::result::Result<T, PantiltError>;
