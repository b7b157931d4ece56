//! Error types for the renderer.

use lumen_raytrace::AccelError;
use thiserror::Error;

/// Errors that can occur while configuring or driving the renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Invalid render settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Scene construction failed.
    #[error(transparent)]
    Accel(#[from] AccelError),

    /// The camera aspect ratio disagrees with the configured resolution.
    #[error("camera aspect {camera_aspect} does not match {width}x{height}")]
    ResolutionMismatch {
        /// Configured width in pixels.
        width: u32,
        /// Configured height in pixels.
        height: u32,
        /// Aspect ratio cached in the camera.
        camera_aspect: f32,
    },
}

/// Result type for renderer operations.
pub type Result<T> = std::result::Result<T, RenderError>;
