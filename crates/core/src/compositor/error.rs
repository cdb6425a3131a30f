//! Error types for the compositor module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur rendering the bulletin.
///
/// Rendering is the last stage before upload and runs entirely locally;
/// every failure here is fatal for the run rather than retryable.
#[derive(Debug, Error)]
pub enum CompositorError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// An input file for the render is missing.
    #[error("Render input not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Render process failed.
    #[error("Render failed: {reason}")]
    RenderFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Render timed out.
    #[error("Render timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error during rendering.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompositorError {
    /// Creates a new render failed error with stderr output.
    pub fn render_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::RenderFailed {
            reason: reason.into(),
            stderr,
        }
    }
}
