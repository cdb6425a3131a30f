//! Upload and platform description.
//!
//! Publishing is platform-specific twice over: the description has to read
//! right for the platform's audience, and the upload itself goes through
//! the platform's own flow (typically a driven browser session). The
//! description round-trips the LLM here because each platform phrases its
//! own; the upload is an opaque external command so the heavyweight
//! browser machinery stays out of this crate.

mod command;

pub use command::CommandPublisher;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::LlmError;

/// Errors that can occur composing the description or uploading.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The description reply did not contain the configured separator.
    #[error("description reply is missing the preamble separator")]
    MissingMarker,

    /// Uploader command not found.
    #[error("uploader command not found: {command}")]
    UploaderNotFound { command: String },

    /// Uploader command exited non-zero.
    #[error("upload failed: {reason}")]
    UploadFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// I/O error running the uploader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::MissingMarker => true,
            // Upload flows fail transiently all the time (sessions expire,
            // pages load slow); a missing binary never fixes itself.
            Self::UploadFailed { .. } => true,
            Self::UploaderNotFound { .. } => false,
            Self::Io(_) => false,
        }
    }
}

/// A platform publisher.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the name of this publisher implementation.
    fn name(&self) -> &str;

    /// Composes the platform description for a finished script.
    async fn compose_description(&self, script: &str) -> Result<String, PublishError>;

    /// Uploads the rendered video with its description.
    async fn publish(&self, video: &Path, description: &str) -> Result<(), PublishError>;
}
