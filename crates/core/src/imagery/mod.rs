//! Background image generation and post-processing.
//!
//! [`ImageGenerator`] produces the day's raw background from a fixed
//! prompt; [`ImagePostProcessor`] turns it into the letterboxed, blurred
//! frame the compositor expects. Generation is a remote asynchronous job
//! polled under a bounded budget; post-processing is local and
//! deterministic, so its failures are config or data errors, never
//! something a retry would fix.

mod blur;
mod wanxiang;

pub use blur::BlurLetterbox;
pub use wanxiang::WanxiangGenerator;

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::RetryError;

/// Errors that can occur generating or processing images.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the vendor API.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The vendor reported the generation task as failed.
    #[error("generation task failed: {0}")]
    TaskFailed(String),

    /// Malformed vendor response.
    #[error("JSON error: {0}")]
    Json(String),

    /// The asynchronous task never finished inside the polling budget.
    #[error(transparent)]
    Poll(#[from] RetryError),

    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The processed image could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

impl ImageError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::TaskFailed(_) | Self::Json(_) | Self::Poll(_) => false,
            Self::Decode(_) | Self::Encode(_) => false,
        }
    }
}

/// A text-to-image engine.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the name of this generator implementation.
    fn name(&self) -> &str;

    /// Generates an image for `prompt`, returning the encoded bytes.
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ImageError>;
}

/// A local image transform applied between generation and compositing.
pub trait ImagePostProcessor: Send + Sync {
    /// Returns the name of this processor implementation.
    fn name(&self) -> &str;

    /// Transforms raw image bytes into the frame handed to the compositor.
    fn process(&self, raw: &[u8]) -> Result<Vec<u8>, ImageError>;
}
