//! Speech synthesis.
//!
//! Turns the narration script into audio plus the per-sentence timing the
//! subtitle builder consumes. Two backends are provided: DashScope sambert
//! (single call, timestamps in the response) and Baidu long-form TTS
//! (asynchronous job, polled to completion under a bounded retry budget).

mod baidu;
mod dashscope;

pub use baidu::BaiduLongformSynthesizer;
pub use dashscope::DashScopeSynthesizer;

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::RetryError;
use crate::subtitle::TimedSegment;

/// Narration audio together with its sentence timing.
#[derive(Debug, Clone)]
pub struct SpeechClip {
    /// Encoded audio bytes (mp3).
    pub audio: Vec<u8>,
    /// Sentence segments in chronological order.
    pub segments: Vec<TimedSegment>,
}

/// Errors that can occur synthesizing speech.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the vendor API.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The vendor reported the synthesis job itself as failed.
    #[error("synthesis job failed: {0}")]
    JobFailed(String),

    /// Malformed vendor response.
    #[error("JSON error: {0}")]
    Json(String),

    /// The asynchronous job never finished inside the polling budget.
    #[error(transparent)]
    Poll(#[from] RetryError),
}

impl SpeechError {
    /// Whether a retry could plausibly succeed.
    ///
    /// An exhausted polling budget is not retryable: re-submitting would
    /// start a fresh billable job against a vendor that just demonstrated
    /// it cannot finish one.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::JobFailed(_) | Self::Json(_) | Self::Poll(_) => false,
        }
    }
}

/// A text-to-speech engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns the name of this synthesizer implementation.
    fn name(&self) -> &str;

    /// Synthesizes `text`, returning the audio and its sentence timing.
    async fn synthesize(&self, text: &str) -> Result<SpeechClip, SpeechError>;
}
