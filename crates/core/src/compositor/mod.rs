//! Video compositing.
//!
//! Renders the finished bulletin: the processed background looped for the
//! narration's duration, subtitles burned in, the series title and date
//! drawn on, and background music ducked under the voice. The heavy
//! lifting is an ffmpeg subprocess; this module builds the invocation and
//! supervises it.

mod error;
mod ffmpeg;
mod types;

pub use error::CompositorError;
pub use ffmpeg::FfmpegCompositor;
pub use types::RenderJob;

use async_trait::async_trait;

/// A renderer that composites the bulletin video.
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Returns the name of this compositor implementation.
    fn name(&self) -> &str;

    /// Validates that the compositor is properly configured and ready.
    async fn validate(&self) -> Result<(), CompositorError>;

    /// Renders the job to its output path.
    async fn render(&self, job: RenderJob) -> Result<(), CompositorError>;
}
