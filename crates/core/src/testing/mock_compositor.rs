//! Mock compositor for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::compositor::{Compositor, CompositorError, RenderJob};

/// Mock implementation of the Compositor trait.
///
/// A successful render writes a placeholder file to the job's output path,
/// so store-publishing behaves exactly as with a real render.
pub struct MockCompositor {
    render_calls: AtomicUsize,
    fail: AtomicBool,
}

impl Default for MockCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompositor {
    pub fn new() -> Self {
        Self {
            render_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Fail every render.
    pub fn fail_renders(&self, enabled: bool) {
        self.fail.store(enabled, Ordering::SeqCst);
    }

    /// Number of renders performed.
    pub fn render_count(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compositor for MockCompositor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self) -> Result<(), CompositorError> {
        Ok(())
    }

    async fn render(&self, job: RenderJob) -> Result<(), CompositorError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(CompositorError::render_failed(
                "simulated render failure",
                None,
            ));
        }

        tokio::fs::write(&job.output, b"mock mp4 bytes")
            .await
            .map_err(CompositorError::Io)?;
        Ok(())
    }
}
