//! Mock publisher for testing.

use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::publisher::{PublishError, Publisher};

/// Mock implementation of the Publisher trait.
pub struct MockPublisher {
    description: RwLock<String>,
    describe_calls: AtomicUsize,
    publish_calls: AtomicUsize,
    publish_fail_remaining: AtomicU32,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            description: RwLock::new("今日要闻速览 #新闻 #AI".to_string()),
            describe_calls: AtomicUsize::new(0),
            publish_calls: AtomicUsize::new(0),
            publish_fail_remaining: AtomicU32::new(0),
        }
    }

    /// Set the description returned by subsequent compositions.
    pub fn set_description(&self, description: &str) {
        *self.description.write().unwrap() = description.to_string();
    }

    /// Fail the next `n` uploads with a retryable error.
    pub fn fail_next_publishes(&self, n: u32) {
        self.publish_fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Number of descriptions composed.
    pub fn describe_count(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    /// Number of uploads performed.
    pub fn publish_count(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compose_description(&self, _script: &str) -> Result<String, PublishError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.description.read().unwrap().clone())
    }

    async fn publish(&self, _video: &Path, _description: &str) -> Result<(), PublishError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.publish_fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.publish_fail_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(PublishError::UploadFailed {
                reason: "simulated session expiry".to_string(),
                stderr: None,
            });
        }

        Ok(())
    }
}
