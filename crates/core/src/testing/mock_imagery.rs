//! Mock image generator and post-processor for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::imagery::{ImageError, ImageGenerator, ImagePostProcessor};

/// Mock implementation of the ImageGenerator trait.
pub struct MockImageGenerator {
    bytes: RwLock<Vec<u8>>,
    generate_calls: AtomicUsize,
    fail_remaining: AtomicU32,
    fail_fatal: AtomicBool,
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self {
            bytes: RwLock::new(b"mock png bytes".to_vec()),
            generate_calls: AtomicUsize::new(0),
            fail_remaining: AtomicU32::new(0),
            fail_fatal: AtomicBool::new(false),
        }
    }

    /// Set the bytes returned by subsequent generations.
    pub fn set_bytes(&self, bytes: Vec<u8>) {
        *self.bytes.write().unwrap() = bytes;
    }

    /// Fail the next `n` generations with a retryable transport error.
    pub fn fail_next_calls(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Fail every generation fatally (the vendor rejects the task).
    pub fn fail_fatally(&self, enabled: bool) {
        self.fail_fatal.store(enabled, Ordering::SeqCst);
    }

    /// Number of generations performed.
    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, _prompt: &str) -> Result<Vec<u8>, ImageError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_fatal.load(Ordering::SeqCst) {
            return Err(ImageError::TaskFailed(
                "simulated content rejection".to_string(),
            ));
        }

        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ImageError::Http("simulated connection reset".to_string()));
        }

        Ok(self.bytes.read().unwrap().clone())
    }
}

/// Mock implementation of the ImagePostProcessor trait.
///
/// Passes input through with a marker prefix so tests can tell processed
/// bytes from raw ones.
pub struct MockPostProcessor {
    process_calls: AtomicUsize,
}

impl Default for MockPostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPostProcessor {
    pub fn new() -> Self {
        Self {
            process_calls: AtomicUsize::new(0),
        }
    }

    /// Number of images processed.
    pub fn process_count(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }
}

impl ImagePostProcessor for MockPostProcessor {
    fn name(&self) -> &str {
        "mock"
    }

    fn process(&self, raw: &[u8]) -> Result<Vec<u8>, ImageError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = b"processed:".to_vec();
        out.extend_from_slice(raw);
        Ok(out)
    }
}
