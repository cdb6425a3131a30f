//! Mock speech synthesizer for testing.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::speech::{SpeechClip, SpeechError, SpeechSynthesizer};

use super::fixtures;

/// Mock implementation of the SpeechSynthesizer trait.
pub struct MockSpeechSynthesizer {
    clip: RwLock<SpeechClip>,
    synthesize_calls: AtomicUsize,
    fail_remaining: AtomicU32,
}

impl Default for MockSpeechSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpeechSynthesizer {
    /// Create a mock returning a three-sentence clip.
    pub fn new() -> Self {
        Self {
            clip: RwLock::new(fixtures::speech_clip(3)),
            synthesize_calls: AtomicUsize::new(0),
            fail_remaining: AtomicU32::new(0),
        }
    }

    /// Set the clip returned by subsequent calls.
    pub fn set_clip(&self, clip: SpeechClip) {
        *self.clip.write().unwrap() = clip;
    }

    /// Fail the next `n` calls with a retryable transport error.
    pub fn fail_next_calls(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Number of synthesis calls performed.
    pub fn synthesize_count(&self) -> usize {
        self.synthesize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeechSynthesizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, _text: &str) -> Result<SpeechClip, SpeechError> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SpeechError::Http("simulated connection reset".to_string()));
        }

        Ok(self.clip.read().unwrap().clone())
    }
}
