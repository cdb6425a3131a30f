//! Mock news source for testing.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::news::{NewsItem, NewsSource, SourceError};

use super::fixtures;

/// Mock implementation of the NewsSource trait.
///
/// Returns a configurable item list, optionally failing a number of
/// leading fetches with a retryable error, and counts every call.
pub struct MockNewsSource {
    items: RwLock<Vec<NewsItem>>,
    fetch_calls: AtomicUsize,
    fail_remaining: AtomicU32,
}

impl Default for MockNewsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNewsSource {
    /// Create a mock with one default item.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(vec![fixtures::news_item("默认热点", "默认摘要内容")]),
            fetch_calls: AtomicUsize::new(0),
            fail_remaining: AtomicU32::new(0),
        }
    }

    /// Set the items returned by subsequent fetches.
    pub fn set_items(&self, items: Vec<NewsItem>) {
        *self.items.write().unwrap() = items;
    }

    /// Fail the next `n` fetches with a retryable transport error.
    pub fn fail_next_fetches(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Number of fetches performed.
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsSource for MockNewsSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SourceError::Http("simulated connection reset".to_string()));
        }

        Ok(self.items.read().unwrap().clone())
    }
}
