//! News acquisition.
//!
//! The script stage needs raw material: the day's trending stories.
//! [`NewsSource`] is the seam; [`HotListSource`] scrapes a configured
//! hot-list page. Persisting news to a database is not this crate's
//! concern; items live only long enough to seed one script.

mod hotlist;
mod types;

pub use hotlist::HotListSource;
pub use types::NewsItem;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur fetching news.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the source site.
    #[error("source returned HTTP {status}")]
    Status { status: u16 },

    /// The page structure did not match the expected selectors.
    #[error("failed to parse hot list: {0}")]
    Parse(String),
}

impl SourceError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status } => *status == 429 || *status >= 500,
            // A markup change will not fix itself between attempts.
            Self::Parse(_) => false,
        }
    }
}

/// A source of trending news items.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Fetches the current hot list, most prominent first.
    async fn fetch(&self) -> Result<Vec<NewsItem>, SourceError>;
}
