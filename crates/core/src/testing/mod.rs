//! Testing utilities and mock implementations for pipeline tests.
//!
//! This module provides mock implementations of every collaborator trait
//! the director consumes, so resume behavior can be tested end to end
//! without real vendors. Each mock records its call count and can be told
//! to fail a number of leading attempts, which is exactly what the
//! presence-cache and retry tests need.
//!
//! # Example
//!
//! ```rust,ignore
//! use newsreel_core::testing::{fixtures, MockNewsSource, MockScriptWriter};
//!
//! let news = MockNewsSource::new();
//! news.set_items(vec![fixtures::news_item("标题", "摘要")]);
//!
//! let scripter = MockScriptWriter::new();
//! scripter.reject_next_drafts(2); // first two replies miss the marker
//!
//! // ...wire into a Director and assert on news.fetch_count() etc.
//! ```

mod mock_compositor;
mod mock_imagery;
mod mock_news;
mod mock_publisher;
mod mock_scripter;
mod mock_speech;

pub use mock_compositor::MockCompositor;
pub use mock_imagery::{MockImageGenerator, MockPostProcessor};
pub use mock_news::MockNewsSource;
pub use mock_publisher::MockPublisher;
pub use mock_scripter::MockScriptWriter;
pub use mock_speech::MockSpeechSynthesizer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::news::NewsItem;
    use crate::speech::SpeechClip;
    use crate::subtitle::TimedSegment;

    /// Create a test news item with reasonable defaults.
    pub fn news_item(title: &str, content: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            content: content.to_string(),
            source_url: format!("https://example.com/story/{}", title.len()),
            source_site: "example.com".to_string(),
            fetched_at: Utc::now(),
            cover_image: None,
        }
    }

    /// Create a timed segment.
    pub fn segment(text: &str, begin_ms: u64, end_ms: u64) -> TimedSegment {
        TimedSegment::new(text, begin_ms, end_ms)
    }

    /// Create a speech clip with `sentences` evenly spaced segments.
    pub fn speech_clip(sentences: usize) -> SpeechClip {
        let segments = (0..sentences)
            .map(|i| {
                segment(
                    &format!("第{}句播报内容", i + 1),
                    i as u64 * 2_000,
                    (i as u64 + 1) * 2_000,
                )
            })
            .collect();
        SpeechClip {
            audio: b"mock mp3 bytes".to_vec(),
            segments,
        }
    }
}
