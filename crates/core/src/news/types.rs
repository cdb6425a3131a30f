use chrono::{DateTime, Utc};

/// One trending story scraped from a hot list.
///
/// Transient: created by the source, consumed once by the script stage,
/// then dropped.
#[derive(Debug, Clone)]
pub struct NewsItem {
    pub title: String,
    /// Excerpt or body text shown on the hot list.
    pub content: String,
    /// Absolute URL of the story.
    pub source_url: String,
    /// Name of the site the story came from.
    pub source_site: String,
    pub fetched_at: DateTime<Utc>,
    /// Cover image bytes, when the hot list exposed one and the download
    /// succeeded.
    pub cover_image: Option<Vec<u8>>,
}

impl NewsItem {
    /// The text handed to the script stage as seed material: title and
    /// excerpt run together, the way an anchor would read them.
    pub fn seed_text(&self) -> String {
        format!("{}{}", self.title, self.content)
    }
}
