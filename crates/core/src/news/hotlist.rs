//! Hot-list page scraper.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::NewsConfig;
use crate::metrics;

use super::types::NewsItem;
use super::{NewsSource, SourceError};

/// Scrapes a trending-topics page of the common "hot item" card layout:
/// each entry is a `section.HotItem` with an `h2` title, a `p` excerpt, an
/// anchor to the story and optionally a cover `img`.
pub struct HotListSource {
    client: reqwest::Client,
    config: NewsConfig,
    item_selector: Selector,
    title_selector: Selector,
    excerpt_selector: Selector,
    link_selector: Selector,
    cover_selector: Selector,
}

impl HotListSource {
    /// Create a new hot-list source with the given configuration.
    pub fn new(config: NewsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            item_selector: Selector::parse("section.HotItem").expect("static selector"),
            title_selector: Selector::parse("h2").expect("static selector"),
            excerpt_selector: Selector::parse("p").expect("static selector"),
            link_selector: Selector::parse("a[href]").expect("static selector"),
            cover_selector: Selector::parse("img[src]").expect("static selector"),
        }
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        if let Some(cookie) = self.config.cookie.as_deref() {
            if let Ok(value) = HeaderValue::from_str(cookie) {
                headers.insert(COOKIE, value);
            }
        }
        headers
    }

    /// Extracts items from the fetched page. Cards missing a title or
    /// excerpt are skipped rather than failing the whole list.
    fn parse_items(&self, html: &str, base: &Url, site: &str) -> Vec<(NewsItem, Option<Url>)> {
        let document = Html::parse_document(html);
        let mut items = Vec::new();

        for card in document.select(&self.item_selector) {
            let title = match card.select(&self.title_selector).next() {
                Some(el) => el.text().collect::<String>().trim().to_string(),
                None => continue,
            };
            let content = match card.select(&self.excerpt_selector).next() {
                Some(el) => el.text().collect::<String>().trim().to_string(),
                None => continue,
            };
            if title.is_empty() {
                continue;
            }

            let source_url = card
                .select(&self.link_selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| base.join(href).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| base.to_string());

            // Tracking query suffixes are stripped so the URL stays stable.
            let cover_url = card
                .select(&self.cover_selector)
                .next()
                .and_then(|el| el.value().attr("src"))
                .map(|src| src.split("?source=").next().unwrap_or(src))
                .and_then(|src| base.join(src).ok());

            items.push((
                NewsItem {
                    title,
                    content,
                    source_url,
                    source_site: site.to_string(),
                    fetched_at: Utc::now(),
                    cover_image: None,
                },
                cover_url,
            ));
        }

        items
    }

    /// Downloads a cover image, keeping it only when the response is
    /// actually an image.
    async fn fetch_cover(&self, url: &Url) -> Option<Vec<u8>> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(%url, status = %r.status(), "cover fetch rejected");
                return None;
            }
            Err(e) => {
                debug!(%url, error = %e, "cover fetch failed");
                return None;
            }
        };

        let is_image = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return None;
        }

        response.bytes().await.ok().map(|b| b.to_vec())
    }
}

#[async_trait]
impl NewsSource for HotListSource {
    fn name(&self) -> &str {
        "hotlist"
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, SourceError> {
        let base = Url::parse(&self.config.url)
            .map_err(|e| SourceError::Parse(format!("invalid hot list URL: {}", e)))?;
        let site = base.host_str().unwrap_or("unknown").to_string();

        let response = self
            .client
            .get(base.clone())
            .headers(self.request_headers())
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            metrics::EXTERNAL_SERVICE_REQUESTS
                .with_label_values(&["news", "fetch", "error"])
                .inc();
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let parsed = self.parse_items(&html, &base, &site);
        if parsed.is_empty() {
            warn!(url = %base, "hot list page matched no items");
        }

        // Covers are best-effort; a dead image URL must not sink the list.
        let items: Vec<NewsItem> = stream::iter(parsed)
            .then(|(mut item, cover_url)| async move {
                if let Some(ref url) = cover_url {
                    item.cover_image = self.fetch_cover(url).await;
                }
                item
            })
            .collect()
            .await;

        metrics::EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["news", "fetch", "success"])
            .inc();
        debug!(count = items.len(), site = %site, "fetched hot list");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HotListSource {
        HotListSource::new(NewsConfig {
            url: "https://example.com/hot".to_string(),
            user_agent: "test-agent".to_string(),
            cookie: None,
            timeout_secs: 5,
        })
    }

    const PAGE: &str = r#"
<html><body>
  <section class="HotItem">
    <a href="/story/1"><h2>首条热点标题</h2></a>
    <p>首条热点的摘要内容。</p>
    <img src="https://img.example.com/1.jpg?source=feed">
  </section>
  <section class="HotItem">
    <h2>第二条标题</h2>
  </section>
  <section class="HotItem">
    <a href="https://other.example.com/story/3"><h2>第三条标题</h2></a>
    <p>第三条摘要。</p>
  </section>
</body></html>
"#;

    #[test]
    fn test_parse_extracts_complete_cards_only() {
        let src = source();
        let base = Url::parse("https://example.com/hot").unwrap();
        let items = src.parse_items(PAGE, &base, "example.com");
        // The second card has no excerpt and is skipped.
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].0.title, "首条热点标题");
        assert_eq!(items[0].0.source_url, "https://example.com/story/1");
        assert_eq!(items[1].0.source_url, "https://other.example.com/story/3");
    }

    #[test]
    fn test_parse_strips_cover_tracking_suffix() {
        let src = source();
        let base = Url::parse("https://example.com/hot").unwrap();
        let items = src.parse_items(PAGE, &base, "example.com");
        let cover = items[0].1.as_ref().unwrap();
        assert_eq!(cover.as_str(), "https://img.example.com/1.jpg");
    }

    #[test]
    fn test_seed_text_joins_title_and_content() {
        let src = source();
        let base = Url::parse("https://example.com/hot").unwrap();
        let items = src.parse_items(PAGE, &base, "example.com");
        assert_eq!(items[0].0.seed_text(), "首条热点标题首条热点的摘要内容。");
    }

    #[test]
    fn test_status_retryability() {
        assert!(SourceError::Status { status: 503 }.is_retryable());
        assert!(SourceError::Status { status: 429 }.is_retryable());
        assert!(!SourceError::Status { status: 403 }.is_retryable());
        assert!(!SourceError::Parse("layout changed".into()).is_retryable());
    }
}
