//! Narration script drafting.
//!
//! The day's hot list goes in, a broadcast-ready script comes out. The
//! model is instructed to open its reply with a fixed preamble ending in a
//! separator; a reply without the separator is malformed and worth
//! regenerating, so [`ScriptError::MissingMarker`] is retryable under the
//! same budget as transport failures.

mod llm_writer;

pub use llm_writer::LlmScriptWriter;

use async_trait::async_trait;
use thiserror::Error;

use crate::artifact::RunId;
use crate::llm::LlmError;
use crate::news::NewsItem;

/// A drafted episode script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftedScript {
    /// Headline of the story the episode covers.
    pub title: String,
    /// Broadcast text with the model's preamble already stripped.
    pub text: String,
}

/// Errors that can occur drafting a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The reply did not contain the configured preamble separator.
    #[error("reply is missing the preamble separator")]
    MissingMarker,

    /// Nothing to draft from.
    #[error("no news items to draft from")]
    NoNews,
}

impl ScriptError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::MissingMarker => true,
            Self::NoNews => false,
        }
    }
}

/// Drafts narration scripts from scraped news.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// Returns the name of this writer implementation.
    fn name(&self) -> &str;

    /// Drafts a script for `run` from the hot list. `attempt` is the
    /// 1-based retry attempt; implementations use it to move on to a
    /// different seed story instead of re-asking about one that keeps
    /// producing rejected replies.
    async fn draft(
        &self,
        run: &RunId,
        news: &[NewsItem],
        attempt: u32,
    ) -> Result<DraftedScript, ScriptError>;
}

/// Strips everything through the first occurrence of `marker`, returning
/// the remainder, or `None` when the marker is absent.
pub(crate) fn strip_preamble<'a>(reply: &'a str, marker: &str) -> Option<&'a str> {
    reply
        .find(marker)
        .map(|i| &reply[i + marker.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_preamble() {
        let reply = "这是我生成的稿子：\n大家好，欢迎收看。";
        assert_eq!(strip_preamble(reply, "：\n"), Some("大家好，欢迎收看。"));
    }

    #[test]
    fn test_strip_preamble_missing_marker() {
        assert_eq!(strip_preamble("没有分隔符的回答", "：\n"), None);
    }

    #[test]
    fn test_strip_preamble_takes_first_occurrence() {
        let reply = "前言：\n正文开始：\n第二段";
        assert_eq!(strip_preamble(reply, "：\n"), Some("正文开始：\n第二段"));
    }
}
