//! LLM-backed script writer.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::artifact::RunId;
use crate::config::ScriptConfig;
use crate::llm::{CompletionRequest, LlmClient};
use crate::news::NewsItem;

use super::{strip_preamble, DraftedScript, ScriptError, ScriptWriter};

/// Drafts the episode script by prompting a chat model with one seed story
/// from the hot list.
pub struct LlmScriptWriter {
    llm: Arc<dyn LlmClient>,
    config: ScriptConfig,
}

impl LlmScriptWriter {
    pub fn new(llm: Arc<dyn LlmClient>, config: ScriptConfig) -> Self {
        Self { llm, config }
    }

    /// Picks the seed story for this run and attempt.
    ///
    /// The base index is a stable hash of the run key, so a resumed run
    /// lands on the same story; each retry walks one slot forward so a
    /// story that keeps yielding rejected replies is not asked forever.
    fn seed_index(run: &RunId, attempt: u32, len: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        run.as_str().hash(&mut hasher);
        (hasher.finish() as usize + attempt.saturating_sub(1) as usize) % len
    }
}

#[async_trait]
impl ScriptWriter for LlmScriptWriter {
    fn name(&self) -> &str {
        "llm"
    }

    async fn draft(
        &self,
        run: &RunId,
        news: &[NewsItem],
        attempt: u32,
    ) -> Result<DraftedScript, ScriptError> {
        if news.is_empty() {
            return Err(ScriptError::NoNews);
        }

        let seed = &news[Self::seed_index(run, attempt, news.len())];
        debug!(run = %run, attempt, title = %seed.title, "drafting script");

        let request = CompletionRequest::new(seed.seed_text())
            .with_system(self.config.prompt.clone())
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm.complete(request).await?;

        let text = strip_preamble(&response.text, &self.config.marker)
            .ok_or(ScriptError::MissingMarker)?
            .trim()
            .to_string();
        if text.is_empty() {
            // A marker with nothing after it is as useless as no marker.
            return Err(ScriptError::MissingMarker);
        }

        Ok(DraftedScript {
            title: seed.title.clone(),
            text,
        })
    }
}
