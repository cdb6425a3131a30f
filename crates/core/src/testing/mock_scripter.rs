//! Mock script writer for testing.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::artifact::RunId;
use crate::news::NewsItem;
use crate::scripter::{DraftedScript, ScriptError, ScriptWriter};

/// Mock implementation of the ScriptWriter trait.
pub struct MockScriptWriter {
    script: RwLock<DraftedScript>,
    draft_calls: AtomicUsize,
    reject_remaining: AtomicU32,
}

impl Default for MockScriptWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScriptWriter {
    pub fn new() -> Self {
        Self {
            script: RwLock::new(DraftedScript {
                title: "默认热点".to_string(),
                text: "大家好，这里是今日播报，下面进入正题。".to_string(),
            }),
            draft_calls: AtomicUsize::new(0),
            reject_remaining: AtomicU32::new(0),
        }
    }

    /// Set the script returned by subsequent drafts.
    pub fn set_script(&self, title: &str, text: &str) {
        *self.script.write().unwrap() = DraftedScript {
            title: title.to_string(),
            text: text.to_string(),
        };
    }

    /// Fail the next `n` drafts as if the reply missed the marker.
    pub fn reject_next_drafts(&self, n: u32) {
        self.reject_remaining.store(n, Ordering::SeqCst);
    }

    /// Number of drafts requested.
    pub fn draft_count(&self) -> usize {
        self.draft_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptWriter for MockScriptWriter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn draft(
        &self,
        _run: &RunId,
        news: &[NewsItem],
        _attempt: u32,
    ) -> Result<DraftedScript, ScriptError> {
        self.draft_calls.fetch_add(1, Ordering::SeqCst);

        if news.is_empty() {
            return Err(ScriptError::NoNews);
        }

        let remaining = self.reject_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reject_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ScriptError::MissingMarker);
        }

        Ok(self.script.read().unwrap().clone())
    }
}
