use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{Config, RetrySections};

/// Director configuration, distilled from the relevant app config
/// sections so the director never reaches into vendor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectorConfig {
    /// Prompt for the daily background image.
    pub image_prompt: String,
    /// Series title drawn on the video.
    pub title: String,
    /// Background music track, if any.
    pub bgm: Option<PathBuf>,
    /// Per-collaborator retry budgets.
    pub retry: RetrySections,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            image_prompt: "新闻播报 AI 信息 背景 麦克风".to_string(),
            title: "《AI信息差》".to_string(),
            bgm: None,
            retry: RetrySections::default(),
        }
    }
}

impl DirectorConfig {
    /// Distills the director's slice out of the full app config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            image_prompt: config.imagery.prompt.clone(),
            title: config.compositor.title.clone(),
            bgm: config.data.bgm.clone(),
            retry: config.retry.clone(),
        }
    }
}
