use super::{types::Config, ConfigError};
use crate::config::{LlmProvider, SpeechBackend};

/// Validate configuration
/// Currently validates:
/// - The selected LLM provider has an API key where one is required
/// - The selected speech backend has its vendor section
/// - Retry budgets allow at least one attempt
/// - Subtitle wrap width is non-zero
/// - Blur geometry leaves room for the letterbox strips
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    match config.llm.provider {
        LlmProvider::Anthropic | LlmProvider::Qwen => {
            if config.llm.api_key.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "llm.api_key is required for provider {:?}",
                    config.llm.provider
                )));
            }
        }
    }

    match config.speech.backend {
        SpeechBackend::DashScope => {
            if config.speech.dash_scope.is_none() {
                return Err(ConfigError::ValidationError(
                    "speech.dash_scope section is required when backend = \"dash_scope\""
                        .to_string(),
                ));
            }
        }
        SpeechBackend::BaiduLongform => {
            if config.speech.baidu.is_none() {
                return Err(ConfigError::ValidationError(
                    "speech.baidu section is required when backend = \"baidu_longform\""
                        .to_string(),
                ));
            }
        }
    }

    for (name, retry) in [
        ("scrape", &config.retry.scrape),
        ("generation", &config.retry.generation),
        ("synthesis", &config.retry.synthesis),
        ("upload", &config.retry.upload),
    ] {
        if retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(format!(
                "retry.{}.max_attempts cannot be 0",
                name
            )));
        }
    }

    if config.subtitle.wrap_width == 0 {
        return Err(ConfigError::ValidationError(
            "subtitle.wrap_width cannot be 0".to_string(),
        ));
    }

    let blur = &config.imagery.blur;
    if blur.canvas_height <= blur.frame_height {
        return Err(ConfigError::ValidationError(
            "imagery.blur.canvas_height must exceed frame_height".to_string(),
        ));
    }
    if blur.margin_pixels == 0 || blur.margin_pixels >= blur.frame_height {
        return Err(ConfigError::ValidationError(
            "imagery.blur.margin_pixels must be between 1 and frame_height".to_string(),
        ));
    }

    if config.publisher.command.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "publisher.command cannot be empty".to_string(),
        ));
    }

    Ok(())
}
