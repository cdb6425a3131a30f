//! LLM client abstraction and implementations.
//!
//! The script and description stages both round-trip through a chat model.
//! [`LlmClient`] is the narrow seam; [`AnthropicClient`] and [`QwenClient`]
//! are the wire adapters, selected by `[llm]` config.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{LlmConfig, LlmProvider};
use crate::metrics;

/// Error type for LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Not configured")]
    NotConfigured,
}

impl LlmError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::NotConfigured => false,
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Request for a completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (instructions for the model)
    pub system: Option<String>,
    /// User message
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 3_000,
            temperature: 1.0, // Scripts should read fresh every day
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Response from a completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The generated text
    pub text: String,
    /// Token usage
    pub usage: LlmUsage,
    /// Model used
    pub model: String,
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g., "anthropic", "qwen")
    fn provider(&self) -> &str;

    /// Model name (e.g., "claude-3-haiku-20240307", "qwen-max")
    fn model(&self) -> &str;

    /// Send a completion request and get a text response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Builds the configured LLM client.
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let api_key = config.api_key.clone().ok_or(LlmError::NotConfigured)?;
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Anthropic => {
            let mut client = AnthropicClient::new(api_key, config.model.clone());
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Arc::new(client)
        }
        LlmProvider::Qwen => {
            let mut client = QwenClient::new(api_key, config.model.clone());
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Arc::new(client)
        }
    };
    Ok(client)
}

fn record_usage(provider: &str, usage: &LlmUsage) {
    metrics::LLM_TOKENS
        .with_label_values(&[provider, "input"])
        .inc_by(usage.input_tokens as u64);
    metrics::LLM_TOKENS
        .with_label_values(&[provider, "output"])
        .inc_by(usage.output_tokens as u64);
}

// ============================================================================
// Anthropic Implementation
// ============================================================================

/// Anthropic API client.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://api.anthropic.com".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let anthropic_request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            temperature: if request.temperature == 0.0 {
                None // Anthropic treats 0 as default, so omit for deterministic
            } else {
                Some(request.temperature)
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(LlmError::Api { status, message });
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Json(e.to_string()))?;

        let text = anthropic_response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = LlmUsage {
            input_tokens: anthropic_response.usage.input_tokens,
            output_tokens: anthropic_response.usage.output_tokens,
        };
        record_usage("anthropic", &usage);

        Ok(CompletionResponse {
            text,
            usage,
            model: anthropic_response.model,
        })
    }
}

// ============================================================================
// Qwen (DashScope) Implementation
// ============================================================================

/// DashScope text-generation client for the Qwen model family.
pub struct QwenClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl QwenClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://dashscope.aliyuncs.com".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct QwenRequest {
    model: String,
    input: QwenInput,
    parameters: QwenParameters,
}

#[derive(Debug, Serialize)]
struct QwenInput {
    messages: Vec<QwenMessage>,
}

#[derive(Debug, Serialize)]
struct QwenMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct QwenParameters {
    result_format: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    enable_search: bool,
}

#[derive(Debug, Deserialize)]
struct QwenResponse {
    output: QwenOutput,
    #[serde(default)]
    usage: QwenUsage,
}

#[derive(Debug, Deserialize)]
struct QwenOutput {
    choices: Vec<QwenChoice>,
}

#[derive(Debug, Deserialize)]
struct QwenChoice {
    message: QwenChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct QwenChoiceMessage {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct QwenUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct QwenError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl LlmClient for QwenClient {
    fn provider(&self) -> &str {
        "qwen"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut messages = Vec::new();
        if let Some(system) = request.system {
            messages.push(QwenMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(QwenMessage {
            role: "user".to_string(),
            content: request.prompt,
        });

        let qwen_request = QwenRequest {
            model: self.model.clone(),
            input: QwenInput { messages },
            parameters: QwenParameters {
                result_format: "message".to_string(),
                temperature: request.temperature,
                top_p: 0.5,
                max_tokens: request.max_tokens,
                enable_search: true,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/api/v1/services/aigc/text-generation/generation",
                self.api_base
            ))
            .bearer_auth(&self.api_key)
            .json(&qwen_request)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<QwenError>(&error_text)
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or(error_text);
            return Err(LlmError::Api { status, message });
        }

        let qwen_response: QwenResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Json(e.to_string()))?;

        let text = qwen_response
            .output
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Json("response carried no choices".to_string()))?;

        let usage = LlmUsage {
            input_tokens: qwen_response.usage.input_tokens,
            output_tokens: qwen_response.usage.output_tokens,
        };
        record_usage("qwen", &usage);

        Ok(CompletionResponse {
            text,
            usage,
            model: self.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new("写一段播音稿")
            .with_system("你是主持人")
            .with_max_tokens(512)
            .with_temperature(0.7);
        assert_eq!(request.prompt, "写一段播音稿");
        assert_eq!(request.system.as_deref(), Some("你是主持人"));
        assert_eq!(request.max_tokens, 512);
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_retryable() {
        assert!(LlmError::Api {
            status: 429,
            message: "rate limited".into()
        }
        .is_retryable());
        assert!(LlmError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_retryable());
        assert!(!LlmError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(LlmError::Http("connection reset".into()).is_retryable());
        assert!(!LlmError::Json("truncated".into()).is_retryable());
    }

    #[test]
    fn test_create_client_requires_api_key() {
        let config = LlmConfig {
            provider: LlmProvider::Qwen,
            model: "qwen-max".to_string(),
            api_key: None,
            api_base: None,
        };
        assert!(matches!(
            create_llm_client(&config).map(|_| ()),
            Err(LlmError::NotConfigured)
        ));
    }
}
