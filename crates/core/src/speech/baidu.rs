//! Baidu long-form TTS backend.
//!
//! Long texts are synthesized as an asynchronous job: create the task,
//! poll its status until the vendor reports success, then download the
//! audio from the result URL. Polling runs under the synthesis retry
//! budget; a job that never finishes surfaces as an error instead of
//! hanging the pipeline.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::BaiduSpeechConfig;
use crate::metrics;
use crate::retry::{Classified, RetryPolicy};
use crate::subtitle::TimedSegment;

use super::{SpeechClip, SpeechError, SpeechSynthesizer};

/// Baidu long-form TTS backend.
pub struct BaiduLongformSynthesizer {
    client: reqwest::Client,
    config: BaiduSpeechConfig,
    poll: RetryPolicy,
}

impl BaiduLongformSynthesizer {
    /// Create a new synthesizer; `poll` bounds the status-poll loop.
    pub fn new(config: BaiduSpeechConfig, poll: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            config,
            poll,
        }
    }

    /// Exchanges the API key pair for a short-lived access token.
    async fn access_token(&self) -> Result<String, SpeechError> {
        let response = self
            .client
            .post(format!("{}/oauth/2.0/token", self.config.api_base))
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.api_key.as_str()),
                ("client_secret", self.config.secret_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Json(e.to_string()))?;
        body.access_token.ok_or_else(|| SpeechError::JobFailed(
            "token endpoint returned no access_token; check api_key/secret_key".to_string(),
        ))
    }

    async fn create_task(&self, token: &str, text: &str) -> Result<String, SpeechError> {
        let payload = json!({
            "text": text,
            "format": "mp3-48k",
            "voice": self.config.voice,
            "lang": "zh",
            "speed": self.config.speed,
            "pitch": self.config.pitch,
            "volume": self.config.volume,
            "enable_subtitle": 1,
            "break": self.config.break_ms,
        });

        let response = self
            .client
            .post(format!("{}/rpc/2.0/tts/v1/create", self.config.api_base))
            .query(&[("access_token", token)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;

        let body: CreateResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Json(e.to_string()))?;

        match (body.task_status.as_deref(), body.task_id) {
            (Some("Created"), Some(task_id)) => {
                debug!(task_id = %task_id, "created long-form TTS task");
                Ok(task_id)
            }
            _ => Err(SpeechError::JobFailed(format!(
                "task creation rejected: {}",
                body.error_msg.unwrap_or_else(|| "unknown".to_string())
            ))),
        }
    }

    async fn query_task(&self, token: &str, task_id: &str) -> Result<TaskInfo, SpeechError> {
        let response = self
            .client
            .post(format!("{}/rpc/2.0/tts/v1/query", self.config.api_base))
            .query(&[("access_token", token)])
            .json(&json!({ "task_ids": [task_id] }))
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Json(e.to_string()))?;

        body.tasks_info
            .into_iter()
            .next()
            .ok_or_else(|| SpeechError::Json("query returned no task info".to_string()))
    }

    /// Polls the task until it leaves the running state.
    async fn await_result(&self, token: &str, task_id: &str) -> Result<TaskResult, SpeechError> {
        let outcome = self
            .poll
            .execute("baidu tts poll", |_| async move {
                match self.query_task(token, task_id).await {
                    Ok(info) => match info.task_status.as_str() {
                        "Success" => match info.task_result {
                            Some(result) => Classified::Success(result),
                            None => Classified::Fatal(
                                "task succeeded but carried no result".to_string(),
                            ),
                        },
                        "Running" => Classified::Retryable("task still running".to_string()),
                        other => Classified::Fatal(format!("task ended as {}", other)),
                    },
                    Err(e) if e.is_retryable() => Classified::Retryable(e.to_string()),
                    Err(e) => Classified::Fatal(e.to_string()),
                }
            })
            .await?;
        Ok(outcome)
    }

    async fn download_audio(&self, url: &str) -> Result<Vec<u8>, SpeechError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SpeechError::Api {
                status: response.status().as_u16(),
                message: "audio download rejected".to_string(),
            });
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| SpeechError::Http(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    task_status: Option<String>,
    #[serde(default)]
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    tasks_info: Vec<TaskInfo>,
}

#[derive(Debug, Deserialize)]
struct TaskInfo {
    task_status: String,
    #[serde(default)]
    task_result: Option<TaskResult>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    speech_url: String,
    #[serde(default)]
    speech_timestamp: SpeechTimestamp,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechTimestamp {
    #[serde(default)]
    sentences: Vec<SentenceTimestamp>,
}

#[derive(Debug, Deserialize)]
struct SentenceTimestamp {
    sentence_texts: String,
    begin_time: u64,
    end_time: u64,
}

#[async_trait]
impl SpeechSynthesizer for BaiduLongformSynthesizer {
    fn name(&self) -> &str {
        "baidu_longform"
    }

    async fn synthesize(&self, text: &str) -> Result<SpeechClip, SpeechError> {
        let token = self.access_token().await?;
        let task_id = self.create_task(&token, text).await?;
        let result = self.await_result(&token, &task_id).await?;

        let audio = self.download_audio(&result.speech_url).await?;
        let segments = result
            .speech_timestamp
            .sentences
            .into_iter()
            .map(|s| TimedSegment {
                text: s.sentence_texts,
                begin_ms: s.begin_time,
                end_ms: s.end_time,
            })
            .collect();

        metrics::EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["tts", "synthesize", "success"])
            .inc();
        Ok(SpeechClip { audio, segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_timestamp_deserializes_vendor_shape() {
        let raw = r#"{
            "speech_url": "https://cdn.example.com/a.mp3",
            "speech_timestamp": {
                "sentences": [
                    {"sentence_texts": "第一句。", "begin_time": 0, "end_time": 2100},
                    {"sentence_texts": "第二句。", "begin_time": 2100, "end_time": 4000}
                ]
            }
        }"#;
        let result: TaskResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.speech_timestamp.sentences.len(), 2);
        assert_eq!(result.speech_timestamp.sentences[0].sentence_texts, "第一句。");
        assert_eq!(result.speech_timestamp.sentences[1].begin_time, 2100);
    }

    #[test]
    fn test_missing_timestamps_default_to_empty() {
        let raw = r#"{"speech_url": "https://cdn.example.com/a.mp3"}"#;
        let result: TaskResult = serde_json::from_str(raw).unwrap();
        assert!(result.speech_timestamp.sentences.is_empty());
    }
}
