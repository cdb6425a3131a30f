//! DashScope wanxiang text-to-image backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::ImageryConfig;
use crate::metrics;
use crate::retry::{Classified, RetryPolicy};

use super::{ImageError, ImageGenerator};

/// Wanxiang backend: submit an asynchronous generation task, poll it to
/// completion, download the first result.
pub struct WanxiangGenerator {
    client: reqwest::Client,
    config: ImageryConfig,
    poll: RetryPolicy,
}

impl WanxiangGenerator {
    /// Create a new generator; `poll` bounds the status-poll loop.
    pub fn new(config: ImageryConfig, poll: RetryPolicy) -> Self {
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

    async fn submit_task(&self, prompt: &str) -> Result<String, ImageError> {
        let request = SubmitRequest {
            model: self.config.model.clone(),
            input: SubmitInput {
                prompt: prompt.to_string(),
            },
            parameters: SubmitParameters {
                n: 1,
                size: self.config.size.clone(),
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/api/v1/services/aigc/text2image/image-synthesis",
                self.config.api_base
            ))
            .bearer_auth(&self.config.api_key)
            .header("X-DashScope-Async", "enable")
            .header("X-Request-Id", Uuid::new_v4().to_string())
            .json(&request)
            .send()
            .await
            .map_err(|e| ImageError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageError::Api { status, message });
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Json(e.to_string()))?;
        debug!(task_id = %body.output.task_id, "submitted image generation task");
        Ok(body.output.task_id)
    }

    async fn query_task(&self, task_id: &str) -> Result<TaskOutput, ImageError> {
        let response = self
            .client
            .get(format!("{}/api/v1/tasks/{}", self.config.api_base, task_id))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| ImageError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageError::Api { status, message });
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Json(e.to_string()))?;
        Ok(body.output)
    }

    /// Polls the task until it leaves the queue.
    async fn await_result_url(&self, task_id: &str) -> Result<String, ImageError> {
        let url = self
            .poll
            .execute("wanxiang poll", |_| async move {
                match self.query_task(task_id).await {
                    Ok(output) => match output.task_status.as_str() {
                        "SUCCEEDED" => match output.results.into_iter().next() {
                            Some(result) => Classified::Success(result.url),
                            None => Classified::Fatal(
                                "task succeeded but returned no images".to_string(),
                            ),
                        },
                        "PENDING" | "RUNNING" => {
                            Classified::Retryable("task still running".to_string())
                        }
                        other => Classified::Fatal(format!("task ended as {}", other)),
                    },
                    Err(e) if e.is_retryable() => Classified::Retryable(e.to_string()),
                    Err(e) => Classified::Fatal(e.to_string()),
                }
            })
            .await?;
        Ok(url)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ImageError::Api {
                status: response.status().as_u16(),
                message: "image download rejected".to_string(),
            });
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ImageError::Http(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct SubmitRequest {
    model: String,
    input: SubmitInput,
    parameters: SubmitParameters,
}

#[derive(Debug, Serialize)]
struct SubmitInput {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct SubmitParameters {
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    output: SubmitOutput,
}

#[derive(Debug, Deserialize)]
struct SubmitOutput {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    output: TaskOutput,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    task_status: String,
    #[serde(default)]
    results: Vec<TaskImage>,
}

#[derive(Debug, Deserialize)]
struct TaskImage {
    url: String,
}

#[async_trait]
impl ImageGenerator for WanxiangGenerator {
    fn name(&self) -> &str {
        "wanxiang"
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ImageError> {
        let task_id = self.submit_task(prompt).await?;
        let url = self.await_result_url(&task_id).await?;
        let bytes = self.download(&url).await?;
        metrics::EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["image", "generate", "success"])
            .inc();
        debug!(bytes = bytes.len(), "downloaded generated background");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_deserializes_vendor_shape() {
        let raw = r#"{
            "output": {
                "task_status": "SUCCEEDED",
                "results": [{"url": "https://cdn.example.com/bg.png"}]
            },
            "request_id": "r-1"
        }"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.output.task_status, "SUCCEEDED");
        assert_eq!(parsed.output.results[0].url, "https://cdn.example.com/bg.png");
    }

    #[test]
    fn test_pending_task_has_no_results() {
        let raw = r#"{"output": {"task_status": "PENDING"}}"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.output.results.is_empty());
    }
}
