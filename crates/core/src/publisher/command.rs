//! External-command publisher.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::PublisherConfig;
use crate::llm::{CompletionRequest, LlmClient};
use crate::metrics;
use crate::scripter::strip_preamble;

use super::{PublishError, Publisher};

/// Publishes through a configured external uploader command.
///
/// The command receives any configured arguments, then the video path,
/// then the description text. It owns its whole session lifecycle
/// (login state, browser profile, upload confirmation) and reports
/// success via its exit code.
pub struct CommandPublisher {
    llm: Arc<dyn LlmClient>,
    config: PublisherConfig,
}

impl CommandPublisher {
    pub fn new(llm: Arc<dyn LlmClient>, config: PublisherConfig) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl Publisher for CommandPublisher {
    fn name(&self) -> &str {
        "command"
    }

    async fn compose_description(&self, script: &str) -> Result<String, PublishError> {
        let prompt = format!("{}\n\n{}", script, self.config.description_prompt);
        let response = self
            .llm
            .complete(CompletionRequest::new(prompt).with_max_tokens(512))
            .await?;

        let description = strip_preamble(&response.text, &self.config.description_marker)
            .ok_or(PublishError::MissingMarker)?
            .trim()
            .to_string();
        if description.is_empty() {
            return Err(PublishError::MissingMarker);
        }
        debug!(chars = description.chars().count(), "composed description");
        Ok(description)
    }

    async fn publish(&self, video: &Path, description: &str) -> Result<(), PublishError> {
        info!(command = %self.config.command, video = %video.display(), "starting upload");

        let child = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg(video)
            .arg(description)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PublishError::UploaderNotFound {
                        command: self.config.command.clone(),
                    }
                } else {
                    PublishError::Io(e)
                }
            })?;

        let output = timeout(
            Duration::from_secs(self.config.timeout_secs as u64),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| PublishError::UploadFailed {
            reason: format!("uploader timed out after {}s", self.config.timeout_secs),
            stderr: None,
        })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            metrics::EXTERNAL_SERVICE_REQUESTS
                .with_label_values(&["publisher", "upload", "error"])
                .inc();
            return Err(PublishError::UploadFailed {
                reason: format!("uploader exited with code: {:?}", output.status.code()),
                stderr: if stderr.is_empty() {
                    None
                } else {
                    Some(stderr.chars().take(2000).collect())
                },
            });
        }

        metrics::EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["publisher", "upload", "success"])
            .inc();
        info!(video = %video.display(), "upload complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, LlmError, LlmUsage};

    struct FixedLlm {
        reply: String,
    }

    #[async_trait]
    impl LlmClient for FixedLlm {
        fn provider(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                text: self.reply.clone(),
                usage: LlmUsage::default(),
                model: "fixed".to_string(),
            })
        }
    }

    fn publisher(reply: &str) -> CommandPublisher {
        CommandPublisher::new(
            Arc::new(FixedLlm {
                reply: reply.to_string(),
            }),
            PublisherConfig {
                command: "upload-bulletin".to_string(),
                args: vec![],
                description_prompt: "写一个视频描述".to_string(),
                description_marker: "：\n".to_string(),
                timeout_secs: 5,
            },
        )
    }

    #[tokio::test]
    async fn test_description_preamble_is_stripped() {
        let publisher = publisher("以下为视频描述：\n今日热点速览 #新闻 #AI");
        let description = publisher.compose_description("稿子正文").await.unwrap();
        assert_eq!(description, "今日热点速览 #新闻 #AI");
    }

    #[tokio::test]
    async fn test_description_without_marker_is_rejected() {
        let publisher = publisher("这是一个没有分隔符的回答");
        let err = publisher.compose_description("稿子正文").await.unwrap_err();
        assert!(matches!(err, PublishError::MissingMarker));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_uploader_command_is_fatal() {
        let publisher = publisher("以下为视频描述：\n描述");
        let err = publisher
            .publish(Path::new("/tmp/does-not-matter.mp4"), "描述")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::UploaderNotFound { .. }));
        assert!(!err.is_retryable());
    }
}
