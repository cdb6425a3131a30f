//! DashScope sambert synthesis backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::DashScopeSpeechConfig;
use crate::metrics;
use crate::subtitle::TimedSegment;

use super::{SpeechClip, SpeechError, SpeechSynthesizer};

/// DashScope sambert backend: one synthesis call returns the audio location
/// and word-level timestamps grouped by sentence.
pub struct DashScopeSynthesizer {
    client: reqwest::Client,
    config: DashScopeSpeechConfig,
}

impl DashScopeSynthesizer {
    /// Create a new synthesizer with the given configuration.
    pub fn new(config: DashScopeSpeechConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    /// Applies the configured phoneme substitutions and wraps the text in
    /// a `<speak>` envelope. First priority is getting ambiguous readings
    /// right; the envelope is required for any SSML to take effect.
    fn pre_ssml(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (needle, replacement) in &self.config.phonemes {
            out = out.replace(needle, replacement);
        }
        format!("<speak>{}</speak>", out)
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

#[derive(Debug, Serialize)]
struct SynthesisRequest {
    model: String,
    input: SynthesisInput,
    parameters: SynthesisParameters,
}

#[derive(Debug, Serialize)]
struct SynthesisInput {
    text: String,
}

#[derive(Debug, Serialize)]
struct SynthesisParameters {
    sample_rate: u32,
    format: String,
    rate: f32,
    volume: u32,
    word_timestamp_enabled: bool,
    sentence_timestamp_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    output: SynthesisOutput,
}

#[derive(Debug, Deserialize)]
struct SynthesisOutput {
    audio_url: String,
    #[serde(default)]
    sentences: Vec<SentenceTimestamp>,
}

#[derive(Debug, Deserialize)]
struct SentenceTimestamp {
    begin_time: u64,
    end_time: u64,
    #[serde(default)]
    words: Vec<WordTimestamp>,
}

#[derive(Debug, Deserialize)]
struct WordTimestamp {
    text: String,
}

#[derive(Debug, Deserialize)]
struct VendorError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl SpeechSynthesizer for DashScopeSynthesizer {
    fn name(&self) -> &str {
        "dash_scope"
    }

    async fn synthesize(&self, text: &str) -> Result<SpeechClip, SpeechError> {
        let ssml = self.pre_ssml(text);
        debug!(chars = text.chars().count(), "submitting sambert synthesis");

        let request = SynthesisRequest {
            model: self.config.model.clone(),
            input: SynthesisInput { text: ssml },
            parameters: SynthesisParameters {
                sample_rate: self.config.sample_rate,
                format: "mp3".to_string(),
                rate: self.config.rate,
                volume: self.config.volume,
                word_timestamp_enabled: true,
                sentence_timestamp_enabled: true,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/api/v1/services/audio/tts/synthesis",
                self.config.api_base
            ))
            .bearer_auth(&self.config.api_key)
            .header("X-Request-Id", Uuid::new_v4().to_string())
            .json(&request)
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<VendorError>(&error_text)
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or(error_text);
            metrics::EXTERNAL_SERVICE_REQUESTS
                .with_label_values(&["tts", "synthesize", "error"])
                .inc();
            return Err(SpeechError::Api { status, message });
        }

        let parsed: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Json(e.to_string()))?;

        let audio = self.download_audio(&parsed.output.audio_url).await?;

        let segments = parsed
            .output
            .sentences
            .into_iter()
            .map(|s| TimedSegment {
                text: s.words.into_iter().map(|w| w.text).collect(),
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
    use std::collections::HashMap;

    fn synthesizer() -> DashScopeSynthesizer {
        DashScopeSynthesizer::new(DashScopeSpeechConfig {
            api_key: "test".to_string(),
            api_base: "https://example.com".to_string(),
            model: "sambert-zhide-v1".to_string(),
            sample_rate: 48_000,
            rate: 1.1,
            volume: 85,
            timeout_secs: 5,
            phonemes: HashMap::from([(
                "信息差".to_string(),
                "<phoneme alphabet=\"py\" ph=\"xin4 xi1 cha1\">信息差</phoneme>".to_string(),
            )]),
        })
    }

    #[test]
    fn test_pre_ssml_wraps_and_substitutes() {
        let ssml = synthesizer().pre_ssml("今天聊聊信息差。");
        assert!(ssml.starts_with("<speak>"));
        assert!(ssml.ends_with("</speak>"));
        assert!(ssml.contains("ph=\"xin4 xi1 cha1\""));
        assert!(!ssml.contains("今天聊聊信息差。</speak>"));
    }

    #[test]
    fn test_sentence_words_join_into_segment_text() {
        let sentence = SentenceTimestamp {
            begin_time: 100,
            end_time: 900,
            words: vec![
                WordTimestamp {
                    text: "今天".to_string(),
                },
                WordTimestamp {
                    text: "晴".to_string(),
                },
            ],
        };
        let text: String = sentence.words.into_iter().map(|w| w.text).collect();
        assert_eq!(text, "今天晴");
    }
}
