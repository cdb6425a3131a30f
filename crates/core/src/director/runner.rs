//! Director implementation.
//!
//! Stage order is fixed: script, speech+subtitles, background, background
//! processing, description, then render+upload. Render strictly requires
//! everything upstream, so a stage that fails fatally aborts the run
//! rather than letting later stages run out of order.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::artifact::{ArtifactKind, RunStore};
use crate::compositor::{Compositor, RenderJob};
use crate::imagery::{ImageGenerator, ImagePostProcessor};
use crate::news::{NewsItem, NewsSource};
use crate::publisher::Publisher;
use crate::retry::{Classified, RetryPolicy};
use crate::scripter::{DraftedScript, ScriptWriter};
use crate::speech::{SpeechClip, SpeechSynthesizer};
use crate::subtitle::{to_srt, CueBuilder};

use super::config::DirectorConfig;
use super::types::{DirectorError, RunReport, Stage, StageOutcome};

/// The director - drives one run through the production pipeline.
pub struct Director {
    config: DirectorConfig,
    news: Arc<dyn NewsSource>,
    scripter: Arc<dyn ScriptWriter>,
    speech: Arc<dyn SpeechSynthesizer>,
    images: Arc<dyn ImageGenerator>,
    post: Arc<dyn ImagePostProcessor>,
    compositor: Arc<dyn Compositor>,
    publisher: Arc<dyn Publisher>,
    cues: CueBuilder,
}

impl Director {
    /// Create a new director.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: DirectorConfig,
        news: Arc<dyn NewsSource>,
        scripter: Arc<dyn ScriptWriter>,
        speech: Arc<dyn SpeechSynthesizer>,
        images: Arc<dyn ImageGenerator>,
        post: Arc<dyn ImagePostProcessor>,
        compositor: Arc<dyn Compositor>,
        publisher: Arc<dyn Publisher>,
        cues: CueBuilder,
    ) -> Self {
        Self {
            config,
            news,
            scripter,
            speech,
            images,
            post,
            compositor,
            publisher,
            cues,
        }
    }

    /// Produces (or resumes) one run.
    ///
    /// All resume state is derived from artifact presence in `store`; no
    /// in-memory state survives between invocations and none is needed.
    pub async fn produce(&self, store: &RunStore) -> Result<RunReport, DirectorError> {
        let mut report = RunReport::new(store.run().clone());
        info!(run = %store.run(), "starting production run");

        let script = self.ensure_script(store, &mut report).await?;
        self.ensure_speech(store, &mut report, &script).await?;
        self.ensure_background(store, &mut report).await?;
        self.ensure_processed_background(store, &mut report).await?;
        self.ensure_description(store, &mut report, &script).await?;
        self.ensure_rendered_and_published(store, &mut report).await?;

        info!(run = %store.run(), published = report.published, "production run complete");
        Ok(report)
    }

    /// Stage 1: the narration script.
    async fn ensure_script(
        &self,
        store: &RunStore,
        report: &mut RunReport,
    ) -> Result<String, DirectorError> {
        if store.exists(ArtifactKind::Script).await {
            debug!(run = %store.run(), "script present, reading");
            report.record(Stage::Script, StageOutcome::Skipped);
            return Ok(store.read_text(ArtifactKind::Script).await?);
        }

        let started = Instant::now();

        let scrape = RetryPolicy::from_config(&self.config.retry.scrape);
        let news = scrape
            .execute("news fetch", |_| self.fetch_news_attempt())
            .await
            .map_err(|source| DirectorError::Stage {
                stage: "script",
                source,
            })?;

        let news_items: &[NewsItem] = &news;
        let generation = RetryPolicy::from_config(&self.config.retry.generation);
        let drafted = generation
            .execute("script draft", |attempt| {
                self.draft_attempt(store, news_items, attempt)
            })
            .await
            .map_err(|source| DirectorError::Stage {
                stage: "script",
                source,
            })?;

        store.write_text(ArtifactKind::Script, &drafted.text).await?;
        info!(run = %store.run(), title = %drafted.title, "script drafted");
        report.record(
            Stage::Script,
            StageOutcome::Ran {
                duration_ms: started.elapsed().as_millis() as u64,
            },
        );
        Ok(drafted.text)
    }

    async fn fetch_news_attempt(&self) -> Classified<Vec<NewsItem>> {
        match self.news.fetch().await {
            Ok(items) if items.is_empty() => {
                Classified::Retryable("hot list came back empty".to_string())
            }
            Ok(items) => Classified::Success(items),
            Err(e) if e.is_retryable() => Classified::Retryable(e.to_string()),
            Err(e) => Classified::Fatal(e.to_string()),
        }
    }

    async fn draft_attempt(
        &self,
        store: &RunStore,
        news: &[NewsItem],
        attempt: u32,
    ) -> Classified<DraftedScript> {
        match self.scripter.draft(store.run(), news, attempt).await {
            Ok(drafted) => Classified::Success(drafted),
            Err(e) if e.is_retryable() => Classified::Retryable(e.to_string()),
            Err(e) => Classified::Fatal(e.to_string()),
        }
    }

    /// Stage 2: narration audio and the subtitle track.
    ///
    /// The pair is durable only when both slots exist; checking both here
    /// means a crash between the two writes re-synthesizes on resume
    /// instead of leaving a silent half-pair behind.
    async fn ensure_speech(
        &self,
        store: &RunStore,
        report: &mut RunReport,
        script: &str,
    ) -> Result<(), DirectorError> {
        if store.exists(ArtifactKind::Narration).await
            && store.exists(ArtifactKind::SubtitleTrack).await
        {
            debug!(run = %store.run(), "narration and subtitles present");
            report.record(Stage::Speech, StageOutcome::Skipped);
            return Ok(());
        }

        let started = Instant::now();

        let generation = RetryPolicy::from_config(&self.config.retry.generation);
        let clip = generation
            .execute("speech synthesis", |_| self.synthesize_attempt(script))
            .await
            .map_err(|source| DirectorError::Stage {
                stage: "speech",
                source,
            })?;

        let cues = self.cues.build(&clip.segments);
        let srt = to_srt(&cues);

        store.write_bytes(ArtifactKind::Narration, &clip.audio).await?;
        store.write_text(ArtifactKind::SubtitleTrack, &srt).await?;
        info!(
            run = %store.run(),
            audio_bytes = clip.audio.len(),
            cues = cues.len(),
            "narration synthesized"
        );
        report.record(
            Stage::Speech,
            StageOutcome::Ran {
                duration_ms: started.elapsed().as_millis() as u64,
            },
        );
        Ok(())
    }

    async fn synthesize_attempt(&self, script: &str) -> Classified<SpeechClip> {
        match self.speech.synthesize(script).await {
            Ok(clip) => Classified::Success(clip),
            Err(e) if e.is_retryable() => Classified::Retryable(e.to_string()),
            Err(e) => Classified::Fatal(e.to_string()),
        }
    }

    /// Stage 3: the raw background image.
    async fn ensure_background(
        &self,
        store: &RunStore,
        report: &mut RunReport,
    ) -> Result<(), DirectorError> {
        if store.exists(ArtifactKind::RawBackground).await {
            debug!(run = %store.run(), "raw background present");
            report.record(Stage::Background, StageOutcome::Skipped);
            return Ok(());
        }

        let started = Instant::now();

        let generation = RetryPolicy::from_config(&self.config.retry.generation);
        let bytes = generation
            .execute("background generation", |_| self.generate_image_attempt())
            .await
            .map_err(|source| DirectorError::Stage {
                stage: "background",
                source,
            })?;

        store.write_bytes(ArtifactKind::RawBackground, &bytes).await?;
        report.record(
            Stage::Background,
            StageOutcome::Ran {
                duration_ms: started.elapsed().as_millis() as u64,
            },
        );
        Ok(())
    }

    async fn generate_image_attempt(&self) -> Classified<Vec<u8>> {
        match self.images.generate(&self.config.image_prompt).await {
            Ok(bytes) => Classified::Success(bytes),
            Err(e) if e.is_retryable() => Classified::Retryable(e.to_string()),
            Err(e) => Classified::Fatal(e.to_string()),
        }
    }

    /// Stage 4: blur/letterbox. Local and deterministic; it only ever
    /// skips on presence, never on flakiness.
    async fn ensure_processed_background(
        &self,
        store: &RunStore,
        report: &mut RunReport,
    ) -> Result<(), DirectorError> {
        if store.exists(ArtifactKind::ProcessedBackground).await {
            debug!(run = %store.run(), "processed background present");
            report.record(Stage::BackgroundProcess, StageOutcome::Skipped);
            return Ok(());
        }

        let started = Instant::now();
        let raw = store.read_bytes(ArtifactKind::RawBackground).await?;
        let processed = self.post.process(&raw).map_err(DirectorError::PostProcess)?;
        store
            .write_bytes(ArtifactKind::ProcessedBackground, &processed)
            .await?;
        report.record(
            Stage::BackgroundProcess,
            StageOutcome::Ran {
                duration_ms: started.elapsed().as_millis() as u64,
            },
        );
        Ok(())
    }

    /// Stage 5: the platform description.
    async fn ensure_description(
        &self,
        store: &RunStore,
        report: &mut RunReport,
        script: &str,
    ) -> Result<(), DirectorError> {
        if store.exists(ArtifactKind::Description).await {
            debug!(run = %store.run(), "description present");
            report.record(Stage::Description, StageOutcome::Skipped);
            return Ok(());
        }

        let started = Instant::now();

        let generation = RetryPolicy::from_config(&self.config.retry.generation);
        let description = generation
            .execute("description", |_| self.describe_attempt(script))
            .await
            .map_err(|source| DirectorError::Stage {
                stage: "description",
                source,
            })?;

        store.write_text(ArtifactKind::Description, &description).await?;
        report.record(
            Stage::Description,
            StageOutcome::Ran {
                duration_ms: started.elapsed().as_millis() as u64,
            },
        );
        Ok(())
    }

    async fn describe_attempt(&self, script: &str) -> Classified<String> {
        match self.publisher.compose_description(script).await {
            Ok(description) => Classified::Success(description),
            Err(e) if e.is_retryable() => Classified::Retryable(e.to_string()),
            Err(e) => Classified::Fatal(e.to_string()),
        }
    }

    /// Stage 6: render and upload.
    ///
    /// Upload shares the stage with render: a run whose video artifact is
    /// already present invokes nothing at all. Re-publishing an existing
    /// video is an operator action (remove the video artifact and rerun).
    async fn ensure_rendered_and_published(
        &self,
        store: &RunStore,
        report: &mut RunReport,
    ) -> Result<(), DirectorError> {
        if store.exists(ArtifactKind::FinalVideo).await {
            debug!(run = %store.run(), "final video present, nothing to do");
            report.record(Stage::Render, StageOutcome::Skipped);
            return Ok(());
        }

        let started = Instant::now();
        let description = store.read_text(ArtifactKind::Description).await?;

        let staging = store.staging_path(ArtifactKind::FinalVideo);
        let job = RenderJob {
            background: store.path_for(ArtifactKind::ProcessedBackground),
            narration: store.path_for(ArtifactKind::Narration),
            subtitles: store.path_for(ArtifactKind::SubtitleTrack),
            bgm: self.config.bgm.clone(),
            title: self.config.title.clone(),
            date_label: store.run().date().format("%Y年%m月%d日").to_string(),
            output: staging.clone(),
        };
        self.compositor
            .render(job)
            .await
            .map_err(DirectorError::Render)?;
        store.publish_file(ArtifactKind::FinalVideo, &staging).await?;

        let video = store.path_for(ArtifactKind::FinalVideo);
        let video_path = video.as_path();
        let description_text = description.as_str();
        let upload = RetryPolicy::from_config(&self.config.retry.upload);
        upload
            .execute("upload", |_| {
                self.publish_attempt(video_path, description_text)
            })
            .await
            .map_err(|source| DirectorError::Stage {
                stage: "publish",
                source,
            })?;

        report.published = true;
        report.record(
            Stage::Render,
            StageOutcome::Ran {
                duration_ms: started.elapsed().as_millis() as u64,
            },
        );
        Ok(())
    }

    async fn publish_attempt(
        &self,
        video: &std::path::Path,
        description: &str,
    ) -> Classified<()> {
        match self.publisher.publish(video, description).await {
            Ok(()) => Classified::Success(()),
            Err(e) if e.is_retryable() => Classified::Retryable(e.to_string()),
            Err(e) => Classified::Fatal(e.to_string()),
        }
    }
}
