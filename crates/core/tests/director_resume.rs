//! Director lifecycle integration tests.
//!
//! These tests verify the presence-cache contract end to end: a full run
//! produces every artifact, a completed run invokes zero collaborators,
//! and a partially completed run resumes from the first absent artifact
//! without re-invoking anything upstream.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use newsreel_core::config::RetrySections;
use newsreel_core::testing::{
    fixtures, MockCompositor, MockImageGenerator, MockNewsSource, MockPostProcessor,
    MockPublisher, MockScriptWriter, MockSpeechSynthesizer,
};
use newsreel_core::{
    ArtifactKind, CueBuilder, Director, DirectorConfig, RetryConfig, RunId, RunStore,
};

/// Test helper owning the mock collaborators and the store root.
struct TestHarness {
    news: Arc<MockNewsSource>,
    scripter: Arc<MockScriptWriter>,
    speech: Arc<MockSpeechSynthesizer>,
    images: Arc<MockImageGenerator>,
    post: Arc<MockPostProcessor>,
    compositor: Arc<MockCompositor>,
    publisher: Arc<MockPublisher>,
    root: PathBuf,
    _temp_dir: Option<TempDir>,
}

fn retries(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        delay_ms: 0,
    }
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self::with_root(root, Some(temp_dir))
    }

    /// A second harness over the same root simulates a process restart:
    /// fresh mocks (all counters zero) over the surviving artifacts.
    fn restarted(&self) -> Self {
        Self::with_root(self.root.clone(), None)
    }

    fn with_root(root: PathBuf, temp_dir: Option<TempDir>) -> Self {
        Self {
            news: Arc::new(MockNewsSource::new()),
            scripter: Arc::new(MockScriptWriter::new()),
            speech: Arc::new(MockSpeechSynthesizer::new()),
            images: Arc::new(MockImageGenerator::new()),
            post: Arc::new(MockPostProcessor::new()),
            compositor: Arc::new(MockCompositor::new()),
            publisher: Arc::new(MockPublisher::new()),
            root,
            _temp_dir: temp_dir,
        }
    }

    fn director(&self) -> Director {
        let config = DirectorConfig {
            image_prompt: "测试背景".to_string(),
            title: "《测试节目》".to_string(),
            bgm: None,
            retry: RetrySections {
                scrape: retries(3),
                generation: retries(3),
                synthesis: retries(5),
                upload: retries(2),
            },
        };

        Director::new(
            config,
            Arc::clone(&self.news) as Arc<dyn newsreel_core::NewsSource>,
            Arc::clone(&self.scripter) as Arc<dyn newsreel_core::ScriptWriter>,
            Arc::clone(&self.speech) as Arc<dyn newsreel_core::SpeechSynthesizer>,
            Arc::clone(&self.images) as Arc<dyn newsreel_core::ImageGenerator>,
            Arc::clone(&self.post) as Arc<dyn newsreel_core::ImagePostProcessor>,
            Arc::clone(&self.compositor) as Arc<dyn newsreel_core::Compositor>,
            Arc::clone(&self.publisher) as Arc<dyn newsreel_core::Publisher>,
            CueBuilder::default(),
        )
    }

    async fn store(&self) -> RunStore {
        RunStore::open(&self.root, RunId::parse("2024_03_15").unwrap())
            .await
            .expect("Failed to open run store")
    }

    async fn remove(&self, store: &RunStore, kind: ArtifactKind) {
        tokio::fs::remove_file(store.path_for(kind))
            .await
            .expect("artifact should exist before removal");
    }
}

#[tokio::test]
async fn test_full_run_produces_all_artifacts() {
    let harness = TestHarness::new();
    let store = harness.store().await;

    let report = harness.director().produce(&store).await.unwrap();

    for kind in ArtifactKind::ALL {
        assert!(store.exists(kind).await, "missing artifact: {}", kind);
    }
    assert!(report.published);

    assert_eq!(harness.news.fetch_count(), 1);
    assert_eq!(harness.scripter.draft_count(), 1);
    assert_eq!(harness.speech.synthesize_count(), 1);
    assert_eq!(harness.images.generate_count(), 1);
    assert_eq!(harness.post.process_count(), 1);
    assert_eq!(harness.compositor.render_count(), 1);
    assert_eq!(harness.publisher.describe_count(), 1);
    assert_eq!(harness.publisher.publish_count(), 1);
}

#[tokio::test]
async fn test_subtitle_artifact_is_derived_from_segments() {
    let harness = TestHarness::new();
    harness.speech.set_clip(fixtures::speech_clip(2));
    let store = harness.store().await;

    harness.director().produce(&store).await.unwrap();

    let srt = store.read_text(ArtifactKind::SubtitleTrack).await.unwrap();
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\n"));
    assert!(srt.contains("\n2\n00:00:02,000 --> 00:00:04,000\n"));
}

#[tokio::test]
async fn test_processed_background_goes_through_post_processor() {
    let harness = TestHarness::new();
    let store = harness.store().await;

    harness.director().produce(&store).await.unwrap();

    let processed = store
        .read_bytes(ArtifactKind::ProcessedBackground)
        .await
        .unwrap();
    assert!(processed.starts_with(b"processed:"));
}

#[tokio::test]
async fn test_completed_run_invokes_zero_collaborators() {
    let harness = TestHarness::new();
    let store = harness.store().await;
    harness.director().produce(&store).await.unwrap();

    // Same artifacts, fresh mocks: nothing should be called at all.
    let resumed = harness.restarted();
    let report = resumed.director().produce(&store).await.unwrap();

    assert_eq!(resumed.news.fetch_count(), 0);
    assert_eq!(resumed.scripter.draft_count(), 0);
    assert_eq!(resumed.speech.synthesize_count(), 0);
    assert_eq!(resumed.images.generate_count(), 0);
    assert_eq!(resumed.post.process_count(), 0);
    assert_eq!(resumed.compositor.render_count(), 0);
    assert_eq!(resumed.publisher.describe_count(), 0);
    assert_eq!(resumed.publisher.publish_count(), 0);

    assert!(!report.published);
    for stage in newsreel_core::Stage::ALL {
        assert!(report.skipped(stage), "stage {} should be skipped", stage);
    }
}

#[tokio::test]
async fn test_partial_resume_starts_at_first_absent_artifact() {
    let harness = TestHarness::new();
    let store = harness.store().await;
    harness.director().produce(&store).await.unwrap();

    // Keep script + narration + subtitles; drop everything downstream.
    harness.remove(&store, ArtifactKind::RawBackground).await;
    harness.remove(&store, ArtifactKind::ProcessedBackground).await;
    harness.remove(&store, ArtifactKind::Description).await;
    harness.remove(&store, ArtifactKind::FinalVideo).await;

    let resumed = harness.restarted();
    let report = resumed.director().produce(&store).await.unwrap();

    // Upstream collaborators untouched.
    assert_eq!(resumed.news.fetch_count(), 0);
    assert_eq!(resumed.scripter.draft_count(), 0);
    assert_eq!(resumed.speech.synthesize_count(), 0);
    // Downstream re-ran.
    assert_eq!(resumed.images.generate_count(), 1);
    assert_eq!(resumed.post.process_count(), 1);
    assert_eq!(resumed.compositor.render_count(), 1);
    assert_eq!(resumed.publisher.publish_count(), 1);

    assert!(report.skipped(newsreel_core::Stage::Script));
    assert!(report.skipped(newsreel_core::Stage::Speech));
    assert!(report.ran(newsreel_core::Stage::Background));
    assert!(report.published);
}

#[tokio::test]
async fn test_missing_subtitle_resynthesizes_the_pair() {
    let harness = TestHarness::new();
    let store = harness.store().await;
    harness.director().produce(&store).await.unwrap();

    // A crash between the audio and subtitle writes leaves only one half;
    // the resumed run must treat the pair as absent.
    harness.remove(&store, ArtifactKind::SubtitleTrack).await;

    let resumed = harness.restarted();
    resumed.director().produce(&store).await.unwrap();

    assert_eq!(resumed.speech.synthesize_count(), 1);
    assert_eq!(resumed.scripter.draft_count(), 0);
    assert!(store.exists(ArtifactKind::SubtitleTrack).await);
    assert!(store.exists(ArtifactKind::Narration).await);
}

#[tokio::test]
async fn test_marker_rejections_share_the_generation_budget() {
    let harness = TestHarness::new();
    harness.scripter.reject_next_drafts(2);
    let store = harness.store().await;

    let report = harness.director().produce(&store).await.unwrap();

    // Two rejected replies plus the good one: three attempts, one budget.
    assert_eq!(harness.scripter.draft_count(), 3);
    assert!(report.ran(newsreel_core::Stage::Script));
}

#[tokio::test]
async fn test_script_retry_exhaustion_aborts_the_run() {
    let harness = TestHarness::new();
    harness.scripter.reject_next_drafts(10);
    let store = harness.store().await;

    let result = harness.director().produce(&store).await;

    assert!(result.is_err());
    // Budget is 3: exactly three attempts, never more.
    assert_eq!(harness.scripter.draft_count(), 3);
    assert!(!store.exists(ArtifactKind::Script).await);
    // Later stages never ran out of order.
    assert_eq!(harness.speech.synthesize_count(), 0);
    assert_eq!(harness.compositor.render_count(), 0);
}

#[tokio::test]
async fn test_fatal_image_failure_aborts_but_keeps_upstream_artifacts() {
    let harness = TestHarness::new();
    harness.images.fail_fatally(true);
    let store = harness.store().await;

    let result = harness.director().produce(&store).await;

    assert!(result.is_err());
    // Fatal surfaces immediately; no retry burn.
    assert_eq!(harness.images.generate_count(), 1);

    // Completed work stays for inspection and resume.
    assert!(store.exists(ArtifactKind::Script).await);
    assert!(store.exists(ArtifactKind::Narration).await);
    assert!(store.exists(ArtifactKind::SubtitleTrack).await);
    assert!(!store.exists(ArtifactKind::RawBackground).await);
    assert_eq!(harness.publisher.describe_count(), 0);
    assert_eq!(harness.publisher.publish_count(), 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried_within_the_stage() {
    let harness = TestHarness::new();
    harness.news.fail_next_fetches(2);
    harness.images.fail_next_calls(1);
    let store = harness.store().await;

    let report = harness.director().produce(&store).await.unwrap();

    assert_eq!(harness.news.fetch_count(), 3);
    assert_eq!(harness.images.generate_count(), 2);
    assert!(report.published);
}

#[tokio::test]
async fn test_upload_retries_then_succeeds() {
    let harness = TestHarness::new();
    harness.publisher.fail_next_publishes(1);
    let store = harness.store().await;

    let report = harness.director().produce(&store).await.unwrap();

    assert_eq!(harness.publisher.publish_count(), 2);
    assert!(report.published);
}

#[tokio::test]
async fn test_upload_exhaustion_leaves_video_for_operator() {
    let harness = TestHarness::new();
    harness.publisher.fail_next_publishes(10);
    let store = harness.store().await;

    let result = harness.director().produce(&store).await;
    assert!(result.is_err());
    assert_eq!(harness.publisher.publish_count(), 2);
    // Render completed and was published into the store before the upload
    // failed; re-publishing is an operator action (remove the video
    // artifact and rerun).
    assert!(store.exists(ArtifactKind::FinalVideo).await);

    let resumed = harness.restarted();
    let report = resumed.director().produce(&store).await.unwrap();
    assert!(!report.published);
    assert_eq!(resumed.publisher.publish_count(), 0);
}
