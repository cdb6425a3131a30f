pub mod artifact;
pub mod compositor;
pub mod config;
pub mod director;
pub mod imagery;
pub mod llm;
pub mod metrics;
pub mod news;
pub mod publisher;
pub mod retry;
pub mod scripter;
pub mod speech;
pub mod subtitle;
pub mod testing;

pub use artifact::{ArtifactError, ArtifactKind, RunId, RunStore};
pub use compositor::{Compositor, CompositorError, FfmpegCompositor, RenderJob};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LlmProvider,
    SanitizedConfig, SpeechBackend,
};
pub use director::{Director, DirectorConfig, DirectorError, RunReport, Stage, StageOutcome};
pub use imagery::{
    BlurLetterbox, ImageError, ImageGenerator, ImagePostProcessor, WanxiangGenerator,
};
pub use llm::{create_llm_client, AnthropicClient, LlmClient, LlmError, QwenClient};
pub use news::{HotListSource, NewsItem, NewsSource, SourceError};
pub use publisher::{CommandPublisher, PublishError, Publisher};
pub use retry::{Classified, RetryConfig, RetryError, RetryPolicy};
pub use scripter::{DraftedScript, LlmScriptWriter, ScriptError, ScriptWriter};
pub use speech::{
    BaiduLongformSynthesizer, DashScopeSynthesizer, SpeechClip, SpeechError, SpeechSynthesizer,
};
pub use subtitle::{format_timecode, to_srt, CueBuilder, SubtitleCue, TimedSegment};
