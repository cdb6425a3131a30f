use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    pub llm: LlmConfig,
    pub news: NewsConfig,
    pub speech: SpeechConfig,
    pub imagery: ImageryConfig,
    #[serde(default)]
    pub compositor: CompositorConfig,
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub subtitle: SubtitleConfig,
    #[serde(default)]
    pub retry: RetrySections,
}

/// Data directory layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Root under which each run gets its own `YYYY_MM_DD` directory.
    #[serde(default = "default_data_root")]
    pub root: PathBuf,
    /// Background music track mixed under the narration, if any.
    #[serde(default)]
    pub bgm: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: default_data_root(),
            bgm: None,
        }
    }
}

fn default_data_root() -> PathBuf {
    PathBuf::from("daily")
}

/// Language model configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override the provider's default API base URL.
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Anthropic,
    Qwen,
}

/// Hot-list news source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewsConfig {
    /// Hot-list page to scrape.
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Session cookie, when the hot list requires a login.
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/118.0.0.0 Safari/537.36"
        .to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeechConfig {
    /// Synthesis backend type
    pub backend: SpeechBackend,
    /// DashScope-specific configuration (required when backend = "dash_scope")
    #[serde(default)]
    pub dash_scope: Option<DashScopeSpeechConfig>,
    /// Baidu long-form TTS configuration (required when backend = "baidu_longform")
    #[serde(default)]
    pub baidu: Option<BaiduSpeechConfig>,
}

/// Available synthesis backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeechBackend {
    DashScope,
    BaiduLongform,
}

/// DashScope sambert synthesis backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashScopeSpeechConfig {
    pub api_key: String,
    #[serde(default = "default_dashscope_base")]
    pub api_base: String,
    #[serde(default = "default_sambert_model")]
    pub model: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Speaking rate multiplier.
    #[serde(default = "default_speech_rate")]
    pub rate: f32,
    #[serde(default = "default_speech_volume")]
    pub volume: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// SSML phoneme substitutions applied before synthesis, mapping source
    /// text to its pinyin-annotated replacement. Keeps ambiguous readings
    /// correct ("信息差" must read cha1, not cha4).
    #[serde(default = "default_phonemes")]
    pub phonemes: HashMap<String, String>,
}

fn default_dashscope_base() -> String {
    "https://dashscope.aliyuncs.com".to_string()
}

fn default_sambert_model() -> String {
    "sambert-zhide-v1".to_string()
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_speech_rate() -> f32 {
    1.1
}

fn default_speech_volume() -> u32 {
    85
}

fn default_phonemes() -> HashMap<String, String> {
    HashMap::from([(
        "信息差".to_string(),
        "<phoneme alphabet=\"py\" ph=\"xin4 xi1 cha1\">信息差</phoneme>".to_string(),
    )])
}

/// Baidu long-form TTS backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BaiduSpeechConfig {
    pub api_key: String,
    pub secret_key: String,
    #[serde(default = "default_baidu_base")]
    pub api_base: String,
    #[serde(default = "default_baidu_voice")]
    pub voice: u32,
    #[serde(default = "default_baidu_speed")]
    pub speed: u32,
    #[serde(default = "default_baidu_pitch")]
    pub pitch: u32,
    #[serde(default = "default_baidu_volume")]
    pub volume: u32,
    /// Pause inserted at paragraph breaks, in milliseconds.
    #[serde(default = "default_baidu_break_ms")]
    pub break_ms: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_baidu_base() -> String {
    "https://aip.baidubce.com".to_string()
}

fn default_baidu_voice() -> u32 {
    106
}

fn default_baidu_speed() -> u32 {
    7
}

fn default_baidu_pitch() -> u32 {
    5
}

fn default_baidu_volume() -> u32 {
    7
}

fn default_baidu_break_ms() -> u32 {
    660
}

/// Background image generation and post-processing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageryConfig {
    pub api_key: String,
    #[serde(default = "default_dashscope_base")]
    pub api_base: String,
    #[serde(default = "default_wanxiang_model")]
    pub model: String,
    /// Requested generation size, `width*height`.
    #[serde(default = "default_image_size")]
    pub size: String,
    /// Prompt for the daily background.
    #[serde(default = "default_image_prompt")]
    pub prompt: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub blur: BlurConfig,
}

fn default_wanxiang_model() -> String {
    "wanx-v1".to_string()
}

fn default_image_size() -> String {
    "720*1280".to_string()
}

fn default_image_prompt() -> String {
    "新闻播报 AI 信息 背景 麦克风".to_string()
}

/// Blur/letterbox geometry for the processed background.
///
/// The raw image is resized to `frame_width` x `frame_height`, centered on
/// a `frame_width` x `canvas_height` canvas, and the strips above and below
/// are filled with blurred stretches of the frame's edges.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlurConfig {
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
    /// Edge rows sampled for the blurred strips.
    #[serde(default = "default_margin_pixels")]
    pub margin_pixels: u32,
    #[serde(default = "default_blur_sigma")]
    pub sigma: f32,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            canvas_height: default_canvas_height(),
            margin_pixels: default_margin_pixels(),
            sigma: default_blur_sigma(),
        }
    }
}

fn default_frame_width() -> u32 {
    1_440
}

fn default_frame_height() -> u32 {
    2_560
}

fn default_canvas_height() -> u32 {
    3_200
}

fn default_margin_pixels() -> u32 {
    30
}

fn default_blur_sigma() -> f32 {
    8.0
}

/// Video compositor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompositorConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
    /// Background music volume relative to the narration.
    #[serde(default = "default_bgm_volume")]
    pub bgm_volume: f32,
    #[serde(default = "default_bgm_fade_in_secs")]
    pub bgm_fade_in_secs: f32,
    /// Series title drawn across the upper third of the frame.
    #[serde(default = "default_title")]
    pub title: String,
    /// Font family passed to drawtext/subtitles; ffmpeg's default when unset.
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_ffmpeg_log_level")]
    pub ffmpeg_log_level: String,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            fps: default_fps(),
            audio_bitrate: default_audio_bitrate(),
            bgm_volume: default_bgm_volume(),
            bgm_fade_in_secs: default_bgm_fade_in_secs(),
            title: default_title(),
            font: None,
            timeout_secs: default_render_timeout(),
            ffmpeg_log_level: default_ffmpeg_log_level(),
        }
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_fps() -> u32 {
    30
}

fn default_audio_bitrate() -> String {
    "320k".to_string()
}

fn default_bgm_volume() -> f32 {
    0.1
}

fn default_bgm_fade_in_secs() -> f32 {
    1.686
}

fn default_title() -> String {
    "《AI信息差》".to_string()
}

fn default_render_timeout() -> u64 {
    1_800
}

fn default_ffmpeg_log_level() -> String {
    "error".to_string()
}

/// Upload configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublisherConfig {
    /// External uploader command. Invoked with any configured `args`
    /// followed by the video path and the description text.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_description_prompt")]
    pub description_prompt: String,
    /// Separator between the model's preamble and the description proper.
    #[serde(default = "default_marker")]
    pub description_marker: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_description_prompt() -> String {
    "对于以上文稿，写一个适合短视频平台的视频描述，可以使用#标上话题，回答以“以下为视频描述：”开头。"
        .to_string()
}

/// Script drafting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptConfig {
    /// Anchor persona and episode instructions prepended to the seed news.
    #[serde(default = "default_script_prompt")]
    pub prompt: String,
    /// Separator between the model's preamble and the script proper. A
    /// reply without it is regenerated.
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            prompt: default_script_prompt(),
            marker: default_marker(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_script_prompt() -> String {
    "以下是近期热点。你是新闻节目的主持人小艾，请为该条热点生成你的播音稿，进行详细报道、扩写和点评，\
     控制在3000字以内。生成不包含标题的演播稿，以“这是我生成的稿子：”开头。"
        .to_string()
}

fn default_marker() -> String {
    "：\n".to_string()
}

fn default_max_tokens() -> u32 {
    3_000
}

/// Subtitle derivation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubtitleConfig {
    /// Maximum line width in code points.
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
    /// Segment text the synthesis backend emits for silence.
    #[serde(default = "default_sentinel")]
    pub no_speech_sentinel: String,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            wrap_width: default_wrap_width(),
            no_speech_sentinel: default_sentinel(),
        }
    }
}

fn default_wrap_width() -> usize {
    crate::subtitle::DEFAULT_WRAP_WIDTH
}

fn default_sentinel() -> String {
    crate::subtitle::NO_SPEECH_SENTINEL.to_string()
}

/// Per-collaborator retry budgets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySections {
    /// Hot-list scraping.
    #[serde(default = "default_scrape_retry")]
    pub scrape: RetryConfig,
    /// Script/description generation, including regeneration of replies
    /// that fail marker validation.
    #[serde(default = "default_generation_retry")]
    pub generation: RetryConfig,
    /// Polling of asynchronous synthesis/generation jobs.
    #[serde(default = "default_synthesis_retry")]
    pub synthesis: RetryConfig,
    /// Video upload.
    #[serde(default = "default_upload_retry")]
    pub upload: RetryConfig,
}

impl Default for RetrySections {
    fn default() -> Self {
        Self {
            scrape: default_scrape_retry(),
            generation: default_generation_retry(),
            synthesis: default_synthesis_retry(),
            upload: default_upload_retry(),
        }
    }
}

fn default_scrape_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        delay_ms: 5_000,
    }
}

fn default_generation_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 6,
        delay_ms: 3_000,
    }
}

fn default_synthesis_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 20,
        delay_ms: 5_000,
    }
}

fn default_upload_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        delay_ms: 10_000,
    }
}

/// Sanitized config for startup logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub data_root: PathBuf,
    pub llm_provider: LlmProvider,
    pub llm_model: String,
    pub news_url: String,
    pub speech_backend: SpeechBackend,
    pub imagery_model: String,
    pub publisher_command: String,
}

impl Config {
    pub fn sanitized(&self) -> SanitizedConfig {
        SanitizedConfig {
            data_root: self.data.root.clone(),
            llm_provider: self.llm.provider,
            llm_model: self.llm.model.clone(),
            news_url: self.news.url.clone(),
            speech_backend: self.speech.backend,
            imagery_model: self.imagery.model.clone(),
            publisher_command: self.publisher.command.clone(),
        }
    }
}
