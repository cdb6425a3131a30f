//! FFmpeg-based compositor implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use crate::config::CompositorConfig;

use super::error::CompositorError;
use super::types::RenderJob;
use super::Compositor;

/// FFmpeg-based compositor implementation.
pub struct FfmpegCompositor {
    config: CompositorConfig,
}

impl FfmpegCompositor {
    /// Creates a new FFmpeg compositor with the given configuration.
    pub fn new(config: CompositorConfig) -> Self {
        Self { config }
    }

    /// Creates a compositor with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CompositorConfig::default())
    }

    /// Builds the video filter chain: burned-in subtitles, then the date
    /// line and series title drawn over the upper third of the frame.
    fn build_video_filter(&self, job: &RenderJob) -> String {
        let mut chain = format!(
            "[0:v]subtitles='{}'",
            escape_filter_arg(&job.subtitles.to_string_lossy())
        );
        if let Some(ref font) = self.config.font {
            chain.push_str(&format!(
                ":force_style='FontName={}'",
                escape_filter_arg(font)
            ));
        }

        chain.push_str(&format!(
            ",drawtext=text='{}':fontsize=96:fontcolor=white:borderw=3:bordercolor=red\
             :x=(w-text_w)/2:y=h/3-420",
            escape_filter_arg(&job.date_label)
        ));
        chain.push_str(&format!(
            ",drawtext=text='{}':fontsize=128:fontcolor=black:box=1:boxcolor=yellow\
             :x=(w-text_w)/2:y=h/3-200",
            escape_filter_arg(&job.title)
        ));
        chain.push_str("[vid]");
        chain
    }

    /// Builds the full argument list. With bgm the music is normalized
    /// down, faded in and mixed under the narration; the narration's
    /// duration always wins.
    fn build_args(&self, job: &RenderJob) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-loop".to_string(),
            "1".to_string(),
            "-i".to_string(),
            job.background.to_string_lossy().to_string(),
            "-i".to_string(),
            job.narration.to_string_lossy().to_string(),
        ];

        if let Some(ref bgm) = job.bgm {
            args.extend([
                "-stream_loop".to_string(),
                "-1".to_string(),
                "-i".to_string(),
                bgm.to_string_lossy().to_string(),
            ]);
        }

        let mut filter = self.build_video_filter(job);
        if job.bgm.is_some() {
            filter.push_str(&format!(
                ";[2:a]volume={},afade=t=in:d={}[bgm];\
                 [1:a][bgm]amix=inputs=2:duration=first:dropout_transition=0[aud]",
                self.config.bgm_volume, self.config.bgm_fade_in_secs
            ));
        }

        args.extend(["-filter_complex".to_string(), filter]);
        args.extend(["-map".to_string(), "[vid]".to_string()]);
        if job.bgm.is_some() {
            args.extend(["-map".to_string(), "[aud]".to_string()]);
        } else {
            args.extend(["-map".to_string(), "1:a".to_string()]);
        }

        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-r".to_string(),
            self.config.fps.to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            self.config.audio_bitrate.clone(),
            "-shortest".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        args.push(job.output.to_string_lossy().to_string());
        args
    }

    async fn check_inputs(&self, job: &RenderJob) -> Result<(), CompositorError> {
        let mut required = vec![&job.background, &job.narration, &job.subtitles];
        if let Some(ref bgm) = job.bgm {
            required.push(bgm);
        }
        for path in required {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(CompositorError::InputNotFound {
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

/// Escapes a value for use inside an ffmpeg filter graph.
fn escape_filter_arg(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace(',', "\\,")
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn validate(&self) -> Result<(), CompositorError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CompositorError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    CompositorError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(CompositorError::render_failed(
                "ffmpeg -version exited non-zero",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = Regex::new(r"ffmpeg version (\S+)")
            .ok()
            .and_then(|re| re.captures(&stdout).map(|c| c[1].to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        debug!(%version, "ffmpeg available");
        Ok(())
    }

    async fn render(&self, job: RenderJob) -> Result<(), CompositorError> {
        self.check_inputs(&job).await?;

        let start = Instant::now();
        let args = self.build_args(&job);
        debug!(output = %job.output.display(), "starting render");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CompositorError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    CompositorError::Io(e)
                }
            })?;

        let stderr = child.stderr.take().expect("stderr should be captured");
        let mut reader = BufReader::new(stderr).lines();
        let time_regex = Regex::new(r"out_time_ms=(\d+)").ok();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if line.contains("Error") || line.contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }
                if let Some(ref re) = time_regex {
                    if let Some(caps) = re.captures(&line) {
                        debug!(out_time_ms = &caps[1], "render progress");
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(CompositorError::render_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => return Err(CompositorError::Io(e)),
            Err(_) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                return Err(CompositorError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        // A zero-byte or missing output means the render silently failed.
        let meta = tokio::fs::metadata(&job.output)
            .await
            .map_err(|_| CompositorError::render_failed("Output file not created", None))?;
        if meta.len() == 0 {
            return Err(CompositorError::render_failed("Output file is empty", None));
        }

        info!(
            output = %job.output.display(),
            bytes = meta.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "render complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(bgm: Option<PathBuf>) -> RenderJob {
        RenderJob {
            background: PathBuf::from("/run/input/background_blurred.png"),
            narration: PathBuf::from("/run/input/narration.mp3"),
            subtitles: PathBuf::from("/run/input/subtitle.srt"),
            bgm,
            title: "《AI信息差》".to_string(),
            date_label: "2023年11月03日".to_string(),
            output: PathBuf::from("/run/output/.bulletin.mp4.part"),
        }
    }

    #[test]
    fn test_args_without_bgm_map_narration_directly() {
        let compositor = FfmpegCompositor::with_defaults();
        let args = compositor.build_args(&job(None));
        assert!(args.contains(&"1:a".to_string()));
        assert!(!args.iter().any(|a| a.contains("amix")));
        assert_eq!(args.last().unwrap(), "/run/output/.bulletin.mp4.part");
    }

    #[test]
    fn test_args_with_bgm_mix_and_loop() {
        let compositor = FfmpegCompositor::with_defaults();
        let args = compositor.build_args(&job(Some(PathBuf::from("/assets/bgm.flac"))));
        assert!(args.contains(&"-stream_loop".to_string()));
        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.contains("amix=inputs=2:duration=first"));
        assert!(filter.contains("volume=0.1"));
        assert!(filter.contains("afade=t=in:d=1.686"));
    }

    #[test]
    fn test_video_filter_burns_subtitles_and_draws_titles() {
        let compositor = FfmpegCompositor::with_defaults();
        let filter = compositor.build_video_filter(&job(None));
        assert!(filter.starts_with("[0:v]subtitles="));
        assert_eq!(filter.matches("drawtext").count(), 2);
        assert!(filter.ends_with("[vid]"));
    }

    #[test]
    fn test_filter_arg_escaping() {
        assert_eq!(escape_filter_arg("C:\\media"), "C\\:\\\\media");
        assert_eq!(escape_filter_arg("it's"), "it\\'s");
        assert_eq!(escape_filter_arg("a,b"), "a\\,b");
    }

    #[test]
    fn test_narration_duration_bounds_the_video() {
        let compositor = FfmpegCompositor::with_defaults();
        let args = compositor.build_args(&job(None));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"-loop".to_string()));
    }
}
