use std::path::PathBuf;

/// Everything the compositor needs to render one bulletin.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Processed (blurred/letterboxed) background image.
    pub background: PathBuf,
    /// Narration audio; its duration is the video's duration.
    pub narration: PathBuf,
    /// SubRip track to burn in.
    pub subtitles: PathBuf,
    /// Background music, mixed under the narration when present.
    pub bgm: Option<PathBuf>,
    /// Series title drawn across the upper third of the frame.
    pub title: String,
    /// Date line drawn above the title.
    pub date_label: String,
    /// Where the rendered file goes. Callers pass a staging path and
    /// publish it into the artifact store after a successful render.
    pub output: PathBuf,
}
