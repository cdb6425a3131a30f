use serde::{Deserialize, Serialize};

/// A stretch of synthesized speech with its position on the audio timeline.
///
/// Segments arrive from the synthesis backend in chronological order.
/// Well-formed input has `begin_ms < end_ms` and no overlaps, but neither
/// is enforced here; arrival order is preserved as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Spoken text of this segment.
    pub text: String,
    /// Offset of the segment start from the beginning of the audio.
    pub begin_ms: u64,
    /// Offset of the segment end from the beginning of the audio.
    pub end_ms: u64,
}

impl TimedSegment {
    pub fn new(text: impl Into<String>, begin_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            begin_ms,
            end_ms,
        }
    }
}

/// One numbered subtitle entry.
///
/// Indices are 1-based and sequential with no gaps in output order. Lines
/// are already wrapped to the configured width and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCue {
    pub index: u32,
    /// Formatted start timecode (`HH:MM:SS,mmm`).
    pub start: String,
    /// Formatted end timecode (`HH:MM:SS,mmm`).
    pub end: String,
    pub lines: Vec<String>,
}
