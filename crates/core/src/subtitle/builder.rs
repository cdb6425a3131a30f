//! Timed-segment to subtitle-cue aggregation.

use super::timecode::format_timecode;
use super::types::{SubtitleCue, TimedSegment};

/// Marker text a synthesis backend emits for a stretch of silence.
/// Segments carrying exactly this text produce no cue.
pub const NO_SPEECH_SENTINEL: &str = "< No Speech >";

/// Default maximum line width in code points.
///
/// Counted in code points rather than bytes so CJK narration wraps at the
/// same visual width as ASCII.
pub const DEFAULT_WRAP_WIDTH: usize = 12;

/// Aggregates raw timed segments into numbered subtitle cues.
#[derive(Debug, Clone)]
pub struct CueBuilder {
    wrap_width: usize,
    sentinel: String,
}

impl Default for CueBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WRAP_WIDTH)
    }
}

impl CueBuilder {
    /// Creates a builder wrapping lines at `wrap_width` code points.
    /// A width of zero is clamped to one.
    pub fn new(wrap_width: usize) -> Self {
        Self {
            wrap_width: wrap_width.max(1),
            sentinel: NO_SPEECH_SENTINEL.to_string(),
        }
    }

    /// Overrides the no-speech sentinel text.
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    /// Converts segments to cues.
    ///
    /// Sentinel segments are dropped and do not consume an index; the
    /// remaining cues are numbered 1..N with no gaps. Timestamps are
    /// formatted as-is, in arrival order.
    pub fn build(&self, segments: &[TimedSegment]) -> Vec<SubtitleCue> {
        let mut cues = Vec::new();
        for segment in segments {
            if segment.text == self.sentinel {
                continue;
            }
            cues.push(SubtitleCue {
                index: cues.len() as u32 + 1,
                start: format_timecode(segment.begin_ms),
                end: format_timecode(segment.end_ms),
                lines: wrap_lines(&segment.text, self.wrap_width),
            });
        }
        cues
    }
}

/// Splits `text` into consecutive chunks of `width` code points, the
/// remainder last. An empty trailing chunk is never produced.
fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, begin: u64, end: u64) -> TimedSegment {
        TimedSegment::new(text, begin, end)
    }

    #[test]
    fn test_indices_are_sequential_from_one() {
        let builder = CueBuilder::default();
        let cues = builder.build(&[
            seg("第一句", 0, 1000),
            seg("第二句", 1000, 2000),
            seg("第三句", 2000, 3000),
        ]);
        let indices: Vec<u32> = cues.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_sentinel_does_not_consume_an_index() {
        let builder = CueBuilder::default();
        let cues = builder.build(&[
            seg("开场白", 0, 1000),
            seg(NO_SPEECH_SENTINEL, 1000, 1500),
            seg("结束语", 1500, 2500),
        ]);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[1].index, 2);
        assert_eq!(cues[1].lines, vec!["结束语".to_string()]);
    }

    #[test]
    fn test_wrap_thirty_chars_at_twelve() {
        let builder = CueBuilder::new(12);
        let text: String = std::iter::repeat('字').take(30).collect();
        let cues = builder.build(&[seg(&text, 0, 5000)]);
        let lengths: Vec<usize> = cues[0].lines.iter().map(|l| l.chars().count()).collect();
        assert_eq!(lengths, vec![12, 12, 6]);
        assert_eq!(cues[0].lines.concat(), text);
    }

    #[test]
    fn test_exact_multiple_has_no_blank_trailing_line() {
        let builder = CueBuilder::new(12);
        let text: String = std::iter::repeat('报').take(24).collect();
        let cues = builder.build(&[seg(&text, 0, 4000)]);
        assert_eq!(cues[0].lines.len(), 2);
        assert!(cues[0].lines.iter().all(|l| !l.is_empty()));
    }

    #[test]
    fn test_short_text_is_a_single_line() {
        let builder = CueBuilder::default();
        let cues = builder.build(&[seg("短句", 0, 800)]);
        assert_eq!(cues[0].lines, vec!["短句".to_string()]);
    }

    #[test]
    fn test_wrap_counts_code_points_not_bytes() {
        // 12 CJK characters are 36 bytes but must stay on one line.
        let builder = CueBuilder::new(12);
        let text: String = std::iter::repeat('新').take(12).collect();
        let cues = builder.build(&[seg(&text, 0, 1000)]);
        assert_eq!(cues[0].lines.len(), 1);
    }

    #[test]
    fn test_overlapping_timestamps_kept_as_is() {
        let builder = CueBuilder::default();
        let cues = builder.build(&[seg("甲", 2000, 4000), seg("乙", 1000, 3000)]);
        assert_eq!(cues[0].start, "00:00:02,000");
        assert_eq!(cues[1].start, "00:00:01,000");
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[1].index, 2);
    }

    #[test]
    fn test_custom_sentinel() {
        let builder = CueBuilder::default().with_sentinel("[silence]");
        let cues = builder.build(&[seg("[silence]", 0, 500), seg("正文", 500, 1500)]);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
    }
}
