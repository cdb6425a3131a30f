//! SubRip serialization.

use super::types::SubtitleCue;

/// Serializes cues in SubRip format: index, `start --> end`, the wrapped
/// text lines, and a blank separator line per entry.
pub fn to_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&cue.index.to_string());
        out.push('\n');
        out.push_str(&cue.start);
        out.push_str(" --> ");
        out.push_str(&cue.end);
        out.push('\n');
        for line in &cue.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::{CueBuilder, TimedSegment};

    #[test]
    fn test_srt_shape() {
        let builder = CueBuilder::default();
        let cues = builder.build(&[
            TimedSegment::new("今日头条", 0, 1200),
            TimedSegment::new("明日预告", 1200, 2400),
        ]);
        let srt = to_srt(&cues);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,200\n今日头条\n\n\
             2\n00:00:01,200 --> 00:00:02,400\n明日预告\n\n"
        );
    }

    #[test]
    fn test_numbering_starts_at_one() {
        let builder = CueBuilder::default();
        let cues = builder.build(&[TimedSegment::new("唯一一句", 0, 900)]);
        let srt = to_srt(&cues);
        assert!(srt.starts_with("1\n"));
    }

    #[test]
    fn test_empty_input_serializes_to_empty_string() {
        assert_eq!(to_srt(&[]), "");
    }
}
