//! Subtitle derivation from speech-synthesis timing output.
//!
//! A synthesis backend returns the narration audio together with a sequence
//! of [`TimedSegment`]s placing each spoken sentence on the audio timeline.
//! [`CueBuilder`] turns those segments into numbered [`SubtitleCue`]s:
//! silence sentinels are dropped, the survivors are renumbered without gaps,
//! and long sentences are wrapped into fixed-width lines so they fit the
//! burned-in subtitle box. [`to_srt`] serializes the cues for the subtitle
//! artifact.
//!
//! The builder does not validate or reorder timestamps. Overlapping or
//! out-of-order segments are formatted exactly as they arrived; timing
//! correction belongs to the synthesis backend, not here.

mod builder;
mod srt;
mod timecode;
mod types;

pub use builder::{CueBuilder, DEFAULT_WRAP_WIDTH, NO_SPEECH_SENTINEL};
pub use srt::to_srt;
pub use timecode::format_timecode;
pub use types::{SubtitleCue, TimedSegment};
