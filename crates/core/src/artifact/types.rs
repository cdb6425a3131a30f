use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ArtifactError;

/// Date key format used for run directories.
const RUN_KEY_FORMAT: &str = "%Y_%m_%d";

/// Identifies one production cycle by calendar date (`YYYY_MM_DD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Builds the run id for a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(RUN_KEY_FORMAT).to_string())
    }

    /// Parses a `YYYY_MM_DD` key, rejecting anything that is not a valid
    /// calendar date (run keys double as directory names).
    pub fn parse(key: &str) -> Result<Self, ArtifactError> {
        NaiveDate::parse_from_str(key, RUN_KEY_FORMAT)
            .map(|_| Self(key.to_string()))
            .map_err(|_| ArtifactError::InvalidRunKey(key.to_string()))
    }

    /// The calendar date this run belongs to.
    pub fn date(&self) -> NaiveDate {
        // The constructor guarantees the key parses.
        NaiveDate::parse_from_str(&self.0, RUN_KEY_FORMAT).expect("run key is a valid date")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The named outputs a run can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Narration script text.
    Script,
    /// Synthesized narration audio.
    Narration,
    /// SubRip subtitle track derived from the narration timing.
    SubtitleTrack,
    /// Generated background image, as returned by the image backend.
    RawBackground,
    /// Blurred/letterboxed background sized for the video frame.
    ProcessedBackground,
    /// Platform description text for the upload.
    Description,
    /// Rendered bulletin video.
    FinalVideo,
}

impl ArtifactKind {
    /// Every slot, in pipeline order.
    pub const ALL: [ArtifactKind; 7] = [
        ArtifactKind::Script,
        ArtifactKind::Narration,
        ArtifactKind::SubtitleTrack,
        ArtifactKind::RawBackground,
        ArtifactKind::ProcessedBackground,
        ArtifactKind::Description,
        ArtifactKind::FinalVideo,
    ];

    /// Path of this artifact relative to the run directory.
    pub fn relative_path(&self) -> &'static str {
        match self {
            ArtifactKind::Script => "input/script.txt",
            ArtifactKind::Narration => "input/narration.mp3",
            ArtifactKind::SubtitleTrack => "input/subtitle.srt",
            ArtifactKind::RawBackground => "input/background.png",
            ArtifactKind::ProcessedBackground => "input/background_blurred.png",
            ArtifactKind::Description => "input/description.txt",
            ArtifactKind::FinalVideo => "output/bulletin.mp4",
        }
    }

    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Script => "script",
            ArtifactKind::Narration => "narration",
            ArtifactKind::SubtitleTrack => "subtitle_track",
            ArtifactKind::RawBackground => "raw_background",
            ArtifactKind::ProcessedBackground => "processed_background",
            ArtifactKind::Description => "description",
            ArtifactKind::FinalVideo => "final_video",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_from_date() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 3).unwrap();
        assert_eq!(RunId::from_date(date).as_str(), "2023_11_03");
    }

    #[test]
    fn test_run_id_parse_roundtrip() {
        let id = RunId::parse("2024_01_31").unwrap();
        assert_eq!(id.date(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_run_id_rejects_garbage() {
        assert!(RunId::parse("2024-01-31").is_err());
        assert!(RunId::parse("2024_13_01").is_err());
        assert!(RunId::parse("today").is_err());
    }

    #[test]
    fn test_slot_paths_are_distinct() {
        let mut paths: Vec<&str> = ArtifactKind::ALL.iter().map(|k| k.relative_path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), ArtifactKind::ALL.len());
    }
}
