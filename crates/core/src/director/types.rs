use std::fmt;

use thiserror::Error;

use crate::artifact::{ArtifactError, RunId};
use crate::compositor::CompositorError;
use crate::imagery::ImageError;
use crate::metrics;
use crate::retry::RetryError;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetch news, draft the narration script.
    Script,
    /// Synthesize narration audio and derive the subtitle track.
    Speech,
    /// Generate the raw background image.
    Background,
    /// Blur/letterbox the raw background. Local, no collaborator.
    BackgroundProcess,
    /// Compose the platform description.
    Description,
    /// Render the video and upload it.
    Render,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Script,
        Stage::Speech,
        Stage::Background,
        Stage::BackgroundProcess,
        Stage::Description,
        Stage::Render,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Script => "script",
            Stage::Speech => "speech",
            Stage::Background => "background",
            Stage::BackgroundProcess => "background_process",
            Stage::Description => "description",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to one stage during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage executed and produced its artifacts.
    Ran { duration_ms: u64 },
    /// Every artifact the stage produces was already present.
    Skipped,
}

/// Summary of one orchestrated run.
#[derive(Debug)]
pub struct RunReport {
    pub run: RunId,
    pub stages: Vec<(Stage, StageOutcome)>,
    /// Whether this run performed the upload (false when the video was
    /// already present from an earlier completed run).
    pub published: bool,
}

impl RunReport {
    pub(crate) fn new(run: RunId) -> Self {
        Self {
            run,
            stages: Vec::new(),
            published: false,
        }
    }

    pub(crate) fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        match outcome {
            StageOutcome::Ran { duration_ms } => {
                metrics::STAGE_EXECUTIONS
                    .with_label_values(&[stage.name(), "ran"])
                    .inc();
                metrics::STAGE_DURATION
                    .with_label_values(&[stage.name()])
                    .observe(duration_ms as f64 / 1_000.0);
            }
            StageOutcome::Skipped => {
                metrics::STAGE_EXECUTIONS
                    .with_label_values(&[stage.name(), "skipped"])
                    .inc();
            }
        }
        self.stages.push((stage, outcome));
    }

    pub fn outcome(&self, stage: Stage) -> Option<StageOutcome> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, o)| *o)
    }

    pub fn ran(&self, stage: Stage) -> bool {
        matches!(self.outcome(stage), Some(StageOutcome::Ran { .. }))
    }

    pub fn skipped(&self, stage: Stage) -> bool {
        matches!(self.outcome(stage), Some(StageOutcome::Skipped))
    }
}

/// Errors that abort a run.
///
/// Partially completed artifacts stay in the store on purpose: an aborted
/// run is resumed by fixing the cause and running again, not by rollback.
#[derive(Debug, Error)]
pub enum DirectorError {
    /// A collaborator-backed stage failed fatally or exhausted its retries.
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: RetryError,
    },

    /// Artifact store failure.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Local background post-processing failed.
    #[error("background post-processing failed: {0}")]
    PostProcess(#[source] ImageError),

    /// Rendering failed.
    #[error("render failed: {0}")]
    Render(#[source] CompositorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lookup() {
        let mut report = RunReport::new(RunId::parse("2024_02_01").unwrap());
        report.record(Stage::Script, StageOutcome::Skipped);
        report.record(Stage::Speech, StageOutcome::Ran { duration_ms: 1200 });

        assert!(report.skipped(Stage::Script));
        assert!(report.ran(Stage::Speech));
        assert_eq!(report.outcome(Stage::Render), None);
    }
}
