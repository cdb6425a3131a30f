//! Error types for the artifact store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur reading or writing run artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The slot has never been produced for this run.
    #[error("artifact '{kind}' not found for run {run}")]
    NotFound { run: String, kind: &'static str },

    /// Another writer's temp file already exists for this slot.
    ///
    /// The pipeline is single-writer per run; hitting this means either a
    /// second orchestrator is driving the same run or a crashed write left
    /// its temp file behind for an operator to inspect.
    #[error("conflicting write in progress: {path}")]
    WriteConflict { path: PathBuf },

    /// A text slot did not contain valid UTF-8.
    #[error("artifact '{kind}' is not valid UTF-8")]
    NotUtf8 { kind: &'static str },

    /// A run key that is not a `YYYY_MM_DD` calendar date.
    #[error("invalid run key: {0}")]
    InvalidRunKey(String),

    /// Underlying filesystem error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
