//! Filesystem-backed artifact store.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::ArtifactError;
use super::types::{ArtifactKind, RunId};

/// Artifact store for a single run.
///
/// Slot paths are pure functions of the run key and the slot kind; the
/// store holds no other state. Writes go to a hidden temp sibling first and
/// are renamed into place, so `exists` only ever turns true for a complete
/// value. A pre-existing temp file makes the write fail with
/// [`ArtifactError::WriteConflict`] instead of silently clobbering it.
pub struct RunStore {
    run: RunId,
    run_dir: PathBuf,
}

impl RunStore {
    /// Opens the store for `run` under `root`, creating the run's
    /// `input/` and `output/` directories on first access.
    pub async fn open(root: &Path, run: RunId) -> Result<Self, ArtifactError> {
        let run_dir = root.join(run.as_str());
        for sub in ["input", "output"] {
            let dir = run_dir.join(sub);
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| ArtifactError::io(&dir, e))?;
        }
        Ok(Self { run, run_dir })
    }

    pub fn run(&self) -> &RunId {
        &self.run
    }

    /// Absolute path of a slot, whether or not it has been produced.
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.run_dir.join(kind.relative_path())
    }

    /// Staging path a subprocess can render into before [`publish_file`]
    /// moves the result into the slot.
    ///
    /// [`publish_file`]: RunStore::publish_file
    pub fn staging_path(&self, kind: ArtifactKind) -> PathBuf {
        hidden_sibling(&self.path_for(kind), "part")
    }

    /// True iff a prior write for this slot completed.
    pub async fn exists(&self, kind: ArtifactKind) -> bool {
        fs::try_exists(self.path_for(kind)).await.unwrap_or(false)
    }

    pub async fn read_bytes(&self, kind: ArtifactKind) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path_for(kind);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ArtifactError::NotFound {
                run: self.run.as_str().to_string(),
                kind: kind.name(),
            }),
            Err(e) => Err(ArtifactError::io(path, e)),
        }
    }

    pub async fn read_text(&self, kind: ArtifactKind) -> Result<String, ArtifactError> {
        let bytes = self.read_bytes(kind).await?;
        String::from_utf8(bytes).map_err(|_| ArtifactError::NotUtf8 { kind: kind.name() })
    }

    /// Writes a slot atomically: temp sibling, flush, fsync, rename.
    pub async fn write_bytes(&self, kind: ArtifactKind, content: &[u8]) -> Result<(), ArtifactError> {
        let path = self.path_for(kind);
        let tmp = hidden_sibling(&path, "tmp");

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    ArtifactError::WriteConflict { path: tmp.clone() }
                } else {
                    ArtifactError::io(&tmp, e)
                }
            })?;

        let write_result = async {
            file.write_all(content).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = write_result {
            // Leave nothing behind on a failed write.
            drop(file);
            let _ = fs::remove_file(&tmp).await;
            return Err(ArtifactError::io(&tmp, e));
        }
        drop(file);

        fs::rename(&tmp, &path)
            .await
            .map_err(|e| ArtifactError::io(&path, e))?;

        debug!(
            run = %self.run,
            artifact = kind.name(),
            bytes = content.len(),
            sha256 = %format!("{:x}", Sha256::digest(content)),
            "artifact written"
        );
        Ok(())
    }

    pub async fn write_text(&self, kind: ArtifactKind, text: &str) -> Result<(), ArtifactError> {
        self.write_bytes(kind, text.as_bytes()).await
    }

    /// Moves an externally produced file into a slot.
    ///
    /// The staging path lives in the same directory as the slot, so the
    /// rename is atomic on any sane filesystem.
    pub async fn publish_file(&self, kind: ArtifactKind, staging: &Path) -> Result<(), ArtifactError> {
        let path = self.path_for(kind);
        fs::rename(staging, &path)
            .await
            .map_err(|e| ArtifactError::io(&path, e))?;
        debug!(run = %self.run, artifact = kind.name(), "artifact published");
        Ok(())
    }
}

/// Builds a dotfile sibling of `path`: `/a/b/c.txt` -> `/a/b/.c.txt.<ext>`.
fn hidden_sibling(path: &Path, ext: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}", name, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, RunStore) {
        let dir = TempDir::new().unwrap();
        let run = RunId::parse("2023_11_03").unwrap();
        let store = RunStore::open(dir.path(), run).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_absent_then_present() {
        let (_dir, store) = store().await;
        assert!(!store.exists(ArtifactKind::Script).await);
        store
            .write_text(ArtifactKind::Script, "晚上好，这里是今日播报。")
            .await
            .unwrap();
        assert!(store.exists(ArtifactKind::Script).await);
        let text = store.read_text(ArtifactKind::Script).await.unwrap();
        assert_eq!(text, "晚上好，这里是今日播报。");
    }

    #[tokio::test]
    async fn test_read_absent_is_not_found() {
        let (_dir, store) = store().await;
        let err = store.read_bytes(ArtifactKind::Narration).await.unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bytes_roundtrip() {
        let (_dir, store) = store().await;
        let payload = vec![0u8, 159, 146, 150, 255];
        store
            .write_bytes(ArtifactKind::RawBackground, &payload)
            .await
            .unwrap();
        assert_eq!(
            store.read_bytes(ArtifactKind::RawBackground).await.unwrap(),
            payload
        );
    }

    #[tokio::test]
    async fn test_no_temp_file_remains_after_write() {
        let (_dir, store) = store().await;
        store
            .write_text(ArtifactKind::Description, "今日要闻速览 #新闻")
            .await
            .unwrap();
        let tmp = hidden_sibling(&store.path_for(ArtifactKind::Description), "tmp");
        assert!(!fs::try_exists(&tmp).await.unwrap());
    }

    #[tokio::test]
    async fn test_conflicting_write_is_rejected() {
        let (_dir, store) = store().await;
        let tmp = hidden_sibling(&store.path_for(ArtifactKind::Script), "tmp");
        fs::write(&tmp, b"leftover").await.unwrap();

        let err = store
            .write_text(ArtifactKind::Script, "new value")
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::WriteConflict { .. }));
        // The slot itself must still be absent.
        assert!(!store.exists(ArtifactKind::Script).await);
    }

    #[tokio::test]
    async fn test_publish_file_moves_staging_into_slot() {
        let (_dir, store) = store().await;
        let staging = store.staging_path(ArtifactKind::FinalVideo);
        fs::write(&staging, b"rendered").await.unwrap();

        store
            .publish_file(ArtifactKind::FinalVideo, &staging)
            .await
            .unwrap();
        assert!(store.exists(ArtifactKind::FinalVideo).await);
        assert!(!fs::try_exists(&staging).await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_completely() {
        let (_dir, store) = store().await;
        store
            .write_text(ArtifactKind::Script, "a much longer first value")
            .await
            .unwrap();
        store.write_text(ArtifactKind::Script, "short").await.unwrap();
        assert_eq!(store.read_text(ArtifactKind::Script).await.unwrap(), "short");
    }

    #[tokio::test]
    async fn test_utf8_error_on_binary_text_read() {
        let (_dir, store) = store().await;
        store
            .write_bytes(ArtifactKind::Script, &[0xff, 0xfe, 0x00])
            .await
            .unwrap();
        let err = store.read_text(ArtifactKind::Script).await.unwrap_err();
        assert!(matches!(err, ArtifactError::NotUtf8 { .. }));
    }
}
