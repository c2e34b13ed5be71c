//! Checkpoint persistence
//!
//! The checkpoint is a tiny JSON record, `{"step": N}`, rewritten after every
//! processed item and removed once the selection is exhausted.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::domain::progress::Progress;
use crate::domain::repositories::CheckpointStore;
use crate::error::{ScrapeError, ScrapeResult};
use crate::infrastructure::dataset_store::write_atomic;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointRecord {
    step: u64,
}

/// Checkpoint stored next to the dataset, e.g. `.product.progress.json`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl Into<String>) -> ScrapeError {
        ScrapeError::CorruptCheckpoint {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> ScrapeResult<Option<Progress>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No checkpoint at {:?}, starting fresh", self.path);
                return Ok(None);
            }
            Err(source) => {
                return Err(ScrapeError::CheckpointUnreadable {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let record: CheckpointRecord =
            serde_json::from_str(&raw).map_err(|e| self.corrupt(e.to_string()))?;
        let step = usize::try_from(record.step).map_err(|e| self.corrupt(e.to_string()))?;
        info!("Restored checkpoint {:?}: step {}", self.path, step);
        Ok(Some(Progress::new(step)))
    }

    async fn save(&self, progress: Progress) -> ScrapeResult<()> {
        let record = CheckpointRecord {
            step: progress.step() as u64,
        };
        let raw = serde_json::to_vec(&record).map_err(|e| {
            ScrapeError::persist("checkpoint", &self.path, std::io::Error::other(e))
        })?;
        write_atomic(&self.path, &raw)
            .await
            .map_err(|e| ScrapeError::persist("checkpoint", &self.path, e))
    }

    async fn clear(&self) -> ScrapeResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed checkpoint {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScrapeError::persist("checkpoint", &self.path, e)),
        }
    }
}

/// Process-local checkpoint, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    inner: Arc<Mutex<InMemoryCheckpoint>>,
}

#[derive(Debug, Default)]
struct InMemoryCheckpoint {
    current: Option<Progress>,
    history: Vec<Option<Progress>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(progress: Progress) -> Self {
        let store = Self::default();
        store.lock().current = Some(progress);
        store
    }

    /// Value currently stored, `None` if absent.
    pub fn current(&self) -> Option<Progress> {
        self.lock().current
    }

    /// Every value written so far; `None` entries are clears.
    pub fn history(&self) -> Vec<Option<Progress>> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryCheckpoint> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self) -> ScrapeResult<Option<Progress>> {
        Ok(self.current())
    }

    async fn save(&self, progress: Progress) -> ScrapeResult<()> {
        let mut state = self.lock();
        state.current = Some(progress);
        state.history.push(Some(progress));
        Ok(())
    }

    async fn clear(&self) -> ScrapeResult<()> {
        let mut state = self.lock();
        state.current = None;
        state.history.push(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_fresh_start() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(dir.path().join(".product.progress.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_load_clear_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".product.progress.json");
        let store = FileCheckpointStore::new(&path);

        store.save(Progress::new(3)).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"step":3}"#);
        assert_eq!(store.load().await.unwrap(), Some(Progress::new(3)));

        store.clear().await.unwrap();
        assert!(!path.exists());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_record_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(dir.path().join(".p.progress.json"));

        for raw in ["{not json", r#"{"step": -1}"#, r#"{"steps": 2}"#, r#"{"step": 1.5}"#] {
            std::fs::write(store.path(), raw).unwrap();
            let err = store.load().await.unwrap_err();
            assert!(matches!(err, ScrapeError::CorruptCheckpoint { .. }), "{raw}");
        }
    }

    #[tokio::test]
    async fn unreadable_file_is_not_reported_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(dir.path().join(".p.progress.json"));
        std::fs::create_dir(store.path()).unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ScrapeError::CheckpointUnreadable { .. }), "{err}");
        assert!(err.is_start_of_run());
    }

    #[tokio::test]
    async fn in_memory_store_records_history() {
        let store = InMemoryCheckpointStore::new();
        let observer = store.clone();
        store.save(Progress::new(1)).await.unwrap();
        store.save(Progress::new(2)).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(observer.current(), None);
        assert_eq!(
            observer.history(),
            vec![Some(Progress::new(1)), Some(Progress::new(2)), None]
        );
    }
}
