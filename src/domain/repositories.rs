//! Storage interfaces for run state
//!
//! Contains trait definitions for the two pieces of state a run persists:
//! the processed-count checkpoint and the dataset document.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::progress::Progress;
use crate::error::ScrapeResult;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// `None` when no checkpoint exists yet (fresh start).
    async fn load(&self) -> ScrapeResult<Option<Progress>>;
    /// Durably overwrite the checkpoint record.
    async fn save(&self, progress: Progress) -> ScrapeResult<()>;
    /// Remove the record; an already-missing record is not an error.
    async fn clear(&self) -> ScrapeResult<()>;
}

#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Input document on a fresh run, previously persisted output when resuming.
    async fn load_initial(&self, progress: Progress) -> ScrapeResult<Value>;
    /// The original input document, whatever the progress. Selections are
    /// always resolved against it so that indices stay stable across resumes.
    async fn load_source(&self) -> ScrapeResult<Value>;
    /// Replace the persisted output with a complete snapshot of `document`.
    async fn persist(&self, document: &Value) -> ScrapeResult<()>;
}
