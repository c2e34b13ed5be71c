//! Dataset document persistence
//!
//! Fresh runs read the input dataset; resumed runs read the output written
//! by the interrupted run, which already carries every merged item. Output
//! is always written as a full snapshot through a temp file and a rename, so
//! a crash never leaves a half-written document behind.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::domain::progress::Progress;
use crate::domain::repositories::DatasetStore;
use crate::error::{ScrapeError, ScrapeResult};

/// Cosmetic serialization mode of the output document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Compact,
    /// Two-space indentation.
    Pretty,
}

impl OutputFormat {
    pub fn from_pretty_flag(pretty: bool) -> Self {
        if pretty { Self::Pretty } else { Self::Compact }
    }

    pub fn render(self, document: &Value) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::Compact => serde_json::to_vec(document),
            Self::Pretty => serde_json::to_vec_pretty(document),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileDatasetStore {
    input: PathBuf,
    output: PathBuf,
    format: OutputFormat,
}

impl FileDatasetStore {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

#[async_trait]
impl DatasetStore for FileDatasetStore {
    async fn load_initial(&self, progress: Progress) -> ScrapeResult<Value> {
        let path = if progress.is_fresh() {
            info!("Data source: {:?}", self.input);
            &self.input
        } else {
            info!("Restoring data source: {:?}", self.output);
            &self.output
        };
        read_document(path).await
    }

    async fn load_source(&self) -> ScrapeResult<Value> {
        debug!("Reading original data source {:?} for selection", self.input);
        read_document(&self.input).await
    }

    async fn persist(&self, document: &Value) -> ScrapeResult<()> {
        let raw = self
            .format
            .render(document)
            .map_err(|e| ScrapeError::persist("dataset", &self.output, std::io::Error::other(e)))?;
        debug!("Writing {} bytes to {:?}", raw.len(), self.output);
        write_atomic(&self.output, &raw)
            .await
            .map_err(|e| ScrapeError::persist("dataset", &self.output, e))
    }
}

pub async fn read_document(path: &Path) -> ScrapeResult<Value> {
    let raw = fs::read(path)
        .await
        .map_err(|source| ScrapeError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Parsing dataset ({} bytes)...", raw.len());
    serde_json::from_slice(&raw).map_err(|source| ScrapeError::MalformedDocument {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `contents` via a synced sibling temp file and a rename.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = fs::File::create(&tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, path).await
}

/// Document store kept in memory; clones share the same state.
#[derive(Debug, Clone)]
pub struct InMemoryDatasetStore {
    inner: Arc<Mutex<InMemoryDataset>>,
}

#[derive(Debug)]
struct InMemoryDataset {
    input: Value,
    output: Option<Value>,
    persist_count: usize,
}

impl InMemoryDatasetStore {
    pub fn new(input: Value) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InMemoryDataset {
                input,
                output: None,
                persist_count: 0,
            })),
        }
    }

    /// Last persisted snapshot, if any.
    pub fn output(&self) -> Option<Value> {
        self.lock().output.clone()
    }

    pub fn persist_count(&self) -> usize {
        self.lock().persist_count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryDataset> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl DatasetStore for InMemoryDatasetStore {
    async fn load_initial(&self, progress: Progress) -> ScrapeResult<Value> {
        let state = self.lock();
        if progress.is_fresh() {
            return Ok(state.input.clone());
        }
        state.output.clone().ok_or_else(|| ScrapeError::SourceUnreadable {
            path: PathBuf::from("<memory output>"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    async fn load_source(&self) -> ScrapeResult<Value> {
        Ok(self.lock().input.clone())
    }

    async fn persist(&self, document: &Value) -> ScrapeResult<()> {
        let mut state = self.lock();
        state.output = Some(document.clone());
        state.persist_count += 1;
        Ok(())
    }
}
