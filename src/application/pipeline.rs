//! One scrape run end to end
//!
//! Derives the run's file locations, restores progress, loads the document
//! to update (input on a fresh run, output on resume) and hands everything
//! to a [`Runner`]. The selection is always resolved against the input.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::application::handler::ItemHandler;
use crate::application::runner::{RunSummary, Runner, RunnerConfig};
use crate::domain::progress::Progress;
use crate::domain::repositories::{CheckpointStore, DatasetStore};
use crate::error::ScrapeResult;
use crate::infrastructure::checkpoint_store::FileCheckpointStore;
use crate::infrastructure::dataset_store::{FileDatasetStore, OutputFormat};
use crate::infrastructure::paths::RunPaths;

/// Everything a run needs besides its handler.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub dataset: PathBuf,
    /// Defaults to `output.json` next to the dataset.
    pub output: Option<PathBuf>,
    /// Names the checkpoint; the handler itself is built separately.
    pub script: PathBuf,
    pub query: String,
    pub format: OutputFormat,
    pub runner: RunnerConfig,
}

pub async fn execute(
    request: &RunRequest,
    handler: Box<dyn ItemHandler>,
    cancel: CancellationToken,
) -> ScrapeResult<RunSummary> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id);

    async move {
        let paths = RunPaths::derive(&request.dataset, request.output.as_deref(), &request.script)?;
        info!("Checkpoint file: {:?}", paths.checkpoint);

        let checkpoint = FileCheckpointStore::new(&paths.checkpoint);
        let dataset = FileDatasetStore::new(&paths.dataset, &paths.output, request.format);

        let progress = checkpoint.load().await?.unwrap_or(Progress::ZERO);
        info!("Current task progress: {}", progress);

        let document = dataset.load_initial(progress).await?;
        // Locations always come from the original input; a resumed document
        // may no longer match the query the same way.
        let source = if progress.is_fresh() {
            None
        } else {
            Some(dataset.load_source().await?)
        };

        let mut runner = Runner::new(
            document,
            progress,
            Box::new(checkpoint),
            Box::new(dataset),
            handler,
            request.runner.clone(),
        )
        .with_cancellation(cancel);
        match &source {
            Some(source) => runner.run_over_source(source, &request.query).await,
            None => runner.run(&request.query).await,
        }
    }
    .instrument(span)
    .await
}
