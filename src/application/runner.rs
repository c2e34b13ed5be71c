//! Rate-limited sequential runner
//!
//! Drives one run over a resolved selection:
//!
//! ```text
//! Idle -> Resolving -> Iterating -> Completed
//!                                 \-> Failed
//! ```
//!
//! For each pending location (bounded by the item limit) the runner waits the
//! configured delay, invokes the handler, merges the result at the location,
//! persists the whole document and then advances and persists the
//! checkpoint. Any failure stops the run before the failing item is merged,
//! so the persisted document and checkpoint always agree. A stop request
//! drops an in-flight handler call without merging its item.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::handler::{ItemContext, ItemHandler};
use crate::domain::location::Location;
use crate::domain::merge::merge_at;
use crate::domain::progress::{Progress, Selection};
use crate::domain::repositories::{CheckpointStore, DatasetStore};
use crate::error::{ScrapeError, ScrapeResult};
use crate::query;

/// Delay, limit and mode of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Pause before every handler invocation.
    pub delay: Duration,
    /// Maximum number of items processed by this run; `None` is unbounded.
    pub item_limit: Option<usize>,
    /// Walk the selection without invoking the handler or persisting anything.
    pub dry_run: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            item_limit: None,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Resolving,
    Iterating,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every selected item is processed and the checkpoint is cleared.
    Completed,
    /// The item limit stopped the run; the checkpoint marks where to resume.
    LimitReached,
    /// A stop was requested between items.
    Interrupted,
    /// Dry run: the selection was walked without side effects.
    Inspected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub selected: usize,
    pub start: usize,
    pub end: usize,
    /// Items walked by this run (handled, or inspected in a dry run).
    pub visited: usize,
    pub progress: Progress,
    pub outcome: RunOutcome,
}

pub struct Runner {
    document: Value,
    progress: Progress,
    checkpoint: Box<dyn CheckpointStore>,
    dataset: Box<dyn DatasetStore>,
    handler: Box<dyn ItemHandler>,
    config: RunnerConfig,
    state: RunState,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(
        document: Value,
        progress: Progress,
        checkpoint: Box<dyn CheckpointStore>,
        dataset: Box<dyn DatasetStore>,
        handler: Box<dyn ItemHandler>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            document,
            progress,
            checkpoint,
            dataset,
            handler,
            config,
            state: RunState::Idle,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between items once `token` is cancelled. A handler call still in
    /// flight is dropped and its item left for the next run.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    /// Resolve `query` once against the current document, then iterate.
    pub async fn run(&mut self, query: &str) -> ScrapeResult<RunSummary> {
        let selection = self.resolve(None, query)?;
        self.run_selection(&selection).await
    }

    /// Resolve `query` against `source` (the original input of a resumed
    /// run), then iterate over the current document at those locations.
    pub async fn run_over_source(&mut self, source: &Value, query: &str) -> ScrapeResult<RunSummary> {
        let selection = self.resolve(Some(source), query)?;
        self.run_selection(&selection).await
    }

    fn resolve(&mut self, source: Option<&Value>, query: &str) -> ScrapeResult<Selection> {
        self.transition(RunState::Resolving);
        let resolved = query::resolve(source.unwrap_or(&self.document), query);
        match resolved {
            Ok(selection) => {
                info!("Data points found: {}", selection.len());
                Ok(selection)
            }
            Err(e) => {
                self.transition(RunState::Failed);
                Err(e.into())
            }
        }
    }

    /// Iterate an already resolved selection.
    pub async fn run_selection(&mut self, selection: &Selection) -> ScrapeResult<RunSummary> {
        self.transition(RunState::Iterating);
        let result = self.iterate(selection).await;
        match &result {
            Ok(summary) => {
                self.transition(RunState::Completed);
                info!(
                    outcome = ?summary.outcome,
                    visited = summary.visited,
                    progress = %summary.progress,
                    selected = summary.selected,
                    "Run finished"
                );
            }
            Err(e) => {
                self.transition(RunState::Failed);
                warn!(progress = %self.progress, "Run failed: {}", e);
            }
        }
        result
    }

    async fn iterate(&mut self, selection: &Selection) -> ScrapeResult<RunSummary> {
        let total = selection.len();
        let (start, end) = selection.window(self.progress, self.config.item_limit);
        let mut visited = 0;

        if start > 0 {
            info!("Resuming from item {} of {}", start + 1, total);
        }

        for index in start..end {
            let location = &selection[index];

            if self.config.dry_run {
                self.inspect(index, total, location);
                visited += 1;
                continue;
            }

            if self.cancel.is_cancelled() || !self.wait_delay().await {
                warn!("⏸️ Stop requested, leaving checkpoint at {}", self.progress);
                return Ok(self.summary(selection, start, end, visited, RunOutcome::Interrupted));
            }

            info!("🔎 Scraping item ({}/{}) at {}", index + 1, total, location);
            if !self.process_item(index, total, location).await? {
                warn!("⏸️ Stop requested while handling item {}, nothing merged", index + 1);
                return Ok(self.summary(selection, start, end, visited, RunOutcome::Interrupted));
            }
            visited += 1;
        }

        if self.config.dry_run {
            info!("Dry run mode, nothing was scraped or persisted");
            return Ok(self.summary(selection, start, end, visited, RunOutcome::Inspected));
        }

        let outcome = if selection.is_complete(self.progress) {
            self.checkpoint.clear().await?;
            info!("✅ All {} items processed, checkpoint cleared", total);
            RunOutcome::Completed
        } else {
            info!(
                "Item limit reached at {}/{}, checkpoint kept for the next run",
                self.progress, total
            );
            RunOutcome::LimitReached
        };
        Ok(self.summary(selection, start, end, visited, outcome))
    }

    fn inspect(&self, index: usize, total: usize, location: &Location) {
        match location.get(&self.document) {
            Some(element) => info!(
                "Dry run ({}/{}) at {}: {}",
                index + 1,
                total,
                location,
                element
            ),
            None => warn!("Dry run ({}/{}): {} does not resolve", index + 1, total, location),
        }
    }

    /// Sleep for the configured delay; `false` if a stop was requested meanwhile.
    async fn wait_delay(&self) -> bool {
        if self.config.delay.is_zero() {
            return true;
        }
        debug!("Waiting {:?} before next item", self.config.delay);
        tokio::select! {
            () = tokio::time::sleep(self.config.delay) => true,
            () = self.cancel.cancelled() => false,
        }
    }

    /// Handle, merge and persist one item; `false` if a stop was requested
    /// before the handler returned.
    async fn process_item(&mut self, index: usize, total: usize, location: &Location) -> ScrapeResult<bool> {
        let element = location
            .get(&self.document)
            .cloned()
            .ok_or_else(|| ScrapeError::LocationMissing {
                location: location.clone(),
            })?;

        let ctx = ItemContext {
            index,
            total,
            location,
        };
        let handled = tokio::select! {
            handled = self.handler.handle(&ctx, &element) => handled,
            () = self.cancel.cancelled() => return Ok(false),
        };
        let result = handled.map_err(|source| ScrapeError::HandlerFailure {
            handler: self.handler.name().to_string(),
            index,
            location: location.clone(),
            source,
        })?;
        debug!("Handler result for {}: {}", location, result);

        merge_at(&mut self.document, location, result)?;
        self.dataset.persist(&self.document).await?;

        self.progress = self.progress.advance();
        self.checkpoint.save(self.progress).await?;
        debug!("Update task progress: {}", self.progress);
        Ok(true)
    }

    fn summary(
        &self,
        selection: &Selection,
        start: usize,
        end: usize,
        visited: usize,
        outcome: RunOutcome,
    ) -> RunSummary {
        RunSummary {
            selected: selection.len(),
            start,
            end,
            visited,
            progress: self.progress,
            outcome,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!("Runner state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
