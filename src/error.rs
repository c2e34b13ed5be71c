//! Error taxonomy for scrape-and-merge runs
//!
//! Start-of-run errors (query, source, checkpoint, script) abort before any
//! persisted state is touched. Mid-run errors (handler, merge, location,
//! persist) abort the run but leave the output document and checkpoint
//! describing the same "completed through index N-1" state.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::location::Location;
use crate::domain::merge::ItemShape;
use crate::query::QueryError;

pub type ScrapeResult<T> = Result<T, ScrapeError>;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Invalid selection query: {0}")]
    QuerySyntax(#[from] QueryError),

    #[error("Cannot read dataset {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset {path} is not valid JSON: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot read checkpoint {path}: {source}")]
    CheckpointUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint {path} is corrupt: {reason}")]
    CorruptCheckpoint { path: PathBuf, reason: String },

    #[error("Handler '{handler}' failed on item {index} at {location}: {source:#}")]
    HandlerFailure {
        handler: String,
        index: usize,
        location: Location,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cannot merge {result} result into {element} element at {location}")]
    MergeRejected {
        location: Location,
        element: ItemShape,
        result: ItemShape,
    },

    #[error("Location {location} no longer exists in the document")]
    LocationMissing { location: Location },

    #[error("Failed to persist {what} to {path}: {source}")]
    Persist {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Handler script {path}: {reason}")]
    Script { path: PathBuf, reason: String },
}

impl ScrapeError {
    /// Whether the error was raised before any persisted state could change.
    pub fn is_start_of_run(&self) -> bool {
        matches!(
            self,
            Self::QuerySyntax(_)
                | Self::SourceUnreadable { .. }
                | Self::MalformedDocument { .. }
                | Self::CheckpointUnreadable { .. }
                | Self::CorruptCheckpoint { .. }
                | Self::Script { .. }
        )
    }

    pub fn persist(what: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            what,
            path: path.into(),
            source,
        }
    }
}
