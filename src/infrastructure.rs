//! Infrastructure layer for files, configuration, logging and page fetching
//!
//! Implements the domain store traits on top of the filesystem and builds
//! item handlers from scripts.

pub mod checkpoint_store;
pub mod config;
pub mod dataset_store;
pub mod handlers;
pub mod http_client;
pub mod logging;
pub mod paths;
pub mod script;

pub use checkpoint_store::{FileCheckpointStore, InMemoryCheckpointStore};
pub use config::{ConfigManager, Settings};
pub use dataset_store::{FileDatasetStore, InMemoryDatasetStore, OutputFormat};
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging_with_config};
pub use paths::RunPaths;
pub use script::{HandlerScript, load_handler};
