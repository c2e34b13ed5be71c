//! Application layer
//!
//! Drives domain logic through the store traits: the handler capability,
//! the sequential runner and the end-to-end run pipeline.

pub mod handler;
pub mod pipeline;
pub mod runner;

pub use handler::{FnHandler, ItemContext, ItemHandler};
pub use pipeline::{RunRequest, execute};
pub use runner::{RunOutcome, RunState, RunSummary, Runner, RunnerConfig};
