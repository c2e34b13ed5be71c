//! Domain module - documents, locations, selections and the merge rule
//!
//! The value types and the merge rule are synchronous and free of I/O. The
//! store traits are the seams the infrastructure layer implements.

pub mod location;
pub mod merge;
pub mod progress;
pub mod repositories;

pub use location::{Location, PathSegment};
pub use merge::{ItemShape, MergeRule, merge_at};
pub use progress::{Progress, Selection};
pub use repositories::{CheckpointStore, DatasetStore};
