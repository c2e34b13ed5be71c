//! Per-item handler capability
//!
//! The runner treats a handler as an opaque async function from one selected
//! element to its enriched replacement. Whatever the handler needs to do its
//! job (an HTTP client, a child process, a browser) lives inside the
//! implementation and is built by the composition root.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::location::Location;

/// What the runner tells a handler about the item being processed.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    /// Position in the selection (0-based).
    pub index: usize,
    /// Selection length.
    pub total: usize,
    pub location: &'a Location,
}

#[async_trait]
pub trait ItemHandler: Send + Sync {
    /// Identity used in logs and errors.
    fn name(&self) -> &str;

    /// Produce the result to merge at `ctx.location`.
    async fn handle(&self, ctx: &ItemContext<'_>, element: &Value) -> anyhow::Result<Value>;
}

/// Adapts a plain closure into an [`ItemHandler`].
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&ItemContext<'_>, &Value) -> anyhow::Result<Value> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> ItemHandler for FnHandler<F>
where
    F: Fn(&ItemContext<'_>, &Value) -> anyhow::Result<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ItemContext<'_>, element: &Value) -> anyhow::Result<Value> {
        (self.func)(ctx, element)
    }
}
