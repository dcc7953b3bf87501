//! Per-consumer rendering and parsing.

use crate::item::TrackedItem;
use async_trait::async_trait;

/// Logic a consumer registers for its items under a stable consumer id.
///
/// Both methods receive a detached copy of the item; mutations go back
/// through the registry.
#[async_trait]
pub trait ItemHandler: Send + Sync {
    /// Re-derives consumer data from the item's content.
    fn parse(&self, item: &TrackedItem) -> serde_json::Value;

    /// Produces the derived view of `item` and pushes it to the content sink.
    /// Called without any registry lock held.
    async fn render(&self, item: &TrackedItem) -> anyhow::Result<()>;
}
