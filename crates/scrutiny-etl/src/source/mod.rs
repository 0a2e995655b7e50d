//! Source adapters
//!
//! Implement [`ContentSource`] for any upstream that ranks top-level stories and
//! serves them as nested trees.

mod hacker_news;

pub use hacker_news::HackerNewsSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ContentNode, ItemId};

/// Read API over tree-shaped content
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Top-level story IDs, best ranked first
    async fn list_top_level_ids(&self) -> Result<Vec<ItemId>>;

    /// One node with its full nested tree of children
    async fn fetch_node(&self, id: ItemId) -> Result<ContentNode>;
}
