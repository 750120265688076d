use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Item store invariant violations.
///
/// These should never surface in normal operation: the remote source hands
/// out unique identifiers and locally created items use a `local-` namespace.
/// Treat them as programming errors, not user-facing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An item with this identifier is already held by the store
    #[error("Duplicate item identifier: {0}")]
    DuplicateItem(ItemId),
}

// ============================================================================
// Data Structures
// ============================================================================

/// Stable identifier of a feed item.
///
/// Opaque to the controller. Server-assigned ids are used verbatim; locally
/// authored items get a `local-` prefixed id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single feed entry, either fetched from the remote source or authored
/// locally.
///
/// Held behind `Arc` by the store so snapshots and filtered views are cheap
/// to hand out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: String,
    #[serde(default)]
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Item {
    /// Case-insensitive substring match against title, body and tags.
    ///
    /// `needle` must already be lowercased. An empty needle matches everything.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle)
            || self.body.to_lowercase().contains(needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// Shared handle to an item held by the store.
pub type SharedItem = Arc<Item>;

/// A tag and how often it currently occurs on the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub tag: String,
    pub count: u64,
}

/// User-authored content awaiting optimistic insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

impl Draft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
