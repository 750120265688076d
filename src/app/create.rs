use chrono::{DateTime, Utc};

use super::{FeedController, FeedError};
use crate::storage::{Draft, Item, ItemId, SharedItem};

/// Supplies the author label and avatar for the current session.
pub trait IdentityProvider: Send + Sync {
    fn author(&self) -> String;
    fn avatar(&self) -> String;
}

/// Fixed identity, typically read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub author: String,
    pub avatar: String,
}

impl SessionIdentity {
    pub fn new(author: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            avatar: avatar.into(),
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn author(&self) -> String {
        self.author.clone()
    }

    fn avatar(&self) -> String {
        self.avatar.clone()
    }
}

/// Trim tags, drop a leading `#` and discard empties. Order is kept.
fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim().trim_start_matches('#').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn local_id(now: DateTime<Utc>, seq: u64) -> ItemId {
    ItemId::new(format!("local-{}-{}", now.timestamp_millis(), seq))
}

impl FeedController {
    /// Post a draft optimistically.
    ///
    /// The new item is at the head of the feed as soon as this returns; no
    /// round-trip to the remote source is made. An empty title is rejected
    /// without touching any state.
    ///
    /// While a query is applied the post is shown first in the filtered
    /// view too, matching or not.
    pub fn submit(&mut self, draft: Draft) -> Result<SharedItem, FeedError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(FeedError::InvalidDraft("title must not be empty"));
        }

        let now = Utc::now();
        let mut id = local_id(now, self.local_seq);
        // Cannot collide in practice; skip ahead rather than fail if it does.
        while self.store.contains(&id) {
            self.local_seq = self.local_seq.wrapping_add(1);
            id = local_id(now, self.local_seq);
        }
        self.local_seq = self.local_seq.wrapping_add(1);

        let item = Item {
            id,
            title: title.to_string(),
            body: draft.body.trim().to_string(),
            author: self.identity.author(),
            avatar: self.identity.avatar(),
            created_at: now,
            likes: 0,
            comments: 0,
            tags: normalize_tags(&draft.tags),
        };

        let shared = self.store.prepend(item)?;
        self.posted.insert(shared.id.clone());
        self.refresh_view();

        tracing::info!(id = %shared.id, title = %shared.title, "Posted item optimistically");
        Ok(shared)
    }
}
