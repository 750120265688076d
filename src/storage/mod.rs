//! In-memory item storage for the feed.
//!
//! Nothing here is persisted: the store lives exactly as long as the
//! controller that owns it.
//!
//! - [`ItemStore`] - ordered, identity-checked item sequence
//! - `types` - domain records shared with the gateway and the controller

mod items;
mod types;

pub use items::ItemStore;
pub use types::{Draft, Item, ItemId, SharedItem, StoreError, TrendingTopic};
