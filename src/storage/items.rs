use std::collections::HashSet;
use std::sync::Arc;

use super::types::{Item, ItemId, SharedItem, StoreError};

/// Ordered, identity-checked sequence of feed items.
///
/// Insertion order is display order. Pagination grows the tail, optimistic
/// posts grow the head, and nothing ever reorders existing entries. A side
/// index of identifiers rejects collisions instead of overwriting.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: Vec<SharedItem>,
    ids: HashSet<ItemId>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    /// Append a page of items to the tail, preserving arrival order.
    ///
    /// The batch is all-or-nothing: a collision with a held item, or between
    /// two items of the same batch, rejects the whole batch and leaves the
    /// store untouched.
    pub fn append<I>(&mut self, items: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = Item>,
    {
        let batch: Vec<Item> = items.into_iter().collect();

        {
            let mut seen = HashSet::with_capacity(batch.len());
            for item in &batch {
                if self.ids.contains(&item.id) || !seen.insert(&item.id) {
                    return Err(StoreError::DuplicateItem(item.id.clone()));
                }
            }
        }

        let added = batch.len();
        self.items.reserve(added);
        for item in batch {
            self.ids.insert(item.id.clone());
            self.items.push(Arc::new(item));
        }
        Ok(added)
    }

    /// Insert a single item at the head.
    pub fn prepend(&mut self, item: Item) -> Result<SharedItem, StoreError> {
        if self.ids.contains(&item.id) {
            return Err(StoreError::DuplicateItem(item.id));
        }
        self.ids.insert(item.id.clone());
        let shared = Arc::new(item);
        self.items.insert(0, Arc::clone(&shared));
        Ok(shared)
    }

    /// Full ordered view. Cloning only bumps reference counts.
    pub fn snapshot(&self) -> Vec<SharedItem> {
        self.items.clone()
    }

    /// Non-mutating derived view of the items accepted by `predicate`.
    pub fn filter<P>(&self, mut predicate: P) -> Vec<SharedItem>
    where
        P: FnMut(&Item) -> bool,
    {
        self.items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
    }
}
