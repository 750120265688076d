//! Paging cursor and in-flight guard.
//!
//! The state machine is synchronous: [`Pagination::begin`] hands out a
//! [`FetchTicket`] when a fetch may start, the caller performs the fetch
//! however it likes, and [`Pagination::complete`] folds the outcome back in.
//! Splitting it this way keeps the guard check and the state change in one
//! `&mut self` step, so two callers can never both observe `Idle`.

use std::collections::HashSet;
use std::sync::Arc;

use super::gateway::{FetchError, Page};
use crate::storage::{Item, ItemStore};

/// Where the pager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Ready to fetch the next page.
    Idle,
    /// A fetch is outstanding; further requests are no-ops.
    Loading,
    /// The source ran dry. Only [`Pagination::reset`] leaves this state.
    Exhausted,
    /// The last fetch failed. The next request retries the same page.
    Failed,
}

/// Proof that a fetch was admitted by the guard.
///
/// Carries the page to request and the generation it was issued against so
/// a response arriving after a reset can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub page: u32,
    pub generation: u64,
}

/// What [`Pagination::complete`] did with a fetch outcome.
#[derive(Debug, PartialEq, Eq)]
pub enum PageOutcome {
    /// The ticket predates the current generation; nothing changed.
    Stale,
    /// Items were appended and more pages may follow.
    Appended(usize),
    /// The source is exhausted (after appending `appended` items).
    Exhausted { appended: usize },
    /// The fetch failed; the error is recorded.
    Failed,
}

#[derive(Debug)]
pub struct Pagination {
    state: PageState,
    page: u32,
    has_more: bool,
    generation: u64,
    last_error: Option<Arc<FetchError>>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new()
    }
}

impl Pagination {
    pub fn new() -> Self {
        Self {
            state: PageState::Idle,
            page: 1,
            has_more: true,
            generation: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Next page to request (1-based).
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.state == PageState::Loading
    }

    pub fn last_error(&self) -> Option<&Arc<FetchError>> {
        self.last_error.as_ref()
    }

    /// Try to admit a fetch.
    ///
    /// Returns `None` while a fetch is already outstanding or once the source
    /// is exhausted. A `Failed` pager is admitted again: failure is not
    /// terminal.
    pub fn begin(&mut self) -> Option<FetchTicket> {
        match self.state {
            PageState::Loading => {
                tracing::debug!(page = self.page, "Fetch already in flight, ignoring request");
                None
            }
            PageState::Exhausted => {
                tracing::debug!("No more pages, ignoring request");
                None
            }
            PageState::Idle | PageState::Failed if !self.has_more => None,
            PageState::Idle | PageState::Failed => {
                self.state = PageState::Loading;
                let ticket = FetchTicket {
                    page: self.page,
                    generation: self.generation,
                };
                tracing::debug!(page = ticket.page, generation = ticket.generation, "Page fetch admitted");
                Some(ticket)
            }
        }
    }

    /// Fold a fetch outcome back into the pager and the store.
    ///
    /// Items whose id is already held (or repeated within the page) are
    /// dropped one by one and logged at `error`; the rest of the page is
    /// appended.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page, FetchError>,
        store: &mut ItemStore,
    ) -> PageOutcome {
        if ticket.generation != self.generation || self.state != PageState::Loading {
            tracing::debug!(
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                page = ticket.page,
                "Discarding stale page response"
            );
            return PageOutcome::Stale;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(page = ticket.page, error = %e, "Page fetch failed");
                self.state = PageState::Failed;
                self.last_error = Some(Arc::new(e));
                return PageOutcome::Failed;
            }
        };

        self.last_error = None;

        if page.items.is_empty() {
            tracing::debug!(page = ticket.page, "Empty page, feed exhausted");
            self.exhaust();
            return PageOutcome::Exhausted { appended: 0 };
        }

        let source_has_more = page.has_more;
        let next = page.next_page;
        let fresh = drop_colliding(ticket.page, page.items, store);
        let appended = match store.append(fresh) {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(
                    page = ticket.page,
                    error = %e,
                    "Page rejected by item store, its items are lost"
                );
                0
            }
        };
        // The cursor moves even when nothing was appended so the pager
        // cannot wedge on the same page.
        self.advance(next);

        if source_has_more {
            self.state = PageState::Idle;
            PageOutcome::Appended(appended)
        } else {
            self.exhaust();
            PageOutcome::Exhausted { appended }
        }
    }

    /// Restart the result set: back to page 1 with an empty store.
    ///
    /// Bumps the generation so any fetch still in flight is discarded when
    /// it lands.
    pub fn reset(&mut self, store: &mut ItemStore) {
        self.generation = self.generation.wrapping_add(1);
        self.state = PageState::Idle;
        self.page = 1;
        self.has_more = true;
        self.last_error = None;
        store.clear();
        tracing::debug!(generation = self.generation, "Pagination reset");
    }

    fn exhaust(&mut self) {
        self.state = PageState::Exhausted;
        self.has_more = false;
    }

    /// Move the cursor forward, honouring a source-suggested cursor only when
    /// it keeps the cursor monotonic.
    fn advance(&mut self, suggested: Option<u32>) {
        let fallback = self.page.saturating_add(1);
        self.page = suggested.filter(|&n| n > self.page).unwrap_or(fallback);
    }
}

/// Keep the page items that would not collide with held items or with an
/// earlier item of the same page.
fn drop_colliding(page: u32, items: Vec<Item>, store: &ItemStore) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| {
            let fresh = !store.contains(&item.id) && seen.insert(item.id.clone());
            if !fresh {
                tracing::error!(page, id = %item.id, "Dropping page item with duplicate id");
            }
            fresh
        })
        .collect()
}
