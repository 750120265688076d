//! The feed controller and the events its background tasks report back.
//!
//! [`FeedController`] owns all feed state. Anything slow (page fetches,
//! trending fetches, debounce timers) runs as a spawned tokio task that
//! reports through the [`FeedEvent`] channel; the host drains that channel
//! and hands each event to [`FeedController::handle_event`]. Every mutation
//! therefore happens through `&mut FeedController`, one step at a time.
//!
//! # Example
//!
//! ```ignore
//! let (event_tx, mut event_rx) = tokio::sync::mpsc::channel(32);
//! let mut feed = FeedController::new(gateway, identity, FeedSettings::default(), event_tx);
//! feed.request_more();
//! while let Some(event) = event_rx.recv().await {
//!     feed.handle_event(event);
//!     render(&feed.snapshot());
//! }
//! ```

mod create;
mod events;
mod search;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::feed::{FetchError, FetchGateway, FetchTicket, Page, PageState, Pagination};
use crate::storage::{ItemId, ItemStore, SharedItem, StoreError, TrendingTopic};

pub use create::{IdentityProvider, SessionIdentity};
use search::SearchState;

/// Default quiet period before a typed query is evaluated.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default number of trailing items that counts as "near the end" for
/// viewport-triggered loading.
pub const DEFAULT_PREFETCH_DISTANCE: usize = 3;

// ============================================================================
// Errors
// ============================================================================

/// Failures of controller commands.
///
/// Fetch failures are not here: they are recorded in the snapshot's `error`
/// instead of being returned, since they happen in the background.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The draft cannot be posted as-is.
    #[error("Invalid draft: {0}")]
    InvalidDraft(&'static str),

    /// Item store invariant violation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Events
// ============================================================================

/// Results from background tasks.
pub enum FeedEvent {
    /// A page fetch finished.
    ///
    /// Fields:
    /// - `ticket`: page and generation the fetch was admitted with
    /// - `result`: the page or the gateway error
    PageLoaded {
        ticket: FetchTicket,
        result: Result<Page, FetchError>,
    },
    /// Trending topics fetch finished.
    TrendingLoaded {
        result: Result<Vec<TrendingTopic>, FetchError>,
    },
    /// A debounce timer survived its quiet period.
    ///
    /// Fields:
    /// - `query`: the query typed when the timer was armed
    /// - `generation`: search generation the timer belongs to
    SearchDebounced { query: String, generation: u64 },
}

impl std::fmt::Debug for FeedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedEvent::PageLoaded { ticket, result } => f
                .debug_struct("PageLoaded")
                .field("ticket", ticket)
                .field("items", &result.as_ref().map(|p| p.items.len()))
                .finish(),
            FeedEvent::TrendingLoaded { result } => f
                .debug_struct("TrendingLoaded")
                .field("topics", &result.as_ref().map(Vec::len))
                .finish(),
            FeedEvent::SearchDebounced { query, generation } => f
                .debug_struct("SearchDebounced")
                .field("query", query)
                .field("generation", generation)
                .finish(),
        }
    }
}

// ============================================================================
// Settings and Snapshot
// ============================================================================

/// Tunables for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    pub debounce: Duration,
    pub prefetch_distance: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            prefetch_distance: DEFAULT_PREFETCH_DISTANCE,
        }
    }
}

/// Read-only view of the feed for the presentation layer.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Active result set: the filtered view while a query is applied,
    /// otherwise the full item sequence. Locally posted items are kept in
    /// the filtered view whether or not they match.
    pub items: Vec<SharedItem>,
    pub loading: bool,
    pub has_more: bool,
    pub error: Option<Arc<FetchError>>,
    pub trending: Vec<TrendingTopic>,
    /// Query as last typed (may not be evaluated yet).
    pub query: String,
    pub state: PageState,
    /// Next page the pager will request.
    pub page: u32,
    /// Number of debounced search evaluations that actually ran.
    pub search_evaluations: u64,
    /// True while a debounce timer is armed.
    pub search_pending: bool,
}

// ============================================================================
// Controller
// ============================================================================

pub struct FeedController {
    gateway: Arc<dyn FetchGateway>,
    identity: Arc<dyn IdentityProvider>,
    settings: FeedSettings,
    store: ItemStore,
    pager: Pagination,
    search: SearchState,
    trending: Vec<TrendingTopic>,
    trending_loading: bool,
    /// Sequence for locally authored item ids.
    local_seq: u64,
    /// Ids of items posted this session; pinned into any filtered view.
    posted: HashSet<ItemId>,
    event_tx: mpsc::Sender<FeedEvent>,
}

impl FeedController {
    pub fn new(
        gateway: Arc<dyn FetchGateway>,
        identity: Arc<dyn IdentityProvider>,
        settings: FeedSettings,
        event_tx: mpsc::Sender<FeedEvent>,
    ) -> Self {
        Self {
            gateway,
            identity,
            settings,
            store: ItemStore::new(),
            pager: Pagination::new(),
            search: SearchState::default(),
            trending: Vec::new(),
            trending_loading: false,
            local_seq: 0,
            posted: HashSet::new(),
            event_tx,
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            items: self.active_items(),
            loading: self.pager.is_loading(),
            has_more: self.pager.has_more(),
            error: self.pager.last_error().cloned(),
            trending: self.trending.clone(),
            query: self.search.query.clone(),
            state: self.pager.state(),
            page: self.pager.page(),
            search_evaluations: self.search.evaluations,
            search_pending: self.search.timer.is_some(),
        }
    }

    fn active_items(&self) -> Vec<SharedItem> {
        match &self.search.view {
            Some(view) => view.clone(),
            None => self.store.snapshot(),
        }
    }

    /// Ask for the next page.
    ///
    /// A no-op (returning `false`) while a fetch is outstanding or after the
    /// source is exhausted, so it is safe to call on every viewport signal.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the fetch runs on a
    /// spawned task.
    pub fn request_more(&mut self) -> bool {
        let Some(ticket) = self.pager.begin() else {
            return false;
        };

        let gateway = Arc::clone(&self.gateway);
        let tx = self.event_tx.clone();

        tracing::debug!(page = ticket.page, generation = ticket.generation, "Spawning page fetch");

        tokio::spawn(async move {
            let result = gateway.fetch_page(ticket.page).await;
            if let Err(e) = tx.send(FeedEvent::PageLoaded { ticket, result }).await {
                tracing::warn!(error = %e, "Failed to send page result (receiver dropped)");
            }
        });
        true
    }

    /// Viewport proximity signal: the item at `last_visible` (index into the
    /// active result set) is on screen.
    ///
    /// Requests the next page when it is within `prefetch_distance` items of
    /// the end.
    ///
    /// # Panics
    ///
    /// Panics outside a Tokio runtime when a fetch is started (see
    /// [`FeedController::request_more`]).
    pub fn on_viewport(&mut self, last_visible: usize) -> bool {
        let len = self.search.view.as_ref().map_or(self.store.len(), Vec::len);
        let remaining = len.saturating_sub(last_visible.saturating_add(1));
        if remaining > self.settings.prefetch_distance {
            return false;
        }
        self.request_more()
    }

    /// Restart the result set from page 1 with an empty store.
    ///
    /// A fetch still in flight is not cancelled; its response is discarded on
    /// arrival because it carries the old generation.
    pub fn reset(&mut self) {
        self.pager.reset(&mut self.store);
        self.posted.clear();
        self.refresh_view();
    }

    /// Fetch trending topics in the background. Single-flight.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn load_trending(&mut self) -> bool {
        if self.trending_loading {
            return false;
        }
        self.trending_loading = true;

        let gateway = Arc::clone(&self.gateway);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = gateway.fetch_trending().await;
            if let Err(e) = tx.send(FeedEvent::TrendingLoaded { result }).await {
                tracing::warn!(error = %e, "Failed to send trending result (receiver dropped)");
            }
        });
        true
    }

    /// Recompute the filtered view after the store changed.
    ///
    /// Own posts always pass the filter, so a fresh post stays at the head
    /// of the active result set even when it does not match the query.
    fn refresh_view(&mut self) {
        let Some(query) = self.search.applied.as_deref() else {
            return;
        };
        let needle = query.to_lowercase();
        let posted = &self.posted;
        let view = self
            .store
            .filter(|item| posted.contains(&item.id) || item.matches_lowercase(&needle));
        self.search.view = Some(view);
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        if let Some(handle) = self.search.timer.take() {
            handle.abort();
            tracing::debug!("Aborted debounce timer on controller drop");
        }
    }
}
