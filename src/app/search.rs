//! Debounced search over the loaded items.
//!
//! The debounce is a single-slot scheduled task: arming a new timer aborts
//! the pending one and bumps the search generation, and an elapsed timer is
//! only acted on when its generation is still current. A timer that raced
//! its own abort therefore can never evaluate.
//!
//! Search is local: only items already fetched are filtered. The remote
//! source is not queried with the search term.

use tokio::task::JoinHandle;

use super::{FeedController, FeedEvent};
use crate::storage::SharedItem;

/// Maximum search query length; longer input is cut before evaluation.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;

#[derive(Default)]
pub(super) struct SearchState {
    /// Query as last typed.
    pub query: String,
    /// Normalised query currently applied, `None` when showing everything.
    pub applied: Option<String>,
    /// Filtered view published while `applied` is set.
    pub view: Option<Vec<SharedItem>>,
    pub generation: u64,
    pub timer: Option<JoinHandle<()>>,
    pub evaluations: u64,
}

/// Trim and cap a raw query. Whitespace-only input becomes empty.
pub(super) fn normalize_query(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(MAX_SEARCH_QUERY_LENGTH) {
        Some((cut, _)) => {
            tracing::warn!(
                len = trimmed.chars().count(),
                max = MAX_SEARCH_QUERY_LENGTH,
                "Search query too long, truncating"
            );
            trimmed[..cut].trim_end().to_string()
        }
        None => trimmed.to_string(),
    }
}

impl FeedController {
    /// Record a query change and (re)arm the debounce timer.
    ///
    /// Nothing is evaluated here; the surviving timer delivers a
    /// [`FeedEvent::SearchDebounced`] once input has been quiet for the
    /// configured delay.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the timer is a
    /// spawned task.
    pub fn set_query(&mut self, query: &str) {
        if let Some(handle) = self.search.timer.take() {
            handle.abort();
            tracing::trace!("Aborted pending debounce timer");
        }

        self.search.query = query.to_string();
        self.search.generation = self.search.generation.wrapping_add(1);
        let generation = self.search.generation;

        let delay = self.settings.debounce;
        let tx = self.event_tx.clone();
        let query = query.to_string();

        tracing::debug!(query = %query, generation, "Arming search debounce");

        self.search.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = tx.send(FeedEvent::SearchDebounced { query, generation }).await {
                tracing::warn!(error = %e, "Failed to send debounce event (receiver dropped)");
            }
        }));
    }

    /// Show items tagged (or otherwise matching) `tag`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (see
    /// [`FeedController::set_query`]).
    pub fn select_topic(&mut self, tag: &str) {
        self.set_query(tag);
    }

    pub(super) fn handle_search_debounced(&mut self, query: String, generation: u64) -> bool {
        if generation != self.search.generation {
            tracing::debug!(
                query = %query,
                generation,
                current = self.search.generation,
                "Dropping stale debounce event"
            );
            return false;
        }
        self.search.timer = None;
        self.evaluate_query(&query);
        true
    }

    /// Decide between re-filtering loaded items and populating first.
    fn evaluate_query(&mut self, raw: &str) {
        let query = normalize_query(raw);
        self.search.evaluations += 1;

        tracing::debug!(
            query = %query,
            loaded = self.store.len(),
            evaluation = self.search.evaluations,
            "Evaluating search"
        );

        if query.is_empty() {
            // Loaded items stand as they are; only the filter goes away.
            self.search.applied = None;
            self.search.view = None;
            if self.store.is_empty() {
                self.request_more();
            }
            return;
        }

        self.search.applied = Some(query);
        if self.store.is_empty() {
            // The view fills in once the page lands (see refresh_view).
            self.search.view = Some(Vec::new());
            self.request_more();
        } else {
            self.refresh_view();
        }
    }
}
