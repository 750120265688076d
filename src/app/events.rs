//! Background task event handling.
//!
//! Folds results from page fetches, trending fetches and debounce timers
//! back into controller state.

use super::{FeedController, FeedEvent};
use crate::feed::{FetchError, FetchTicket, Page, PageOutcome};
use crate::storage::TrendingTopic;

impl FeedController {
    /// Apply one background event.
    ///
    /// Returns `true` when visible state changed and the presentation layer
    /// should redraw.
    pub fn handle_event(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::PageLoaded { ticket, result } => self.handle_page_loaded(ticket, result),
            FeedEvent::TrendingLoaded { result } => self.handle_trending_loaded(result),
            FeedEvent::SearchDebounced { query, generation } => {
                self.handle_search_debounced(query, generation)
            }
        }
    }

    fn handle_page_loaded(&mut self, ticket: FetchTicket, result: Result<Page, FetchError>) -> bool {
        let outcome = self.pager.complete(ticket, result, &mut self.store);
        match outcome {
            PageOutcome::Stale => false,
            PageOutcome::Failed => true,
            PageOutcome::Appended(count) | PageOutcome::Exhausted { appended: count } => {
                tracing::debug!(
                    page = ticket.page,
                    appended = count,
                    total = self.store.len(),
                    has_more = self.pager.has_more(),
                    "Page applied"
                );
                self.refresh_view();
                true
            }
        }
    }

    fn handle_trending_loaded(&mut self, result: Result<Vec<TrendingTopic>, FetchError>) -> bool {
        self.trending_loading = false;
        match result {
            Ok(topics) => {
                tracing::debug!(count = topics.len(), "Trending topics loaded");
                self.trending = topics;
                true
            }
            Err(e) => {
                // Non-critical: never shown as the feed error.
                tracing::warn!(error = %e, "Failed to load trending topics");
                false
            }
        }
    }
}
