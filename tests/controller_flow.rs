//! Integration tests for the feed controller: load-more dedup, exhaustion,
//! debounced search, optimistic posting and reset.
//!
//! Each test drives the controller the way the host loop does: commands are
//! called directly and background events are pumped from the channel. Time is
//! paused so debounce timers are deterministic.

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use feedline::app::{FeedController, FeedError, FeedEvent, FeedSettings, SessionIdentity};
use feedline::feed::{FetchError, FetchGateway, Page, PageState};
use feedline::storage::{Draft, Item, ItemId, TrendingTopic};

// ============================================================================
// Test Gateway
// ============================================================================

/// Gateway that replays a script of page results.
///
/// Once the script runs out every further page is empty.
#[derive(Default)]
struct ScriptedGateway {
    pages: Mutex<VecDeque<Result<Page, FetchError>>>,
    trending: Mutex<Option<Result<Vec<TrendingTopic>, FetchError>>>,
    requested: Mutex<Vec<u32>>,
    page_calls: AtomicUsize,
}

impl ScriptedGateway {
    fn with_pages(pages: Vec<Result<Page, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        })
    }

    fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchGateway for ScriptedGateway {
    async fn fetch_page(&self, page: u32) -> Result<Page, FetchError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(page);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Page::new(Vec::new())))
    }

    async fn fetch_trending(&self) -> Result<Vec<TrendingTopic>, FetchError> {
        self.trending
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn item(id: &str, title: &str, tags: &[&str]) -> Item {
    Item {
        id: ItemId::new(id),
        title: title.to_string(),
        body: String::new(),
        author: "remote".to_string(),
        avatar: "R".to_string(),
        created_at: Utc::now(),
        likes: 7,
        comments: 2,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn numbered(prefix: &str, n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| item(&format!("{prefix}{i}"), &format!("Post {prefix}{i}"), &[]))
        .collect()
}

fn controller(gateway: Arc<ScriptedGateway>) -> (FeedController, mpsc::Receiver<FeedEvent>) {
    let (tx, rx) = mpsc::channel(32);
    let feed = FeedController::new(
        gateway,
        Arc::new(SessionIdentity::new("me", "M")),
        FeedSettings::default(),
        tx,
    );
    (feed, rx)
}

/// Receive one background event and apply it.
async fn pump(feed: &mut FeedController, rx: &mut mpsc::Receiver<FeedEvent>) -> bool {
    let event = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for a background event")
        .expect("event channel closed");
    feed.handle_event(event)
}

/// Assert that no background event arrives.
async fn assert_quiet(rx: &mut mpsc::Receiver<FeedEvent>) {
    let res = timeout(Duration::from_secs(5), rx.recv()).await;
    assert!(res.is_err(), "unexpected background event: {:?}", res);
}

fn ids(feed: &FeedController) -> Vec<String> {
    feed.snapshot()
        .items
        .iter()
        .map(|i| i.id.to_string())
        .collect()
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_request_more_while_loading_fetches_once() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(numbered("a", 3)))]);
    let (mut feed, mut rx) = controller(gateway.clone());

    assert!(feed.request_more());
    assert!(feed.snapshot().loading);
    for _ in 0..5 {
        assert!(!feed.request_more());
    }

    pump(&mut feed, &mut rx).await;
    assert_quiet(&mut rx).await;

    assert_eq!(gateway.page_calls(), 1);
    let snap = feed.snapshot();
    assert!(!snap.loading);
    assert_eq!(snap.items.len(), 3);
    assert_eq!(snap.page, 2);
}

#[tokio::test(start_paused = true)]
async fn test_pages_until_empty_then_stop() {
    let gateway = ScriptedGateway::with_pages(vec![
        Ok(Page::new(numbered("a", 5))),
        Ok(Page::new(numbered("b", 5))),
        Ok(Page::new(Vec::new())),
    ]);
    let (mut feed, mut rx) = controller(gateway.clone());

    for _ in 0..3 {
        assert!(feed.request_more());
        pump(&mut feed, &mut rx).await;
    }

    let snap = feed.snapshot();
    assert!(!snap.has_more);
    assert_eq!(snap.state, PageState::Exhausted);
    assert_eq!(snap.items.len(), 10);

    // A fourth request is a no-op
    assert!(!feed.request_more());
    assert_quiet(&mut rx).await;
    assert_eq!(feed.snapshot().items.len(), 10);
    assert_eq!(gateway.requested(), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_recorded_and_retry_recovers() {
    let gateway = ScriptedGateway::with_pages(vec![
        Err(FetchError::Server(503)),
        Ok(Page::new(numbered("a", 2))),
    ]);
    let (mut feed, mut rx) = controller(gateway.clone());

    feed.request_more();
    pump(&mut feed, &mut rx).await;

    let snap = feed.snapshot();
    assert_eq!(snap.state, PageState::Failed);
    assert!(snap.has_more);
    assert!(!snap.loading);
    assert!(matches!(
        snap.error.as_deref(),
        Some(FetchError::Server(503))
    ));

    assert!(feed.request_more());
    pump(&mut feed, &mut rx).await;

    let snap = feed.snapshot();
    assert!(snap.error.is_none());
    assert_eq!(snap.items.len(), 2);
    // The failed page was re-requested, not skipped
    assert_eq!(gateway.requested(), vec![1, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_loaded_items() {
    let gateway = ScriptedGateway::with_pages(vec![
        Ok(Page::new(numbered("a", 4))),
        Err(FetchError::Timeout),
    ]);
    let (mut feed, mut rx) = controller(gateway);

    feed.request_more();
    pump(&mut feed, &mut rx).await;
    feed.request_more();
    pump(&mut feed, &mut rx).await;

    let snap = feed.snapshot();
    assert_eq!(snap.items.len(), 4);
    assert!(snap.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_viewport_near_end_requests_more() {
    let gateway = ScriptedGateway::with_pages(vec![
        Ok(Page::new(numbered("a", 10))),
        Ok(Page::new(numbered("b", 10))),
    ]);
    let (mut feed, mut rx) = controller(gateway.clone());

    // Empty feed: any viewport signal is "near the end"
    assert!(feed.on_viewport(0));
    pump(&mut feed, &mut rx).await;

    // Default prefetch distance is 3
    assert!(!feed.on_viewport(2));
    assert!(!feed.on_viewport(5));
    assert!(feed.on_viewport(7));
    assert!(!feed.on_viewport(9)); // already loading
    pump(&mut feed, &mut rx).await;

    assert_eq!(feed.snapshot().items.len(), 20);
    assert_eq!(gateway.page_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reset_discards_in_flight_response() {
    let gateway = ScriptedGateway::with_pages(vec![
        Ok(Page::new(numbered("old", 3))),
        Ok(Page::new(numbered("new", 2))),
    ]);
    let (mut feed, mut rx) = controller(gateway);

    feed.request_more();
    feed.reset();
    assert!(!feed.snapshot().loading);

    // Reissue against the new generation before the old response lands
    assert!(feed.request_more());

    let mut applied = 0;
    for _ in 0..2 {
        if pump(&mut feed, &mut rx).await {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(ids(&feed), vec!["new0", "new1"]);
}

#[tokio::test(start_paused = true)]
async fn test_reset_after_exhaustion_restarts_paging() {
    let gateway = ScriptedGateway::with_pages(vec![
        Ok(Page::last(numbered("a", 2))),
        Ok(Page::new(numbered("b", 1))),
    ]);
    let (mut feed, mut rx) = controller(gateway.clone());

    feed.request_more();
    pump(&mut feed, &mut rx).await;
    assert!(!feed.snapshot().has_more);
    assert!(!feed.request_more());

    feed.reset();
    let snap = feed.snapshot();
    assert!(snap.has_more);
    assert_eq!(snap.page, 1);
    assert!(snap.items.is_empty());

    assert!(feed.request_more());
    pump(&mut feed, &mut rx).await;
    assert_eq!(ids(&feed), vec!["b0"]);
    assert_eq!(gateway.requested(), vec![1, 1]);
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rapid_typing_evaluates_only_final_query() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(vec![
        item("1", "abc tutorial", &[]),
        item("2", "ab testing", &[]),
        item("3", "a note", &[]),
    ]))]);
    let (mut feed, mut rx) = controller(gateway);
    feed.request_more();
    pump(&mut feed, &mut rx).await;

    feed.set_query("a");
    tokio::time::advance(Duration::from_millis(100)).await;
    feed.set_query("ab");
    tokio::time::advance(Duration::from_millis(100)).await;
    feed.set_query("abc");
    assert!(feed.snapshot().search_pending);

    assert!(pump(&mut feed, &mut rx).await);
    assert_quiet(&mut rx).await;

    let snap = feed.snapshot();
    assert_eq!(snap.search_evaluations, 1);
    assert!(!snap.search_pending);
    assert_eq!(snap.query, "abc");
    assert_eq!(ids(&feed), vec!["1"]);
}

#[tokio::test(start_paused = true)]
async fn test_query_not_evaluated_before_delay() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(numbered("a", 2)))]);
    let (mut feed, mut rx) = controller(gateway);
    feed.request_more();
    pump(&mut feed, &mut rx).await;

    feed.set_query("zzz");
    tokio::time::advance(Duration::from_millis(499)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(feed.snapshot().items.len(), 2);

    pump(&mut feed, &mut rx).await;
    assert!(feed.snapshot().items.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_with_items_loaded_is_noop() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(numbered("a", 3)))]);
    let (mut feed, mut rx) = controller(gateway.clone());
    feed.request_more();
    pump(&mut feed, &mut rx).await;
    let before = ids(&feed);

    feed.set_query("");
    pump(&mut feed, &mut rx).await;
    assert_quiet(&mut rx).await;

    assert_eq!(ids(&feed), before);
    assert_eq!(gateway.page_calls(), 1);
    assert_eq!(feed.snapshot().search_evaluations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_clearing_query_restores_full_sequence() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(vec![
        item("1", "rust", &[]),
        item("2", "go", &[]),
    ]))]);
    let (mut feed, mut rx) = controller(gateway.clone());
    feed.request_more();
    pump(&mut feed, &mut rx).await;

    feed.set_query("rust");
    pump(&mut feed, &mut rx).await;
    assert_eq!(ids(&feed), vec!["1"]);

    feed.set_query("   ");
    pump(&mut feed, &mut rx).await;
    assert_eq!(ids(&feed), vec!["1", "2"]);
    assert_eq!(gateway.page_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_with_empty_store_loads_first_page() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(numbered("a", 2)))]);
    let (mut feed, mut rx) = controller(gateway.clone());

    feed.set_query("");
    pump(&mut feed, &mut rx).await; // debounce fires, fetch starts
    assert!(feed.snapshot().loading);
    pump(&mut feed, &mut rx).await; // page lands

    assert_eq!(feed.snapshot().items.len(), 2);
    assert_eq!(gateway.page_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_query_with_empty_store_fetches_then_filters() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(vec![
        item("1", "Intro to Rust", &[]),
        item("2", "Cooking", &["food"]),
        item("3", "Lifetimes", &["rust"]),
    ]))]);
    let (mut feed, mut rx) = controller(gateway.clone());

    feed.set_query("rust");
    pump(&mut feed, &mut rx).await;
    let snap = feed.snapshot();
    assert!(snap.loading);
    assert!(snap.items.is_empty());

    pump(&mut feed, &mut rx).await;
    assert_eq!(ids(&feed), vec!["1", "3"]);
    assert_eq!(gateway.page_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tag_filter_returns_tagged_items_in_order() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(vec![
        item("1", "one", &["zebra"]),
        item("2", "two", &["lion"]),
        item("3", "three", &["Zebra", "lion"]),
        item("4", "four", &[]),
        item("5", "five", &["zebra"]),
    ]))]);
    let (mut feed, mut rx) = controller(gateway);
    feed.request_more();
    pump(&mut feed, &mut rx).await;

    feed.select_topic("zebra");
    pump(&mut feed, &mut rx).await;

    assert_eq!(ids(&feed), vec!["1", "3", "5"]);
    assert_eq!(feed.snapshot().query, "zebra");
}

#[tokio::test(start_paused = true)]
async fn test_filtered_view_grows_with_new_pages() {
    let gateway = ScriptedGateway::with_pages(vec![
        Ok(Page::new(vec![item("1", "rust one", &[]), item("2", "go", &[])])),
        Ok(Page::new(vec![item("3", "rust two", &[]), item("4", "zig", &[])])),
    ]);
    let (mut feed, mut rx) = controller(gateway);
    feed.request_more();
    pump(&mut feed, &mut rx).await;

    feed.set_query("rust");
    pump(&mut feed, &mut rx).await;
    assert_eq!(ids(&feed), vec!["1"]);

    feed.request_more();
    pump(&mut feed, &mut rx).await;
    assert_eq!(ids(&feed), vec!["1", "3"]);
}

#[tokio::test(start_paused = true)]
async fn test_typing_during_fetch_does_not_duplicate_fetch() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(vec![
        item("1", "alpha", &[]),
        item("2", "beta", &[]),
    ]))]);
    let (mut feed, mut rx) = controller(gateway.clone());

    feed.request_more();
    feed.set_query("alp");

    // Page lands first, then the debounce fires against a populated store
    pump(&mut feed, &mut rx).await;
    pump(&mut feed, &mut rx).await;
    assert_quiet(&mut rx).await;

    assert_eq!(gateway.page_calls(), 1);
    assert_eq!(ids(&feed), vec!["1"]);
}

// ============================================================================
// Optimistic Posting
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_submit_prepends_with_zero_counters() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(numbered("a", 3)))]);
    let (mut feed, mut rx) = controller(gateway.clone());
    feed.request_more();
    pump(&mut feed, &mut rx).await;

    let posted = feed
        .submit(Draft::new("  My first post ", "hello").with_tags(["#rust", " "]))
        .unwrap();

    let snap = feed.snapshot();
    assert_eq!(snap.items.len(), 4);
    let head = &snap.items[0];
    assert_eq!(head.id, posted.id);
    assert_eq!(head.title, "My first post");
    assert_eq!(head.likes, 0);
    assert_eq!(head.comments, 0);
    assert_eq!(head.author, "me");
    assert_eq!(head.avatar, "M");
    assert_eq!(head.tags, vec!["rust".to_string()]);

    // No remote round-trip
    assert_eq!(gateway.page_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_submit_empty_title_leaves_feed_unchanged() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(numbered("a", 2)))]);
    let (mut feed, mut rx) = controller(gateway);
    feed.request_more();
    pump(&mut feed, &mut rx).await;
    let before = ids(&feed);

    let err = feed.submit(Draft::new("   ", "body only")).unwrap_err();
    assert!(matches!(err, FeedError::InvalidDraft(_)));
    assert_eq!(ids(&feed), before);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_submits_stack_newest_first() {
    let gateway = ScriptedGateway::with_pages(Vec::new());
    let (mut feed, _rx) = controller(gateway);

    let first = feed.submit(Draft::new("first", "")).unwrap();
    let second = feed.submit(Draft::new("second", "")).unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(
        ids(&feed),
        vec![second.id.to_string(), first.id.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_submit_while_loading_keeps_page_order() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(numbered("a", 2)))]);
    let (mut feed, mut rx) = controller(gateway);

    feed.request_more();
    let posted = feed.submit(Draft::new("mine", "")).unwrap();
    pump(&mut feed, &mut rx).await;

    assert_eq!(
        ids(&feed),
        vec![posted.id.to_string(), "a0".to_string(), "a1".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_submit_matching_active_query_appears_in_results() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(vec![
        item("1", "rust", &[]),
        item("2", "go", &[]),
    ]))]);
    let (mut feed, mut rx) = controller(gateway);
    feed.request_more();
    pump(&mut feed, &mut rx).await;
    feed.set_query("rust");
    pump(&mut feed, &mut rx).await;

    let posted = feed.submit(Draft::new("More rust", "")).unwrap();

    assert_eq!(ids(&feed), vec![posted.id.to_string(), "1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_submit_not_matching_active_query_is_still_first() {
    let gateway = ScriptedGateway::with_pages(vec![
        Ok(Page::new(vec![item("1", "rust", &[]), item("2", "go", &[])])),
        Ok(Page::new(vec![item("3", "rust again", &[]), item("4", "zig", &[])])),
    ]);
    let (mut feed, mut rx) = controller(gateway);
    feed.request_more();
    pump(&mut feed, &mut rx).await;
    feed.set_query("rust");
    pump(&mut feed, &mut rx).await;

    let posted = feed.submit(Draft::new("Hello world", "")).unwrap();
    let snap = feed.snapshot();
    assert_eq!(snap.items.first().map(|i| &i.id), Some(&posted.id));
    assert_eq!(ids(&feed), vec![posted.id.to_string(), "1".to_string()]);

    // Later pages are still filtered; the post stays pinned at the head
    feed.request_more();
    pump(&mut feed, &mut rx).await;
    assert_eq!(
        ids(&feed),
        vec![posted.id.to_string(), "1".to_string(), "3".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reset_drops_own_posts_from_filtered_view() {
    let gateway = ScriptedGateway::with_pages(vec![Ok(Page::new(vec![item("1", "rust", &[])]))]);
    let (mut feed, mut rx) = controller(gateway);
    feed.set_query("rust");
    feed.submit(Draft::new("Hello world", "")).unwrap();
    pump(&mut feed, &mut rx).await; // debounce fires, store non-empty

    feed.reset();
    feed.request_more();
    pump(&mut feed, &mut rx).await;

    assert_eq!(ids(&feed), vec!["1".to_string()]);
}

// ============================================================================
// Trending
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_trending_loaded_into_snapshot() {
    let gateway = Arc::new(ScriptedGateway {
        trending: Mutex::new(Some(Ok(vec![
            TrendingTopic {
                tag: "rust".into(),
                count: 12,
            },
            TrendingTopic {
                tag: "wasm".into(),
                count: 3,
            },
        ]))),
        ..Default::default()
    });
    let (mut feed, mut rx) = controller(gateway);

    assert!(feed.load_trending());
    assert!(!feed.load_trending()); // single-flight
    pump(&mut feed, &mut rx).await;

    let snap = feed.snapshot();
    assert_eq!(snap.trending.len(), 2);
    assert_eq!(snap.trending[0].tag, "rust");
}

#[tokio::test(start_paused = true)]
async fn test_trending_failure_is_swallowed() {
    let gateway = Arc::new(ScriptedGateway {
        trending: Mutex::new(Some(Err(FetchError::Decode("bad json".into())))),
        ..Default::default()
    });
    let (mut feed, mut rx) = controller(gateway);

    feed.load_trending();
    pump(&mut feed, &mut rx).await;

    let snap = feed.snapshot();
    assert!(snap.error.is_none());
    assert!(snap.trending.is_empty());
    // A later attempt is allowed again
    assert!(feed.load_trending());
}
