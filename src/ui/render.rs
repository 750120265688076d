//! Plain-text rendering of a feed snapshot.

use std::borrow::Cow;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::FeedSnapshot;
use crate::feed::{FetchError, PageState};
use crate::storage::Item;

/// Ellipsis string used for truncation
const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncate `s` to at most `max_width` terminal columns, appending "..."
/// when something was cut.
pub(super) fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width <= ELLIPSIS_WIDTH {
        let mut out = String::new();
        let mut used = 0;
        for c in s.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > max_width {
                break;
            }
            used += w;
            out.push(c);
        }
        return Cow::Owned(out);
    }

    let budget = max_width - ELLIPSIS_WIDTH;
    let mut out = String::with_capacity(max_width);
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// One line per item: index, avatar, author, title, counters and tags.
pub(super) fn format_item(index: usize, item: &Item, width: usize) -> String {
    let tags = if item.tags.is_empty() {
        String::new()
    } else {
        format!(
            " {}",
            item.tags
                .iter()
                .map(|t| format!("#{t}"))
                .collect::<Vec<_>>()
                .join(" ")
        )
    };
    let line = format!(
        "{:>3}. {} {}: {}  [♥{} 💬{}]{}",
        index, item.avatar, item.author, item.title, item.likes, item.comments, tags
    );
    truncate_to_width(&line, width).into_owned()
}

pub(super) fn status_line(snapshot: &FeedSnapshot) -> String {
    let state = match snapshot.state {
        PageState::Idle => "idle",
        PageState::Loading => "loading...",
        PageState::Exhausted => "end of feed",
        PageState::Failed if snapshot.error.as_deref().is_some_and(FetchError::is_retryable) => {
            "failed (run 'more' to retry)"
        }
        PageState::Failed => "failed",
    };
    let mut line = format!(
        "{} items | page {} | {}",
        snapshot.items.len(),
        snapshot.page,
        state
    );
    if !snapshot.query.trim().is_empty() {
        line.push_str(&format!(" | search: '{}'", snapshot.query.trim()));
        if snapshot.search_pending {
            line.push_str(" (pending)");
        }
    }
    if let Some(err) = &snapshot.error {
        line.push_str(&format!(" | error: {err}"));
    }
    line
}

pub(super) fn print_snapshot(snapshot: &FeedSnapshot, width: usize) {
    if !snapshot.trending.is_empty() {
        let topics: Vec<String> = snapshot
            .trending
            .iter()
            .map(|t| format!("#{} ({})", t.tag, t.count))
            .collect();
        println!("{}", truncate_to_width(&format!("Trending: {}", topics.join("  ")), width));
    }
    for (i, item) in snapshot.items.iter().enumerate() {
        println!("{}", format_item(i, item, width));
    }
    println!("{}", status_line(snapshot));
}
