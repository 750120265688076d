//! Line input handling for the interactive host.
//!
//! Each stdin line is parsed into a [`Command`] and dispatched to the feed
//! controller.

use crate::app::FeedController;
use crate::storage::Draft;

use super::render;
use super::Action;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Command {
    /// Load the next page.
    More,
    /// Viewport signal: item at this index is visible.
    Seen(usize),
    /// Change the search query (empty clears it).
    Search(String),
    /// Search by trending tag.
    Topic(String),
    /// Post a draft: `post <title> | <body> | tag, tag`.
    Post(Draft),
    /// Fetch trending topics.
    Trending,
    /// Restart from page 1.
    Reset,
    /// Print the current feed.
    Show,
    Help,
    Quit,
}

pub(super) const HELP: &str = "\
Commands:
  more                         load the next page
  seen <index>                 report the last visible item (loads more near the end)
  /<query>  | search <query>   filter loaded items (empty clears)
  topic <tag>                  filter by a trending tag
  post <title> | <body> | a,b  post optimistically
  trending                     refresh trending topics
  reset                        restart from page 1
  show                         print the feed
  help                         this text
  quit";

/// Parse one input line. `Err` carries a message for the user.
pub(super) fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(query) = line.strip_prefix('/') {
        return Ok(Command::Search(query.to_string()));
    }

    let trimmed = line.trim();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (trimmed, ""),
    };

    match word {
        "" | "show" | "ls" => Ok(Command::Show),
        "more" | "m" => Ok(Command::More),
        "seen" => rest
            .parse::<usize>()
            .map(Command::Seen)
            .map_err(|_| format!("Expected an item index, got '{rest}'")),
        "search" | "s" => Ok(Command::Search(rest.to_string())),
        "clear" => Ok(Command::Search(String::new())),
        "topic" | "t" if !rest.is_empty() => Ok(Command::Topic(rest.to_string())),
        "topic" | "t" => Err("Usage: topic <tag>".to_string()),
        "post" | "p" => parse_draft(rest).map(Command::Post),
        "trending" => Ok(Command::Trending),
        "reset" => Ok(Command::Reset),
        "help" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command '{other}' (try 'help')")),
    }
}

fn parse_draft(rest: &str) -> Result<Draft, String> {
    let mut parts = rest.splitn(3, '|').map(str::trim);
    let title = parts.next().unwrap_or_default();
    let body = parts.next().unwrap_or_default();
    let tags: Vec<String> = parts
        .next()
        .map(|t| {
            t.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    // Title validation is the controller's job; pass empties through.
    Ok(Draft::new(title, body).with_tags(tags))
}

/// Apply a command to the controller.
pub(super) fn handle_command(feed: &mut FeedController, command: Command, width: usize) -> Action {
    match command {
        Command::More => {
            if !feed.request_more() {
                println!("(nothing to load: already loading or no more pages)");
            }
        }
        Command::Seen(index) => {
            feed.on_viewport(index);
        }
        Command::Search(query) => feed.set_query(&query),
        Command::Topic(tag) => feed.select_topic(&tag),
        Command::Post(draft) => match feed.submit(draft) {
            Ok(item) => println!("Posted '{}' ({})", item.title, item.id),
            Err(e) => println!("Error: {e}"),
        },
        Command::Trending => {
            feed.load_trending();
        }
        Command::Reset => {
            feed.reset();
            feed.request_more();
        }
        Command::Show => render::print_snapshot(&feed.snapshot(), width),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Action::Quit,
    }
    Action::Continue
}
