//! Main event loop for the interactive host.
//!
//! Multiplexes stdin lines, background task events and shutdown signals.
//! All controller mutation happens on this one task.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::input::{handle_command, parse_command, HELP};
use super::render;
use crate::app::{FeedController, FeedEvent};

/// Default output width when the terminal width is unknown.
const DEFAULT_WIDTH: usize = 100;

/// Result of handling an input line.
pub enum Action {
    /// Keep reading input.
    Continue,
    /// Leave the loop.
    Quit,
}

fn output_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .filter(|&w: &usize| w > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Runs the host loop until `quit`, end of input, or a shutdown signal.
///
/// Uses `tokio::select!` to multiplex:
/// - **Input**: commands read line by line from stdin
/// - **Background tasks**: page, trending and debounce events via `FeedEvent`
/// - **Signals**: SIGINT/SIGTERM for graceful shutdown (Unix only)
pub async fn run(feed: &mut FeedController, mut event_rx: mpsc::Receiver<FeedEvent>) -> Result<()> {
    let width = output_width();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    println!("{HELP}");

    loop {
        // Drain pending background events before reading more input so
        // results are not starved by fast typing.
        let mut changed = false;
        while let Ok(event) = event_rx.try_recv() {
            changed |= feed.handle_event(event);
        }
        if changed {
            println!("{}", render::status_line(&feed.snapshot()));
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("End of input");
                    break;
                };
                match parse_command(&line) {
                    Ok(command) => {
                        if let Action::Quit = handle_command(feed, command, width) {
                            break;
                        }
                    }
                    Err(msg) => println!("{msg}"),
                }
            }

            Some(event) = event_rx.recv() => {
                if feed.handle_event(event) {
                    println!("{}", render::status_line(&feed.snapshot()));
                }
            }
        }
    }

    Ok(())
}
