use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use feedline::app::{FeedController, FeedEvent, SessionIdentity};
use feedline::config::Config;
use feedline::feed::HttpGateway;

/// Get the default config file path (~/.config/feedline/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedline")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "feedline", about = "Browse, search and post to a paginated content feed")]
struct Args {
    /// Config file (defaults to ~/.config/feedline/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the feed service base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Override the number of items requested per page
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with feed output on stdout
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    config.validate().context("Invalid configuration")?;

    let base_url = config.parsed_base_url()?;
    let client = reqwest::Client::builder()
        .user_agent(concat!("feedline/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let gateway = HttpGateway::new(client, base_url, config.page_size, config.request_timeout());
    let identity = SessionIdentity::new(config.author.clone(), config.avatar.clone());

    tracing::info!(base_url = %config.base_url, page_size = config.page_size, "Starting feed");

    // Channel for background task results
    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(32);

    let mut feed = FeedController::new(
        Arc::new(gateway),
        Arc::new(identity),
        config.feed_settings(),
        event_tx,
    );

    feed.request_more();
    feed.load_trending();

    feedline::ui::run(&mut feed, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
