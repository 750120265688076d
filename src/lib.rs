//! Paginated, searchable content feed controller.
//!
//! - [`storage`] - in-memory item sequence with identity checks
//! - [`feed`] - remote gateway boundary and the paging state machine
//! - [`app`] - the [`FeedController`](app::FeedController): load-more,
//!   debounced search and optimistic posting
//! - [`config`] - TOML configuration
//! - [`ui`] - line-oriented interactive host used by the binary

pub mod app;
pub mod config;
pub mod feed;
pub mod storage;
pub mod ui;
