//! Remote feed access and the paging state machine.
//!
//! - [`gateway`] - the [`FetchGateway`] boundary, [`Page`] and [`FetchError`]
//! - [`http`] - JSON-over-HTTP gateway built on `reqwest`
//! - [`pagination`] - cursor, `has_more` and the in-flight guard
//!
//! # Example
//!
//! ```ignore
//! use feedline::feed::{HttpGateway, Pagination};
//!
//! let gateway = HttpGateway::new(client, base_url, 20, timeout);
//! let mut pager = Pagination::new();
//! if let Some(ticket) = pager.begin() {
//!     let result = gateway.fetch_page(ticket.page).await;
//!     pager.complete(ticket, result, &mut store);
//! }
//! ```

pub mod gateway;
pub mod http;
pub mod pagination;

pub use gateway::{FetchError, FetchGateway, Page};
pub use http::HttpGateway;
pub use pagination::{FetchTicket, PageOutcome, PageState, Pagination};
