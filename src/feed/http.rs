use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::gateway::{FetchError, FetchGateway, Page};
use crate::storage::TrendingTopic;

const MAX_RESPONSE_SIZE: usize = 4 * 1024 * 1024; // 4MB

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    topics: Vec<TrendingTopic>,
}

/// [`FetchGateway`] backed by a JSON-over-HTTP feed service.
///
/// Endpoints, relative to the base URL:
/// - `GET items?page={n}&limit={page_size}` → `{ items, next_page?, has_more? }`
/// - `GET trending` → `{ topics: [{ tag, count }] }`
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    page_size: u32,
    timeout: Duration,
}

impl HttpGateway {
    /// Build a gateway for `base_url`.
    ///
    /// A missing trailing slash is added so relative endpoint joins keep the
    /// base path (`https://host/api` + `items` → `https://host/api/items`).
    pub fn new(
        client: reqwest::Client,
        mut base_url: Url,
        page_size: u32,
        timeout: Duration,
    ) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client,
            base_url,
            page_size,
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::Decode(format!("invalid endpoint '{path}': {e}")))
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url = %url, "Fetching from remote source");

        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Server(status.as_u16()));
        }

        tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_RESPONSE_SIZE))
            .await
            .map_err(|_| FetchError::Timeout)?
    }
}

#[async_trait]
impl FetchGateway for HttpGateway {
    async fn fetch_page(&self, page: u32) -> Result<Page, FetchError> {
        let mut url = self.endpoint("items")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &self.page_size.to_string());

        let bytes = self.get_bytes(url).await?;
        let page_body: Page =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::debug!(
            page,
            items = page_body.items.len(),
            has_more = page_body.has_more,
            "Page received"
        );
        Ok(page_body)
    }

    async fn fetch_trending(&self) -> Result<Vec<TrendingTopic>, FetchError> {
        let url = self.endpoint("trending")?;
        let bytes = self.get_bytes(url).await?;
        let body: TrendingResponse =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(body.topics)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
