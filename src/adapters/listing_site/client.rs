//! Listing Site Client
//!
//! Fetches paginated exchange listing pages (newest first) and extracts
//! their table rows. Requests are spaced by a shared `RateLimiter`.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::html::parse_listing_table;
use crate::adapters::rate_limit::{shared, RateLimiter, SharedRateLimiter};
use crate::ports::{ListingPage, ListingSource, ListingSourceError};

/// Configuration for the ListingSiteClient
#[derive(Debug, Clone)]
pub struct ListingSiteConfig {
    /// Site root, without trailing slash
    pub base_url: String,
    /// Minimum gap between page requests
    pub request_delay: Duration,
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for ListingSiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://listedon.org".to_string(),
            request_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(20),
            user_agent: concat!("listing-scout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP listing source for listedon-style exchange pages
#[derive(Debug, Clone)]
pub struct ListingSiteClient {
    config: ListingSiteConfig,
    http: Client,
    limiter: SharedRateLimiter,
}

impl ListingSiteClient {
    pub fn new(config: ListingSiteConfig) -> Result<Self, ListingSourceError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ListingSourceError::Transport(e.to_string()))?;

        let limiter = shared(RateLimiter::with_interval(config.request_delay));
        Ok(Self { config, http, limiter })
    }

    /// URL of one search page for an exchange, sorted by listing date
    pub fn page_url(&self, exchange_id: &str, page: u32) -> Result<String, ListingSourceError> {
        let valid = !exchange_id.is_empty()
            && exchange_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ListingSourceError::InvalidRequest(format!(
                "bad exchange id '{}'",
                exchange_id
            )));
        }
        if page == 0 {
            return Err(ListingSourceError::InvalidRequest("pages start at 1".into()));
        }

        Ok(format!(
            "{}/en/exchange/{}/search?sort=date&order=1&page={}",
            self.config.base_url.trim_end_matches('/'),
            exchange_id,
            page
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[async_trait]
impl ListingSource for ListingSiteClient {
    fn name(&self) -> &str {
        "listing-site"
    }

    async fn fetch_page(&self, exchange_id: &str, page: u32) -> Result<ListingPage, ListingSourceError> {
        let url = self.page_url(exchange_id, page)?;

        self.limiter.lock().await.wait_if_needed().await;
        tracing::debug!("[{}] page {}: {}", exchange_id, page, url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ListingSourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListingSourceError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ListingSourceError::Transport(e.to_string()))?;

        let rows = parse_listing_table(&body);
        Ok(ListingPage::new(url, rows))
    }
}
