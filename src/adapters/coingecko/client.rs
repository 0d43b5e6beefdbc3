//! CoinGecko Client
//!
//! `MarketLookup` over the CoinGecko v3 REST API. Every request goes through
//! one shared `RateLimiter`; 429 and 5xx responses are retried with backoff,
//! any other non-success status fails the call immediately.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::{ApiPlan, CoinDetail, MarketsRow, SearchResponse};
use crate::adapters::rate_limit::{shared, RateLimiter, SharedRateLimiter};
use crate::domain::{AssetRecord, AssetStub, MarketSnapshot};
use crate::ports::{LookupError, MarketLookup};

/// Configuration for the CoinGeckoClient
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// API root, e.g. `https://api.coingecko.com/api/v3`
    pub base_url: String,
    /// Optional API key sent in the plan's header
    pub api_key: Option<String>,
    /// API plan
    pub plan: ApiPlan,
    /// Minimum gap between requests
    pub request_delay: Duration,
    /// Request timeout
    pub timeout: Duration,
    /// Number of attempts per call
    pub max_retries: u32,
    /// Base delay for backoff (milliseconds)
    pub retry_base_delay_ms: u64,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: ApiPlan::Demo.default_base_url().to_string(),
            api_key: None,
            plan: ApiPlan::Demo,
            request_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

/// Client for CoinGecko search, coin detail and markets endpoints
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    config: CoinGeckoConfig,
    http: Client,
    limiter: SharedRateLimiter,
}

impl CoinGeckoClient {
    pub fn new(config: CoinGeckoConfig) -> Result<Self, LookupError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("listing-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let limiter = shared(RateLimiter::with_interval(config.request_delay));
        Ok(Self { config, http, limiter })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Query flags for the coin detail call: tickers and market data only
    pub fn detail_query() -> [(&'static str, &'static str); 6] {
        [
            ("localization", "false"),
            ("tickers", "true"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ]
    }

    /// GET a JSON document with pacing and retry
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LookupError> {
        let url = self.url(path);
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            self.limiter.lock().await.wait_if_needed().await;

            let mut request = self
                .http
                .get(&url)
                .query(query)
                .header("Accept", "application/json");
            if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
                request = request.header(self.config.plan.key_header(), key);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(LookupError::Transport(e.to_string()));
                    self.backoff(attempt, false).await;
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(
                    "CoinGecko rate limited (429) on {} (attempt {}/{})",
                    path,
                    attempt + 1,
                    attempts
                );
                last_error = Some(LookupError::RateLimited);
                self.backoff(attempt, true).await;
                continue;
            }

            if status.is_server_error() {
                last_error = Some(LookupError::Status {
                    status: status.as_u16(),
                    body: String::new(),
                });
                self.backoff(attempt, false).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LookupError::Status {
                    status: status.as_u16(),
                    body: body.chars().take(200).collect(),
                });
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| LookupError::Parse(e.to_string()));
        }

        Err(last_error.unwrap_or(LookupError::RateLimited))
    }

    async fn backoff(&self, attempt: u32, exponential: bool) {
        let base = self.config.retry_base_delay_ms;
        let ms = if exponential {
            base.saturating_mul(2u64.saturating_pow(attempt + 1))
        } else {
            base.saturating_mul(attempt as u64 + 1)
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl MarketLookup for CoinGeckoClient {
    async fn search(&self, symbol: &str) -> Result<Vec<AssetStub>, LookupError> {
        let response: SearchResponse = self
            .get_json("/search", &[("query", symbol.to_string())])
            .await?;
        Ok(response.coins.into_iter().map(AssetStub::from).collect())
    }

    async fn details(&self, external_id: &str) -> Result<AssetRecord, LookupError> {
        let query: Vec<(&str, String)> = Self::detail_query()
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        let path = coin_path(external_id);
        let detail: CoinDetail = self.get_json(&path, &query).await?;
        Ok(detail.into())
    }

    async fn markets_page(&self, page: u32, per_page: u32) -> Result<Vec<MarketSnapshot>, LookupError> {
        let query = [
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
            ("sparkline", "false".to_string()),
        ];
        let rows: Vec<MarketsRow> = self.get_json("/coins/markets", &query).await?;
        Ok(rows.into_iter().map(MarketSnapshot::from).collect())
    }
}

fn coin_path(external_id: &str) -> String {
    format!("/coins/{}", urlencoding::encode(external_id))
}
