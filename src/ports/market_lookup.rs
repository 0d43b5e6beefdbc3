use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AssetRecord, AssetStub, MarketSnapshot};

/// Market lookup error type
///
/// Every variant is scoped to the one call that produced it; callers turn it
/// into a skip of that symbol or asset id.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited, retries exhausted")]
    RateLimited,

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Market lookup port trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketLookup: Send + Sync {
    /// Candidate assets for a ticker; may be empty or ambiguous
    async fn search(&self, symbol: &str) -> Result<Vec<AssetStub>, LookupError>;

    /// Full record for one asset id, including market cap, platforms and venues
    async fn details(&self, external_id: &str) -> Result<AssetRecord, LookupError>;

    /// One page of assets ordered by descending market cap
    async fn markets_page(&self, page: u32, per_page: u32) -> Result<Vec<MarketSnapshot>, LookupError>;
}
