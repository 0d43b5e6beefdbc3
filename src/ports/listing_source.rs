use async_trait::async_trait;
use thiserror::Error;

use crate::domain::RawRow;

/// Listing source error type
#[derive(Error, Debug)]
pub enum ListingSourceError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Listing page returned status {status}")]
    Status { status: u16 },

    #[error("Invalid listing request: {0}")]
    InvalidRequest(String),
}

/// One fetched listing page, rows not yet interpreted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// URL the page was fetched from
    pub url: String,
    /// Table rows in document order; empty when the page has no listing table
    pub rows: Vec<RawRow>,
}

impl ListingPage {
    pub fn new(url: impl Into<String>, rows: Vec<RawRow>) -> Self {
        Self {
            url: url.into(),
            rows,
        }
    }

    /// No table or no rows: end of pagination
    pub fn is_end(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Listing source port trait
///
/// Pages are numbered from 1 and ordered newest listings first.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch one page of an exchange's listing table
    async fn fetch_page(&self, exchange_id: &str, page: u32) -> Result<ListingPage, ListingSourceError>;
}
