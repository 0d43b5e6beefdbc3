use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;

use crate::domain::{AssetRecord, AssetStub, MarketSnapshot, RawRow};
use super::listing_source::{ListingPage, ListingSource, ListingSourceError};
use super::market_lookup::{LookupError, MarketLookup};

/// Mock listing source serving canned pages and recording requests
///
/// Pages that were not configured come back empty, which ends a crawl.
#[derive(Debug, Default, Clone)]
pub struct StaticListingSource {
    calls: Arc<Mutex<Vec<(String, u32)>>>,
    pages: Arc<Mutex<HashMap<(String, u32), Vec<RawRow>>>>,
    failing: Arc<Mutex<HashSet<(String, u32)>>>,
}

impl StaticListingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the rows of one page
    pub fn with_page(self, exchange_id: &str, page: u32, rows: Vec<RawRow>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert((exchange_id.to_string(), page), rows);
        self
    }

    /// Builder method to make one page fail with a transport error
    pub fn with_failure(self, exchange_id: &str, page: u32) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert((exchange_id.to_string(), page));
        self
    }

    /// Get all recorded `(exchange, page)` requests
    pub fn get_calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for StaticListingSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_page(&self, exchange_id: &str, page: u32) -> Result<ListingPage, ListingSourceError> {
        let key = (exchange_id.to_string(), page);
        self.calls.lock().unwrap().push(key.clone());

        if self.failing.lock().unwrap().contains(&key) {
            return Err(ListingSourceError::Transport("connection reset".to_string()));
        }

        let rows = self.pages.lock().unwrap().get(&key).cloned().unwrap_or_default();
        Ok(ListingPage::new(
            format!("https://listings.test/{}/{}", exchange_id, page),
            rows,
        ))
    }
}

/// Mock market lookup with canned search hits and asset details
#[derive(Debug, Default, Clone)]
pub struct StaticMarketLookup {
    search_calls: Arc<Mutex<Vec<String>>>,
    detail_calls: Arc<Mutex<Vec<String>>>,
    stubs: Arc<Mutex<HashMap<String, Vec<AssetStub>>>>,
    details: Arc<Mutex<HashMap<String, AssetRecord>>>,
    markets: Arc<Mutex<HashMap<u32, Vec<MarketSnapshot>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    failing_pages: Arc<Mutex<HashSet<u32>>>,
}

impl StaticMarketLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set search results for a symbol (matched case-insensitively)
    pub fn with_search(self, symbol: &str, stubs: Vec<AssetStub>) -> Self {
        self.stubs.lock().unwrap().insert(symbol.to_uppercase(), stubs);
        self
    }

    /// Builder method to register an asset; also used for its details lookup
    pub fn with_asset(self, asset: AssetRecord) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(asset.external_id.clone(), asset);
        self
    }

    /// Builder method to set one page of the market-cap listing
    pub fn with_markets_page(self, page: u32, rows: Vec<MarketSnapshot>) -> Self {
        self.markets.lock().unwrap().insert(page, rows);
        self
    }

    /// Builder method to make a search symbol or asset id fail
    pub fn with_failure(self, key: &str) -> Self {
        self.failing.lock().unwrap().insert(key.to_string());
        self
    }

    /// Builder method to make one markets page fail
    pub fn with_markets_failure(self, page: u32) -> Self {
        self.failing_pages.lock().unwrap().insert(page);
        self
    }

    pub fn get_search_calls(&self) -> Vec<String> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn get_detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketLookup for StaticMarketLookup {
    async fn search(&self, symbol: &str) -> Result<Vec<AssetStub>, LookupError> {
        self.search_calls.lock().unwrap().push(symbol.to_string());
        if self.failing.lock().unwrap().contains(symbol) {
            return Err(LookupError::Status {
                status: 500,
                body: "search failed".to_string(),
            });
        }
        Ok(self
            .stubs
            .lock()
            .unwrap()
            .get(&symbol.to_uppercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn details(&self, external_id: &str) -> Result<AssetRecord, LookupError> {
        self.detail_calls.lock().unwrap().push(external_id.to_string());
        if self.failing.lock().unwrap().contains(external_id) {
            return Err(LookupError::Transport("timed out".to_string()));
        }
        self.details
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .ok_or_else(|| LookupError::Status {
                status: 404,
                body: format!("coin {} not found", external_id),
            })
    }

    async fn markets_page(&self, page: u32, _per_page: u32) -> Result<Vec<MarketSnapshot>, LookupError> {
        if self.failing_pages.lock().unwrap().contains(&page) {
            return Err(LookupError::RateLimited);
        }
        Ok(self.markets.lock().unwrap().get(&page).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    #[tokio::test]
    async fn test_static_listing_source() {
        let source = StaticListingSource::new()
            .with_page("mxc", 1, vec![RawRow::new(vec!["2025-11-10".into()])])
            .with_failure("mxc", 2);

        let page = source.fetch_page("mxc", 1).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert!(source.fetch_page("mxc", 2).await.is_err());
        assert!(source.fetch_page("mxc", 3).await.unwrap().is_end());
        assert_eq!(source.get_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_static_market_lookup() {
        let asset = AssetRecord {
            external_id: "foo".to_string(),
            symbol: "foo".to_string(),
            name: "Foo".to_string(),
            market_cap_usd: Some(1.0),
            chain_addresses: BTreeMap::new(),
            venues: BTreeSet::new(),
        };
        let lookup = StaticMarketLookup::new()
            .with_search(
                "foo",
                vec![AssetStub {
                    external_id: "foo".to_string(),
                    symbol: "foo".to_string(),
                    name: "Foo".to_string(),
                    market_cap_rank: None,
                }],
            )
            .with_asset(asset.clone());

        assert_eq!(lookup.search("FOO").await.unwrap().len(), 1);
        assert_eq!(lookup.details("foo").await.unwrap(), asset);
        assert!(lookup.details("bar").await.is_err());
        assert_eq!(lookup.get_search_calls(), vec!["FOO".to_string()]);
        assert_eq!(lookup.get_detail_calls(), vec!["foo".to_string(), "bar".to_string()]);
    }
}
