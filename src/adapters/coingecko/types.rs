//! CoinGecko Response Types
//!
//! Wire types for the search, coin-detail and markets endpoints, and their
//! conversion into domain asset types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::{AssetRecord, AssetStub, MarketSnapshot};

/// API plan, selects the auth header and default host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiPlan {
    #[default]
    Demo,
    Pro,
}

impl ApiPlan {
    pub fn key_header(&self) -> &'static str {
        match self {
            Self::Demo => "x-cg-demo-api-key",
            Self::Pro => "x-cg-pro-api-key",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Demo => "https://api.coingecko.com/api/v3",
            Self::Pro => "https://pro-api.coingecko.com/api/v3",
        }
    }
}

impl std::str::FromStr for ApiPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" | "" => Ok(Self::Demo),
            "pro" => Ok(Self::Pro),
            other => Err(format!("unknown CoinGecko plan '{}'", other)),
        }
    }
}

/// `/search` response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub coins: Vec<SearchCoin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

impl From<SearchCoin> for AssetStub {
    fn from(coin: SearchCoin) -> Self {
        Self {
            external_id: coin.id,
            symbol: coin.symbol,
            name: coin.name,
            market_cap_rank: coin.market_cap_rank,
        }
    }
}

/// `/coins/{id}` response, only the fields we read
#[derive(Debug, Clone, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub platforms: HashMap<String, Option<String>>,
    #[serde(default)]
    pub asset_platform_id: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub market_data: Option<CoinMarketData>,
    #[serde(default)]
    pub tickers: Vec<Ticker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarketData {
    #[serde(default)]
    pub market_cap: HashMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ticker {
    #[serde(default)]
    pub market: Option<TickerMarket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerMarket {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl CoinDetail {
    pub fn market_cap_usd(&self) -> Option<f64> {
        self.market_data
            .as_ref()
            .and_then(|md| md.market_cap.get("usd").copied().flatten())
    }

    /// Platform id -> contract address, with the top-level contract as fallback
    pub fn chain_addresses(&self) -> BTreeMap<String, String> {
        let mut out: BTreeMap<String, String> = self
            .platforms
            .iter()
            .filter_map(|(platform, address)| {
                let platform = non_empty(Some(platform.as_str()))?;
                let address = non_empty(address.as_deref())?;
                Some((platform.to_lowercase(), address.to_string()))
            })
            .collect();

        if out.is_empty() {
            if let (Some(platform), Some(address)) = (
                non_empty(self.asset_platform_id.as_deref()),
                non_empty(self.contract_address.as_deref()),
            ) {
                out.insert(platform.to_lowercase(), address.to_string());
            }
        }
        out
    }

    /// Lowercased venue identifiers and names across all tickers
    pub fn venues(&self) -> BTreeSet<String> {
        self.tickers
            .iter()
            .filter_map(|t| t.market.as_ref())
            .flat_map(|m| [m.identifier.as_deref(), m.name.as_deref()])
            .filter_map(non_empty)
            .map(str::to_lowercase)
            .collect()
    }
}

impl From<CoinDetail> for AssetRecord {
    fn from(coin: CoinDetail) -> Self {
        Self {
            market_cap_usd: coin.market_cap_usd(),
            chain_addresses: coin.chain_addresses(),
            venues: coin.venues(),
            external_id: coin.id,
            symbol: coin.symbol,
            name: coin.name,
        }
    }
}

/// `/coins/markets` row
#[derive(Debug, Clone, Deserialize)]
pub struct MarketsRow {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
}

impl From<MarketsRow> for MarketSnapshot {
    fn from(row: MarketsRow) -> Self {
        Self {
            external_id: row.id,
            symbol: row.symbol,
            name: row.name,
            market_cap_usd: row.market_cap,
        }
    }
}
