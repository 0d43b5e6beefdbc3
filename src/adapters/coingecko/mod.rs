//! CoinGecko Adapter
//!
//! `MarketLookup` implementation backed by the CoinGecko v3 API:
//! - `/search` for ticker -> candidate coin ids
//! - `/coins/{id}` with tickers and market data for the full asset record
//! - `/coins/markets` for the market-cap ordered listing used by scans
//!
//! # Example
//!
//! ```rust,ignore
//! use listing_scout::adapters::coingecko::{CoinGeckoClient, CoinGeckoConfig};
//! use listing_scout::ports::MarketLookup;
//!
//! let client = CoinGeckoClient::new(CoinGeckoConfig::default())?;
//! for stub in client.search("PEPE").await? {
//!     let asset = client.details(&stub.external_id).await?;
//!     println!("{} mcap={:?}", asset.name, asset.market_cap_usd);
//! }
//! ```

mod client;
mod types;

pub use client::{CoinGeckoClient, CoinGeckoConfig};
pub use types::ApiPlan;
