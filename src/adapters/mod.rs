//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Listing site: listedon.org exchange listing pages (HTML scraping)
//! - CoinGecko: asset search, coin details and market-cap listings
//! - Rate limit: request pacing shared by the HTTP adapters
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod coingecko;
pub mod listing_site;
pub mod rate_limit;

pub use cli::CliApp;
pub use coingecko::{ApiPlan, CoinGeckoClient, CoinGeckoConfig};
pub use listing_site::{ListingSiteClient, ListingSiteConfig};
pub use rate_limit::{RateLimiter, SharedRateLimiter};
