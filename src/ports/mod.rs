//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement:
//! - Listing pages scraped from exchange listing sites
//! - Market-data lookups (search, details, market-cap listing)
//!
//! `mocks` holds in-memory implementations used by tests.

pub mod listing_source;
pub mod market_lookup;
pub mod mocks;

pub use listing_source::{ListingPage, ListingSource, ListingSourceError};
pub use market_lookup::{LookupError, MarketLookup};
