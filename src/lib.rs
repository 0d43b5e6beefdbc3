//! listing-scout - Newly listed token discovery and registry reconciliation
//!
//! Crawls exchange listing announcement pages, aggregates tickers across
//! exchanges, filters them by listing age and exchange coverage, resolves
//! them against a market-data provider and merges accepted tokens into a
//! deduplicated registry file.
//!
//! # Modules
//!
//! - `domain`: Core types and rules (listings, candidates, eligibility, registry)
//! - `ports`: Trait abstractions (ListingSource, MarketLookup)
//! - `adapters`: External implementations (listing site, CoinGecko, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Crawler, resolver, market scan and the discovery pipeline

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
