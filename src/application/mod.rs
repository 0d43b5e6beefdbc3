//! Application Layer - Discovery workflow
//!
//! - `listing_crawler`: lazy per-exchange page crawl with stop rules
//! - `resolver`: ticker -> asset resolution through `MarketLookup`
//! - `scan`: market-cap ordered discovery without listing pages
//! - `pipeline`: the batch run from crawl to persisted registry

pub mod listing_crawler;
pub mod resolver;
pub mod scan;
pub mod pipeline;

pub use listing_crawler::{fetch_listings, CrawlConfig, CrawlStats, ListingCrawl, StopReason};
pub use resolver::{AssetRejection, CandidateResolver, ResolveSummary, ResolverConfig, SkipReason};
pub use scan::{scan_markets, ScanConfig, ScanStats};
pub use pipeline::{DiscoveryPipeline, PipelineError, PipelineReport, PipelineSettings};
