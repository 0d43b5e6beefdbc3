//! Market-Cap Scan
//!
//! Alternative discovery path that skips listing pages: walks the market-data
//! provider's listing in descending market cap, keeps assets inside the mcap
//! range and runs each through the resolver's chain and venue filters.

use std::collections::BTreeMap;

use super::resolver::CandidateResolver;
use crate::domain::{IdentityKey, MarketSnapshot, Resolution};

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            per_page: 250,
            max_pages: 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub pages: u32,
    pub scanned: usize,
    pub in_range: usize,
    pub accepted: usize,
    pub lookup_failures: usize,
    pub duplicates_merged: usize,
}

/// Walk the market listing and resolve every in-range asset
///
/// Duplicate identity keys keep the placement of the asset with the larger
/// market cap; output is ordered by identity key.
pub async fn scan_markets(resolver: &CandidateResolver, config: &ScanConfig) -> (Vec<Resolution>, ScanStats) {
    let mut stats = ScanStats::default();
    let in_range = collect_in_range(resolver, config, &mut stats).await;
    stats.in_range = in_range.len();
    tracing::info!("Scan: {} assets in range after {} pages", in_range.len(), stats.pages);

    let mut by_key: BTreeMap<IdentityKey, (f64, Resolution)> = BTreeMap::new();

    for snapshot in in_range {
        let asset = match resolver.lookup().details(&snapshot.external_id).await {
            Ok(asset) => asset,
            Err(e) => {
                tracing::warn!("Scan: details for {} failed, skipping: {}", snapshot.external_id, e);
                stats.lookup_failures += 1;
                continue;
            }
        };

        let resolution = match resolver.accept(asset, None) {
            Ok(resolution) => resolution,
            Err(rejection) => {
                tracing::debug!("Scan: {} rejected: {}", snapshot.external_id, rejection);
                continue;
            }
        };
        stats.accepted += 1;

        let mcap = resolution.asset.market_cap_usd.unwrap_or_default();
        for placement in &resolution.placements {
            let key = IdentityKey::new(&placement.chain_id, &placement.address);
            if let Some((kept, _)) = by_key.get(&key) {
                stats.duplicates_merged += 1;
                if *kept >= mcap {
                    continue;
                }
            }
            let single = Resolution {
                asset: resolution.asset.clone(),
                placements: vec![placement.clone()],
                candidate: None,
            };
            by_key.insert(key, (mcap, single));
        }
    }

    let resolutions = by_key.into_values().map(|(_, r)| r).collect();
    (resolutions, stats)
}

async fn collect_in_range(
    resolver: &CandidateResolver,
    config: &ScanConfig,
    stats: &mut ScanStats,
) -> Vec<MarketSnapshot> {
    let range = resolver.config().mcap;
    let mut kept = Vec::new();

    for page in 1..=config.max_pages {
        let rows = match resolver.lookup().markets_page(page, config.per_page).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Scan: markets page {} failed, skipping: {}", page, e);
                stats.lookup_failures += 1;
                continue;
            }
        };
        stats.pages += 1;
        if rows.is_empty() {
            break;
        }

        for row in rows {
            stats.scanned += 1;
            let Some(mcap) = row.market_cap_usd else {
                continue;
            };
            if mcap < range.min_usd {
                // descending order: nothing further can be in range
                return kept;
            }
            if range.contains(mcap) {
                kept.push(row);
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::resolver::ResolverConfig;
    use crate::domain::AssetRecord;
    use crate::ports::mocks::StaticMarketLookup;
    use std::sync::Arc;

    fn snapshot(id: &str, mcap: Option<f64>) -> MarketSnapshot {
        MarketSnapshot {
            external_id: id.to_string(),
            symbol: id.to_string(),
            name: id.to_uppercase(),
            market_cap_usd: mcap,
        }
    }

    fn asset(id: &str, mcap: f64, address: &str) -> AssetRecord {
        AssetRecord {
            external_id: id.to_string(),
            symbol: id.to_string(),
            name: id.to_uppercase(),
            market_cap_usd: Some(mcap),
            chain_addresses: [("ethereum".to_string(), address.to_string())].into_iter().collect(),
            venues: ["binance", "kucoin", "bybit"].iter().map(|v| v.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_scan_stops_below_min_and_skips_above_max() {
        let lookup = StaticMarketLookup::new()
            .with_markets_page(
                1,
                vec![
                    snapshot("huge", Some(5e9)),
                    snapshot("aaa", Some(8e6)),
                    snapshot("nomcap", None),
                ],
            )
            .with_markets_page(2, vec![snapshot("bbb", Some(4e6)), snapshot("tiny", Some(1e6)), snapshot("after", Some(5e6))])
            .with_markets_page(3, vec![snapshot("never", Some(5e6))])
            .with_asset(asset("aaa", 8e6, "0xaaa"))
            .with_asset(asset("bbb", 4e6, "0xbbb"))
            .with_asset(asset("after", 5e6, "0xafter"));

        let resolver = CandidateResolver::new(Arc::new(lookup.clone()), ResolverConfig::default());
        let (resolutions, stats) = scan_markets(&resolver, &ScanConfig::default()).await;

        let ids: Vec<_> = resolutions.iter().map(|r| r.asset.external_id.as_str()).collect();
        assert_eq!(ids, vec!["aaa", "bbb"]);
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.in_range, 2);
        assert_eq!(lookup.get_detail_calls(), vec!["aaa".to_string(), "bbb".to_string()]);
        assert!(resolutions.iter().all(|r| r.candidate.is_none()));
    }

    #[tokio::test]
    async fn test_scan_duplicate_key_keeps_larger_mcap() {
        let lookup = StaticMarketLookup::new()
            .with_markets_page(1, vec![snapshot("big", Some(9e6)), snapshot("small", Some(6e6))])
            .with_asset(asset("small", 6e6, "0xSHARED"))
            .with_asset(asset("big", 9e6, "0xshared"));

        let resolver = CandidateResolver::new(Arc::new(lookup), ResolverConfig::default());
        let (resolutions, stats) = scan_markets(&resolver, &ScanConfig::default()).await;

        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].asset.external_id, "big");
        assert_eq!(stats.duplicates_merged, 1);
    }

    #[tokio::test]
    async fn test_scan_failed_detail_is_skipped() {
        let lookup = StaticMarketLookup::new()
            .with_markets_page(1, vec![snapshot("aaa", Some(8e6)), snapshot("bbb", Some(7e6))])
            .with_asset(asset("bbb", 7e6, "0xbbb"))
            .with_failure("aaa");

        let resolver = CandidateResolver::new(Arc::new(lookup), ResolverConfig::default());
        let (resolutions, stats) = scan_markets(&resolver, &ScanConfig::default()).await;

        assert_eq!(resolutions.len(), 1);
        assert_eq!(stats.lookup_failures, 1);
    }

    #[tokio::test]
    async fn test_scan_failed_markets_page_is_skipped() {
        let lookup = StaticMarketLookup::new()
            .with_markets_failure(1)
            .with_markets_page(2, vec![snapshot("bbb", Some(7e6))])
            .with_asset(asset("bbb", 7e6, "0xbbb"));

        let resolver = CandidateResolver::new(Arc::new(lookup), ResolverConfig::default());
        let (resolutions, stats) = scan_markets(&resolver, &ScanConfig::default()).await;

        assert_eq!(stats.lookup_failures, 1);
        // page 2 fetched, page 3 empty
        assert_eq!(stats.pages, 2);
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].asset.external_id, "bbb");
    }

    #[tokio::test]
    async fn test_scan_respects_page_limit() {
        let lookup = StaticMarketLookup::new()
            .with_markets_page(1, vec![snapshot("aaa", Some(8e6))])
            .with_markets_page(2, vec![snapshot("bbb", Some(7e6))]);

        let resolver = CandidateResolver::new(Arc::new(lookup), ResolverConfig::default());
        let config = ScanConfig {
            per_page: 1,
            max_pages: 1,
        };
        let (_, stats) = scan_markets(&resolver, &config).await;
        assert_eq!(stats.pages, 1);
        assert_eq!(stats.in_range, 1);
    }
}
