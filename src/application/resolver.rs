//! Candidate Resolver
//!
//! Maps a shortlisted ticker onto one market-data asset and the chain
//! placements to register. Lookup failures never escape: a failed search
//! skips the ticker, a failed detail call skips that one stub.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{
    AssetRecord, AssetStub, ChainCatalog, ChainPolicy, McapRange, Resolution, SelectionPolicy,
    TickerCandidate, VenueCatalog,
};
use crate::ports::{LookupError, MarketLookup};

/// Resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub mcap: McapRange,
    pub chains: ChainCatalog,
    pub venues: VenueCatalog,
    /// Minimum number of distinct target venues an asset must trade on
    pub min_target_venues: usize,
    pub selection: SelectionPolicy,
    pub chain_policy: ChainPolicy,
    /// Cap on stubs whose details are fetched per ticker, best first;
    /// `None` evaluates every search hit
    pub max_stubs_per_symbol: Option<usize>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mcap: McapRange::default(),
            chains: ChainCatalog::default(),
            venues: VenueCatalog::default(),
            min_target_venues: 3,
            selection: SelectionPolicy::default(),
            chain_policy: ChainPolicy::default(),
            max_stubs_per_symbol: None,
        }
    }
}

/// Why one asset's details were rejected
#[derive(Debug, Clone, PartialEq)]
pub enum AssetRejection {
    NoSupportedChain,
    NoMarketCap,
    McapOutOfRange { mcap: f64 },
    TooFewVenues { hits: usize, required: usize },
}

impl fmt::Display for AssetRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSupportedChain => write!(f, "no address on a supported chain"),
            Self::NoMarketCap => write!(f, "no USD market cap"),
            Self::McapOutOfRange { mcap } => write!(f, "market cap ${:.0} out of range", mcap),
            Self::TooFewVenues { hits, required } => {
                write!(f, "{} target venues, need {}", hits, required)
            }
        }
    }
}

/// Why a ticker produced no resolution
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoSearchResults,
    SearchFailed(LookupError),
    NoAcceptedAsset { evaluated: usize, failed_lookups: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSearchResults => write!(f, "no search results"),
            Self::SearchFailed(e) => write!(f, "search failed: {}", e),
            Self::NoAcceptedAsset {
                evaluated,
                failed_lookups,
            } => write!(
                f,
                "none of {} assets accepted ({} lookups failed)",
                evaluated, failed_lookups
            ),
        }
    }
}

/// Result of resolving a batch of candidates
#[derive(Debug, Clone, Default)]
pub struct ResolveSummary {
    pub resolutions: Vec<Resolution>,
    pub skipped: Vec<(String, SkipReason)>,
    /// Search and detail calls that failed
    pub lookup_failures: usize,
}

pub struct CandidateResolver {
    lookup: Arc<dyn MarketLookup>,
    config: ResolverConfig,
}

impl CandidateResolver {
    pub fn new(lookup: Arc<dyn MarketLookup>, config: ResolverConfig) -> Self {
        Self { lookup, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn lookup(&self) -> &Arc<dyn MarketLookup> {
        &self.lookup
    }

    /// Stubs in evaluation order: exact symbol matches first, then by
    /// ascending market-cap rank with unranked stubs last
    pub fn order_stubs(&self, symbol: &str, mut stubs: Vec<AssetStub>) -> Vec<AssetStub> {
        stubs.sort_by_key(|stub| {
            let exact = stub.symbol.trim().eq_ignore_ascii_case(symbol.trim());
            (!exact, stub.market_cap_rank.is_none(), stub.market_cap_rank.unwrap_or(u32::MAX))
        });
        if let Some(cap) = self.config.max_stubs_per_symbol {
            stubs.truncate(cap.max(1));
        }
        stubs
    }

    /// Apply chain, market-cap and venue filters to one asset
    ///
    /// Returns the asset's supported `chain -> address` pairs when accepted.
    pub fn evaluate(&self, asset: &AssetRecord) -> Result<BTreeMap<String, String>, AssetRejection> {
        let supported = self.config.chains.supported_addresses(asset);
        if supported.is_empty() {
            return Err(AssetRejection::NoSupportedChain);
        }

        let mcap = asset.market_cap_usd.ok_or(AssetRejection::NoMarketCap)?;
        if !self.config.mcap.contains(mcap) {
            return Err(AssetRejection::McapOutOfRange { mcap });
        }

        let hits = self.config.venues.target_hits(&asset.venues).len();
        if hits < self.config.min_target_venues {
            return Err(AssetRejection::TooFewVenues {
                hits,
                required: self.config.min_target_venues,
            });
        }

        Ok(supported)
    }

    /// Evaluate an asset and place it on chains per the chain policy
    pub fn accept(
        &self,
        asset: AssetRecord,
        candidate: Option<TickerCandidate>,
    ) -> Result<Resolution, AssetRejection> {
        let supported = self.evaluate(&asset)?;
        let placements = self.config.chain_policy.place(&self.config.chains, &supported);
        Ok(Resolution {
            asset,
            placements,
            candidate,
        })
    }

    /// Resolve one candidate
    pub async fn resolve(&self, candidate: &TickerCandidate) -> Result<Resolution, SkipReason> {
        let mut failures = 0;
        self.resolve_counted(candidate, &mut failures).await
    }

    async fn resolve_counted(
        &self,
        candidate: &TickerCandidate,
        failures: &mut usize,
    ) -> Result<Resolution, SkipReason> {
        let symbol = candidate.symbol.as_str();

        let stubs = match self.lookup.search(symbol).await {
            Ok(stubs) => stubs,
            Err(e) => {
                *failures += 1;
                return Err(SkipReason::SearchFailed(e));
            }
        };
        if stubs.is_empty() {
            return Err(SkipReason::NoSearchResults);
        }

        let stubs = self.order_stubs(symbol, stubs);
        let evaluated = stubs.len();
        let mut failed_lookups = 0;
        let mut best: Option<Resolution> = None;

        for stub in stubs {
            let asset = match self.lookup.details(&stub.external_id).await {
                Ok(asset) => asset,
                Err(e) => {
                    tracing::warn!("{}: details for {} failed, skipping: {}", symbol, stub.external_id, e);
                    failed_lookups += 1;
                    *failures += 1;
                    continue;
                }
            };

            match self.accept(asset, Some(candidate.clone())) {
                Ok(resolution) => {
                    tracing::debug!("{}: {} accepted", symbol, stub.external_id);
                    match self.config.selection {
                        SelectionPolicy::FirstAccepted => return Ok(resolution),
                        SelectionPolicy::MaxMarketCap => {
                            let larger = best.as_ref().map_or(true, |b| {
                                resolution.asset.market_cap_usd > b.asset.market_cap_usd
                            });
                            if larger {
                                best = Some(resolution);
                            }
                        }
                    }
                }
                Err(rejection) => {
                    tracing::debug!("{}: {} rejected: {}", symbol, stub.external_id, rejection);
                }
            }
        }

        best.ok_or(SkipReason::NoAcceptedAsset {
            evaluated,
            failed_lookups,
        })
    }

    /// Resolve candidates one after another
    pub async fn resolve_all(&self, candidates: &[TickerCandidate]) -> ResolveSummary {
        let mut summary = ResolveSummary::default();

        for candidate in candidates {
            match self.resolve_counted(candidate, &mut summary.lookup_failures).await {
                Ok(resolution) => {
                    tracing::info!(
                        "{} -> {} ({} placements)",
                        candidate.symbol,
                        resolution.asset.external_id,
                        resolution.placements.len()
                    );
                    summary.resolutions.push(resolution);
                }
                Err(reason) => {
                    match &reason {
                        SkipReason::SearchFailed(_) => tracing::warn!("Skip {}: {}", candidate.symbol, reason),
                        _ => tracing::debug!("Skip {}: {}", candidate.symbol, reason),
                    }
                    summary.skipped.push((candidate.symbol.clone(), reason));
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListingRecord, Placement};
    use crate::ports::market_lookup::MockMarketLookup;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn candidate(symbol: &str) -> TickerCandidate {
        TickerCandidate::from_record(ListingRecord {
            symbol: symbol.to_string(),
            pair: Some(format!("{}/USDT", symbol)),
            exchange_id: "mxc".to_string(),
            listed_at: NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            source_url: "https://listings.test/mxc/1".to_string(),
        })
    }

    fn stub(id: &str, symbol: &str, rank: Option<u32>) -> AssetStub {
        AssetStub {
            external_id: id.to_string(),
            symbol: symbol.to_string(),
            name: id.to_string(),
            market_cap_rank: rank,
        }
    }

    fn asset(id: &str, mcap: Option<f64>, chains: &[(&str, &str)], venues: &[&str]) -> AssetRecord {
        AssetRecord {
            external_id: id.to_string(),
            symbol: "foo".to_string(),
            name: "Foo".to_string(),
            market_cap_usd: mcap,
            chain_addresses: chains.iter().map(|(p, a)| (p.to_string(), a.to_string())).collect(),
            venues: venues.iter().map(|v| v.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn good_asset(id: &str, mcap: f64) -> AssetRecord {
        asset(id, Some(mcap), &[("ethereum", "0xAbC")], &["binance", "gate", "mxc"])
    }

    fn resolver_with(mock: MockMarketLookup, config: ResolverConfig) -> CandidateResolver {
        CandidateResolver::new(Arc::new(mock), config)
    }

    fn resolver() -> CandidateResolver {
        resolver_with(MockMarketLookup::new(), ResolverConfig::default())
    }

    #[test]
    fn test_mcap_boundaries() {
        let r = resolver();
        let min = McapRange::default().min_usd;
        let max = McapRange::default().max_usd;

        assert!(r.evaluate(&good_asset("a", min)).is_ok());
        assert!(r.evaluate(&good_asset("a", max)).is_ok());
        assert_eq!(
            r.evaluate(&good_asset("a", min - 1.0)),
            Err(AssetRejection::McapOutOfRange { mcap: min - 1.0 })
        );
        assert_eq!(
            r.evaluate(&good_asset("a", max + 1.0)),
            Err(AssetRejection::McapOutOfRange { mcap: max + 1.0 })
        );
    }

    #[test]
    fn test_rejects_missing_chain_mcap_and_venues() {
        let r = resolver();
        let no_chain = asset("a", Some(5e6), &[("polygon-pos", "0x1")], &["binance", "gate", "mxc"]);
        assert_eq!(r.evaluate(&no_chain), Err(AssetRejection::NoSupportedChain));

        let no_mcap = asset("a", None, &[("ethereum", "0x1")], &["binance", "gate", "mxc"]);
        assert_eq!(r.evaluate(&no_mcap), Err(AssetRejection::NoMarketCap));

        // gate.io and gate both map to one label
        let few_venues = asset("a", Some(5e6), &[("ethereum", "0x1")], &["binance", "gate", "gate.io"]);
        assert_eq!(
            r.evaluate(&few_venues),
            Err(AssetRejection::TooFewVenues { hits: 2, required: 3 })
        );
    }

    #[test]
    fn test_order_stubs_exact_then_rank() {
        let r = resolver();
        let ordered = r.order_stubs(
            "FOO",
            vec![
                stub("foo-wrapped", "wfoo", Some(1)),
                stub("foo-unranked", "FOO", None),
                stub("foo-big", "foo", Some(50)),
                stub("foo-small", "Foo", Some(900)),
            ],
        );
        let ids: Vec<_> = ordered.iter().map(|s| s.external_id.as_str()).collect();
        assert_eq!(ids, vec!["foo-big", "foo-small", "foo-unranked", "foo-wrapped"]);
    }

    #[test]
    fn test_order_stubs_truncates() {
        let config = ResolverConfig {
            max_stubs_per_symbol: Some(2),
            ..Default::default()
        };
        let r = resolver_with(MockMarketLookup::new(), config);
        let stubs = (0..5).map(|i| stub(&format!("id{}", i), "FOO", Some(i))).collect();
        assert_eq!(r.order_stubs("FOO", stubs).len(), 2);
    }

    #[test]
    fn test_order_stubs_keeps_all_by_default() {
        let r = resolver_with(MockMarketLookup::new(), ResolverConfig::default());
        let stubs = (0..25).map(|i| stub(&format!("id{}", i), "FOO", Some(i))).collect();
        assert_eq!(r.order_stubs("FOO", stubs).len(), 25);
    }

    #[test]
    fn test_accept_places_preferred_chain() {
        let r = resolver();
        let multi = asset(
            "foo",
            Some(5e6),
            &[("solana", "FooMint"), ("binance-smart-chain", "0xbsc"), ("ethereum", "0xeth")],
            &["binance", "gate", "mxc"],
        );
        let resolution = r.accept(multi, None).unwrap();
        assert_eq!(
            resolution.placements,
            vec![Placement {
                chain_id: "ethereum".to_string(),
                address: "0xeth".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_first_accepted_stops_early() {
        let mut mock = MockMarketLookup::new();
        mock.expect_search()
            .times(1)
            .returning(|_| Ok(vec![stub("foo-a", "FOO", Some(10)), stub("foo-b", "FOO", Some(20))]));
        mock.expect_details()
            .times(1)
            .returning(|id| Ok(good_asset(id, 5e6)));

        let r = resolver_with(mock, ResolverConfig::default());
        let resolution = r.resolve(&candidate("FOO")).await.unwrap();
        assert_eq!(resolution.asset.external_id, "foo-a");
        assert_eq!(resolution.candidate.unwrap().symbol, "FOO");
    }

    #[tokio::test]
    async fn test_max_market_cap_evaluates_all() {
        let mut mock = MockMarketLookup::new();
        mock.expect_search().times(1).returning(|_| {
            Ok(vec![
                stub("foo-a", "FOO", Some(10)),
                stub("foo-b", "FOO", Some(20)),
                stub("foo-c", "FOO", Some(30)),
            ])
        });
        mock.expect_details().times(3).returning(|id| {
            Ok(match id {
                "foo-a" => good_asset(id, 4e6),
                "foo-b" => good_asset(id, 9e6),
                _ => good_asset(id, 2e9),
            })
        });

        let config = ResolverConfig {
            selection: SelectionPolicy::MaxMarketCap,
            ..Default::default()
        };
        let r = resolver_with(mock, config);
        let resolution = r.resolve(&candidate("FOO")).await.unwrap();
        // foo-c is above the cap
        assert_eq!(resolution.asset.external_id, "foo-b");
    }

    #[tokio::test]
    async fn test_max_market_cap_sees_low_ranked_stubs() {
        let mut mock = MockMarketLookup::new();
        mock.expect_search()
            .times(1)
            .returning(|_| Ok((1..=15).map(|i| stub(&format!("foo-{}", i), "FOO", Some(i))).collect()));
        mock.expect_details().times(15).returning(|id| {
            Ok(if id == "foo-15" {
                good_asset(id, 9e6)
            } else {
                good_asset(id, 4e6)
            })
        });

        let config = ResolverConfig {
            selection: SelectionPolicy::MaxMarketCap,
            ..Default::default()
        };
        let r = resolver_with(mock, config);
        let resolution = r.resolve(&candidate("FOO")).await.unwrap();
        assert_eq!(resolution.asset.external_id, "foo-15");
    }

    #[tokio::test]
    async fn test_empty_search_skips() {
        let mut mock = MockMarketLookup::new();
        mock.expect_search().returning(|_| Ok(vec![]));
        mock.expect_details().never();

        let r = resolver_with(mock, ResolverConfig::default());
        assert_eq!(r.resolve(&candidate("FOO")).await, Err(SkipReason::NoSearchResults));
    }

    #[tokio::test]
    async fn test_failed_detail_skips_stub_only() {
        let mut mock = MockMarketLookup::new();
        mock.expect_search()
            .returning(|_| Ok(vec![stub("foo-a", "FOO", Some(1)), stub("foo-b", "FOO", Some(2))]));
        mock.expect_details().times(2).returning(|id| {
            if id == "foo-a" {
                Err(LookupError::Transport("timed out".to_string()))
            } else {
                Ok(good_asset(id, 5e6))
            }
        });

        let r = resolver_with(mock, ResolverConfig::default());
        let summary = r.resolve_all(&[candidate("FOO")]).await;
        assert_eq!(summary.resolutions.len(), 1);
        assert_eq!(summary.resolutions[0].asset.external_id, "foo-b");
        assert_eq!(summary.lookup_failures, 1);
    }

    #[tokio::test]
    async fn test_failed_search_continues_with_next_candidate() {
        let mut mock = MockMarketLookup::new();
        mock.expect_search().times(2).returning(|symbol| {
            if symbol == "BAD" {
                Err(LookupError::Status {
                    status: 500,
                    body: String::new(),
                })
            } else {
                Ok(vec![stub("foo", "FOO", Some(1))])
            }
        });
        mock.expect_details().returning(|id| Ok(good_asset(id, 5e6)));

        let r = resolver_with(mock, ResolverConfig::default());
        let summary = r.resolve_all(&[candidate("BAD"), candidate("FOO")]).await;
        assert_eq!(summary.resolutions.len(), 1);
        assert_eq!(summary.skipped.len(), 1);
        assert!(matches!(summary.skipped[0].1, SkipReason::SearchFailed(_)));
        assert_eq!(summary.lookup_failures, 1);
    }

    #[tokio::test]
    async fn test_every_chain_policy() {
        let mut mock = MockMarketLookup::new();
        mock.expect_search().returning(|_| Ok(vec![stub("foo", "FOO", Some(1))]));
        mock.expect_details().returning(|id| {
            Ok(asset(
                id,
                Some(5e6),
                &[("ethereum", "0xeth"), ("bsc", "0xbsc")],
                &["kucoin", "bybit", "htx"],
            ))
        });

        let config = ResolverConfig {
            chain_policy: ChainPolicy::EveryChain,
            ..Default::default()
        };
        let r = resolver_with(mock, config);
        let resolution = r.resolve(&candidate("FOO")).await.unwrap();
        let chains: Vec<_> = resolution.placements.iter().map(|p| p.chain_id.as_str()).collect();
        assert_eq!(chains, vec!["bnb", "ethereum"]);
    }

    #[tokio::test]
    async fn test_all_rejected_reports_counts() {
        let mut mock = MockMarketLookup::new();
        mock.expect_search().returning(|_| Ok(vec![stub("foo", "FOO", Some(1))]));
        mock.expect_details().returning(|id| Ok(good_asset(id, 1.0)));

        let r = resolver_with(mock, ResolverConfig::default());
        assert_eq!(
            r.resolve(&candidate("FOO")).await,
            Err(SkipReason::NoAcceptedAsset {
                evaluated: 1,
                failed_lookups: 0
            })
        );
    }
}
