//! Asset Records and Catalogs
//!
//! Market-data snapshots for a token plus the catalogs that map provider
//! platform ids onto supported chains and provider venue names onto target
//! exchanges.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Search hit for a ticker, before details are fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStub {
    pub external_id: String,
    pub symbol: String,
    pub name: String,
    /// Provider market-cap rank (1 = largest); `None` when unranked
    pub market_cap_rank: Option<u32>,
}

/// Full asset snapshot from the market-data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub external_id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap_usd: Option<f64>,
    /// Provider platform id -> contract address
    pub chain_addresses: BTreeMap<String, String>,
    /// Lowercased venue identifiers and names from the provider's tickers
    pub venues: BTreeSet<String>,
}

/// One row of the provider's market-cap ordered listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub external_id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap_usd: Option<f64>,
}

/// Inclusive USD market-cap bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McapRange {
    pub min_usd: f64,
    pub max_usd: f64,
}

impl Default for McapRange {
    fn default() -> Self {
        Self {
            min_usd: 3_000_000.0,
            max_usd: 1_000_000_000.0,
        }
    }
}

impl McapRange {
    pub fn contains(&self, mcap: f64) -> bool {
        mcap.is_finite() && self.min_usd <= mcap && mcap <= self.max_usd
    }
}

/// Maps provider platform ids to chain ids and ranks chains by preference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainCatalog {
    /// Lowercased provider platform id -> chain id
    pub platforms: BTreeMap<String, String>,
    /// Chain ids in descending preference
    pub preference: Vec<String>,
}

impl Default for ChainCatalog {
    fn default() -> Self {
        let platforms = [
            ("ethereum", "ethereum"),
            ("binance-smart-chain", "bnb"),
            ("bnb-smart-chain", "bnb"),
            ("bnb-chain", "bnb"),
            ("bsc", "bnb"),
            ("solana", "solana"),
        ]
        .into_iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect();

        Self {
            platforms,
            preference: vec!["ethereum".into(), "bnb".into(), "solana".into()],
        }
    }
}

impl ChainCatalog {
    pub fn chain_for(&self, platform: &str) -> Option<&str> {
        self.platforms
            .get(&platform.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Supported `(chain_id, address)` pairs of an asset, ordered by chain id
    ///
    /// When several platforms map to the same chain the first non-empty
    /// address in platform order wins.
    pub fn supported_addresses(&self, asset: &AssetRecord) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (platform, address) in &asset.chain_addresses {
            let address = address.trim();
            if address.is_empty() {
                continue;
            }
            if let Some(chain) = self.chain_for(platform) {
                out.entry(chain.to_string())
                    .or_insert_with(|| address.to_string());
            }
        }
        out
    }

    /// Rank of a chain in the preference list (lower is better)
    pub fn rank(&self, chain: &str) -> Option<usize> {
        self.preference.iter().position(|c| c == chain)
    }
}

/// Maps provider venue strings to target exchange labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueCatalog {
    /// Lowercased substring pattern -> target label
    pub patterns: BTreeMap<String, String>,
}

impl Default for VenueCatalog {
    fn default() -> Self {
        let patterns = [
            ("binance", "binance"),
            ("gate", "gate"),
            ("gate.io", "gate"),
            ("kucoin", "kucoin"),
            ("mexc", "mexc"),
            ("mxc", "mexc"),
            ("bybit", "bybit"),
            ("htx", "htx"),
            ("huobi", "htx"),
            ("bingx", "bingx"),
        ]
        .into_iter()
        .map(|(p, l)| (p.to_string(), l.to_string()))
        .collect();

        Self { patterns }
    }
}

impl VenueCatalog {
    /// Target labels hit by any of the asset's venues
    pub fn target_hits(&self, venues: &BTreeSet<String>) -> BTreeSet<String> {
        let mut hits = BTreeSet::new();
        for venue in venues {
            let venue = venue.to_lowercase();
            for (pattern, label) in &self.patterns {
                if venue.contains(pattern.as_str()) {
                    hits.insert(label.clone());
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(platforms: &[(&str, &str)], venues: &[&str]) -> AssetRecord {
        AssetRecord {
            external_id: "foo".to_string(),
            symbol: "foo".to_string(),
            name: "Foo".to_string(),
            market_cap_usd: Some(5_000_000.0),
            chain_addresses: platforms
                .iter()
                .map(|(p, a)| (p.to_string(), a.to_string()))
                .collect(),
            venues: venues.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_mcap_range_inclusive() {
        let range = McapRange {
            min_usd: 1_000_000.0,
            max_usd: 2_000_000.0,
        };
        assert!(range.contains(1_000_000.0));
        assert!(!range.contains(999_999.0));
        assert!(range.contains(2_000_000.0));
        assert!(!range.contains(2_000_001.0));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_supported_addresses_maps_aliases() {
        let catalog = ChainCatalog::default();
        let a = asset(
            &[
                ("binance-smart-chain", "0xBEEF"),
                ("Ethereum", "0xABC"),
                ("polygon-pos", "0x999"),
                ("solana", ""),
            ],
            &[],
        );

        let supported = catalog.supported_addresses(&a);
        assert_eq!(supported.len(), 2);
        assert_eq!(supported["bnb"], "0xBEEF");
        assert_eq!(supported["ethereum"], "0xABC");
    }

    #[test]
    fn test_supported_addresses_duplicate_chain_first_wins() {
        let catalog = ChainCatalog::default();
        let a = asset(&[("binance-smart-chain", "0x1"), ("bsc", "0x2")], &[]);
        let supported = catalog.supported_addresses(&a);
        assert_eq!(supported["bnb"], "0x1");
    }

    #[test]
    fn test_chain_rank() {
        let catalog = ChainCatalog::default();
        assert_eq!(catalog.rank("ethereum"), Some(0));
        assert_eq!(catalog.rank("solana"), Some(2));
        assert_eq!(catalog.rank("tron"), None);
    }

    #[test]
    fn test_venue_hits_substring_and_aliases() {
        let catalog = VenueCatalog::default();
        let a = asset(
            &[],
            &["binance", "gate.io", "huobi global", "mxc", "uniswap v3"],
        );
        let hits = catalog.target_hits(&a.venues);
        let expected: BTreeSet<String> = ["binance", "gate", "htx", "mexc"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(hits, expected);
    }

    #[test]
    fn test_venue_hits_case_insensitive() {
        let catalog = VenueCatalog::default();
        let venues: BTreeSet<String> = ["KuCoin".to_string(), "Bybit".to_string()].into();
        assert_eq!(catalog.target_hits(&venues).len(), 2);
    }
}
