//! Resolution Policies
//!
//! Which asset wins when a ticker is ambiguous, and which chains of the
//! winning asset become registry entries. Both are plain values chosen by
//! configuration and handed to the resolver.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::asset::{AssetRecord, ChainCatalog};
use super::candidate::TickerCandidate;

/// How to choose among accepted assets for one ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Stop at the first stub whose details pass every filter
    #[default]
    FirstAccepted,
    /// Evaluate every stub and keep the accepted asset with the largest market cap
    MaxMarketCap,
}

/// How many registry entries an accepted asset produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainPolicy {
    /// One entry on the most preferred supported chain
    #[default]
    Preferred,
    /// One entry per supported chain
    EveryChain,
}

/// A chain/address pair chosen for an asset
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Placement {
    pub chain_id: String,
    pub address: String,
}

/// An accepted asset for a candidate, with the placements to register
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub asset: AssetRecord,
    pub placements: Vec<Placement>,
    /// Listing candidate that led here; `None` for market-scan results
    pub candidate: Option<TickerCandidate>,
}

impl ChainPolicy {
    /// Pick placements from an asset's supported chains
    ///
    /// `Preferred` takes the best-ranked chain in the catalog preference list;
    /// when no supported chain is ranked it falls back to the first chain id in
    /// ascending order. `EveryChain` returns all supported chains in ascending
    /// chain-id order.
    pub fn place(&self, catalog: &ChainCatalog, supported: &BTreeMap<String, String>) -> Vec<Placement> {
        let to_placement = |(chain, address): (&String, &String)| Placement {
            chain_id: chain.clone(),
            address: address.clone(),
        };

        match self {
            Self::EveryChain => supported.iter().map(to_placement).collect(),
            Self::Preferred => {
                let ranked = supported
                    .iter()
                    .filter_map(|entry| catalog.rank(entry.0).map(|rank| (rank, entry)))
                    .min_by_key(|(rank, _)| *rank)
                    .map(|(_, entry)| entry);

                ranked
                    .or_else(|| supported.iter().next())
                    .map(to_placement)
                    .into_iter()
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(c, a)| (c.to_string(), a.to_string()))
            .collect()
    }

    fn placement(chain: &str, address: &str) -> Placement {
        Placement {
            chain_id: chain.to_string(),
            address: address.to_string(),
        }
    }

    #[test]
    fn test_preferred_picks_highest_ranked() {
        let catalog = ChainCatalog::default();
        let chains = supported(&[("solana", "So1"), ("bnb", "0xB"), ("ethereum", "0xE")]);
        assert_eq!(
            ChainPolicy::Preferred.place(&catalog, &chains),
            vec![placement("ethereum", "0xE")]
        );

        let chains = supported(&[("solana", "So1"), ("bnb", "0xB")]);
        assert_eq!(
            ChainPolicy::Preferred.place(&catalog, &chains),
            vec![placement("bnb", "0xB")]
        );

        let chains = supported(&[("solana", "So1")]);
        assert_eq!(
            ChainPolicy::Preferred.place(&catalog, &chains),
            vec![placement("solana", "So1")]
        );
    }

    #[test]
    fn test_preferred_respects_custom_order() {
        let mut catalog = ChainCatalog::default();
        catalog.preference = vec!["solana".into(), "ethereum".into()];
        let chains = supported(&[("bnb", "0xB"), ("ethereum", "0xE"), ("solana", "So1")]);
        assert_eq!(
            ChainPolicy::Preferred.place(&catalog, &chains),
            vec![placement("solana", "So1")]
        );
    }

    #[test]
    fn test_preferred_falls_back_to_first_chain_id() {
        let mut catalog = ChainCatalog::default();
        catalog.preference = vec!["ethereum".into()];
        let chains = supported(&[("solana", "So1"), ("bnb", "0xB")]);
        // Neither chain is ranked; ascending chain id order puts "bnb" first
        assert_eq!(
            ChainPolicy::Preferred.place(&catalog, &chains),
            vec![placement("bnb", "0xB")]
        );
    }

    #[test]
    fn test_preferred_empty() {
        let catalog = ChainCatalog::default();
        assert!(ChainPolicy::Preferred.place(&catalog, &BTreeMap::new()).is_empty());
        assert!(ChainPolicy::EveryChain.place(&catalog, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_every_chain_ordered_by_chain_id() {
        let catalog = ChainCatalog::default();
        let chains = supported(&[("solana", "So1"), ("ethereum", "0xE"), ("bnb", "0xB")]);
        assert_eq!(
            ChainPolicy::EveryChain.place(&catalog, &chains),
            vec![
                placement("bnb", "0xB"),
                placement("ethereum", "0xE"),
                placement("solana", "So1"),
            ]
        );
    }

    #[test]
    fn test_policy_deserialize() {
        let policy: SelectionPolicy = serde_json::from_str("\"max_market_cap\"").unwrap();
        assert_eq!(policy, SelectionPolicy::MaxMarketCap);
        let policy: ChainPolicy = serde_json::from_str("\"every_chain\"").unwrap();
        assert_eq!(policy, ChainPolicy::EveryChain);
        assert_eq!(SelectionPolicy::default(), SelectionPolicy::FirstAccepted);
        assert_eq!(ChainPolicy::default(), ChainPolicy::Preferred);
    }
}
