//! Token Registry
//!
//! The persisted, deduplicated set of accepted tokens. Entries are keyed by
//! `(chain, lowercased address)`; the reconciler only ever appends entries
//! with new keys and never edits or removes existing ones.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashSet};

use super::listing::normalize_symbol;
use super::resolution::Resolution;

/// Unique identity of a registry entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub chain: String,
    pub address: String,
}

impl IdentityKey {
    pub fn new(chain: &str, address: &str) -> Self {
        Self {
            chain: chain.trim().to_lowercase(),
            address: address.trim().to_lowercase(),
        }
    }
}

/// One persisted token entry
///
/// Optional fields that are absent in the file stay absent when written back;
/// `coingecko_id` also distinguishes an explicit `null` from a missing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub chain: String,
    pub address: String,
    #[serde(
        rename = "coingecko_id",
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_listed_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listing_exchanges: Vec<String>,
    /// Fields this version does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A present key deserializes to `Some`, even when its value is `null`
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RegistryEntry {
    pub fn identity(&self) -> IdentityKey {
        IdentityKey::new(&self.chain, &self.address)
    }

    pub fn coingecko_id(&self) -> Option<&str> {
        self.external_id.as_ref().and_then(|id| id.as_deref())
    }

    /// Entries without an `active` flag count as active
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }

    fn sort_key(&self) -> (&str, &str) {
        (self.symbol.as_str(), self.chain.as_str())
    }
}

/// Counts from one reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries present before reconciling
    pub existing: usize,
    /// Entries appended
    pub added: usize,
    /// Placements skipped because their key was already present
    pub duplicates_skipped: usize,
    /// Entries after reconciling
    pub total: usize,
}

/// Ordered registry document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<RegistryEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.entries.iter().any(|e| &e.identity() == key)
    }

    /// Identity keys that occur more than once (only possible in hand-edited files)
    pub fn duplicate_keys(&self) -> Vec<IdentityKey> {
        let mut seen = HashSet::new();
        let mut dups = BTreeSet::new();
        for entry in &self.entries {
            let key = entry.identity();
            if !seen.insert(key.clone()) {
                dups.insert(key);
            }
        }
        dups.into_iter().collect()
    }

    /// Stable sort by `(symbol, chain)`
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }
}

/// Build the entry for one placement of a resolution
pub fn build_entry(resolution: &Resolution, chain: &str, address: &str) -> RegistryEntry {
    let asset = &resolution.asset;
    let symbol = normalize_symbol(&asset.symbol);
    let name = if asset.name.trim().is_empty() {
        symbol.clone()
    } else {
        asset.name.clone()
    };

    RegistryEntry {
        symbol,
        name: Some(name),
        chain: chain.to_string(),
        address: address.to_string(),
        external_id: Some(Some(asset.external_id.clone())),
        active: Some(true),
        first_listed_at: resolution.candidate.as_ref().map(|c| c.first_listed_at),
        listing_exchanges: resolution
            .candidate
            .as_ref()
            .map(|c| c.exchanges.iter().cloned().collect())
            .unwrap_or_default(),
        extra: serde_json::Map::new(),
    }
}

/// Merge resolutions into an existing registry
///
/// Keys already in `existing`, or added earlier in the same call, are skipped,
/// so reconciling the same input twice yields the same registry. The result
/// is sorted by `(symbol, chain)`.
pub fn reconcile(existing: Registry, resolved: &[Resolution]) -> (Registry, ReconcileReport) {
    let mut report = ReconcileReport {
        existing: existing.len(),
        ..Default::default()
    };

    let mut keys: HashSet<IdentityKey> = existing.entries.iter().map(RegistryEntry::identity).collect();
    let mut entries = existing.into_entries();

    for resolution in resolved {
        for placement in &resolution.placements {
            let key = IdentityKey::new(&placement.chain_id, &placement.address);
            if !keys.insert(key) {
                tracing::debug!(
                    "Skip {} {} {}: already registered",
                    resolution.asset.symbol,
                    placement.chain_id,
                    placement.address
                );
                report.duplicates_skipped += 1;
                continue;
            }

            let entry = build_entry(resolution, &placement.chain_id, &placement.address);
            tracing::info!("+ {} {} {}", entry.symbol, entry.chain, entry.address);
            entries.push(entry);
            report.added += 1;
        }
    }

    let mut registry = Registry::new(entries);
    registry.sort();
    report.total = registry.len();
    (registry, report)
}
