//! Ticker Candidates
//!
//! Aggregates raw listing records across exchanges into one candidate per
//! uppercased symbol.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::listing::{normalize_symbol, ListingRecord};

/// A ticker seen on one or more listing sources
///
/// `first_listed_at` is always the minimum `listed_at` over `listings`, and
/// `exchanges` is always the set of their exchange ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerCandidate {
    pub symbol: String,
    pub exchanges: BTreeSet<String>,
    pub first_listed_at: NaiveDate,
    pub listings: Vec<ListingRecord>,
}

impl TickerCandidate {
    /// Start a candidate from its first record
    pub fn from_record(record: ListingRecord) -> Self {
        let mut exchanges = BTreeSet::new();
        exchanges.insert(record.exchange_id.clone());
        Self {
            symbol: record.key(),
            exchanges,
            first_listed_at: record.listed_at,
            listings: vec![record],
        }
    }

    /// Fold another record for the same symbol into this candidate
    pub fn absorb(&mut self, record: ListingRecord) {
        debug_assert_eq!(record.key(), self.symbol);
        if record.listed_at < self.first_listed_at {
            self.first_listed_at = record.listed_at;
        }
        self.exchanges.insert(record.exchange_id.clone());
        self.listings.push(record);
    }

    /// Age of the earliest listing in days (negative when in the future)
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.first_listed_at).num_days()
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }
}

/// Group records by uppercased symbol
///
/// Deterministic: the map is ordered by symbol and each candidate keeps its
/// records in input order.
pub fn aggregate<I>(records: I) -> BTreeMap<String, TickerCandidate>
where
    I: IntoIterator<Item = ListingRecord>,
{
    let mut candidates: BTreeMap<String, TickerCandidate> = BTreeMap::new();

    for record in records {
        let key = normalize_symbol(&record.symbol);
        if key.is_empty() {
            continue;
        }
        match candidates.get_mut(&key) {
            Some(candidate) => candidate.absorb(record),
            None => {
                candidates.insert(key, TickerCandidate::from_record(record));
            }
        }
    }

    tracing::debug!("Aggregated listings into {} candidates", candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, exchange: &str, y: i32, m: u32, d: u32) -> ListingRecord {
        ListingRecord {
            symbol: symbol.to_string(),
            pair: Some(format!("{}/USDT", symbol)),
            exchange_id: exchange.to_string(),
            listed_at: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            source_url: format!("https://listings.test/{}", exchange),
        }
    }

    #[test]
    fn test_aggregate_merges_case_insensitive() {
        let records = vec![
            record("XYZ", "A", 2025, 1, 5),
            record("xyz", "B", 2025, 1, 3),
        ];

        let candidates = aggregate(records);
        assert_eq!(candidates.len(), 1);

        let xyz = &candidates["XYZ"];
        assert_eq!(xyz.symbol, "XYZ");
        assert_eq!(
            xyz.exchanges,
            ["A", "B"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(xyz.first_listed_at, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert_eq!(xyz.listings.len(), 2);
    }

    #[test]
    fn test_aggregate_same_exchange_twice() {
        let records = vec![
            record("AAA", "mxc", 2025, 2, 1),
            record("AAA", "mxc", 2025, 2, 9),
        ];

        let candidates = aggregate(records);
        let aaa = &candidates["AAA"];
        assert_eq!(aaa.exchange_count(), 1);
        assert_eq!(aaa.listings.len(), 2);
        assert_eq!(aaa.first_listed_at, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[test]
    fn test_aggregate_invariants_hold() {
        let records = vec![
            record("AAA", "x", 2025, 3, 4),
            record("BBB", "y", 2025, 3, 1),
            record("aaa", "z", 2025, 2, 28),
            record("bbb", "x", 2025, 3, 7),
            record("CCC", "x", 2025, 3, 2),
        ];

        for candidate in aggregate(records).values() {
            let min = candidate.listings.iter().map(|r| r.listed_at).min().unwrap();
            assert_eq!(candidate.first_listed_at, min);
            let exchanges: BTreeSet<String> =
                candidate.listings.iter().map(|r| r.exchange_id.clone()).collect();
            assert_eq!(candidate.exchanges, exchanges);
        }
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn test_age_days() {
        let candidate = TickerCandidate::from_record(record("AAA", "x", 2025, 1, 1));
        let today = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        assert_eq!(candidate.age_days(today), 10);
    }
}
