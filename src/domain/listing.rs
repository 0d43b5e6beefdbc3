//! Listing Records
//!
//! Rows scraped from an exchange listing page. A row either parses into a
//! `ListingRecord` or is kept as an `Unparsed` outcome with the reason it was
//! dropped, so malformed markup never aborts a crawl.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest ticker accepted from a listing page
pub const MAX_SYMBOL_LEN: usize = 20;

/// One listing scraped from one exchange page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Ticker as shown on the page (not yet normalized)
    pub symbol: String,
    /// Trading pair when the page shows one (e.g. "AAA/USDT")
    pub pair: Option<String>,
    /// Listing source exchange identifier (e.g. "mxc")
    pub exchange_id: String,
    /// Listing date, UTC-normalized
    pub listed_at: NaiveDate,
    /// Page the row was read from
    pub source_url: String,
}

impl ListingRecord {
    /// Aggregation key for this record
    pub fn key(&self) -> String {
        normalize_symbol(&self.symbol)
    }

    /// Age in whole days relative to `today` (negative for future dates)
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.listed_at).num_days()
    }
}

/// Why a scraped row was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnparsedReason {
    /// Row carried neither a ticker nor a date
    Empty,
    /// Ticker text present but not a plausible symbol
    InvalidSymbol(String),
    /// Ticker found but no date in the row and none carried forward
    MissingDate(String),
    /// Date cell present but not in any known format
    InvalidDate(String),
}

impl fmt::Display for UnparsedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty row"),
            Self::InvalidSymbol(s) => write!(f, "invalid symbol '{}'", s),
            Self::MissingDate(s) => write!(f, "no date for symbol '{}'", s),
            Self::InvalidDate(s) => write!(f, "unparseable date '{}'", s),
        }
    }
}

/// Outcome of interpreting one scraped table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Row produced a listing
    Parsed(ListingRecord),
    /// Row only set the carried-forward date
    DateHeader(NaiveDate),
    /// Row was dropped
    Unparsed(UnparsedReason),
}

impl RowOutcome {
    pub fn record(&self) -> Option<&ListingRecord> {
        match self {
            Self::Parsed(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self, Self::Unparsed(_))
    }
}

/// Uppercase and trim a ticker symbol
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Validate a ticker after normalization
///
/// Accepts 1..=20 ASCII alphanumerics. Pairs (`BASE/QUOTE`) resolve to their base.
pub fn parse_symbol(text: &str) -> Option<String> {
    let text = text.trim();
    let base = text.split('/').next().unwrap_or(text).trim();
    let symbol = normalize_symbol(base);

    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
        return None;
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(symbol)
}

/// Date formats seen on listing pages, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%d.%m.%Y %H:%M",
];

/// Parse a listing date cell
///
/// Returns `None` for blank or unrecognized text; never panics on page input.
pub fn parse_listing_date(text: &str) -> Option<NaiveDate> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&text, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&text, fmt) {
            return Some(dt.date());
        }
    }

    chrono::DateTime::parse_from_rfc3339(&text)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_symbol_plain_and_pair() {
        assert_eq!(parse_symbol("aaa"), Some("AAA".to_string()));
        assert_eq!(parse_symbol("  Foo2 "), Some("FOO2".to_string()));
        assert_eq!(parse_symbol("BBB/USDT"), Some("BBB".to_string()));
    }

    #[test]
    fn test_parse_symbol_rejects_garbage() {
        assert_eq!(parse_symbol(""), None);
        assert_eq!(parse_symbol("   "), None);
        assert_eq!(parse_symbol("NOT A TICKER"), None);
        assert_eq!(parse_symbol("$$$"), None);
        assert_eq!(parse_symbol(&"A".repeat(MAX_SYMBOL_LEN + 1)), None);
    }

    #[test]
    fn test_parse_listing_date_formats() {
        let expected = date(2025, 11, 10);
        assert_eq!(parse_listing_date("2025-11-10"), Some(expected));
        assert_eq!(parse_listing_date("2025/11/10"), Some(expected));
        assert_eq!(parse_listing_date("10.11.2025"), Some(expected));
        assert_eq!(parse_listing_date("10 Nov 2025"), Some(expected));
        assert_eq!(parse_listing_date("Nov 10, 2025"), Some(expected));
        assert_eq!(parse_listing_date("November 10, 2025"), Some(expected));
        assert_eq!(parse_listing_date("2025-11-10 14:30"), Some(expected));
        assert_eq!(parse_listing_date("2025-11-10T14:30:00Z"), Some(expected));
        assert_eq!(parse_listing_date("  2025-11-10\n "), Some(expected));
    }

    #[test]
    fn test_parse_listing_date_rejects_garbage() {
        assert_eq!(parse_listing_date(""), None);
        assert_eq!(parse_listing_date("yesterday"), None);
        assert_eq!(parse_listing_date("2025-13-40"), None);
    }

    #[test]
    fn test_age_days_future_is_negative() {
        let record = ListingRecord {
            symbol: "aaa".to_string(),
            pair: None,
            exchange_id: "mxc".to_string(),
            listed_at: date(2025, 11, 12),
            source_url: "https://example.com".to_string(),
        };
        assert_eq!(record.age_days(date(2025, 11, 10)), -2);
        assert_eq!(record.age_days(date(2025, 11, 20)), 8);
        assert_eq!(record.key(), "AAA");
    }
}
