//! Listing Row Interpretation
//!
//! Turns scraped table rows into listings. Two layouts occur on listing
//! pages: rows carrying both ticker and date, and date header rows followed
//! by ticker-only rows. `RowParser` keeps the current date across rows and
//! across pages, so one parser must be used for one crawl in page order.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use super::listing::{parse_listing_date, parse_symbol, ListingRecord, RowOutcome, UnparsedReason};

/// Text content of one table row, before interpretation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// Trimmed text of each cell (`td` or `th`), in order
    pub cells: Vec<String>,
    /// Text of the row's coin link, when present
    pub coin_link: Option<String>,
}

impl RawRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            coin_link: None,
        }
    }

    pub fn with_coin_link(mut self, text: impl Into<String>) -> Self {
        self.coin_link = Some(text.into());
        self
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
            && self.coin_link.as_deref().map_or(true, |l| l.trim().is_empty())
    }
}

fn pair_regex() -> &'static Regex {
    static PAIR: OnceLock<Regex> = OnceLock::new();
    PAIR.get_or_init(|| {
        Regex::new(r"\b([A-Za-z0-9]{1,20})\s*/\s*([A-Za-z]{2,10})\b").expect("valid pair regex")
    })
}

fn date_shape_regex() -> &'static Regex {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    DATE_SHAPE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:\d{1,4}[-./]\d{1,2}[-./]\d{1,4}|\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{2,4}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{2,4})",
        )
        .expect("valid date shape regex")
    })
}

/// Text shaped like a date, whether or not it is a valid one
fn looks_like_date(text: &str) -> bool {
    date_shape_regex().is_match(text.trim())
}

/// Find a `BASE/QUOTE` pair in any cell
fn find_pair(cells: &[String]) -> Option<(String, String)> {
    cells.iter().find_map(|cell| {
        pair_regex().captures(cell).map(|caps| {
            (caps[1].to_uppercase(), caps[2].to_uppercase())
        })
    })
}

/// Last cell that parses as a date, scanning right to left
fn find_date(cells: &[String]) -> Option<NaiveDate> {
    cells.iter().rev().find_map(|cell| parse_listing_date(cell))
}

/// Stateful row interpreter for one exchange crawl
#[derive(Debug, Clone)]
pub struct RowParser {
    exchange_id: String,
    current_date: Option<NaiveDate>,
}

impl RowParser {
    pub fn new(exchange_id: impl Into<String>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            current_date: None,
        }
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_date
    }

    /// Forget the carried date; undated rows are dropped until the next header
    pub fn reset_date(&mut self) {
        self.current_date = None;
    }

    /// Interpret one row, updating the carried-forward date
    pub fn interpret(&mut self, row: &RawRow, source_url: &str) -> RowOutcome {
        if row.is_blank() {
            return RowOutcome::Unparsed(UnparsedReason::Empty);
        }

        let pair = find_pair(&row.cells);
        let row_date = find_date(&row.cells);

        let symbol_text = row
            .coin_link
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .or_else(|| pair.as_ref().map(|(base, _)| base.clone()));

        let Some(symbol_text) = symbol_text else {
            // No ticker: either a date header or noise
            return match row_date {
                Some(date) => {
                    self.current_date = Some(date);
                    RowOutcome::DateHeader(date)
                }
                None => RowOutcome::Unparsed(UnparsedReason::InvalidSymbol(row.cells.join(" "))),
            };
        };

        let Some(symbol) = parse_symbol(&symbol_text) else {
            return RowOutcome::Unparsed(UnparsedReason::InvalidSymbol(symbol_text));
        };

        // A malformed own date must not fall back to the carried one
        if row_date.is_none() {
            if let Some(last) = row.cells.last().map(|c| c.trim()).filter(|c| looks_like_date(c)) {
                return RowOutcome::Unparsed(UnparsedReason::InvalidDate(last.to_string()));
            }
        }

        if let Some(date) = row_date {
            self.current_date = Some(date);
        }

        let Some(listed_at) = self.current_date else {
            return RowOutcome::Unparsed(UnparsedReason::MissingDate(symbol));
        };

        RowOutcome::Parsed(ListingRecord {
            symbol,
            pair: pair.map(|(base, quote)| format!("{}/{}", base, quote)),
            exchange_id: self.exchange_id.clone(),
            listed_at,
            source_url: source_url.to_string(),
        })
    }

    /// Interpret a page of rows in order
    pub fn interpret_all(&mut self, rows: &[RawRow], source_url: &str) -> Vec<RowOutcome> {
        rows.iter().map(|row| self.interpret(row, source_url)).collect()
    }
}
