//! Listing Crawler
//!
//! Pulls one exchange's listing pages in order, page 1 first, feeding every
//! page through a single `RowParser` so the carried-forward date survives
//! page boundaries. A crawl is consumed page by page with `next_page` and
//! cannot be rewound; starting over means building a new crawl.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;

use crate::domain::{EligibilityFilter, ListingRecord, RowOutcome, RowParser};
use crate::ports::ListingSource;

/// Crawl limits for one exchange
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Highest page number fetched
    pub max_pages: u32,
    /// Stop once this many distinct symbols were collected
    pub max_tickers: usize,
    /// Consecutive failed pages that end the crawl
    pub max_consecutive_failures: u32,
    /// Age window; a page entirely older than it ends the crawl
    pub window: EligibilityFilter,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_tickers: 1000,
            max_consecutive_failures: 3,
            window: EligibilityFilter::default(),
        }
    }
}

/// Why a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page without rows
    EndOfData,
    /// Every listing on the last page was older than the window
    OlderThanWindow,
    PageCap,
    TickerCap,
    TooManyFailures,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EndOfData => "end of data",
            Self::OlderThanWindow => "older than age window",
            Self::PageCap => "page cap reached",
            Self::TickerCap => "ticker cap reached",
            Self::TooManyFailures => "too many failed pages",
        };
        f.write_str(text)
    }
}

/// Counters for one exchange crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub records: usize,
    pub dropped_rows: usize,
    pub stop: Option<StopReason>,
}

/// Lazy, single-pass crawl of one exchange
pub struct ListingCrawl<'a> {
    source: &'a dyn ListingSource,
    exchange_id: String,
    config: CrawlConfig,
    today: NaiveDate,
    parser: RowParser,
    next_page: u32,
    symbols: HashSet<String>,
    consecutive_failures: u32,
    stats: CrawlStats,
}

impl<'a> ListingCrawl<'a> {
    pub fn new(
        source: &'a dyn ListingSource,
        exchange_id: impl Into<String>,
        config: CrawlConfig,
        today: NaiveDate,
    ) -> Self {
        let exchange_id = exchange_id.into();
        Self {
            source,
            parser: RowParser::new(exchange_id.clone()),
            exchange_id,
            config,
            today,
            next_page: 1,
            symbols: HashSet::new(),
            consecutive_failures: 0,
            stats: CrawlStats::default(),
        }
    }

    pub fn exchange_id(&self) -> &str {
        &self.exchange_id
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    fn stop(&mut self, reason: StopReason) {
        if self.stats.stop.is_none() {
            tracing::debug!("{}: crawl stopped after page {} ({})", self.exchange_id, self.next_page - 1, reason);
            self.stats.stop = Some(reason);
        }
    }

    /// Records of the next page, or `None` once the crawl has ended
    ///
    /// Failed pages are skipped without yielding; a page whose rows all fail
    /// to parse yields an empty batch.
    pub async fn next_page(&mut self) -> Option<Vec<ListingRecord>> {
        loop {
            if self.stats.stop.is_some() {
                return None;
            }
            if self.next_page > self.config.max_pages {
                self.stop(StopReason::PageCap);
                return None;
            }

            let page_no = self.next_page;
            self.next_page += 1;

            let page = match self.source.fetch_page(&self.exchange_id, page_no).await {
                Ok(page) => page,
                Err(e) => {
                    self.stats.pages_failed += 1;
                    self.consecutive_failures += 1;
                    // Date headers on the lost page are unknown
                    self.parser.reset_date();
                    tracing::warn!(
                        "{}: skipping page {} via {}: {}",
                        self.exchange_id,
                        page_no,
                        self.source.name(),
                        e
                    );
                    if self.consecutive_failures >= self.config.max_consecutive_failures.max(1) {
                        self.stop(StopReason::TooManyFailures);
                    }
                    continue;
                }
            };

            self.consecutive_failures = 0;
            self.stats.pages_fetched += 1;

            if page.is_end() {
                self.stop(StopReason::EndOfData);
                return None;
            }

            let mut records = Vec::new();
            for outcome in self.parser.interpret_all(&page.rows, &page.url) {
                match outcome {
                    RowOutcome::Parsed(record) => records.push(record),
                    RowOutcome::DateHeader(_) => {}
                    RowOutcome::Unparsed(reason) => {
                        tracing::debug!("{}: dropped row on page {}: {}", self.exchange_id, page_no, reason);
                        self.stats.dropped_rows += 1;
                    }
                }
            }

            self.stats.records += records.len();
            self.symbols.extend(records.iter().map(|r| r.symbol.clone()));

            let all_stale = !records.is_empty()
                && records
                    .iter()
                    .all(|r| self.config.window.is_older_than_window(r.age_days(self.today)));

            if all_stale {
                self.stop(StopReason::OlderThanWindow);
            } else if self.symbols.len() >= self.config.max_tickers {
                self.stop(StopReason::TickerCap);
            }

            return Some(records);
        }
    }

    /// Drain the crawl
    pub async fn collect(mut self) -> (Vec<ListingRecord>, CrawlStats) {
        let mut all = Vec::new();
        while let Some(records) = self.next_page().await {
            all.extend(records);
        }
        (all, self.stats)
    }
}

/// Crawl one exchange to completion
pub async fn fetch_listings(
    source: &dyn ListingSource,
    exchange_id: &str,
    config: CrawlConfig,
    today: NaiveDate,
) -> (Vec<ListingRecord>, CrawlStats) {
    ListingCrawl::new(source, exchange_id, config, today).collect().await
}
