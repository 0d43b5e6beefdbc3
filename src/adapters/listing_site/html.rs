//! Listing Table Extraction
//!
//! Pulls the rows of the listing table out of a page. Only text and the coin
//! link are kept; interpretation happens in `domain::row_parser`.

use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::domain::RawRow;

struct Selectors {
    body_rows: Selector,
    any_rows: Selector,
    cells: Selector,
    coin_link: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        body_rows: Selector::parse("table tbody tr").expect("valid selector"),
        any_rows: Selector::parse("table tr").expect("valid selector"),
        cells: Selector::parse("td, th").expect("valid selector"),
        coin_link: Selector::parse(r#"a[href*="/coin/"]"#).expect("valid selector"),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn raw_row(row: ElementRef<'_>) -> RawRow {
    let s = selectors();
    let cells = row.select(&s.cells).map(element_text).collect();
    let coin_link = row
        .select(&s.coin_link)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    RawRow { cells, coin_link }
}

/// Extract listing-table rows in document order
///
/// Returns an empty vector when the page has no table, which callers treat
/// as the end of pagination.
pub fn parse_listing_table(html: &str) -> Vec<RawRow> {
    let document = Html::parse_document(html);
    let s = selectors();

    let mut rows: Vec<RawRow> = document.select(&s.body_rows).map(raw_row).collect();
    if rows.is_empty() {
        rows = document.select(&s.any_rows).map(raw_row).collect();
    }
    rows
}
