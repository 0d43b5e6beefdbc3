//! Listing Site Adapter
//!
//! `ListingSource` implementation for exchange listing announcement pages:
//! paginated HTML search results, newest listings first, one table per page.

mod client;
mod html;

pub use client::{ListingSiteClient, ListingSiteConfig};
pub use html::parse_listing_table;
