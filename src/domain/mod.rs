//! Domain Layer - Core types and rules for listing discovery
//!
//! Pure types and logic with no network access. All external interactions
//! happen through the ports layer.
//!
//! - `listing`: scraped listing records and row outcomes
//! - `row_parser`: table-row interpretation with date carry-forward
//! - `candidate`: aggregation of listings into ticker candidates
//! - `eligibility`: age-window and exchange-coverage filter
//! - `asset`: market-data snapshots, chain and venue catalogs
//! - `resolution`: asset selection and chain placement policies
//! - `registry`: registry entries and the reconciler
//! - `registry_persistence`: loading and atomic saving of the registry file

pub mod listing;
pub mod row_parser;
pub mod candidate;
pub mod eligibility;
pub mod asset;
pub mod resolution;
pub mod registry;
pub mod registry_persistence;

pub use listing::{ListingRecord, RowOutcome, UnparsedReason, normalize_symbol, parse_listing_date, parse_symbol};
pub use row_parser::{RawRow, RowParser};
pub use candidate::{TickerCandidate, aggregate};
pub use eligibility::{EligibilityFilter, EligibilityError, Rejection};
pub use asset::{AssetRecord, AssetStub, MarketSnapshot, McapRange, ChainCatalog, VenueCatalog};
pub use resolution::{ChainPolicy, Placement, Resolution, SelectionPolicy};
pub use registry::{IdentityKey, Registry, RegistryEntry, ReconcileReport, build_entry, reconcile};
pub use registry_persistence::{RegistryStore, RegistryError, DEFAULT_REGISTRY_FILE, parse_registry, render_registry};
