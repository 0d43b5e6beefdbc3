//! Discovery Pipeline
//!
//! One batch run: crawl every configured exchange, aggregate, filter,
//! resolve, reconcile into the registry and persist. The registry is loaded
//! and the destination probed before any network traffic; the final persist
//! is the only write and is atomic.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::listing_crawler::{fetch_listings, CrawlConfig};
use super::resolver::CandidateResolver;
use super::scan::{scan_markets, ScanConfig};
use crate::domain::{aggregate, reconcile, EligibilityFilter, Registry, RegistryError, RegistryStore, Resolution};
use crate::ports::ListingSource;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid pipeline settings: {0}")]
    Settings(String),
}

/// Listing-side settings of a run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Listing-source exchange ids to crawl, in order
    pub exchanges: Vec<String>,
    pub crawl: CrawlConfig,
    pub filter: EligibilityFilter,
    /// Skip the final persist
    pub dry_run: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let filter = EligibilityFilter::default();
        Self {
            exchanges: vec!["mxc".to_string()],
            crawl: CrawlConfig {
                window: filter,
                ..Default::default()
            },
            filter,
            dry_run: false,
        }
    }
}

/// Stage counts of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub listings: usize,
    pub dropped_rows: usize,
    pub candidates: usize,
    pub eligible: usize,
    pub resolved: usize,
    pub lookup_failures: usize,
    pub added: usize,
    pub duplicates_skipped: usize,
    pub total: usize,
    pub persisted: bool,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listings={} dropped_rows={} candidates={} eligible={} resolved={} lookup_failures={} added={} duplicates_skipped={} total={}{}",
            self.listings,
            self.dropped_rows,
            self.candidates,
            self.eligible,
            self.resolved,
            self.lookup_failures,
            self.added,
            self.duplicates_skipped,
            self.total,
            if self.persisted { "" } else { " (not persisted)" }
        )
    }
}

pub struct DiscoveryPipeline {
    source: Arc<dyn ListingSource>,
    resolver: CandidateResolver,
    store: RegistryStore,
    settings: PipelineSettings,
}

impl DiscoveryPipeline {
    pub fn new(
        source: Arc<dyn ListingSource>,
        resolver: CandidateResolver,
        store: RegistryStore,
        settings: PipelineSettings,
    ) -> Result<Self, PipelineError> {
        if settings.exchanges.is_empty() {
            return Err(PipelineError::Settings("no listing exchanges configured".to_string()));
        }
        settings
            .filter
            .validate()
            .map_err(|e| PipelineError::Settings(e.to_string()))?;

        Ok(Self {
            source,
            resolver,
            store,
            settings,
        })
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Run against today's UTC date
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        self.run_at(Utc::now().date_naive()).await
    }

    pub async fn run_at(&self, today: NaiveDate) -> Result<PipelineReport, PipelineError> {
        let existing = self.prepare()?;
        let mut report = PipelineReport::default();

        let mut records = Vec::new();
        for exchange in &self.settings.exchanges {
            let (batch, stats) =
                fetch_listings(self.source.as_ref(), exchange, self.settings.crawl.clone(), today).await;
            tracing::info!(
                "{}: {} listings from {} pages ({} failed, {} rows dropped, stop: {})",
                exchange,
                batch.len(),
                stats.pages_fetched,
                stats.pages_failed,
                stats.dropped_rows,
                stats.stop.map(|s| s.to_string()).unwrap_or_default()
            );
            report.dropped_rows += stats.dropped_rows;
            records.extend(batch);
        }
        report.listings = records.len();

        let candidates = aggregate(records);
        report.candidates = candidates.len();

        let eligible = self.settings.filter.filter(candidates.values(), today);
        report.eligible = eligible.len();
        tracing::info!(
            "{} candidates, {} pass age {}..={}d and >= {} exchanges",
            report.candidates,
            report.eligible,
            self.settings.filter.min_age_days,
            self.settings.filter.max_age_days,
            self.settings.filter.min_exchanges
        );

        let summary = self.resolver.resolve_all(&eligible).await;
        report.resolved = summary.resolutions.len();
        report.lookup_failures = summary.lookup_failures;

        self.finish(existing, &summary.resolutions, report)
    }

    /// Market-cap scan instead of listing crawl
    pub async fn run_scan(&self, scan: &ScanConfig) -> Result<PipelineReport, PipelineError> {
        let existing = self.prepare()?;
        let (resolutions, stats) = scan_markets(&self.resolver, scan).await;

        let report = PipelineReport {
            candidates: stats.in_range,
            eligible: stats.accepted,
            resolved: resolutions.len(),
            lookup_failures: stats.lookup_failures,
            ..Default::default()
        };
        self.finish(existing, &resolutions, report)
    }

    fn prepare(&self) -> Result<Registry, PipelineError> {
        if !self.settings.dry_run {
            self.store.ensure_writable()?;
        }
        Ok(self.store.load()?)
    }

    fn finish(
        &self,
        existing: Registry,
        resolutions: &[Resolution],
        mut report: PipelineReport,
    ) -> Result<PipelineReport, PipelineError> {
        let (registry, outcome) = reconcile(existing, resolutions);
        report.added = outcome.added;
        report.duplicates_skipped = outcome.duplicates_skipped;
        report.total = outcome.total;

        if self.settings.dry_run {
            tracing::info!("Dry run, not writing {}", self.store.destination().display());
        } else {
            self.store.persist(&registry)?;
            report.persisted = true;
            tracing::info!("Wrote {} entries to {}", registry.len(), self.store.destination().display());
        }

        tracing::info!("{}", report);
        Ok(report)
    }
}
