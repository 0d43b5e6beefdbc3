//! Configuration Loader
//!
//! Builds the run configuration from built-in defaults, an optional TOML
//! file and environment overrides, in that order of precedence. CLI flags
//! are applied on top by the caller. Nothing below the CLI reads the
//! environment; components get their sub-config at construction.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::coingecko::{ApiPlan, CoinGeckoConfig};
use crate::adapters::listing_site::ListingSiteConfig;
use crate::application::{CrawlConfig, PipelineSettings, ResolverConfig, ScanConfig};
use crate::domain::{
    ChainCatalog, ChainPolicy, EligibilityFilter, McapRange, RegistryStore, SelectionPolicy, VenueCatalog,
    DEFAULT_REGISTRY_FILE,
};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listing: ListingSection,
    pub filter: FilterSection,
    pub market: MarketSection,
    pub registry: RegistrySection,
    pub policy: PolicySection,
}

/// Listing-site crawl settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListingSection {
    /// Listing site root
    pub base_url: String,
    /// Exchange ids on the listing site, crawled in order
    pub exchanges: Vec<String>,
    /// Page cap per exchange
    pub max_pages: u32,
    /// Distinct-symbol cap per exchange
    pub max_tickers: usize,
    /// Consecutive failed pages that end an exchange's crawl
    pub max_consecutive_failures: u32,
    /// Minimum delay between page requests (milliseconds)
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ListingSection {
    fn default() -> Self {
        Self {
            base_url: ListingSiteConfig::default().base_url,
            exchanges: vec!["mxc".to_string()],
            max_pages: 50,
            max_tickers: 1000,
            max_consecutive_failures: 3,
            request_delay_ms: 1000,
            timeout_secs: 20,
        }
    }
}

/// Eligibility window
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    pub min_age_days: i64,
    pub max_age_days: i64,
    /// Minimum listing-source exchanges a ticker must appear on
    pub min_exchanges: usize,
}

impl Default for FilterSection {
    fn default() -> Self {
        let filter = EligibilityFilter::default();
        Self {
            min_age_days: filter.min_age_days,
            max_age_days: filter.max_age_days,
            min_exchanges: filter.min_exchanges,
        }
    }
}

/// Market-data provider settings and asset filters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketSection {
    /// Overrides the plan's default API root
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub plan: ApiPlan,
    /// Inclusive USD market-cap bounds
    pub min_mcap: f64,
    pub max_mcap: f64,
    /// Target venues an asset must trade on
    pub min_target_venues: usize,
    /// Optional cap on search hits whose details are fetched per ticker
    pub max_stubs_per_symbol: Option<usize>,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Rows per markets page in scan mode
    pub scan_per_page: u32,
    /// Markets pages walked in scan mode
    pub scan_max_pages: u32,
}

impl Default for MarketSection {
    fn default() -> Self {
        let mcap = McapRange::default();
        let client = CoinGeckoConfig::default();
        let scan = ScanConfig::default();
        Self {
            base_url: None,
            api_key: None,
            plan: ApiPlan::default(),
            min_mcap: mcap.min_usd,
            max_mcap: mcap.max_usd,
            min_target_venues: 3,
            max_stubs_per_symbol: None,
            request_delay_ms: client.request_delay.as_millis() as u64,
            timeout_secs: client.timeout.as_secs(),
            max_retries: client.max_retries,
            retry_base_delay_ms: client.retry_base_delay_ms,
            scan_per_page: scan.per_page,
            scan_max_pages: scan.max_pages,
        }
    }
}

/// Registry file locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Registry to load; `~` is expanded
    pub path: String,
    /// Where to write; defaults to `path`
    pub output: Option<String>,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            path: DEFAULT_REGISTRY_FILE.to_string(),
            output: None,
        }
    }
}

impl RegistrySection {
    pub fn source_path(&self) -> PathBuf {
        expand_path(&self.path)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(expand_path)
            .unwrap_or_else(|| self.source_path())
    }
}

/// Resolution policies and catalogs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub selection: SelectionPolicy,
    pub chain: ChainPolicy,
    pub chains: ChainCatalog,
    pub venues: VenueCatalog,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    EnvError {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from an optional TOML file plus the process environment
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    config.apply_env(|var| std::env::var(var).ok())?;
    config.validate()?;
    Ok(config)
}

/// Parse TOML content without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Expand a leading `~` in a path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.trim()).into_owned())
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::EnvError {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl Config {
    /// Apply environment overrides through `lookup`
    ///
    /// Empty values are ignored so a blank `.env` line keeps the default.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MIN_AGE_DAYS") {
            self.filter.min_age_days = parse_var("MIN_AGE_DAYS", &v)?;
        }
        if let Some(v) = get("MAX_AGE_DAYS") {
            self.filter.max_age_days = parse_var("MAX_AGE_DAYS", &v)?;
        }
        if let Some(v) = get("MIN_EXCHANGES") {
            self.filter.min_exchanges = parse_var("MIN_EXCHANGES", &v)?;
        }
        if let Some(v) = get("MIN_MCAP") {
            self.market.min_mcap = parse_var("MIN_MCAP", &v)?;
        }
        if let Some(v) = get("MAX_MCAP") {
            self.market.max_mcap = parse_var("MAX_MCAP", &v)?;
        }
        if let Some(v) = get("MIN_TARGET_VENUES") {
            self.market.min_target_venues = parse_var("MIN_TARGET_VENUES", &v)?;
        }
        if let Some(v) = get("LISTING_EXCHANGES") {
            self.listing.exchanges = v
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("MAX_PAGES") {
            self.listing.max_pages = parse_var("MAX_PAGES", &v)?;
        }
        if let Some(v) = get("MAX_TICKERS") {
            self.listing.max_tickers = parse_var("MAX_TICKERS", &v)?;
        }
        if let Some(v) = get("COINGECKO_API_KEY") {
            self.market.api_key = Some(v.trim().to_string());
        }
        if let Some(v) = get("COINGECKO_API_PLAN") {
            self.market.plan = parse_var("COINGECKO_API_PLAN", &v)?;
        }
        if let Some(v) = get("TOKEN_MAP_PATH") {
            self.registry.path = v;
        }
        if let Some(v) = get("OUTPUT_PATH") {
            self.registry.output = Some(v);
        }
        Ok(())
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.eligibility_filter()
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let bounds_finite = self.market.min_mcap.is_finite() && self.market.max_mcap.is_finite();
        if !bounds_finite || self.market.min_mcap < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "market cap bounds must be finite and >= 0, got {}..={}",
                self.market.min_mcap, self.market.max_mcap
            )));
        }

        if self.market.min_mcap > self.market.max_mcap {
            return Err(ConfigError::ValidationError(format!(
                "min_mcap ({}) must be <= max_mcap ({})",
                self.market.min_mcap, self.market.max_mcap
            )));
        }

        if self.listing.exchanges.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one listing exchange is required".to_string(),
            ));
        }

        if self.listing.max_pages == 0 {
            return Err(ConfigError::ValidationError(
                "max_pages must be > 0".to_string(),
            ));
        }

        if self.listing.max_tickers == 0 {
            return Err(ConfigError::ValidationError(
                "max_tickers must be > 0".to_string(),
            ));
        }

        if self.market.max_stubs_per_symbol == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_stubs_per_symbol must be > 0".to_string(),
            ));
        }

        if self.policy.chains.preference.is_empty() || self.policy.chains.platforms.is_empty() {
            return Err(ConfigError::ValidationError(
                "chain catalog needs platforms and a preference order".to_string(),
            ));
        }

        if self.policy.venues.patterns.is_empty() {
            return Err(ConfigError::ValidationError(
                "venue catalog cannot be empty".to_string(),
            ));
        }

        if self.registry.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "registry path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn eligibility_filter(&self) -> EligibilityFilter {
        EligibilityFilter {
            min_age_days: self.filter.min_age_days,
            max_age_days: self.filter.max_age_days,
            min_exchanges: self.filter.min_exchanges,
        }
    }

    pub fn listing_site_config(&self) -> ListingSiteConfig {
        ListingSiteConfig {
            base_url: self.listing.base_url.clone(),
            request_delay: Duration::from_millis(self.listing.request_delay_ms),
            timeout: Duration::from_secs(self.listing.timeout_secs),
            ..Default::default()
        }
    }

    pub fn coingecko_config(&self) -> CoinGeckoConfig {
        CoinGeckoConfig {
            base_url: self
                .market
                .base_url
                .clone()
                .unwrap_or_else(|| self.market.plan.default_base_url().to_string()),
            api_key: self.market.api_key.clone(),
            plan: self.market.plan,
            request_delay: Duration::from_millis(self.market.request_delay_ms),
            timeout: Duration::from_secs(self.market.timeout_secs),
            max_retries: self.market.max_retries,
            retry_base_delay_ms: self.market.retry_base_delay_ms,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            mcap: McapRange {
                min_usd: self.market.min_mcap,
                max_usd: self.market.max_mcap,
            },
            chains: self.policy.chains.clone(),
            venues: self.policy.venues.clone(),
            min_target_venues: self.market.min_target_venues,
            selection: self.policy.selection,
            chain_policy: self.policy.chain,
            max_stubs_per_symbol: self.market.max_stubs_per_symbol,
        }
    }

    pub fn pipeline_settings(&self, dry_run: bool) -> PipelineSettings {
        let filter = self.eligibility_filter();
        PipelineSettings {
            exchanges: self.listing.exchanges.clone(),
            crawl: CrawlConfig {
                max_pages: self.listing.max_pages,
                max_tickers: self.listing.max_tickers,
                max_consecutive_failures: self.listing.max_consecutive_failures,
                window: filter,
            },
            filter,
            dry_run,
        }
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            per_page: self.market.scan_per_page,
            max_pages: self.market.scan_max_pages,
        }
    }

    pub fn registry_store(&self) -> RegistryStore {
        RegistryStore::with_destination(self.registry.source_path(), self.registry.output_path())
    }
}
