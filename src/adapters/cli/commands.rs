//! CLI Command Handlers
//!
//! Implementation of all CLI commands for listing-scout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::coingecko::CoinGeckoClient;
use crate::adapters::listing_site::ListingSiteClient;
use crate::application::{CandidateResolver, DiscoveryPipeline, PipelineReport};
use crate::config::{expand_path, load_config, Config};
use crate::domain::RegistryStore;

/// listing-scout - Discover newly listed tokens and keep a token registry
#[derive(Parser, Debug)]
#[command(
    name = "listing-scout",
    version = env!("CARGO_PKG_VERSION"),
    about = "Discover newly listed tokens and reconcile them into a token registry",
    long_about = "listing-scout crawls exchange listing pages, filters candidates by listing age \
                  and exchange coverage, resolves them against CoinGecko by market cap, chain \
                  and venue coverage, and appends new tokens to a deduplicated registry file."
)]
pub struct CliApp {
    /// The command to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl listings, resolve candidates and update the registry
    Run(RunCmd),

    /// Discover by walking CoinGecko markets in descending market cap
    Scan(ScanCmd),

    /// Load and validate the registry file
    Check(CheckCmd),
}

/// Options shared by commands that update the registry
#[derive(Args, Debug, Default, Clone)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Registry file to load
    #[arg(short, long, value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Where to write the updated registry (defaults to --registry)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Run everything but do not write the registry
    #[arg(long)]
    pub dry_run: bool,
}

/// Market-cap scan
#[derive(Args, Debug, Default, Clone)]
pub struct ScanCmd {
    #[command(flatten)]
    pub run: RunCmd,

    /// Override the number of markets pages to walk
    #[arg(long, value_name = "PAGES")]
    pub max_pages: Option<u32>,
}

/// Registry check
#[derive(Args, Debug, Default, Clone)]
pub struct CheckCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Registry file to check
    #[arg(short, long, value_name = "FILE")]
    pub registry: Option<PathBuf>,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    match app.command.unwrap_or_else(|| Command::Run(RunCmd::default())) {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Scan(cmd) => scan_command(cmd).await,
        Command::Check(cmd) => check_command(cmd),
    }
}

/// Initialize logging system
///
/// `RUST_LOG` wins over the flags when set.
pub fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load config and apply CLI overrides on top of file and environment
fn resolve_config(config: Option<&PathBuf>, registry: Option<&PathBuf>, output: Option<&PathBuf>) -> Result<Config> {
    let mut cfg = load_config(config.map(PathBuf::as_path)).context("Failed to load configuration")?;

    if let Some(path) = registry {
        cfg.registry.path = path.to_string_lossy().into_owned();
    }
    if let Some(path) = output {
        cfg.registry.output = Some(path.to_string_lossy().into_owned());
    }
    cfg.validate().context("Invalid configuration")?;
    Ok(cfg)
}

fn build_pipeline(cfg: &Config, dry_run: bool) -> Result<DiscoveryPipeline> {
    let listing = ListingSiteClient::new(cfg.listing_site_config())
        .context("Failed to create listing site client")?;
    let coingecko = CoinGeckoClient::new(cfg.coingecko_config())
        .context("Failed to create CoinGecko client")?;

    if cfg.market.api_key.is_none() {
        tracing::warn!("No COINGECKO_API_KEY set, using the keyless rate limit");
    }

    let resolver = CandidateResolver::new(Arc::new(coingecko), cfg.resolver_config());
    let pipeline = DiscoveryPipeline::new(
        Arc::new(listing),
        resolver,
        cfg.registry_store(),
        cfg.pipeline_settings(dry_run),
    )?;
    Ok(pipeline)
}

/// Handle run command
async fn run_command(cmd: RunCmd) -> Result<()> {
    let cfg = resolve_config(cmd.config.as_ref(), cmd.registry.as_ref(), cmd.output.as_ref())?;
    tracing::info!(
        "Crawling {} via {} into {}",
        cfg.listing.exchanges.join(","),
        cfg.listing.base_url,
        cfg.registry.output_path().display()
    );

    let pipeline = build_pipeline(&cfg, cmd.dry_run)?;
    let report = pipeline.run().await.context("Discovery run failed")?;
    print_report("Discovery", &report, pipeline.store());
    Ok(())
}

/// Handle scan command
async fn scan_command(cmd: ScanCmd) -> Result<()> {
    let mut cfg = resolve_config(cmd.run.config.as_ref(), cmd.run.registry.as_ref(), cmd.run.output.as_ref())?;
    if let Some(pages) = cmd.max_pages {
        cfg.market.scan_max_pages = pages;
    }

    let pipeline = build_pipeline(&cfg, cmd.run.dry_run)?;
    let report = pipeline
        .run_scan(&cfg.scan_config())
        .await
        .context("Market scan failed")?;
    print_report("Market scan", &report, pipeline.store());
    Ok(())
}

/// Handle check command
fn check_command(cmd: CheckCmd) -> Result<()> {
    let cfg = resolve_config(cmd.config.as_ref(), cmd.registry.as_ref(), None)?;
    let path = match cmd.registry {
        Some(path) => expand_path(&path.to_string_lossy()),
        None => cfg.registry.source_path(),
    };
    check_registry(&path)
}

/// Load a registry file and fail on duplicate identity keys
fn check_registry(path: &Path) -> Result<()> {
    let registry = RegistryStore::new(path)
        .load()
        .with_context(|| format!("Registry {} is not usable", path.display()))?;

    println!("Registry: {}", path.display());
    println!("  Entries: {}", registry.len());

    let duplicates = registry.duplicate_keys();
    if !duplicates.is_empty() {
        for key in &duplicates {
            println!("  Duplicate: {} {}", key.chain, key.address);
        }
        bail!("{} duplicate identity keys in {}", duplicates.len(), path.display());
    }

    println!("  Duplicates: none");
    Ok(())
}

fn print_report(title: &str, report: &PipelineReport, store: &RegistryStore) {
    println!("{} summary", title);
    println!("  Listings:           {}", report.listings);
    println!("  Dropped rows:       {}", report.dropped_rows);
    println!("  Candidates:         {}", report.candidates);
    println!("  Passed filters:     {}", report.eligible);
    println!("  Resolved:           {}", report.resolved);
    println!("  Lookup failures:    {}", report.lookup_failures);
    println!("  Added:              {}", report.added);
    println!("  Already registered: {}", report.duplicates_skipped);
    println!("  Registry total:     {}", report.total);
    if report.persisted {
        println!("  Written to:         {}", store.destination().display());
    } else {
        println!("  Dry run, nothing written");
    }
}
