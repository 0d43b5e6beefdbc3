//! listing-scout - newly listed token discovery
//!
//! Crawls exchange listing pages, resolves candidates against CoinGecko and
//! appends accepted tokens to the registry file.

use anyhow::Result;
use listing_scout::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (API keys go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::init_logging(app.verbose, app.debug)?;

    cli::execute(app).await
}
