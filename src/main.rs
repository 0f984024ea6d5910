//! Sector Scanner — Batch Entrypoint
//! One scheduled pass: incremental news/price ingest, enrichment backfill,
//! analytics, and insight snapshot replace. Run it from cron or a CI
//! schedule; there is no long-lived server component.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sector_scanner::analytics::sectors::SectorMap;
use sector_scanner::config::ScannerConfig;
use sector_scanner::enrich;
use sector_scanner::ingest::providers::{finnhub::FinnhubProvider, yahoo::YahooProvider};
use sector_scanner::ingest::types::NewsProvider;
use sector_scanner::{pipeline, Store};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sector_scanner=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = ScannerConfig::load_default().context("loading scanner config")?;

    let sectors = match &cfg.sector_map_path {
        Some(path) => SectorMap::load_from_file(path).context("loading sector map")?,
        None => SectorMap::default_seed(),
    };

    // Store unavailable is fatal: abort with the diagnostic rather than
    // produce a partial run.
    let store = Store::connect(&cfg.database_url).await?;

    let finnhub_key = std::env::var("FINNHUB_API_KEY").unwrap_or_default();
    let news_providers: Vec<Box<dyn NewsProvider>> = if finnhub_key.is_empty() {
        tracing::warn!("FINNHUB_API_KEY not set, running without news sources");
        Vec::new()
    } else {
        vec![Box::new(FinnhubProvider::new(finnhub_key, &cfg.news_keywords)?)]
    };

    let price_provider = YahooProvider::new()?;
    let gateway = enrich::build_gateway(&cfg.enrichment);

    let today = chrono::Utc::now().date_naive();
    let summary = pipeline::run(
        &store,
        &news_providers,
        &price_provider,
        gateway.as_ref(),
        &sectors,
        &cfg,
        today,
    )
    .await?;

    tracing::info!(?summary, "scan complete");
    Ok(())
}
