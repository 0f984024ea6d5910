//! # Batch pipeline
//! One scheduled pass: concurrent fetch stages → enrichment backfill →
//! in-memory analytics → snapshot replace. The store's upserts are the
//! only synchronization point between the fetch tasks.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use metrics::gauge;
use tracing::info;

use crate::analytics::{generate_insights, join::JoinPolicy, sectors::SectorMap};
use crate::config::ScannerConfig;
use crate::enrich::{self, EnrichCounts, EnrichmentGateway};
use crate::ingest::{
    self,
    types::{NewsProvider, PriceProvider},
    IngestCounts,
};
use crate::store::Store;

/// What one run did, stage by stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub news: IngestCounts,
    pub prices: IngestCounts,
    pub enrichment: EnrichCounts,
    pub insight_rows: usize,
}

/// Execute one full batch pass for `today`.
///
/// Fetch failures degrade (counted, watermark unchanged); an unavailable
/// store aborts with an error before the insight snapshot is touched, so
/// downstream readers keep the previous valid snapshot.
pub async fn run(
    store: &Store,
    news_providers: &[Box<dyn NewsProvider>],
    price_provider: &dyn PriceProvider,
    gateway: &dyn EnrichmentGateway,
    sectors: &SectorMap,
    cfg: &ScannerConfig,
    today: NaiveDate,
) -> Result<RunSummary> {
    let mut universe: Vec<String> = sectors.tickers().map(String::from).collect();
    universe.sort();
    if !universe.contains(&cfg.benchmark_symbol) {
        universe.push(cfg.benchmark_symbol.clone());
    }

    // News and price ingestion are independent; run them concurrently.
    let (news, prices) = tokio::join!(
        ingest::run_news_ingest(store, news_providers, today, &cfg.retry),
        ingest::run_price_ingest(store, price_provider, &universe, today, &cfg.retry),
    );
    let news = news.context("news ingest stage")?;
    let prices = prices.context("price ingest stage")?;

    let enrichment = enrich::backfill(store, gateway)
        .await
        .context("enrichment stage")?;

    let articles = store.articles().scored().await?;
    let bars_by_symbol = store.bars().all_series().await?;

    let records = generate_insights(
        &articles,
        &bars_by_symbol,
        sectors,
        JoinPolicy::default(),
        &cfg.thresholds,
        &cfg.benchmark_symbol,
    );

    let insight_rows = store
        .insights()
        .replace(&records)
        .await
        .context("insight snapshot replace")?;

    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
    info!(
        news_fetched = news.fetched,
        news_inserted = news.inserted,
        bars_fetched = prices.fetched,
        bars_inserted = prices.inserted,
        scored = enrichment.scored,
        tagged = enrichment.tagged,
        insight_rows,
        "pipeline run finished"
    );

    Ok(RunSummary {
        news,
        prices,
        enrichment,
        insight_rows,
    })
}
