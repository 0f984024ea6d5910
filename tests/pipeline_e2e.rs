// tests/pipeline_e2e.rs
//
// Whole-pipeline pass over mocked providers and an in-memory store:
// ingest → enrich → aggregate → join → classify → snapshot.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use chrono::NaiveDate;
use sector_scanner::analytics::sectors::SectorMap;
use sector_scanner::config::ScannerConfig;
use sector_scanner::enrich::EnrichmentGateway;
use sector_scanner::ingest::types::{DailyBar, NewsProvider, PriceProvider, RawNewsItem};
use sector_scanner::{pipeline, Signal, Store};

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

struct OneArticleNews;

#[async_trait::async_trait]
impl NewsProvider for OneArticleNews {
    async fn fetch_window(&self, _from: NaiveDate, _to: NaiveDate) -> Result<Vec<RawNewsItem>> {
        Ok(vec![
            RawNewsItem {
                source: "Finnhub".into(),
                title: Some("Tech services demand improves".into()),
                url: Some("https://news.example/tech-demand".into()),
                content: Some(
                    "Software exporters guided for stronger deal wins through the year, \
                     citing a broad recovery in client budgets and a healthy pipeline of \
                     multi-year contracts across regions."
                        .into(),
                ),
                published_at: Some(d("2025-06-02")),
            },
            // Malformed: no URL. Must be counted and skipped, not fatal.
            RawNewsItem {
                source: "Finnhub".into(),
                title: Some("Dropped headline".into()),
                url: None,
                content: None,
                published_at: Some(d("2025-06-02")),
            },
        ])
    }

    fn name(&self) -> &'static str {
        "Finnhub"
    }
}

struct OneDayPrices;

#[async_trait::async_trait]
impl PriceProvider for OneDayPrices {
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        if symbol != "IDX" {
            return Ok(Vec::new()); // no data for the benchmark
        }
        Ok(vec![DailyBar {
            date: d("2025-06-02"),
            open: Some(99.0),
            high: Some(101.0),
            low: Some(98.5),
            close: 100.0,
            volume: Some(10_000.0),
        }])
    }

    fn name(&self) -> &'static str {
        "mock-prices"
    }
}

/// Fixed-answer gateway: every article is 0.7 positive and tagged Tech.
struct FixedGateway;

impl EnrichmentGateway for FixedGateway {
    fn score_sentiment<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<f64>>> + Send + 'a>> {
        Box::pin(async { Ok(Some(0.7)) })
    }

    fn extract_entities<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<(Vec<String>, Vec<String>)>>> + Send + 'a>>
    {
        Box::pin(async { Ok(Some((vec![], vec!["Tech".to_string()]))) })
    }

    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

fn test_config() -> ScannerConfig {
    let mut cfg = ScannerConfig::default();
    cfg.retry.max_attempts = 1;
    cfg.retry.base_delay_ms = 1;
    cfg
}

#[tokio::test]
async fn single_day_run_produces_one_neutral_insight() {
    let store = Store::connect_in_memory().await.unwrap();
    let sectors = SectorMap::from_pairs([("Tech", "IDX")]);
    let news: Vec<Box<dyn NewsProvider>> = vec![Box::new(OneArticleNews)];
    let cfg = test_config();

    let summary = pipeline::run(
        &store,
        &news,
        &OneDayPrices,
        &FixedGateway,
        &sectors,
        &cfg,
        d("2025-06-05"),
    )
    .await
    .unwrap();

    assert_eq!(summary.news.inserted, 1);
    assert_eq!(summary.news.malformed, 1);
    assert_eq!(summary.prices.inserted, 1);
    assert_eq!(summary.enrichment.scored, 1);
    assert_eq!(summary.insight_rows, 1);

    let rows = store.insights().all().await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.date, d("2025-06-02"));
    assert_eq!(row.sector, "Tech");
    assert_eq!(row.close, 100.0);
    assert!((row.avg_sentiment - 0.7).abs() < 1e-12);
    assert_eq!(row.num_articles, 1);
    // One row of history: every indicator stays undefined, so the
    // classifier cannot justify Buy or Sell.
    assert!(row.sma_20.is_none());
    assert!(row.sma_50.is_none());
    assert!(row.beta.is_none());
    assert_eq!(row.signal, Signal::Neutral);
}

#[tokio::test]
async fn second_run_is_idempotent() {
    let store = Store::connect_in_memory().await.unwrap();
    let sectors = SectorMap::from_pairs([("Tech", "IDX")]);
    let news: Vec<Box<dyn NewsProvider>> = vec![Box::new(OneArticleNews)];
    let cfg = test_config();

    pipeline::run(&store, &news, &OneDayPrices, &FixedGateway, &sectors, &cfg, d("2025-06-05"))
        .await
        .unwrap();
    let second = pipeline::run(
        &store,
        &news,
        &OneDayPrices,
        &FixedGateway,
        &sectors,
        &cfg,
        d("2025-06-05"),
    )
    .await
    .unwrap();

    // The news watermark sits at 2025-06-02, so the second run re-fetches
    // the remaining window and the same records land as no-ops.
    assert_eq!(second.news.inserted, 0);
    assert_eq!(second.prices.inserted, 0);
    assert_eq!(store.articles().count().await.unwrap(), 1);
    assert_eq!(store.bars().count().await.unwrap(), 1);
    assert_eq!(store.insights().count().await.unwrap(), 1);
}

struct FailingNews;

#[async_trait::async_trait]
impl NewsProvider for FailingNews {
    async fn fetch_window(&self, _from: NaiveDate, _to: NaiveDate) -> Result<Vec<RawNewsItem>> {
        anyhow::bail!("upstream timed out")
    }

    fn name(&self) -> &'static str {
        "Flaky Wire"
    }
}

#[tokio::test]
async fn failing_news_source_degrades_instead_of_aborting() {
    let store = Store::connect_in_memory().await.unwrap();
    let sectors = SectorMap::from_pairs([("Tech", "IDX")]);
    let news: Vec<Box<dyn NewsProvider>> = vec![Box::new(FailingNews)];
    let cfg = test_config();

    let summary = pipeline::run(
        &store,
        &news,
        &OneDayPrices,
        &FixedGateway,
        &sectors,
        &cfg,
        d("2025-06-05"),
    )
    .await
    .unwrap();

    assert_eq!(summary.news.failed_sources, 1);
    // Price-only day still flows through with the neutral fill.
    assert_eq!(summary.insight_rows, 1);
    let rows = store.insights().all().await.unwrap();
    assert!((rows[0].avg_sentiment - 0.5).abs() < 1e-12);
    assert_eq!(rows[0].num_articles, 0);
}
