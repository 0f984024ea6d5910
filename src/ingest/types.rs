// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDate;

/// A news record as a provider hands it over, before validation. Every
/// field except `source` may be missing or garbage; validation decides
/// per-record whether it becomes an article.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RawNewsItem {
    pub source: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub published_at: Option<NaiveDate>,
}

/// One daily OHLCV point from a price provider. `close` is required; the
/// rest may be absent in degraded feeds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    /// Fetch items published within the window (inclusive). An empty list
    /// is a normal "nothing new" answer, not an error.
    async fn fetch_window(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<RawNewsItem>>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetch daily bars for one symbol within the window (inclusive).
    /// An empty list means no new data exists.
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyBar>>;
    fn name(&self) -> &'static str;
}
