//! Daily-bars adapter over the Yahoo chart JSON API. Time-of-day is
//! discarded at this boundary: each point becomes a calendar-date bar.
//! Null OHLV entries are tolerated (the close is required, the rest may
//! be missing); an empty result set is not an error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::types::{DailyBar, PriceProvider};

const API_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl YahooProvider {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("sector-scanner/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building yahoo http client")?;
        Ok(Self {
            mode: Mode::Http { client },
        })
    }

    /// Parse from a canned JSON body (tests, offline runs).
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    fn parse_bars(body: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyBar>> {
        let resp: ChartResponse = serde_json::from_str(body).context("parsing chart json")?;
        if let Some(err) = resp.chart.error {
            anyhow::bail!("chart api error: {err}");
        }
        let Some(result) = resp.chart.result.and_then(|mut r| r.pop()) else {
            return Ok(Vec::new());
        };
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
                continue;
            };
            if date < from || date > to {
                continue;
            }
            // A point without a close is useless; skip it quietly.
            let Some(close) = at(&quote.close, i) else {
                continue;
            };
            bars.push(DailyBar {
                date,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close,
                volume: at(&quote.volume, i),
            });
        }
        Ok(bars)
    }
}

#[async_trait]
impl PriceProvider for YahooProvider {
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_bars(body, from, to),
            Mode::Http { client } => {
                let period1 = from.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp()).unwrap_or(0);
                // Exclusive upper bound: midnight after `to`.
                let period2 = to
                    .succ_opt()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc().timestamp())
                    .unwrap_or(i64::MAX);
                let url = format!("{API_BASE}/{symbol}");
                let body = client
                    .get(&url)
                    .query(&[
                        ("period1", period1.to_string()),
                        ("period2", period2.to_string()),
                        ("interval", "1d".to_string()),
                    ])
                    .send()
                    .await
                    .context("chart http get")?
                    .error_for_status()
                    .context("chart http status")?
                    .text()
                    .await
                    .context("chart http body")?;
                Self::parse_bars(&body, from, to)
            }
        }
    }

    fn name(&self) -> &'static str {
        "Yahoo"
    }
}
