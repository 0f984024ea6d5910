//! # Market Bar Store
//! Durable `(symbol, date)`-keyed OHLCV bars. Dates are calendar days; any
//! time-of-day information is discarded at the provider boundary.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::collections::HashMap;

use super::Upsert;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Upsert payload; `close` is the only required price field.
pub type BarUpsert = Bar;

pub struct BarStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BarStore<'a> {
    pub(crate) fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert-if-absent-else-update on `(symbol, date)`. A duplicate key is
    /// never surfaced as an error.
    pub async fn upsert(&self, bar: BarUpsert) -> Result<Upsert> {
        anyhow::ensure!(!bar.symbol.is_empty(), "bar symbol must be non-empty");
        anyhow::ensure!(bar.close.is_finite() && bar.close >= 0.0, "close must be non-negative");

        let inserted = sqlx::query(
            "INSERT INTO market_bars (symbol, date, open, high, low, close, volume) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(symbol, date) DO NOTHING",
        )
        .bind(&bar.symbol)
        .bind(bar.date)
        .bind(bar.open)
        .bind(bar.high)
        .bind(bar.low)
        .bind(bar.close)
        .bind(bar.volume)
        .execute(self.pool)
        .await
        .with_context(|| format!("inserting bar {} {}", bar.symbol, bar.date))?
        .rows_affected();

        if inserted == 1 {
            return Ok(Upsert::Inserted);
        }

        let existing = self
            .get(&bar.symbol, bar.date)
            .await?
            .with_context(|| format!("bar {} {} vanished mid-upsert", bar.symbol, bar.date))?;
        if existing == bar {
            return Ok(Upsert::Unchanged);
        }

        sqlx::query(
            "UPDATE market_bars SET open = ?, high = ?, low = ?, close = ?, volume = ? \
             WHERE symbol = ? AND date = ?",
        )
        .bind(bar.open)
        .bind(bar.high)
        .bind(bar.low)
        .bind(bar.close)
        .bind(bar.volume)
        .bind(&bar.symbol)
        .bind(bar.date)
        .execute(self.pool)
        .await
        .with_context(|| format!("updating bar {} {}", bar.symbol, bar.date))?;

        Ok(Upsert::Updated)
    }

    pub async fn get(&self, symbol: &str, date: NaiveDate) -> Result<Option<Bar>> {
        let bar = sqlx::query_as::<_, Bar>(
            "SELECT * FROM market_bars WHERE symbol = ? AND date = ?",
        )
        .bind(symbol)
        .bind(date)
        .fetch_optional(self.pool)
        .await
        .context("fetching bar")?;
        Ok(bar)
    }

    /// Latest stored date for a symbol (the price watermark).
    pub async fn latest_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let date: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MAX(date) FROM market_bars WHERE symbol = ?")
                .bind(symbol)
                .fetch_one(self.pool)
                .await
                .context("reading price watermark")?;
        Ok(date)
    }

    /// Full series for one symbol, ascending by date (the indicator engine
    /// precondition).
    pub async fn series(&self, symbol: &str) -> Result<Vec<Bar>> {
        let bars = sqlx::query_as::<_, Bar>(
            "SELECT * FROM market_bars WHERE symbol = ? ORDER BY date",
        )
        .bind(symbol)
        .fetch_all(self.pool)
        .await
        .context("loading bar series")?;
        Ok(bars)
    }

    /// All stored series grouped by symbol, each ascending by date.
    pub async fn all_series(&self) -> Result<HashMap<String, Vec<Bar>>> {
        let bars = sqlx::query_as::<_, Bar>("SELECT * FROM market_bars ORDER BY symbol, date")
            .fetch_all(self.pool)
            .await
            .context("loading all bar series")?;

        let mut by_symbol: HashMap<String, Vec<Bar>> = HashMap::new();
        for bar in bars {
            by_symbol.entry(bar.symbol.clone()).or_default().push(bar);
        }
        Ok(by_symbol)
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM market_bars")
            .fetch_one(self.pool)
            .await
            .context("counting bars")?;
        Ok(n)
    }
}
