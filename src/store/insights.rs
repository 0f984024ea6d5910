//! # Insight Store
//! Replaceable snapshot of the latest computed insight rows. This is a
//! materialized view, not an append log: every analytics run clears the
//! collection and bulk-inserts the new set inside one transaction, so a
//! failed run leaves the previous snapshot intact.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::warn;

use crate::analytics::signal::Signal;

/// One derived row per `(date, sector)`. Undefined analytics stay `None`
/// rather than being zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRecord {
    pub date: NaiveDate,
    pub sector: String,
    pub symbol: String,
    pub close: f64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub avg_sentiment: f64,
    pub num_articles: u32,
    pub beta: Option<f64>,
    pub price_to_sma_ratio: Option<f64>,
    pub signal: Signal,
}

impl InsightRecord {
    /// Downstream consumers expect `avg_sentiment` in [0,1] and a finite
    /// close; anything else is a malformed row.
    fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.sector.is_empty() {
            return Err("empty sector");
        }
        if !self.close.is_finite() || self.close < 0.0 {
            return Err("close not a non-negative finite number");
        }
        if !(0.0..=1.0).contains(&self.avg_sentiment) {
            return Err("avg_sentiment outside [0,1]");
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InsightRow {
    date: NaiveDate,
    sector: String,
    symbol: String,
    close: f64,
    sma_20: Option<f64>,
    sma_50: Option<f64>,
    avg_sentiment: f64,
    num_articles: i64,
    beta: Option<f64>,
    price_to_sma_ratio: Option<f64>,
    signal: String,
}

impl InsightRow {
    fn into_record(self) -> Result<InsightRecord> {
        let signal = Signal::parse(&self.signal)
            .with_context(|| format!("unknown signal literal `{}` in store", self.signal))?;
        Ok(InsightRecord {
            date: self.date,
            sector: self.sector,
            symbol: self.symbol,
            close: self.close,
            sma_20: self.sma_20,
            sma_50: self.sma_50,
            avg_sentiment: self.avg_sentiment,
            num_articles: self.num_articles.max(0) as u32,
            beta: self.beta,
            price_to_sma_ratio: self.price_to_sma_ratio,
            signal,
        })
    }
}

pub struct InsightStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InsightStore<'a> {
    pub(crate) fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Full snapshot replace: drop all prior rows, bulk-insert the new set.
    ///
    /// Malformed rows are skipped and logged (best-effort) so one bad record
    /// cannot blank the whole snapshot; the delete + inserts commit together,
    /// so readers never observe a partially replaced collection.
    pub async fn replace(&self, records: &[InsightRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("opening replace transaction")?;

        sqlx::query("DELETE FROM insights")
            .execute(&mut *tx)
            .await
            .context("clearing prior insights")?;

        let mut inserted = 0usize;
        let mut skipped = 0usize;
        for rec in records {
            if let Err(why) = rec.validate() {
                warn!(sector = %rec.sector, date = %rec.date, why, "skipping malformed insight row");
                skipped += 1;
                continue;
            }
            let n = sqlx::query(
                "INSERT INTO insights \
                 (date, sector, symbol, close, sma_20, sma_50, avg_sentiment, \
                  num_articles, beta, price_to_sma_ratio, signal) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(date, sector) DO NOTHING",
            )
            .bind(rec.date)
            .bind(&rec.sector)
            .bind(&rec.symbol)
            .bind(rec.close)
            .bind(rec.sma_20)
            .bind(rec.sma_50)
            .bind(rec.avg_sentiment)
            .bind(rec.num_articles as i64)
            .bind(rec.beta)
            .bind(rec.price_to_sma_ratio)
            .bind(rec.signal.as_str())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("inserting insight {} {}", rec.sector, rec.date))?
            .rows_affected();
            inserted += n as usize;
        }

        tx.commit().await.context("committing insight snapshot")?;

        if skipped > 0 {
            warn!(skipped, inserted, "insight snapshot replaced with skips");
        }
        Ok(inserted)
    }

    /// Rows for one sector within a date range, ascending by date.
    pub async fn query(
        &self,
        sector: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<InsightRecord>> {
        let rows = sqlx::query_as::<_, InsightRow>(
            "SELECT * FROM insights WHERE sector = ? AND date >= ? AND date <= ? ORDER BY date",
        )
        .bind(sector)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await
        .context("querying insights")?;
        rows.into_iter().map(InsightRow::into_record).collect()
    }

    /// The whole snapshot, ascending by sector then date.
    pub async fn all(&self) -> Result<Vec<InsightRecord>> {
        let rows =
            sqlx::query_as::<_, InsightRow>("SELECT * FROM insights ORDER BY sector, date")
                .fetch_all(self.pool)
                .await
                .context("loading insight snapshot")?;
        rows.into_iter().map(InsightRow::into_record).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM insights")
            .fetch_one(self.pool)
            .await
            .context("counting insights")?;
        Ok(n)
    }
}
