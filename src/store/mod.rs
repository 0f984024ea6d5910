// src/store/mod.rs
pub mod articles;
pub mod bars;
pub mod insights;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

pub use articles::{Article, ArticleStore, ArticleUpsert};
pub use bars::{Bar, BarStore, BarUpsert};
pub use insights::{InsightRecord, InsightStore};

/// Outcome of an idempotent upsert against a unique identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

/// Shared SQLite-backed persistence layer. Each sub-store borrows the same
/// pool; every upsert is independently atomic at single-row granularity.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    url                 TEXT PRIMARY KEY,
    title               TEXT NOT NULL DEFAULT '',
    content             TEXT NOT NULL DEFAULT '',
    publication_date    TEXT NOT NULL,
    source              TEXT NOT NULL,
    sentiment_score     REAL,
    companies_mentioned TEXT NOT NULL DEFAULT '[]',
    sectors_mentioned   TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS idx_articles_source_date
    ON articles (source, publication_date);

CREATE TABLE IF NOT EXISTS market_bars (
    symbol TEXT NOT NULL,
    date   TEXT NOT NULL,
    open   REAL,
    high   REAL,
    low    REAL,
    close  REAL NOT NULL,
    volume REAL,
    PRIMARY KEY (symbol, date)
);

CREATE TABLE IF NOT EXISTS insights (
    date               TEXT NOT NULL,
    sector             TEXT NOT NULL,
    symbol             TEXT NOT NULL,
    close              REAL NOT NULL,
    sma_20             REAL,
    sma_50             REAL,
    avg_sentiment      REAL NOT NULL,
    num_articles       INTEGER NOT NULL,
    beta               REAL,
    price_to_sma_ratio REAL,
    signal             TEXT NOT NULL,
    PRIMARY KEY (date, sector)
);
"#;

impl Store {
    /// Open (or create) the database and ensure the schema exists.
    ///
    /// An unreachable store is fatal for the whole run: callers are expected
    /// to propagate this error and abort with the diagnostic, rather than
    /// continue and produce partial output.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url `{database_url}`"))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .with_context(|| format!("connecting to store at `{database_url}`"))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("initializing store schema")?;

        Ok(Self { pool })
    }

    /// In-memory store for tests. Single pinned connection so all queries
    /// share the same memory database.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("opening in-memory store")?;
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("initializing store schema")?;
        Ok(Self { pool })
    }

    pub fn articles(&self) -> ArticleStore<'_> {
        ArticleStore::new(&self.pool)
    }

    pub fn bars(&self) -> BarStore<'_> {
        BarStore::new(&self.pool)
    }

    pub fn insights(&self) -> InsightStore<'_> {
        InsightStore::new(&self.pool)
    }
}
