//! # Article Store
//! Durable, URL-keyed collection of news documents with idempotent upsert
//! semantics. This is the sole write path for every ingestion adapter, so
//! deduplication lives here once instead of per source.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;

use super::Upsert;

/// A stored news document. `sentiment_score` and the mention lists start
/// unset and are backfilled later by the enrichment gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub content: String,
    pub publication_date: NaiveDate,
    pub source: String,
    pub sentiment_score: Option<f64>,
    pub companies_mentioned: Vec<String>,
    pub sectors_mentioned: Vec<String>,
}

/// Upsert payload. Empty `title`/`content` and unset enrichment fields are
/// treated as "not supplied" and never clobber stored values.
#[derive(Debug, Clone)]
pub struct ArticleUpsert {
    pub url: String,
    pub title: String,
    pub content: String,
    pub publication_date: NaiveDate,
    pub source: String,
    pub sentiment_score: Option<f64>,
    pub companies_mentioned: Vec<String>,
    pub sectors_mentioned: Vec<String>,
}

impl ArticleUpsert {
    /// Ingestion payload with enrichment fields at their defaults.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        publication_date: NaiveDate,
        source: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            publication_date,
            source: source.into(),
            sentiment_score: None,
            companies_mentioned: Vec::new(),
            sectors_mentioned: Vec::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ArticleRow {
    url: String,
    title: String,
    content: String,
    publication_date: NaiveDate,
    source: String,
    sentiment_score: Option<f64>,
    companies_mentioned: String,
    sectors_mentioned: String,
}

impl ArticleRow {
    fn into_article(self) -> Article {
        Article {
            url: self.url,
            title: self.title,
            content: self.content,
            publication_date: self.publication_date,
            source: self.source,
            sentiment_score: self.sentiment_score,
            companies_mentioned: decode_list(&self.companies_mentioned),
            sectors_mentioned: decode_list(&self.sectors_mentioned),
        }
    }
}

fn decode_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

pub struct ArticleStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ArticleStore<'a> {
    pub(crate) fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert-if-absent-else-update, keyed by `url`.
    ///
    /// A same-key race with a concurrent insert is not an error: the losing
    /// insert falls through to the update path and merges instead.
    pub async fn upsert(&self, payload: ArticleUpsert) -> Result<Upsert> {
        anyhow::ensure!(!payload.url.is_empty(), "article url must be non-empty");

        let inserted = sqlx::query(
            "INSERT INTO articles \
             (url, title, content, publication_date, source, sentiment_score, \
              companies_mentioned, sectors_mentioned) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(url) DO NOTHING",
        )
        .bind(&payload.url)
        .bind(&payload.title)
        .bind(&payload.content)
        .bind(payload.publication_date)
        .bind(&payload.source)
        .bind(payload.sentiment_score)
        .bind(encode_list(&payload.companies_mentioned))
        .bind(encode_list(&payload.sectors_mentioned))
        .execute(self.pool)
        .await
        .with_context(|| format!("inserting article {}", payload.url))?
        .rows_affected();

        if inserted == 1 {
            return Ok(Upsert::Inserted);
        }

        // Already present: merge, preserving fields the payload did not supply.
        let existing = self
            .get(&payload.url)
            .await?
            .with_context(|| format!("article {} vanished mid-upsert", payload.url))?;

        let merged = merge(&existing, &payload);
        if merged == existing {
            return Ok(Upsert::Unchanged);
        }

        sqlx::query(
            "UPDATE articles SET title = ?, content = ?, publication_date = ?, \
             source = ?, sentiment_score = ?, companies_mentioned = ?, \
             sectors_mentioned = ? WHERE url = ?",
        )
        .bind(&merged.title)
        .bind(&merged.content)
        .bind(merged.publication_date)
        .bind(&merged.source)
        .bind(merged.sentiment_score)
        .bind(encode_list(&merged.companies_mentioned))
        .bind(encode_list(&merged.sectors_mentioned))
        .bind(&merged.url)
        .execute(self.pool)
        .await
        .with_context(|| format!("updating article {}", merged.url))?;

        Ok(Upsert::Updated)
    }

    pub async fn get(&self, url: &str) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>("SELECT * FROM articles WHERE url = ?")
            .bind(url)
            .fetch_optional(self.pool)
            .await
            .context("fetching article by url")?;
        Ok(row.map(ArticleRow::into_article))
    }

    /// Latest publication date stored for a source (the news watermark).
    pub async fn latest_date_for_source(&self, source: &str) -> Result<Option<NaiveDate>> {
        let date: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT MAX(publication_date) FROM articles WHERE source = ?",
        )
        .bind(source)
        .fetch_one(self.pool)
        .await
        .context("reading news watermark")?;
        Ok(date)
    }

    /// Newest articles for a source, descending by publication date.
    pub async fn recent_by_source(&self, source: &str, limit: u32) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            "SELECT * FROM articles WHERE source = ? \
             ORDER BY publication_date DESC, url LIMIT ?",
        )
        .bind(source)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await
        .context("listing recent articles by source")?;
        Ok(rows.into_iter().map(ArticleRow::into_article).collect())
    }

    /// Articles still lacking a sentiment score.
    pub async fn missing_sentiment(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            "SELECT * FROM articles WHERE sentiment_score IS NULL ORDER BY url",
        )
        .fetch_all(self.pool)
        .await
        .context("listing articles missing sentiment")?;
        Ok(rows.into_iter().map(ArticleRow::into_article).collect())
    }

    /// Articles still lacking company or sector tags.
    pub async fn missing_entities(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            "SELECT * FROM articles \
             WHERE companies_mentioned = '[]' OR sectors_mentioned = '[]' \
             ORDER BY url",
        )
        .fetch_all(self.pool)
        .await
        .context("listing articles missing entities")?;
        Ok(rows.into_iter().map(ArticleRow::into_article).collect())
    }

    /// Articles with a sentiment score — the aggregation input.
    pub async fn scored(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            "SELECT * FROM articles WHERE sentiment_score IS NOT NULL \
             ORDER BY publication_date, url",
        )
        .fetch_all(self.pool)
        .await
        .context("listing scored articles")?;
        Ok(rows.into_iter().map(ArticleRow::into_article).collect())
    }

    /// Enrichment write-back: sentiment only, other fields untouched.
    pub async fn set_sentiment(&self, url: &str, score: f64) -> Result<bool> {
        let n = sqlx::query("UPDATE articles SET sentiment_score = ? WHERE url = ?")
            .bind(score)
            .bind(url)
            .execute(self.pool)
            .await
            .context("writing sentiment score")?
            .rows_affected();
        Ok(n > 0)
    }

    /// Enrichment write-back: entity/sector tags. Empty lists are "nothing
    /// found" and leave the stored value alone.
    pub async fn set_entities(
        &self,
        url: &str,
        companies: &[String],
        sectors: &[String],
    ) -> Result<bool> {
        if companies.is_empty() && sectors.is_empty() {
            return Ok(false);
        }
        let n = sqlx::query(
            "UPDATE articles SET \
             companies_mentioned = CASE WHEN ? = '[]' THEN companies_mentioned ELSE ? END, \
             sectors_mentioned   = CASE WHEN ? = '[]' THEN sectors_mentioned   ELSE ? END \
             WHERE url = ?",
        )
        .bind(encode_list(companies))
        .bind(encode_list(companies))
        .bind(encode_list(sectors))
        .bind(encode_list(sectors))
        .bind(url)
        .execute(self.pool)
        .await
        .context("writing entity tags")?
        .rows_affected();
        Ok(n > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self.pool)
            .await
            .context("counting articles")?;
        Ok(n)
    }
}

/// Merge an upsert payload over a stored article. Partial-update semantics:
/// an enrichment-only caller must not clobber `title`/`content` with empty
/// values, and a re-ingest without enrichment must not erase earlier scores.
fn merge(existing: &Article, payload: &ArticleUpsert) -> Article {
    Article {
        url: existing.url.clone(),
        title: if payload.title.is_empty() {
            existing.title.clone()
        } else {
            payload.title.clone()
        },
        content: if payload.content.is_empty() {
            existing.content.clone()
        } else {
            payload.content.clone()
        },
        publication_date: payload.publication_date,
        source: payload.source.clone(),
        sentiment_score: payload.sentiment_score.or(existing.sentiment_score),
        companies_mentioned: if payload.companies_mentioned.is_empty() {
            existing.companies_mentioned.clone()
        } else {
            payload.companies_mentioned.clone()
        },
        sectors_mentioned: if payload.sectors_mentioned.is_empty() {
            existing.sectors_mentioned.clone()
        } else {
            payload.sectors_mentioned.clone()
        },
    }
}
