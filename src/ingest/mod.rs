// src/ingest/mod.rs
pub mod providers;
pub mod retry;
pub mod types;

use anyhow::Result;
use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::store::{ArticleUpsert, BarUpsert, Store, Upsert};
use crate::watermark::{plan_fetch_window, NEWS_LOOKBACK_DAYS, PRICE_LOOKBACK_DAYS};
use retry::RetryPolicy;
use types::{NewsProvider, PriceProvider, RawNewsItem};

/// One-time metrics registration (so series carry descriptions).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_articles_inserted_total", "New articles stored.");
        describe_counter!("ingest_articles_updated_total", "Existing articles updated.");
        describe_counter!(
            "ingest_articles_unchanged_total",
            "Upserts that were no-ops (idempotent re-ingest)."
        );
        describe_counter!(
            "ingest_malformed_total",
            "Records skipped by validation (missing url/title/date)."
        );
        describe_counter!("ingest_bars_inserted_total", "New market bars stored.");
        describe_counter!(
            "ingest_source_errors_total",
            "Sources that exhausted their retry budget."
        );
        describe_gauge!("ingest_last_run_ts", "Unix ts when ingest last ran.");
    });
}

/// Normalize provider text: decode HTML entities, strip tags, collapse
/// whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 8000 chars (enough for full summaries, bounds the store)
    if out.chars().count() > 8000 {
        out = out.chars().take(8000).collect();
    }
    out
}

/// Validate one raw news record into an upsert payload.
///
/// Missing url, title, or publication date makes the record malformed —
/// skipped and counted, never aborting the batch. A missing body is fine:
/// the article is stored with empty content as a fetch-failure placeholder
/// and enrichment will skip it until content arrives.
pub fn validate_news(raw: RawNewsItem) -> Option<ArticleUpsert> {
    let url = raw.url.as_deref().unwrap_or("").trim().to_string();
    let title = normalize_text(raw.title.as_deref().unwrap_or(""));
    let date = raw.published_at?;
    if url.is_empty() || title.is_empty() {
        return None;
    }
    let content = normalize_text(raw.content.as_deref().unwrap_or(""));
    Some(ArticleUpsert::new(url, title, content, date, raw.source))
}

/// Per-run ingest tallies, for the run summary log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub malformed: usize,
    pub failed_sources: usize,
}

impl IngestCounts {
    fn absorb(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Inserted => self.inserted += 1,
            Upsert::Updated => self.updated += 1,
            Upsert::Unchanged => self.unchanged += 1,
        }
    }
}

/// Incremental news ingest across all providers. Every record funnels
/// through the article store upsert — the sole write path — so dedup
/// stays centralized. A provider that exhausts its retries is skipped;
/// its watermark stays put and the next run re-plans the same window.
pub async fn run_news_ingest(
    store: &Store,
    providers: &[Box<dyn NewsProvider>],
    today: NaiveDate,
    retry: &RetryPolicy,
) -> Result<IngestCounts> {
    ensure_metrics_described();
    let mut counts = IngestCounts::default();

    for provider in providers {
        let latest = store.articles().latest_date_for_source(provider.name()).await?;
        let Some((from, to)) = plan_fetch_window(latest, today, NEWS_LOOKBACK_DAYS) else {
            info!(source = provider.name(), "news already up to date, skipping fetch");
            continue;
        };

        let raw = match retry
            .run(provider.name(), || provider.fetch_window(from, to))
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!(source = provider.name(), error = ?e, "news source failed, window not advanced");
                counter!("ingest_source_errors_total").increment(1);
                counts.failed_sources += 1;
                continue;
            }
        };

        counts.fetched += raw.len();
        for item in raw {
            let Some(payload) = validate_news(item) else {
                counter!("ingest_malformed_total").increment(1);
                counts.malformed += 1;
                continue;
            };
            let outcome = store.articles().upsert(payload).await?;
            match outcome {
                Upsert::Inserted => counter!("ingest_articles_inserted_total").increment(1),
                Upsert::Updated => counter!("ingest_articles_updated_total").increment(1),
                Upsert::Unchanged => counter!("ingest_articles_unchanged_total").increment(1),
            }
            counts.absorb(outcome);
        }
    }

    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
    Ok(counts)
}

/// Incremental price ingest for every symbol in the universe. Watermarks
/// are read per symbol from the store; symbols whose window starts in the
/// future are skipped outright.
pub async fn run_price_ingest(
    store: &Store,
    provider: &dyn PriceProvider,
    symbols: &[String],
    today: NaiveDate,
    retry: &RetryPolicy,
) -> Result<IngestCounts> {
    ensure_metrics_described();
    let mut counts = IngestCounts::default();

    for symbol in symbols {
        let latest = store.bars().latest_date(symbol).await?;
        let Some((from, to)) = plan_fetch_window(latest, today, PRICE_LOOKBACK_DAYS) else {
            info!(symbol, "bars already up to date, skipping fetch");
            continue;
        };

        let bars = match retry
            .run(symbol, || provider.fetch_daily_bars(symbol, from, to))
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol, error = ?e, "price fetch failed, window not advanced");
                counter!("ingest_source_errors_total").increment(1);
                counts.failed_sources += 1;
                continue;
            }
        };

        if bars.is_empty() {
            info!(symbol, %from, %to, "no new bars in window");
            continue;
        }

        counts.fetched += bars.len();
        for bar in bars {
            if !(bar.close.is_finite() && bar.close >= 0.0) {
                counter!("ingest_malformed_total").increment(1);
                counts.malformed += 1;
                continue;
            }
            let outcome = store
                .bars()
                .upsert(BarUpsert {
                    symbol: symbol.clone(),
                    date: bar.date,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                })
                .await?;
            if outcome == Upsert::Inserted {
                counter!("ingest_bars_inserted_total").increment(1);
            }
            counts.absorb(outcome);
        }
    }

    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_markup_and_collapses_ws() {
        let s = "  Rates &amp; growth <b>outlook</b>\n\n improving  ";
        assert_eq!(normalize_text(s), "Rates & growth outlook improving");
    }

    #[test]
    fn validate_rejects_missing_url_or_title() {
        let mut raw = RawNewsItem {
            source: "Finnhub".into(),
            title: Some("Headline".into()),
            url: None,
            content: Some("Body".into()),
            published_at: Some("2025-06-02".parse().unwrap()),
        };
        assert!(validate_news(raw.clone()).is_none());

        raw.url = Some("https://news.example/a".into());
        raw.title = Some("   ".into());
        assert!(validate_news(raw.clone()).is_none());

        raw.title = Some("Headline".into());
        assert!(validate_news(raw).is_some());
    }

    #[test]
    fn validate_keeps_empty_content_as_placeholder() {
        let raw = RawNewsItem {
            source: "Economic Times".into(),
            title: Some("Headline".into()),
            url: Some("https://news.example/b".into()),
            content: None,
            published_at: Some("2025-06-02".parse().unwrap()),
        };
        let payload = validate_news(raw).unwrap();
        assert!(payload.content.is_empty());
        assert!(payload.sentiment_score.is_none());
    }

    #[test]
    fn validate_rejects_missing_date() {
        let raw = RawNewsItem {
            source: "Finnhub".into(),
            title: Some("Headline".into()),
            url: Some("https://news.example/c".into()),
            content: Some("Body".into()),
            published_at: None,
        };
        assert!(validate_news(raw).is_none());
    }
}
