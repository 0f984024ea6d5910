//! Finnhub general-news adapter. Maps the JSON feed into raw news items
//! and applies the optional market-relevance keyword filter (the feed has
//! no country filter of its own).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::types::{NewsProvider, RawNewsItem};

const API_URL: &str = "https://finnhub.io/api/v1/news";
pub const SOURCE_NAME: &str = "Finnhub";

#[derive(Debug, Deserialize)]
struct FeedItem {
    headline: Option<String>,
    summary: Option<String>,
    url: Option<String>,
    /// Unix seconds.
    datetime: Option<i64>,
}

pub struct FinnhubProvider {
    mode: Mode,
    /// Lower-cased keywords; when non-empty, an item must mention at least
    /// one in its headline or summary to be kept.
    keywords: Vec<String>,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client, api_key: String },
}

impl FinnhubProvider {
    pub fn new(api_key: String, keywords: &[String]) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("sector-scanner/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building finnhub http client")?;
        Ok(Self {
            mode: Mode::Http { client, api_key },
            keywords: lower(keywords),
        })
    }

    /// Parse from a canned JSON body (tests, offline runs).
    pub fn from_fixture(body: &str, keywords: &[String]) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            keywords: lower(keywords),
        }
    }

    fn parse_items(&self, body: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<RawNewsItem>> {
        let items: Vec<FeedItem> = serde_json::from_str(body).context("parsing finnhub feed")?;

        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let published_at = item
                .datetime
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.date_naive());

            // Window filter here; anything undated passes through for
            // validation to reject with the malformed counter.
            if let Some(d) = published_at {
                if d < from || d > to {
                    continue;
                }
            }

            if !self.matches_keywords(&item) {
                continue;
            }

            out.push(RawNewsItem {
                source: SOURCE_NAME.to_string(),
                title: item.headline,
                url: item.url,
                content: item.summary,
                published_at,
            });
        }
        Ok(out)
    }

    fn matches_keywords(&self, item: &FeedItem) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {}",
            item.headline.as_deref().unwrap_or(""),
            item.summary.as_deref().unwrap_or("")
        )
        .to_lowercase();
        self.keywords.iter().any(|k| haystack.contains(k))
    }
}

fn lower(keywords: &[String]) -> Vec<String> {
    keywords.iter().map(|k| k.trim().to_lowercase()).collect()
}

#[async_trait]
impl NewsProvider for FinnhubProvider {
    async fn fetch_window(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<RawNewsItem>> {
        match &self.mode {
            Mode::Fixture(body) => self.parse_items(body, from, to),
            Mode::Http { client, api_key } => {
                let body = client
                    .get(API_URL)
                    .query(&[("category", "general"), ("token", api_key.as_str())])
                    .send()
                    .await
                    .context("finnhub http get")?
                    .error_for_status()
                    .context("finnhub http status")?
                    .text()
                    .await
                    .context("finnhub http body")?;
                self.parse_items(&body, from, to)
            }
        }
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}
