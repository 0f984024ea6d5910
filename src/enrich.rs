//! # Enrichment Gateway
//! Thin interface to the external scoring capability: text → sentiment in
//! [0,1], text → (companies, sectors). The models behind it live in a
//! separate service; this side holds no global mutable state — a gateway
//! is built once at startup and injected into the pipeline.
//!
//! Backfill annotates stored articles that lack scores/tags. Articles with
//! too little content are skipped outright (they stay unenriched and are
//! excluded from aggregation), never guessed at.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::counter;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::Store;

/// Minimum content length for sentiment scoring.
pub const MIN_SENTIMENT_CHARS: usize = 50;
/// Minimum content length for entity/sector extraction.
pub const MIN_ENTITY_CHARS: usize = 100;

/// External scoring capability. `None` means "unavailable for this text"
/// (too short, model declined) and is not an error; `Err` is a transport
/// failure worth logging.
pub trait EnrichmentGateway: Send + Sync {
    fn score_sentiment<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<f64>>> + Send + 'a>>;

    #[allow(clippy::type_complexity)]
    fn extract_entities<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<(Vec<String>, Vec<String>)>>> + Send + 'a>>;

    fn provider_name(&self) -> &'static str;
}

/// Gateway configuration (part of the scanner config file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the scoring service, e.g. "http://127.0.0.1:8750".
    pub base_url: Option<String>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
        }
    }
}

/// Factory: build a gateway from config. Disabled (or misconfigured)
/// setups get an inert gateway so the pipeline still runs end to end.
pub fn build_gateway(cfg: &EnrichConfig) -> Box<dyn EnrichmentGateway> {
    if !cfg.enabled {
        return Box::new(DisabledGateway);
    }
    match &cfg.base_url {
        Some(url) => match HttpGateway::new(url.clone()) {
            Ok(g) => Box::new(g),
            Err(e) => {
                warn!(error = ?e, "enrichment http client failed to build, running disabled");
                Box::new(DisabledGateway)
            }
        },
        None => {
            warn!("enrichment enabled but no base_url configured, running disabled");
            Box::new(DisabledGateway)
        }
    }
}

/// Inert gateway: everything is "unavailable".
pub struct DisabledGateway;

impl EnrichmentGateway for DisabledGateway {
    fn score_sentiment<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<f64>>> + Send + 'a>> {
        Box::pin(async { Ok(None) })
    }

    fn extract_entities<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<(Vec<String>, Vec<String>)>>> + Send + 'a>> {
        Box::pin(async { Ok(None) })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Remote scoring service over HTTP. Expects `POST /sentiment {"text"}`
/// returning `{"positive": 0.0..1.0}` and `POST /entities {"text"}`
/// returning `{"companies": [...], "sectors": [...]}`. Sector tags are
/// supplemented with the local keyword table either way.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct TextReq<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct SentimentResp {
    positive: f64,
}

#[derive(Deserialize, Default)]
struct EntitiesResp {
    #[serde(default)]
    companies: Vec<String>,
    #[serde(default)]
    sectors: Vec<String>,
}

impl HttpGateway {
    pub fn new(base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("sector-scanner/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building enrichment http client")?;
        Ok(Self { http, base_url })
    }
}

impl EnrichmentGateway for HttpGateway {
    fn score_sentiment<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<f64>>> + Send + 'a>> {
        Box::pin(async move {
            if text.chars().count() < MIN_SENTIMENT_CHARS {
                return Ok(None);
            }
            let resp: SentimentResp = self
                .http
                .post(format!("{}/sentiment", self.base_url))
                .json(&TextReq { text })
                .send()
                .await
                .context("sentiment http post")?
                .error_for_status()
                .context("sentiment http status")?
                .json()
                .await
                .context("sentiment http body")?;

            if !(0.0..=1.0).contains(&resp.positive) {
                warn!(score = resp.positive, "sentiment service returned out-of-range score");
                return Ok(None);
            }
            Ok(Some(resp.positive))
        })
    }

    fn extract_entities<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<(Vec<String>, Vec<String>)>>> + Send + 'a>> {
        Box::pin(async move {
            if text.chars().count() < MIN_ENTITY_CHARS {
                return Ok(None);
            }
            let resp: EntitiesResp = self
                .http
                .post(format!("{}/entities", self.base_url))
                .json(&TextReq { text })
                .send()
                .await
                .context("entities http post")?
                .error_for_status()
                .context("entities http status")?
                .json()
                .await
                .context("entities http body")?;

            let mut sectors = resp.sectors;
            for s in keyword_sectors(text) {
                if !sectors.contains(&s) {
                    sectors.push(s);
                }
            }
            Ok(Some((resp.companies, sectors)))
        })
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

/// Keyword → sector name table. Cheap local inference used alongside the
/// remote tagger; matching is case-insensitive substring on the article
/// body.
static SECTOR_KEYWORDS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("bank", "Banking & Financial Services"),
        ("finance", "Banking & Financial Services"),
        ("nbfc", "Banking & Financial Services"),
        ("software", "Information Technology"),
        ("tech", "Information Technology"),
        ("infosys", "Information Technology"),
        ("wipro", "Information Technology"),
        ("pharma", "Healthcare & Pharma"),
        ("healthcare", "Healthcare & Pharma"),
        ("hospital", "Healthcare & Pharma"),
        ("energy", "Energy"),
        ("oil", "Energy"),
        ("gas", "Energy"),
        ("auto", "Automobile"),
        ("automobile", "Automobile"),
        ("telecom", "Telecommunication"),
        ("infra", "Infrastructure"),
        ("construction", "Infrastructure"),
        ("cement", "Infrastructure"),
        ("metal", "Metals & Mining"),
        ("steel", "Metals & Mining"),
        ("mining", "Metals & Mining"),
        ("fmcg", "FMCG"),
        ("consumer", "FMCG"),
        ("real estate", "Real Estate"),
        ("property", "Real Estate"),
        ("media", "Media & Entertainment"),
        ("entertainment", "Media & Entertainment"),
        ("chemical", "Chemicals"),
        ("textile", "Textiles"),
        ("logistics", "Logistics"),
    ]
});

/// Infer sector names from keyword mentions. Deduplicated, input order of
/// the table preserved.
pub fn keyword_sectors(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for (keyword, sector) in SECTOR_KEYWORDS.iter() {
        if lower.contains(keyword) && !out.iter().any(|s| s == sector) {
            out.push(sector.to_string());
        }
    }
    out
}

/// Backfill tallies for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichCounts {
    pub scored: usize,
    pub tagged: usize,
    pub skipped_short: usize,
    pub unavailable: usize,
    pub failed: usize,
}

/// Annotate stored articles that lack sentiment scores or entity tags.
/// Transport failures are logged and counted per article; they never
/// abort the pass.
pub async fn backfill(store: &Store, gateway: &dyn EnrichmentGateway) -> Result<EnrichCounts> {
    let mut counts = EnrichCounts::default();

    for article in store.articles().missing_sentiment().await? {
        if article.content.chars().count() < MIN_SENTIMENT_CHARS {
            counts.skipped_short += 1;
            continue;
        }
        match gateway.score_sentiment(&article.content).await {
            Ok(Some(score)) => {
                store.articles().set_sentiment(&article.url, score).await?;
                counter!("enrich_scored_total").increment(1);
                counts.scored += 1;
            }
            Ok(None) => counts.unavailable += 1,
            Err(e) => {
                warn!(url = %article.url, error = ?e, "sentiment scoring failed");
                counter!("enrich_errors_total").increment(1);
                counts.failed += 1;
            }
        }
    }

    for article in store.articles().missing_entities().await? {
        if article.content.chars().count() < MIN_ENTITY_CHARS {
            counts.skipped_short += 1;
            continue;
        }
        match gateway.extract_entities(&article.content).await {
            Ok(Some((companies, sectors))) => {
                if store
                    .articles()
                    .set_entities(&article.url, &companies, &sectors)
                    .await?
                {
                    counter!("enrich_tagged_total").increment(1);
                    counts.tagged += 1;
                }
            }
            Ok(None) => counts.unavailable += 1,
            Err(e) => {
                warn!(url = %article.url, error = ?e, "entity extraction failed");
                counter!("enrich_errors_total").increment(1);
                counts.failed += 1;
            }
        }
    }

    info!(
        scored = counts.scored,
        tagged = counts.tagged,
        skipped_short = counts.skipped_short,
        unavailable = counts.unavailable,
        failed = counts.failed,
        provider = gateway.provider_name(),
        "enrichment backfill finished"
    );
    Ok(counts)
}
