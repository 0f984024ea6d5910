//! # Sector Aggregator
//! Groups scored articles by `(publication_date, sector)` and produces the
//! daily sentiment summary per sector.
//!
//! An article tagged with several sectors contributes its full score to
//! *every* one of them (fan-out, not an exclusive partition). Articles
//! without a score are excluded here, never treated as neutral — the
//! neutral fill happens only at the join stage for days with no news.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::store::Article;

/// Daily sentiment summary for one sector. Derived and ephemeral; it is
/// recomputed each run and only persists folded into insight rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorSentiment {
    pub date: NaiveDate,
    pub sector: String,
    pub avg_sentiment: f64,
    pub num_articles: u32,
}

/// Aggregate scored articles into per-(date, sector) summaries, ordered by
/// date then sector.
pub fn aggregate_sentiment(articles: &[Article]) -> Vec<SectorSentiment> {
    // (sum, count) per key; BTreeMap gives a stable output order.
    let mut acc: BTreeMap<(NaiveDate, String), (f64, u32)> = BTreeMap::new();

    for article in articles {
        let score = match article.sentiment_score {
            Some(s) => s,
            None => continue,
        };
        for sector in &article.sectors_mentioned {
            let entry = acc
                .entry((article.publication_date, sector.clone()))
                .or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    acc.into_iter()
        .map(|((date, sector), (sum, n))| SectorSentiment {
            date,
            sector,
            avg_sentiment: sum / f64::from(n),
            num_articles: n,
        })
        .collect()
}
