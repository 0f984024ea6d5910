//! # Market-Sentiment Joiner
//! Merges daily sector sentiment with market bars on `(date, sector)`,
//! resolving each bar's symbol through the sector map.
//!
//! Two policies exist because historical runs of this pipeline did both;
//! `LeftMarket` (every trading day kept, missing sentiment filled neutral)
//! is the default, since the rolling windows downstream need unbroken
//! daily series. `Inner` silently breaks SMA windows across sentiment-gap
//! days and is retained for comparison only.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::aggregate::SectorSentiment;
use super::sectors::SectorMap;
use crate::store::Bar;

/// Sentiment assumed for a trading day with no news at all (LeftMarket only).
pub const NEUTRAL_SENTIMENT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Keep only `(date, sector)` pairs present on both sides.
    Inner,
    /// Keep every trading day for every mapped symbol; days without news
    /// get `NEUTRAL_SENTIMENT` and a zero article count.
    #[default]
    LeftMarket,
}

/// A joined row, pre-indicator stage.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub date: NaiveDate,
    pub sector: String,
    pub symbol: String,
    pub close: f64,
    pub avg_sentiment: f64,
    pub num_articles: u32,
}

/// Join sentiment summaries with bar series. Bars whose symbol has no
/// sector mapping are dropped, not errored. Output is grouped per symbol
/// in the input's ascending-date order.
pub fn join_market_sentiment(
    summaries: &[SectorSentiment],
    bars_by_symbol: &HashMap<String, Vec<Bar>>,
    sectors: &SectorMap,
    policy: JoinPolicy,
) -> Vec<JoinedRow> {
    let mut by_key: HashMap<(NaiveDate, &str), &SectorSentiment> = HashMap::new();
    for s in summaries {
        by_key.insert((s.date, s.sector.as_str()), s);
    }

    let mut symbols: Vec<&String> = bars_by_symbol.keys().collect();
    symbols.sort();

    let mut rows = Vec::new();
    for symbol in symbols {
        let sector = match sectors.sector_for(symbol) {
            Some(s) => s,
            None => continue,
        };
        for bar in &bars_by_symbol[symbol] {
            let summary = by_key.get(&(bar.date, sector));
            let (avg_sentiment, num_articles) = match (summary, policy) {
                (Some(s), _) => (s.avg_sentiment, s.num_articles),
                (None, JoinPolicy::LeftMarket) => (NEUTRAL_SENTIMENT, 0),
                (None, JoinPolicy::Inner) => continue,
            };
            rows.push(JoinedRow {
                date: bar.date,
                sector: sector.to_string(),
                symbol: symbol.clone(),
                close: bar.close,
                avg_sentiment,
                num_articles,
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(symbol: &str, date: &str, close: f64) -> Bar {
        Bar {
            symbol: symbol.into(),
            date: date.parse().unwrap(),
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    fn summary(date: &str, sector: &str, avg: f64, n: u32) -> SectorSentiment {
        SectorSentiment {
            date: date.parse().unwrap(),
            sector: sector.into(),
            avg_sentiment: avg,
            num_articles: n,
        }
    }

    fn map() -> SectorMap {
        SectorMap::from_pairs([("Tech", "IDX")])
    }

    #[test]
    fn left_join_fills_quiet_days_with_neutral() {
        let bars = HashMap::from([(
            "IDX".to_string(),
            vec![bar("IDX", "2025-06-02", 100.0), bar("IDX", "2025-06-03", 101.0)],
        )]);
        let summaries = vec![summary("2025-06-02", "Tech", 0.7, 2)];

        let rows = join_market_sentiment(&summaries, &bars, &map(), JoinPolicy::LeftMarket);
        assert_eq!(rows.len(), 2);
        assert!((rows[0].avg_sentiment - 0.7).abs() < 1e-12);
        assert_eq!(rows[0].num_articles, 2);
        assert!((rows[1].avg_sentiment - NEUTRAL_SENTIMENT).abs() < 1e-12);
        assert_eq!(rows[1].num_articles, 0);
    }

    #[test]
    fn inner_join_drops_price_only_days() {
        let bars = HashMap::from([(
            "IDX".to_string(),
            vec![bar("IDX", "2025-06-02", 100.0), bar("IDX", "2025-06-03", 101.0)],
        )]);
        let summaries = vec![summary("2025-06-03", "Tech", 0.4, 1)];

        let rows = join_market_sentiment(&summaries, &bars, &map(), JoinPolicy::Inner);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "2025-06-03".parse().unwrap());
    }

    #[test]
    fn unmapped_symbols_are_dropped_silently() {
        let bars = HashMap::from([(
            "^NOBODY".to_string(),
            vec![bar("^NOBODY", "2025-06-02", 100.0)],
        )]);
        let rows = join_market_sentiment(&[], &bars, &map(), JoinPolicy::LeftMarket);
        assert!(rows.is_empty());
    }

    #[test]
    fn sentiment_without_bars_never_creates_rows() {
        let bars = HashMap::new();
        let summaries = vec![summary("2025-06-02", "Tech", 0.9, 5)];
        let rows = join_market_sentiment(&summaries, &bars, &map(), JoinPolicy::LeftMarket);
        assert!(rows.is_empty());
    }
}
