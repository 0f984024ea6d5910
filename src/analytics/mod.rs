// src/analytics/mod.rs
pub mod aggregate;
pub mod indicators;
pub mod join;
pub mod sectors;
pub mod signal;

use std::collections::HashMap;

use crate::store::{Article, Bar, InsightRecord};
use aggregate::aggregate_sentiment;
use indicators::{betas_by_symbol, sma, SMA_LONG_WINDOW, SMA_SHORT_WINDOW};
use join::{join_market_sentiment, JoinPolicy};
use sectors::SectorMap;
use signal::{classify, SignalThresholds};

/// The full in-memory analytics pass: aggregate → join → indicators →
/// classify. Pure over already-fetched data, so the whole stage is
/// end-to-end testable without a store.
///
/// `bars_by_symbol` series must be ascending by date (the store guarantees
/// this); SMA windows run over each symbol's joined rows, which under the
/// default left-join policy is its unbroken trading-day series.
pub fn generate_insights(
    articles: &[Article],
    bars_by_symbol: &HashMap<String, Vec<Bar>>,
    sectors: &SectorMap,
    policy: JoinPolicy,
    thresholds: &SignalThresholds,
    benchmark: &str,
) -> Vec<InsightRecord> {
    let summaries = aggregate_sentiment(articles);
    let rows = join_market_sentiment(&summaries, bars_by_symbol, sectors, policy);
    let betas = betas_by_symbol(bars_by_symbol, benchmark);

    // Rows arrive grouped per symbol in ascending date order.
    let mut records = Vec::with_capacity(rows.len());
    let mut i = 0;
    while i < rows.len() {
        let symbol = rows[i].symbol.clone();
        let mut j = i;
        while j < rows.len() && rows[j].symbol == symbol {
            j += 1;
        }
        let group = &rows[i..j];

        let closes: Vec<f64> = group.iter().map(|r| r.close).collect();
        let sma_20 = sma(&closes, SMA_SHORT_WINDOW);
        let sma_50 = sma(&closes, SMA_LONG_WINDOW);
        let beta = betas.get(&symbol).copied().flatten();

        for (k, row) in group.iter().enumerate() {
            let price_to_sma_ratio = sma_50[k].filter(|s| *s > 0.0).map(|s| row.close / s);
            let mut record = InsightRecord {
                date: row.date,
                sector: row.sector.clone(),
                symbol: row.symbol.clone(),
                close: row.close,
                sma_20: sma_20[k],
                sma_50: sma_50[k],
                avg_sentiment: row.avg_sentiment,
                num_articles: row.num_articles,
                beta,
                price_to_sma_ratio,
                signal: signal::Signal::Neutral,
            };
            record.signal = classify(&record, thresholds);
            records.push(record);
        }
        i = j;
    }
    records
}
