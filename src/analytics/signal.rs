//! # Signal Classifier
//! Pure, total decision rule over sentiment + trend + risk features.
//! All comparisons are strict (`>` / `<`): a row sitting exactly on a
//! threshold is Neutral, never Buy or Sell. Undefined inputs disqualify
//! Buy/Sell instead of raising.

use serde::{Deserialize, Serialize};

use crate::store::InsightRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "Buy",
            Signal::Sell => "Sell",
            Signal::Neutral => "Neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Buy" => Some(Signal::Buy),
            "Sell" => Some(Signal::Sell),
            "Neutral" => Some(Signal::Neutral),
            _ => None,
        }
    }
}

/// Decision-rule constants. These are policy, kept in one tunable struct
/// rather than buried in the rule body; the defaults mirror the historical
/// 0.65/0.35 sentiment cut-offs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// Buy requires avg_sentiment strictly above this.
    #[serde(default = "default_bullish")]
    pub bullish_sentiment: f64,
    /// Sell requires avg_sentiment strictly below this.
    #[serde(default = "default_bearish")]
    pub bearish_sentiment: f64,
    /// When true, Buy additionally requires the risk gate below.
    #[serde(default)]
    pub risk_gate: bool,
    /// Risk gate: beta must be defined and strictly below this ceiling.
    #[serde(default = "default_max_beta")]
    pub max_beta: f64,
    /// Risk gate: close/sma_50 must be defined and strictly below this
    /// ceiling (not overextended).
    #[serde(default = "default_max_ratio")]
    pub max_price_to_sma_ratio: f64,
}

fn default_bullish() -> f64 {
    0.65
}
fn default_bearish() -> f64 {
    0.35
}
fn default_max_beta() -> f64 {
    1.5
}
fn default_max_ratio() -> f64 {
    1.2
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            bullish_sentiment: default_bullish(),
            bearish_sentiment: default_bearish(),
            risk_gate: false,
            max_beta: default_max_beta(),
            max_price_to_sma_ratio: default_max_ratio(),
        }
    }
}

/// Classify one insight row. Pure and total: never panics, and a missing
/// sma_20/sma_50 (or gated beta/ratio) resolves to Neutral.
pub fn classify(row: &InsightRecord, th: &SignalThresholds) -> Signal {
    let (sma_20, sma_50) = match (row.sma_20, row.sma_50) {
        (Some(a), Some(b)) => (a, b),
        _ => return Signal::Neutral,
    };

    let uptrend = row.close > sma_20 && sma_20 > sma_50;
    let downtrend = row.close < sma_20 && sma_20 < sma_50;

    if row.avg_sentiment > th.bullish_sentiment && uptrend && risk_gate_passes(row, th) {
        return Signal::Buy;
    }
    if row.avg_sentiment < th.bearish_sentiment && downtrend {
        return Signal::Sell;
    }
    Signal::Neutral
}

fn risk_gate_passes(row: &InsightRecord, th: &SignalThresholds) -> bool {
    if !th.risk_gate {
        return true;
    }
    // An undefined beta or ratio makes the row ineligible for a gated Buy.
    matches!(row.beta, Some(b) if b < th.max_beta)
        && matches!(row.price_to_sma_ratio, Some(r) if r < th.max_price_to_sma_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        sentiment: f64,
        close: f64,
        sma_20: Option<f64>,
        sma_50: Option<f64>,
    ) -> InsightRecord {
        InsightRecord {
            date: "2025-06-30".parse().unwrap(),
            sector: "Information Technology".into(),
            symbol: "^CNXIT".into(),
            close,
            sma_20,
            sma_50,
            avg_sentiment: sentiment,
            num_articles: 3,
            beta: None,
            price_to_sma_ratio: sma_50.map(|s| close / s),
            signal: Signal::Neutral,
        }
    }

    #[test]
    fn buy_requires_sentiment_and_established_uptrend() {
        let th = SignalThresholds::default();
        let r = row(0.8, 110.0, Some(105.0), Some(100.0));
        assert_eq!(classify(&r, &th), Signal::Buy);
    }

    #[test]
    fn sell_requires_sentiment_and_downtrend() {
        let th = SignalThresholds::default();
        let r = row(0.2, 90.0, Some(95.0), Some(100.0));
        assert_eq!(classify(&r, &th), Signal::Sell);
    }

    #[test]
    fn boundary_values_resolve_neutral() {
        let th = SignalThresholds::default();
        // Exactly at the bullish threshold: strict `>` keeps it Neutral.
        let r = row(0.65, 110.0, Some(105.0), Some(100.0));
        assert_eq!(classify(&r, &th), Signal::Neutral);
        // close == sma_20: no established trend either way.
        let r = row(0.9, 105.0, Some(105.0), Some(100.0));
        assert_eq!(classify(&r, &th), Signal::Neutral);
    }

    #[test]
    fn missing_indicators_disqualify_buy_and_sell() {
        let th = SignalThresholds::default();
        assert_eq!(classify(&row(0.9, 110.0, None, None), &th), Signal::Neutral);
        assert_eq!(classify(&row(0.1, 90.0, Some(95.0), None), &th), Signal::Neutral);
    }

    #[test]
    fn risk_gate_blocks_buy_on_undefined_beta() {
        let th = SignalThresholds {
            risk_gate: true,
            ..SignalThresholds::default()
        };
        let mut r = row(0.8, 110.0, Some(105.0), Some(100.0));
        r.beta = None;
        assert_eq!(classify(&r, &th), Signal::Neutral);

        r.beta = Some(0.9);
        assert_eq!(classify(&r, &th), Signal::Buy);

        r.beta = Some(2.0);
        assert_eq!(classify(&r, &th), Signal::Neutral);
    }

    #[test]
    fn risk_gate_blocks_overextended_buy() {
        let th = SignalThresholds {
            risk_gate: true,
            max_price_to_sma_ratio: 1.05,
            ..SignalThresholds::default()
        };
        let mut r = row(0.8, 110.0, Some(105.0), Some(100.0));
        r.beta = Some(0.9);
        // close/sma_50 = 1.10 >= 1.05 ceiling.
        assert_eq!(classify(&r, &th), Signal::Neutral);
    }

    #[test]
    fn classify_is_deterministic() {
        let th = SignalThresholds::default();
        let r = row(0.8, 110.0, Some(105.0), Some(100.0));
        let first = classify(&r, &th);
        for _ in 0..100 {
            assert_eq!(classify(&r, &th), first);
        }
    }
}
