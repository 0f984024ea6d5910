//! # Technical Indicator Engine
//! Rolling trend statistics (SMA over trailing *rows*, not calendar days)
//! and a market-relative risk statistic (beta against one benchmark index).
//!
//! Numeric semantics: insufficient history or a zero-variance benchmark
//! yields `None`, never an error and never a zero-filled estimate. The
//! missing markers propagate into the signal classifier, which treats them
//! as disqualifying.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::store::Bar;

/// Minimum paired daily returns before a beta estimate is considered
/// meaningful; below this it stays undefined rather than noisy.
pub const MIN_BETA_OBSERVATIONS: usize = 20;

pub const SMA_SHORT_WINDOW: usize = 20;
pub const SMA_LONG_WINDOW: usize = 50;

/// Simple moving average over the trailing `window` rows. The first
/// `window - 1` positions are `None`.
pub fn sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; closes.len()];
    }
    let mut out = Vec::with_capacity(closes.len());
    let mut running = 0.0f64;
    for (i, &c) in closes.iter().enumerate() {
        running += c;
        if i >= window {
            running -= closes[i - window];
        }
        if i + 1 >= window {
            out.push(Some(running / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Daily simple returns `close[t] / close[t-1] - 1`, keyed by the later
/// date. Bars must already be ascending by date. Rows with a non-positive
/// previous close are skipped.
pub fn daily_returns(bars: &[Bar]) -> Vec<(NaiveDate, f64)> {
    bars.windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| (w[1].date, w[1].close / w[0].close - 1.0))
        .collect()
}

/// Beta of a symbol's returns against the benchmark's, aligned by date:
/// `Cov(r_sym, r_bench) / Var(r_bench)` over the full aligned history.
///
/// `None` when fewer than [`MIN_BETA_OBSERVATIONS`] dates pair up, or when
/// the benchmark variance is zero.
pub fn beta(
    symbol_returns: &[(NaiveDate, f64)],
    benchmark_returns: &[(NaiveDate, f64)],
) -> Option<f64> {
    let bench: HashMap<NaiveDate, f64> = benchmark_returns.iter().copied().collect();
    let paired: Vec<(f64, f64)> = symbol_returns
        .iter()
        .filter_map(|(d, r)| bench.get(d).map(|b| (*r, *b)))
        .collect();

    if paired.len() < MIN_BETA_OBSERVATIONS {
        return None;
    }

    let n = paired.len() as f64;
    let mean_s = paired.iter().map(|(s, _)| s).sum::<f64>() / n;
    let mean_b = paired.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (s, b) in &paired {
        cov += (s - mean_s) * (b - mean_b);
        var += (b - mean_b) * (b - mean_b);
    }

    if var == 0.0 {
        return None;
    }
    Some(cov / var)
}

/// Per-symbol betas for every symbol in `bars_by_symbol`, computed against
/// `benchmark`. The benchmark's own beta is exactly 1.0 by convention, not
/// computed. Symbols are independent of each other here; only the ordering
/// *within* a series matters.
pub fn betas_by_symbol(
    bars_by_symbol: &HashMap<String, Vec<Bar>>,
    benchmark: &str,
) -> HashMap<String, Option<f64>> {
    let bench_returns = bars_by_symbol
        .get(benchmark)
        .map(|bars| daily_returns(bars))
        .unwrap_or_default();

    bars_by_symbol
        .iter()
        .map(|(symbol, bars)| {
            let b = if symbol == benchmark {
                Some(1.0)
            } else {
                beta(&daily_returns(bars), &bench_returns)
            };
            (symbol.clone(), b)
        })
        .collect()
}
