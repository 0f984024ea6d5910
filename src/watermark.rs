//! # Fetch-window planning
//! Pure watermark logic: given the latest date already stored for a source
//! or symbol, decide which `(from, to)` window the next incremental fetch
//! should cover. The watermark is always *read* from the store (max over
//! stored records); it is a fetch-planning hint, never ground truth.

use chrono::{Days, NaiveDate};

/// Default lookback when no news is stored yet for a source.
pub const NEWS_LOOKBACK_DAYS: u64 = 7;

/// Default lookback when no bars are stored yet for a symbol (≈ 5 years).
pub const PRICE_LOOKBACK_DAYS: u64 = 5 * 365;

/// Plan the next incremental fetch window.
///
/// - No prior data: bounded lookback of `lookback_days` ending `today`
///   (never unbounded, to avoid pathological full-history re-pulls).
/// - Prior data: the day after the latest stored date, through `today`.
/// - Returns `None` when the computed start lies after `today` (already
///   up to date, clock skew, or a bad stored date) — a future start date
///   must never be sent upstream.
pub fn plan_fetch_window(
    latest_stored: Option<NaiveDate>,
    today: NaiveDate,
    lookback_days: u64,
) -> Option<(NaiveDate, NaiveDate)> {
    let from = match latest_stored {
        Some(latest) => latest.checked_add_days(Days::new(1))?,
        None => today.checked_sub_days(Days::new(lookback_days))?,
    };

    if from > today {
        return None;
    }
    Some((from, today))
}
