//! # Retry Policy
//! One configurable bounded-retry-with-backoff policy shared by every
//! fetch adapter, instead of ad hoc loops duplicated per source.
//!
//! Exhaustion is reported to the caller; ingestion treats it as "window
//! not advanced" for that source and moves on — never fatal to the batch.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or attempts are exhausted, sleeping with
    /// exponential backoff between attempts. Returns the last error on
    /// exhaustion.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut delay = Duration::from_millis(self.base_delay_ms);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt < attempts {
                        warn!(what, attempt, error = ?e, "fetch failed, retrying");
                        tokio::time::sleep(delay).await;
                        delay = delay.saturating_mul(2);
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.expect("at least one attempt ran"))
    }
}
