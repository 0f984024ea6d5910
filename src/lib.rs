// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod enrich;
pub mod pipeline;
pub mod store;
pub mod watermark;

// Ingestion: providers, retry policy, validation, incremental runs
pub mod ingest;

// Analytics: sector aggregation, market join, indicators, signal
pub mod analytics;

// ---- Re-exports for stable public API ----
pub use crate::analytics::signal::Signal;
pub use crate::pipeline::{run, RunSummary};
pub use crate::store::{Store, Upsert};
