// src/ingest/providers/mod.rs
pub mod finnhub;
pub mod yahoo;
