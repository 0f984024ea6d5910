//! # Scanner configuration
//! Loaded from TOML with an env-var path override and serde defaults, so a
//! bare checkout runs against the built-in seed values.
//!
//! Resolution order:
//! 1. `$SCANNER_CONFIG_PATH`
//! 2. `config/scanner.toml`
//! 3. built-in defaults

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analytics::signal::SignalThresholds;
use crate::enrich::EnrichConfig;
use crate::ingest::retry::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "SCANNER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/scanner.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// SQLite database location.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Broad market index used as the beta benchmark.
    #[serde(default = "default_benchmark")]
    pub benchmark_symbol: String,

    /// Optional market-relevance keywords for the news feed filter.
    #[serde(default)]
    pub news_keywords: Vec<String>,

    /// Optional sector map TOML; the built-in seed applies when absent.
    #[serde(default)]
    pub sector_map_path: Option<PathBuf>,

    #[serde(default)]
    pub thresholds: SignalThresholds,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub enrichment: EnrichConfig,
}

fn default_database_url() -> String {
    "sqlite://scanner.db".to_string()
}

fn default_benchmark() -> String {
    "^NSEI".to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        // An empty TOML document materializes every serde default.
        toml::from_str("").expect("defaults deserialize")
    }
}

impl ScannerConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading scanner config from {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to a non-existent path"));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }
}
