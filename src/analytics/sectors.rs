//! # Sector-Ticker Resolver
//!
//! Static bidirectional mapping between human-readable sector names and
//! the index ticker tracking that sector.
//!
//! - Loads from TOML config (`[tickers]` table: sector name → symbol).
//! - Falls back to a built-in seed of NSE sector indices.
//! - Unmapped tickers/sectors are simply absent — lookups return `None`
//!   and the join drops them, they are never an error.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

#[derive(Debug, Clone)]
pub struct SectorMap {
    ticker_by_sector: HashMap<String, String>,
    sector_by_ticker: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SectorMapFile {
    #[serde(default)]
    tickers: HashMap<String, String>,
}

impl SectorMap {
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut ticker_by_sector = HashMap::new();
        let mut sector_by_ticker = HashMap::new();
        for (sector, ticker) in pairs {
            let sector = sector.into();
            let ticker = ticker.into();
            sector_by_ticker.insert(ticker.clone(), sector.clone());
            ticker_by_sector.insert(sector, ticker);
        }
        Self {
            ticker_by_sector,
            sector_by_ticker,
        }
    }

    /// Load from a TOML file; errors if the file is unreadable or invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading sector map from {}", path.as_ref().display()))?;
        let parsed: SectorMapFile = toml::from_str(&raw).context("parsing sector map toml")?;
        Ok(Self::from_pairs(parsed.tickers))
    }

    /// Built-in seed: the NSE sector indices the scanner has historically
    /// tracked, keyed by the sector names the entity tagger emits.
    pub fn default_seed() -> Self {
        Self::from_pairs([
            ("Banking & Financial Services", "^NSEBANK"),
            ("Information Technology", "^CNXIT"),
            ("Automobile", "^CNXAUTO"),
            ("Healthcare & Pharma", "^CNXPHARM"),
            ("FMCG", "^CNXFMCG"),
            ("Metals & Mining", "^CNXMETAL"),
            ("Media & Entertainment", "^CNXMEDIA"),
            ("Real Estate", "^CNXREALTY"),
        ])
    }

    pub fn ticker_for(&self, sector: &str) -> Option<&str> {
        self.ticker_by_sector.get(sector).map(String::as_str)
    }

    pub fn sector_for(&self, ticker: &str) -> Option<&str> {
        self.sector_by_ticker.get(ticker).map(String::as_str)
    }

    /// All mapped tickers (the fetch universe, excluding the benchmark).
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.sector_by_ticker.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ticker_by_sector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticker_by_sector.is_empty()
    }
}
