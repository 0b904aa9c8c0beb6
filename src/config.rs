//! Environment-based configuration.
//!
//! Every field has a default so the engine runs with an empty environment;
//! unit conversion factors are deliberately configuration rather than code
//! constants, since the published figures are approximate.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::instrument::ConversionTable;

const ENV_FACTOR_PREFIX: &str = "CONVERSION_FACTOR_";

#[derive(Debug, Clone)]
pub struct Config {
    /// Consolidated historical dataset CSV.
    pub dataset_path: PathBuf,
    /// Base URL of the chart-style quote endpoint.
    pub feed_base_url: String,
    /// Per-instrument fetch timeout. Bounds the whole refresh: fetches run
    /// concurrently, so the aggregate wait is one timeout, not one per
    /// instrument.
    pub feed_timeout_ms: u64,
    /// How many calendar days of closes to request per instrument.
    pub feed_lookback_days: u32,
    /// Factor overrides collected from `CONVERSION_FACTOR_<INSTRUMENT>`.
    pub conversion_overrides: HashMap<String, f64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dataset_path = PathBuf::from(env_or(
            "DATASET_PATH",
            "data/processed/dataset_consolidado.csv",
        ));
        let feed_base_url = env_or("FEED_BASE_URL", "https://query1.finance.yahoo.com");
        let feed_timeout_ms = env_or("FEED_TIMEOUT_MS", "4000")
            .parse::<u64>()
            .context("Invalid FEED_TIMEOUT_MS")?;
        let feed_lookback_days = env_or("FEED_LOOKBACK_DAYS", "7")
            .parse::<u32>()
            .context("Invalid FEED_LOOKBACK_DAYS")?;

        let mut conversion_overrides = HashMap::new();
        for (key, value) in env::vars() {
            if let Some(name) = key.strip_prefix(ENV_FACTOR_PREFIX) {
                let factor = value
                    .parse::<f64>()
                    .with_context(|| format!("Invalid {}", key))?;
                conversion_overrides.insert(name.to_lowercase(), factor);
            }
        }

        Ok(Self {
            dataset_path,
            feed_base_url,
            feed_timeout_ms,
            feed_lookback_days,
            conversion_overrides,
        })
    }

    /// Default conversion table with the environment overrides applied.
    pub fn conversion_table(&self) -> ConversionTable {
        let mut table = ConversionTable::default();
        for (name, factor) in &self.conversion_overrides {
            table.set(name.clone(), *factor);
        }
        table
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
