//! Configuration management for wfm-oracle
//!
//! Loads defaults, optional config files and `WFM__*` environment variables.

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::oracle::OraclePreset;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub fetch: FetchConfig,
    pub oracle: OracleConfig,
    pub matcher: MatcherConfig,
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// API base URL
    pub api_url: String,
    /// Public site URL, used for profile and item links
    pub site_url: String,
    /// Platform header (pc, ps4, xbox, switch)
    pub platform: String,
    /// Language header
    pub language: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Maximum requests in flight during a refresh
    pub workers: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Extra attempts after a throttled or failed request
    pub max_retries: usize,
    /// Upper bound of the random back-off between attempts
    pub retry_jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Preset name used when a command does not pick one
    pub preset: String,
    /// Window length for the custom quote column
    pub hours: u32,
    /// Share of the expanded window kept by the custom quote column
    pub ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
    /// Options shown after ranking
    pub best_n: usize,
    /// Hide options that only cover one good
    pub ignore_single_item_sellers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    /// Enable CSV export
    pub csv_enabled: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Market defaults
            .set_default("market.api_url", "https://api.warframe.market")?
            .set_default("market.site_url", crate::types::DEFAULT_SITE_URL)?
            .set_default("market.platform", "pc")?
            .set_default("market.language", "en")?
            .set_default(
                "market.user_agent",
                concat!("wfm-oracle/", env!("CARGO_PKG_VERSION")),
            )?
            // Fetch defaults
            .set_default("fetch.workers", 5)?
            .set_default("fetch.timeout_secs", 30)?
            .set_default("fetch.max_retries", 8)?
            .set_default("fetch.retry_jitter_ms", 3000)?
            // Oracle defaults
            .set_default("oracle.preset", OraclePreset::default().name())?
            .set_default("oracle.hours", 48)?
            .set_default("oracle.ratio", 0.3)?
            // Matcher defaults
            .set_default("matcher.best_n", 10)?
            .set_default("matcher.ignore_single_item_sellers", false)?
            // Persistence defaults
            .set_default("persistence.data_dir", "./data")?
            .set_default("persistence.csv_enabled", true)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (WFM__*)
            .add_source(Environment::with_prefix("WFM").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// The configured oracle preset
    pub fn oracle_preset(&self) -> Result<OraclePreset> {
        OraclePreset::from_name(&self.oracle.preset)
            .ok_or_else(|| anyhow!("Unknown oracle preset '{}'", self.oracle.preset))
    }

    /// Generate a one-line digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "api={} platform={} workers={} preset={} best_n={} csv={}",
            self.market.api_url,
            self.market.platform,
            self.fetch.workers,
            self.oracle.preset,
            self.matcher.best_n,
            self.persistence.csv_enabled
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults() {
        let cfg = AppConfig::load().unwrap();
        assert!(cfg.fetch.workers >= 1);
        assert!(!cfg.market.api_url.is_empty());
        assert!(cfg.digest().contains("platform="));
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let mut cfg = AppConfig::load().unwrap();
        cfg.oracle.preset = "median_of_everything".to_string();
        assert!(cfg.oracle_preset().is_err());

        cfg.oracle.preset = "cur_lowest_price".to_string();
        assert_eq!(cfg.oracle_preset().unwrap(), OraclePreset::CurrentLowestSell);
    }
}
