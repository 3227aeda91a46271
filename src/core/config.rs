use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_AGGREGATOR_URL: &str =
    "https://apiv2.bitcoinaverage.com/indices/global/ticker/short?crypto=BTC";
pub const DEFAULT_TICKER_URL: &str = "https://api.coinmarketcap.com/v1/ticker/dogmcoin/";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_aggregator")]
    pub aggregator: FeedConfig,
    #[serde(default = "default_ticker")]
    pub ticker: FeedConfig,
}

fn default_aggregator() -> FeedConfig {
    FeedConfig {
        url: DEFAULT_AGGREGATOR_URL.to_string(),
    }
}

fn default_ticker() -> FeedConfig {
    FeedConfig {
        url: DEFAULT_TICKER_URL.to_string(),
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            aggregator: default_aggregator(),
            ticker: default_ticker(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 {
    600
}

fn default_fallback_currency() -> String {
    "USD".to_string()
}

fn default_user_agent() -> String {
    format!("coinrates/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_retries() -> usize {
    2
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Seconds before cached rates are refreshed again.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Last resort when neither the requested, preferred nor locale currency has a rate.
    #[serde(default = "default_fallback_currency")]
    pub fallback_currency: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extra attempts on connection failures.
    #[serde(default = "default_request_retries")]
    pub request_retries: usize,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            refresh_interval_secs: default_refresh_interval_secs(),
            fallback_currency: default_fallback_currency(),
            user_agent: default_user_agent(),
            request_retries: default_request_retries(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config at the default location, or defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "coinrates", "coinrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("org", "coinrates", "coinrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn refresh_interval(&self) -> chrono::Duration {
        i64::try_from(self.refresh_interval_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
