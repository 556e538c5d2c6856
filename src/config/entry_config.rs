use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::scheduling::types::CadenceIntervals;

/// Settings of one configured brokerage entry, handed to each component that needs them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryConfig {
    /// OAuth client id issued for the app (`<key>@AMER.OAUTHAP`).
    #[serde(default)]
    pub consumer_key: String,

    #[serde(default, deserialize_with = "deserialize_accounts")]
    pub accounts: Vec<String>,

    #[serde(default = "default_asset_class")]
    pub asset_class: String,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Fixed poll interval of the market sensor.
    pub market_interval_secs: u64,

    /// Account poll interval while the regular session is open.
    pub fast_secs: u64,

    /// Account poll interval while the regular session is closed.
    pub slow_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            market_interval_secs: 60,
            fast_secs: 10,
            slow_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tdameritrade.com/v1".to_string(),
            token_url: "https://api.tdameritrade.com/v1/oauth2/token".to_string(),
        }
    }
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            accounts: Vec::new(),
            asset_class: default_asset_class(),
            polling: PollingConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl EntryConfig {
    /// Reads the YAML file when it exists, then applies `TDA_CONSUMER_KEY` / `TDA_ACCOUNTS`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Self::from_yaml(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults and environment");
            Self::default()
        };

        config.apply_overrides(
            env::var("TDA_CONSUMER_KEY").ok(),
            env::var("TDA_ACCOUNTS").ok(),
        );

        config.validate().context("config validation failed")?;

        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str::<Self>(raw)?)
    }

    pub fn apply_overrides(&mut self, consumer_key: Option<String>, accounts: Option<String>) {
        if let Some(consumer_key) = consumer_key.filter(|key| !key.trim().is_empty()) {
            self.consumer_key = consumer_key.trim().to_string();
        }
        if let Some(accounts) = accounts {
            self.accounts = split_accounts(&accounts);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.consumer_key.trim().is_empty() {
            bail!("consumer_key must be set (config file or TDA_CONSUMER_KEY)");
        }
        if self.asset_class.trim().is_empty() {
            bail!("asset_class must not be empty");
        }
        if self.polling.market_interval_secs == 0 {
            bail!("polling.market_interval_secs must be > 0");
        }
        if self.polling.fast_secs == 0 || self.polling.slow_secs == 0 {
            bail!("polling.fast_secs and polling.slow_secs must be > 0");
        }
        if self.polling.fast_secs > self.polling.slow_secs {
            bail!("polling.fast_secs must not exceed polling.slow_secs");
        }
        if self.accounts.iter().any(|account| account.trim().is_empty()) {
            bail!("account ids must not be empty");
        }
        Ok(())
    }

    pub fn market_interval(&self) -> Duration {
        Duration::from_secs(self.polling.market_interval_secs)
    }

    pub fn cadence_intervals(&self) -> CadenceIntervals {
        CadenceIntervals::new(
            Duration::from_secs(self.polling.fast_secs),
            Duration::from_secs(self.polling.slow_secs),
        )
    }
}

fn default_asset_class() -> String {
    "EQUITY".to_string()
}

/// `"123, 456,,"` -> `["123", "456"]`.
pub fn split_accounts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|account| !account.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_accounts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Accounts {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Option::<Accounts>::deserialize(deserializer)? {
        Some(Accounts::List(list)) => list
            .iter()
            .flat_map(|entry| split_accounts(entry))
            .collect(),
        Some(Accounts::Csv(raw)) => split_accounts(&raw),
        None => Vec::new(),
    })
}
