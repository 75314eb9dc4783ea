// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command line configuration
//!
//! Sources, later ones overriding earlier ones:
//! 1. Default values
//! 2. Configuration file (`caw.json`, `caw.toml` or `caw.yaml`), or an explicit path
//! 3. Environment variables with the `CAW__` prefix, `__` separating nested keys
//! 4. The conventional key variables, e.g. `ETHERSCAN_API_KEY`

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Result, ensure};
use api_client::{ApiKey, FetchSettings};
use config::{Config, Environment, File};
use external_apis::{
    CoinMarketCapClient, CoinMarketCapConfig, DefiLlamaClient, DefiLlamaConfig, EtherscanClient,
    ExplorerConfig, FtmscanClient, MessariClient, MessariConfig, ProviderRegistry,
};
use serde::{Deserialize, Deserializer, Serialize, de};
use shared_types::Chain;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};

const ENV_PREFIX: &str = "CAW";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_CONFIG_NAME: &str = "caw";
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Conventional key variables and the config fields they set
pub const API_KEY_VARIABLES: [(&str, &str); 4] = [
    ("ETHERSCAN_API_KEY", "etherscan_api_key"),
    ("FTMSCAN_API_KEY", "ftmscan_api_key"),
    ("COINMARKETCAP_API_KEY", "coinmarketcap_api_key"),
    ("MESSARI_API_KEY", "messari_api_key"),
];

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Create a safe default timeout (30 seconds)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(30))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Base URL overrides, mostly for pointing the tool at a proxy or mock
#[derive(Debug, Clone, Default, Deserialize)]
#[allow(missing_docs)]
pub struct Endpoints {
    pub etherscan: Option<String>,
    pub ftmscan: Option<String>,
    pub coinmarketcap: Option<String>,
    pub messari: Option<String>,
    pub defillama: Option<String>,
}

/// Settings shared by every command
#[derive(Debug, Clone, Deserialize)]
pub struct CawConfig {
    /// Etherscan key
    #[serde(default)]
    pub etherscan_api_key: Option<ApiKey>,
    /// FTMScan key
    #[serde(default)]
    pub ftmscan_api_key: Option<ApiKey>,
    /// CoinMarketCap Pro key
    #[serde(default)]
    pub coinmarketcap_api_key: Option<ApiKey>,
    /// Messari key; anonymous access works with a lower rate limit
    #[serde(default)]
    pub messari_api_key: Option<ApiKey>,
    /// Request timeout (validated range: 1-300)
    #[serde(default)]
    pub timeout_seconds: TimeoutSeconds,
    /// Extra attempts after a retryable failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Directory that token info and id maps are merged into
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
    /// Base URL overrides
    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl CawConfig {
    /// Load configuration from the process environment and an optional file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or a value is invalid
    pub fn load(file: Option<&Path>) -> ConfigResult<Self> {
        Self::load_from(std::env::vars().collect(), file)
    }

    /// Load configuration with `vars` standing in for the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or a value is invalid
    pub fn load_from(vars: HashMap<String, String>, file: Option<&Path>) -> ConfigResult<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let mut builder = Config::builder()
            .set_default("timeout_seconds", 30)?
            .set_default("max_retries", i64::from(DEFAULT_MAX_RETRIES))?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            );

        for (variable, field) in API_KEY_VARIABLES {
            if let Some(key) = vars.get(variable).filter(|k| !k.trim().is_empty()) {
                debug!(variable, "using conventional key variable");
                builder = builder.set_override(field, key.as_str())?;
            }
        }

        let config: Self = builder.build()?.try_deserialize()?;
        info!(
            timeout_seconds = config.timeout_seconds.value().as_secs(),
            max_retries = config.max_retries,
            providers_with_keys = config.configured_keys().len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Names of the keyed providers that have a key
    pub fn configured_keys(&self) -> Vec<&'static str> {
        [
            ("etherscan", self.etherscan_api_key.is_some()),
            ("ftmscan", self.ftmscan_api_key.is_some()),
            ("coinmarketcap", self.coinmarketcap_api_key.is_some()),
            ("messari", self.messari_api_key.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    fn fetch_settings(&self, provider_defaults: FetchSettings) -> FetchSettings {
        FetchSettings {
            timeout_seconds: self.timeout_seconds.value().as_secs(),
            max_retries: self.max_retries,
            ..provider_defaults
        }
    }

    fn explorer_config(
        &self,
        chain: Chain,
        key: Option<&ApiKey>,
        variable: &'static str,
        endpoint: Option<&String>,
    ) -> ConfigResult<ExplorerConfig> {
        let key = key.cloned().ok_or(ConfigError::MissingApiKey {
            provider: chain.explorer_name(),
            variable,
        })?;
        let mut config = ExplorerConfig::for_chain(chain, key);
        config.fetch = self.fetch_settings(config.fetch);
        if let Some(url) = endpoint {
            config.base_url.clone_from(url);
        }
        Ok(config)
    }

    /// Etherscan client
    pub fn etherscan(&self) -> ConfigResult<EtherscanClient> {
        let config = self.explorer_config(
            Chain::Ethereum,
            self.etherscan_api_key.as_ref(),
            "ETHERSCAN_API_KEY",
            self.endpoints.etherscan.as_ref(),
        )?;
        EtherscanClient::new(config).map_err(|source| ConfigError::Client {
            provider: "etherscan",
            source,
        })
    }

    /// FTMScan client
    pub fn ftmscan(&self) -> ConfigResult<FtmscanClient> {
        let config = self.explorer_config(
            Chain::Fantom,
            self.ftmscan_api_key.as_ref(),
            "FTMSCAN_API_KEY",
            self.endpoints.ftmscan.as_ref(),
        )?;
        FtmscanClient::new(config).map_err(|source| ConfigError::Client {
            provider: "ftmscan",
            source,
        })
    }

    /// CoinMarketCap client
    pub fn coinmarketcap(&self) -> ConfigResult<CoinMarketCapClient> {
        let key = self
            .coinmarketcap_api_key
            .clone()
            .ok_or(ConfigError::MissingApiKey {
                provider: "coinmarketcap",
                variable: "COINMARKETCAP_API_KEY",
            })?;
        let mut config = CoinMarketCapConfig::new(key);
        config.fetch = self.fetch_settings(config.fetch);
        if let Some(url) = &self.endpoints.coinmarketcap {
            config.base_url.clone_from(url);
        }
        CoinMarketCapClient::new(config).map_err(|source| ConfigError::Client {
            provider: "coinmarketcap",
            source,
        })
    }

    /// Messari client, anonymous when no key is configured
    pub fn messari(&self) -> ConfigResult<MessariClient> {
        let mut config = MessariConfig {
            api_key: self.messari_api_key.clone(),
            ..MessariConfig::default()
        };
        config.fetch = self.fetch_settings(config.fetch);
        if let Some(url) = &self.endpoints.messari {
            config.base_url.clone_from(url);
        }
        MessariClient::new(config).map_err(|source| ConfigError::Client {
            provider: "messari",
            source,
        })
    }

    /// DeFiLlama client
    pub fn defillama(&self) -> ConfigResult<DefiLlamaClient> {
        let mut config = DefiLlamaConfig::default();
        config.fetch = self.fetch_settings(config.fetch);
        if let Some(url) = &self.endpoints.defillama {
            config.base_url.clone_from(url);
        }
        DefiLlamaClient::new(config).map_err(|source| ConfigError::Client {
            provider: "defillama",
            source,
        })
    }

    /// Registry of every provider that can be built from this configuration
    ///
    /// Keyed providers without a key are left out.
    pub fn registry(&self) -> ConfigResult<ProviderRegistry> {
        let mut registry = ProviderRegistry::new()
            .with_messari(self.messari()?)
            .with_defillama(self.defillama()?);
        if self.etherscan_api_key.is_some() {
            registry = registry.with_etherscan(self.etherscan()?);
        }
        if self.ftmscan_api_key.is_some() {
            registry = registry.with_ftmscan(self.ftmscan()?);
        }
        if self.coinmarketcap_api_key.is_some() {
            registry = registry.with_coinmarketcap(self.coinmarketcap()?);
        }
        Ok(registry)
    }
}
