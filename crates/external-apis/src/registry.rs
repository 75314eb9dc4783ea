// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Registry of configured provider clients
//!
//! Each provider is optional; the registry only reports on the clients it was
//! given.

use std::{collections::BTreeMap, time::Instant};

use api_client::{ApiClient, HealthCheckResult, HealthStatus};
use tracing::{debug, warn};

use crate::{CoinMarketCapClient, DefiLlamaClient, EtherscanClient, FtmscanClient, MessariClient};

/// Registry holding one optional client per provider
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    etherscan: Option<EtherscanClient>,
    ftmscan: Option<FtmscanClient>,
    coinmarketcap: Option<CoinMarketCapClient>,
    messari: Option<MessariClient>,
    defillama: Option<DefiLlamaClient>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an Etherscan client
    #[must_use]
    pub fn with_etherscan(mut self, client: EtherscanClient) -> Self {
        self.etherscan = Some(client);
        self
    }

    /// Register an FTMScan client
    #[must_use]
    pub fn with_ftmscan(mut self, client: FtmscanClient) -> Self {
        self.ftmscan = Some(client);
        self
    }

    /// Register a CoinMarketCap client
    #[must_use]
    pub fn with_coinmarketcap(mut self, client: CoinMarketCapClient) -> Self {
        self.coinmarketcap = Some(client);
        self
    }

    /// Register a Messari client
    #[must_use]
    pub fn with_messari(mut self, client: MessariClient) -> Self {
        self.messari = Some(client);
        self
    }

    /// Register a DeFiLlama client
    #[must_use]
    pub fn with_defillama(mut self, client: DefiLlamaClient) -> Self {
        self.defillama = Some(client);
        self
    }

    /// The Etherscan client, if registered
    pub fn etherscan(&self) -> Option<&EtherscanClient> {
        self.etherscan.as_ref()
    }

    /// The FTMScan client, if registered
    pub fn ftmscan(&self) -> Option<&FtmscanClient> {
        self.ftmscan.as_ref()
    }

    /// The CoinMarketCap client, if registered
    pub fn coinmarketcap(&self) -> Option<&CoinMarketCapClient> {
        self.coinmarketcap.as_ref()
    }

    /// The Messari client, if registered
    pub fn messari(&self) -> Option<&MessariClient> {
        self.messari.as_ref()
    }

    /// The DeFiLlama client, if registered
    pub fn defillama(&self) -> Option<&DefiLlamaClient> {
        self.defillama.as_ref()
    }

    /// Health of every registered client, keyed by client name
    ///
    /// Health checks are performed concurrently. A failed check is reported as
    /// [`HealthStatus::Down`].
    pub async fn overall_health(&self) -> BTreeMap<&'static str, HealthCheckResult> {
        let (etherscan, ftmscan, coinmarketcap, messari, defillama) = tokio::join!(
            check(self.etherscan.as_ref()),
            check(self.ftmscan.as_ref()),
            check(self.coinmarketcap.as_ref()),
            check(self.messari.as_ref()),
            check(self.defillama.as_ref()),
        );

        [etherscan, ftmscan, coinmarketcap, messari, defillama]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Get the number of registered clients
    pub fn client_count(&self) -> usize {
        self.client_names().len()
    }

    /// Get the names of all registered clients
    pub fn client_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if let Some(client) = &self.etherscan {
            names.push(client.name());
        }
        if let Some(client) = &self.ftmscan {
            names.push(client.name());
        }
        if let Some(client) = &self.coinmarketcap {
            names.push(client.name());
        }
        if let Some(client) = &self.messari {
            names.push(client.name());
        }
        if let Some(client) = &self.defillama {
            names.push(client.name());
        }
        names
    }
}

async fn check<C: ApiClient>(client: Option<&C>) -> Option<(&'static str, HealthCheckResult)> {
    let client = client?;
    let started = Instant::now();
    let status = match client.health_check().await {
        Ok(status) => status,
        Err(e) => {
            warn!("Health check failed for {} client: {}", client.name(), e);
            HealthStatus::Down {
                reason: format!("Health check failed: {e}"),
            }
        }
    };
    let elapsed = started.elapsed();
    debug!(client = client.name(), ?status, ?elapsed, "health check finished");
    Some((client.name(), HealthCheckResult::new(status, elapsed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefiLlamaConfig;

    #[tokio::test]
    async fn registry_creation() {
        let registry = ProviderRegistry::new();
        assert_eq!(registry.client_count(), 0);
        assert!(registry.client_names().is_empty());
        assert!(registry.overall_health().await.is_empty());
    }

    #[test]
    fn names_follow_registration() {
        let registry = ProviderRegistry::new()
            .with_defillama(DefiLlamaClient::new(DefiLlamaConfig::default()).unwrap());
        assert_eq!(registry.client_count(), 1);
        assert_eq!(registry.client_names(), ["defillama"]);
        assert!(registry.defillama().is_some());
        assert!(registry.etherscan().is_none());
    }
}
