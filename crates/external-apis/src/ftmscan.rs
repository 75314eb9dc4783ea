// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! FTMScan API integration
//!
//! Balances and transaction history on Fantom Opera.

use alloy_primitives::{Address, U256};
use api_client::{ApiClient, ApiError, ApiKey, HealthStatus};
use shared_types::{Chain, units::wei_to_ether};

use crate::explorer::{ExplorerClient, ExplorerConfig, LATEST_BLOCK, NormalTx};

/// FTMScan API client
#[derive(Debug, Clone)]
pub struct FtmscanClient {
    explorer: ExplorerClient,
}

impl FtmscanClient {
    /// Create a new FTMScan API client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(config: ExplorerConfig) -> Result<Self, ApiError> {
        Ok(Self {
            explorer: ExplorerClient::new(Chain::Fantom, config)?,
        })
    }

    /// Client for the public endpoint with default settings
    pub fn with_api_key(api_key: ApiKey) -> Result<Self, ApiError> {
        Self::new(ExplorerConfig::for_chain(Chain::Fantom, api_key))
    }

    /// The underlying explorer client
    pub fn explorer(&self) -> &ExplorerClient {
        &self.explorer
    }

    /// Balance of `address` in wei
    pub async fn account_balance_single_address(&self, address: Address) -> Result<U256, ApiError> {
        self.explorer.balance(address).await
    }

    /// Balance of `address` in FTM
    ///
    /// Lossy above 2^53 wei of precision; use
    /// [`FtmscanClient::account_balance_single_address`] for exact amounts.
    pub async fn account_balance_ftm(&self, address: Address) -> Result<f64, ApiError> {
        Ok(wei_to_ether(self.account_balance_single_address(address).await?))
    }

    /// Normal transactions of `address` between two blocks, oldest first
    ///
    /// `None` bounds default to the first block and [`LATEST_BLOCK`].
    pub async fn tx_receipt_list(
        &self,
        address: Address,
        start_block: Option<u64>,
        end_block: Option<u64>,
    ) -> Result<Vec<NormalTx>, ApiError> {
        self.explorer
            .normal_transactions(
                address,
                start_block.unwrap_or(0),
                end_block.unwrap_or(LATEST_BLOCK),
            )
            .await
    }
}

impl ApiClient for FtmscanClient {
    async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        self.explorer.health_status().await
    }

    fn name(&self) -> &'static str {
        "ftmscan"
    }
}
