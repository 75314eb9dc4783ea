// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Transaction gas accounting

use alloy_primitives::{B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::units::wei_to_ether;

/// Gas usage and price of a single transaction, in wei
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasInfo {
    /// Gas units consumed by the transaction
    pub gas_used: U256,
    /// Effective gas price paid per unit, in wei
    pub gas_price_wei: U256,
    /// Hash of the transaction
    pub tx_hash: B256,
    /// ETH price in USD, when known
    pub eth_price_usd: Option<f64>,
    /// Time the transaction was mined, when known
    pub timestamp: Option<DateTime<Utc>>,
}

impl GasInfo {
    /// Create gas info without price or time context
    pub fn new(gas_used: U256, gas_price_wei: U256, tx_hash: B256) -> Self {
        Self {
            gas_used,
            gas_price_wei,
            tx_hash,
            eth_price_usd: None,
            timestamp: None,
        }
    }

    /// Attach an ETH/USD price
    #[must_use]
    pub fn with_eth_price(mut self, eth_price_usd: f64) -> Self {
        self.eth_price_usd = Some(eth_price_usd);
        self
    }

    /// Attach the mining time
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Total fee in wei
    pub fn tx_gas_cost_wei(&self) -> U256 {
        self.gas_price_wei.saturating_mul(self.gas_used)
    }

    /// Total fee in ether
    pub fn tx_gas_cost_eth(&self) -> f64 {
        wei_to_ether(self.tx_gas_cost_wei())
    }

    /// Total fee in USD, if an ETH price is attached
    pub fn tx_gas_cost_usd(&self) -> Option<f64> {
        self.eth_price_usd.map(|price| price * self.tx_gas_cost_eth())
    }
}
