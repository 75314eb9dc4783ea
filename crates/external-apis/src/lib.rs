// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! External API integrations for crypto market and chain data providers
//!
//! This crate provides implementations of the `ApiClient` trait for block
//! explorers and market data services, along with JSON persistence for results
//! that are cached on disk and a registry reporting on every configured client.
//!
//! # Architecture
//!
//! - **Block explorers**: [`etherscan`], [`ftmscan`] - built on the shared [`explorer`] core
//! - **Market data**: [`coinmarketcap`], [`messari`], [`defillama`]
//! - **Persistence**: [`persist`] - merge results into pretty-printed JSON files
//! - **Registry**: [`registry::ProviderRegistry`] - concurrent health checks
//!
//! # Features
//!
//! - **Retries with backoff**: transport errors and provider rate limits are retried,
//!   including rate limits reported inside a `200 OK` body
//! - **Typed responses**: quantities, addresses and timestamps are parsed at the edge
//! - **Testing Support**: integration tests run against wiremock servers

pub mod coinmarketcap;
pub mod defillama;
pub mod etherscan;
pub mod explorer;
pub mod ftmscan;
pub mod messari;
pub mod persist;
pub mod registry;
mod serde_helpers;

pub use coinmarketcap::{
    CmcCategory, CmcEndpoint, CmcIdMap, CmcPath, CoinMarketCapClient, CoinMarketCapConfig,
};
pub use defillama::{ChainTvl, DefiLlamaClient, DefiLlamaConfig, LlamaEndpoint};
pub use etherscan::{Closest, DailyEthPrice, DailyGasPrice, EthPrice, EtherscanClient, GasOracle};
pub use explorer::{ExplorerClient, ExplorerConfig, EventLog, InternalTx, NormalTx, TxReceipt};
pub use ftmscan::FtmscanClient;
pub use messari::{AssetQuery, MessariClient, MessariConfig};
pub use persist::PersistError;
pub use registry::ProviderRegistry;
