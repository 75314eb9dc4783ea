// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command line arguments

use std::path::PathBuf;

use alloy_primitives::{Address, B256};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use external_apis::Closest;

/// Query crypto market and chain data providers
#[derive(Debug, Parser)]
#[clap(name = "caw", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file; defaults to caw.{json,toml,yaml} in the working directory
    #[clap(short, long, env = "CAW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory that token info and id maps are merged into
    #[clap(long, global = true)]
    pub save_dir: Option<PathBuf>,

    /// The provider to query
    #[clap(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check every configured provider
    Health,
    /// Etherscan (Ethereum mainnet explorer)
    #[clap(subcommand)]
    Etherscan(EtherscanCommand),
    /// FTMScan (Fantom Opera explorer)
    #[clap(subcommand)]
    Ftmscan(FtmscanCommand),
    /// CoinMarketCap
    #[clap(subcommand)]
    Cmc(CmcCommand),
    /// Messari
    #[clap(subcommand)]
    Messari(MessariCommand),
    /// DeFiLlama
    #[clap(subcommand)]
    Llama(LlamaCommand),
}

/// Inclusive date range; open ends are unbounded
#[derive(Debug, Clone, clap::Args)]
pub struct DateRange {
    /// First day, YYYY-MM-DD
    #[clap(long)]
    pub start: Option<NaiveDate>,
    /// Last day, YYYY-MM-DD
    #[clap(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
#[allow(missing_docs)]
pub enum EtherscanCommand {
    /// Transaction receipt
    Receipt { tx_hash: B256 },
    /// Gas used and fee of a transaction
    GasInfo {
        tx_hash: B256,
        /// Also price the fee in USD at the current ETH price
        #[clap(long)]
        usd: bool,
    },
    /// Token metadata by contract address
    TokenInfo {
        #[clap(required = true)]
        token_ids: Vec<String>,
    },
    /// Verified contract ABI
    Abi { address: Address },
    /// Transactions of an address, oldest first
    Txs {
        address: Address,
        /// Internal transactions instead of normal ones
        #[clap(long, conflicts_with = "decode")]
        internal: bool,
        /// Decode call input with the called contract's ABI
        #[clap(long)]
        decode: bool,
    },
    /// Event logs of a contract filtered by topic 0
    Logs {
        address: Address,
        topic0: B256,
        /// Decode logs with the contract's ABI
        #[clap(long)]
        decode: bool,
    },
    /// Block mined closest to a unix timestamp
    BlockByTime {
        timestamp: u64,
        #[clap(long, default_value = "before")]
        closest: Closest,
    },
    /// Current gas price suggestions
    GasOracle,
    /// Daily average gas price
    DailyGas { start: NaiveDate, end: NaiveDate },
    /// Latest ETH price
    EthPrice,
    /// Daily ETH price
    EthDailyPrice { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Subcommand)]
#[allow(missing_docs)]
pub enum FtmscanCommand {
    /// Account balance in FTM
    Balance {
        address: Address,
        /// Print the exact balance in wei
        #[clap(long)]
        wei: bool,
    },
    /// Normal transactions between two blocks
    Txs {
        address: Address,
        #[clap(long)]
        start_block: Option<u64>,
        #[clap(long)]
        end_block: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
#[allow(missing_docs)]
pub enum CmcCommand {
    /// CoinMarketCap ids for symbols, or "all"
    IdMap {
        #[clap(required = true)]
        symbols: Vec<String>,
    },
    /// Static metadata
    Info {
        #[clap(required = true)]
        symbols: Vec<String>,
    },
    /// Latest quotes
    Quotes {
        #[clap(required = true)]
        symbols: Vec<String>,
        /// Quote currency
        #[clap(long)]
        convert: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
#[allow(missing_docs)]
pub enum MessariCommand {
    /// One page of the asset listing, keyed by slug
    Assets {
        #[clap(long)]
        page: Option<u32>,
        #[clap(long)]
        limit: Option<u32>,
        /// Metric group to include, e.g. market_data
        #[clap(long)]
        metric: Option<String>,
    },
    /// Asset metadata
    Asset {
        #[clap(required = true)]
        slugs: Vec<String>,
        /// Comma separated fields to return
        #[clap(long, use_value_delimiter = true)]
        fields: Vec<String>,
    },
    /// Asset profiles
    Profile {
        #[clap(required = true)]
        slugs: Vec<String>,
        /// Profile section, e.g. investors
        #[clap(long)]
        metric: Option<String>,
    },
    /// Asset metrics
    Metrics {
        #[clap(required = true)]
        slugs: Vec<String>,
        /// Metric group, e.g. mining-stats
        #[clap(long)]
        metric: Option<String>,
    },
    /// Latest market data
    MarketData {
        #[clap(required = true)]
        slugs: Vec<String>,
    },
    /// All exchange markets
    Markets,
    /// Metric time series
    Timeseries {
        #[clap(required = true)]
        slugs: Vec<String>,
        /// Metric id, e.g. price
        #[clap(long)]
        metric: String,
        #[clap(long)]
        start: NaiveDate,
        #[clap(long)]
        end: NaiveDate,
        #[clap(long, default_value = external_apis::messari::DEFAULT_INTERVAL)]
        interval: String,
    },
}

#[derive(Debug, Subcommand)]
#[allow(missing_docs)]
pub enum LlamaCommand {
    /// All protocols keyed by slug
    Protocols,
    /// Historical TVL by chain and token
    ProtocolTvl {
        #[clap(required = true)]
        slugs: Vec<String>,
        #[clap(flatten)]
        range: DateRange,
    },
    /// Historical TVL across DeFi
    GlobalTvl {
        #[clap(flatten)]
        range: DateRange,
    },
    /// Historical TVL per chain
    ChainTvl {
        #[clap(required = true)]
        chains: Vec<String>,
        #[clap(flatten)]
        range: DateRange,
    },
    /// Current TVL per protocol
    CurrentTvl {
        #[clap(required = true)]
        slugs: Vec<String>,
    },
    /// Current TVL of every chain
    Chains,
}
