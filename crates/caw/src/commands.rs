// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command execution
//!
//! Every command builds the client it needs from [`CawConfig`], runs one or
//! more queries and returns a JSON value for `main` to print.

use std::path::Path;

use abi_decoder::{AbiCache, DecodedCall, DecodedLog};
use anyhow::{Context, Result};
use api_client::ApiError;
use external_apis::{AssetQuery, EtherscanClient, EventLog, NormalTx};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    cli::{CmcCommand, Command, EtherscanCommand, FtmscanCommand, LlamaCommand, MessariCommand},
    config::CawConfig,
};

/// A transaction with its decoded call input, when the ABI was available
#[derive(Debug, Serialize)]
pub struct DecodedTx {
    /// The transaction as returned by the explorer
    #[serde(flatten)]
    pub tx: NormalTx,
    /// Decoded input
    pub decoded: Option<DecodedCall>,
}

/// An event log with its decoded parameters, when the ABI was available
#[derive(Debug, Serialize)]
pub struct DecodedEventLog {
    /// The log as returned by the explorer
    #[serde(flatten)]
    pub log: EventLog,
    /// Decoded event
    pub decoded: Option<DecodedLog>,
}

/// Run `command` and return its output
pub async fn run(command: Command, config: &CawConfig, save_dir: Option<&Path>) -> Result<Value> {
    match command {
        Command::Health => health(config).await,
        Command::Etherscan(command) => etherscan(command, config, save_dir).await,
        Command::Ftmscan(command) => ftmscan(command, config).await,
        Command::Cmc(command) => cmc(command, config, save_dir).await,
        Command::Messari(command) => messari(command, config).await,
        Command::Llama(command) => llama(command, config).await,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("failed to serialise output")
}

async fn health(config: &CawConfig) -> Result<Value> {
    let registry = config.registry()?;
    info!(clients = ?registry.client_names(), "checking provider health");
    to_json(&registry.overall_health().await)
}

async fn etherscan(
    command: EtherscanCommand,
    config: &CawConfig,
    save_dir: Option<&Path>,
) -> Result<Value> {
    let client = config.etherscan()?;
    match command {
        EtherscanCommand::Receipt { tx_hash } => to_json(&client.get_tx_receipt(tx_hash).await?),
        EtherscanCommand::GasInfo { tx_hash, usd } => {
            let mut gas = client.get_tx_gas_info(tx_hash).await?;
            if usd {
                gas = gas.with_eth_price(client.get_eth_price().await?.ethusd);
            }
            let mut output = to_json(&gas)?;
            if let Value::Object(fields) = &mut output {
                fields.insert("tx_gas_cost_eth".to_string(), gas.tx_gas_cost_eth().into());
                if let Some(cost) = gas.tx_gas_cost_usd() {
                    fields.insert("tx_gas_cost_usd".to_string(), cost.into());
                }
            }
            Ok(output)
        }
        EtherscanCommand::TokenInfo { token_ids } => {
            to_json(&client.get_token_info(&token_ids, save_dir).await?)
        }
        EtherscanCommand::Abi { address } => to_json(&client.get_contract_abi(address).await?),
        EtherscanCommand::Txs {
            address,
            internal: true,
            ..
        } => to_json(&client.get_internal_transactions(address).await?),
        EtherscanCommand::Txs {
            address, decode, ..
        } => {
            let txs = client.get_normal_transactions(address).await?;
            if decode {
                to_json(&decode_txs(&client, txs).await?)
            } else {
                to_json(&txs)
            }
        }
        EtherscanCommand::Logs {
            address,
            topic0,
            decode,
        } => {
            let logs = client.get_event_log(address, topic0).await?;
            if decode {
                to_json(&decode_logs(&client, logs).await?)
            } else {
                to_json(&logs)
            }
        }
        EtherscanCommand::BlockByTime { timestamp, closest } => to_json(
            &client
                .get_block_number_by_timestamp(timestamp, closest)
                .await?,
        ),
        EtherscanCommand::GasOracle => to_json(&client.gas_oracle().await?),
        EtherscanCommand::DailyGas { start, end } => {
            to_json(&client.get_gas_price_daily_avg(start, end).await?)
        }
        EtherscanCommand::EthPrice => to_json(&client.get_eth_price().await?),
        EtherscanCommand::EthDailyPrice { start, end } => {
            to_json(&client.get_eth_daily_price(start, end).await?)
        }
    }
}

/// Decode the input of every contract call in `txs`
///
/// Plain transfers and calls to contracts without a verified ABI are kept
/// undecoded.
pub async fn decode_txs(client: &EtherscanClient, txs: Vec<NormalTx>) -> Result<Vec<DecodedTx>> {
    let cache = AbiCache::new();
    let mut decoded_txs = Vec::with_capacity(txs.len());

    for tx in txs {
        let input = tx.input_bytes()?;
        let decoded = match tx.to {
            Some(to) if input.len() >= 4 => match client.contract_decoder(to, &cache).await {
                Ok(decoder) => decoder
                    .decode_call(&input)
                    .inspect_err(|e| debug!(hash = %tx.hash, error = %e, "input not decoded"))
                    .ok(),
                Err(e) => {
                    skip_unverified(to, &e)?;
                    None
                }
            },
            _ => None,
        };
        decoded_txs.push(DecodedTx { tx, decoded });
    }

    info!(
        txs = decoded_txs.len(),
        decoded = decoded_txs.iter().filter(|t| t.decoded.is_some()).count(),
        contracts = cache.len(),
        "decoded transactions"
    );
    Ok(decoded_txs)
}

/// Decode every log in `logs` with its emitting contract's ABI
pub async fn decode_logs(
    client: &EtherscanClient,
    logs: Vec<EventLog>,
) -> Result<Vec<DecodedEventLog>> {
    let cache = AbiCache::new();
    let mut decoded_logs = Vec::with_capacity(logs.len());

    for log in logs {
        let decoded = match client.contract_decoder(log.address, &cache).await {
            Ok(decoder) => decoder
                .decode_log(&log.topics_b256()?, &log.data_bytes()?)
                .inspect_err(|e| {
                    debug!(tx = %log.transaction_hash, error = %e, "log not decoded");
                })
                .ok(),
            Err(e) => {
                skip_unverified(log.address, &e)?;
                None
            }
        };
        decoded_logs.push(DecodedEventLog { log, decoded });
    }
    Ok(decoded_logs)
}

/// Contracts without a verified ABI are skipped; any other failure aborts
fn skip_unverified(address: alloy_primitives::Address, error: &ApiError) -> Result<()> {
    match error {
        ApiError::Provider { .. } | ApiError::InvalidResponse { .. } => {
            warn!(%address, %error, "no usable ABI, leaving undecoded");
            Ok(())
        }
        other => Err(anyhow::anyhow!("fetching ABI for {address}: {other}")),
    }
}

async fn ftmscan(command: FtmscanCommand, config: &CawConfig) -> Result<Value> {
    let client = config.ftmscan()?;
    match command {
        FtmscanCommand::Balance { address, wei: true } => {
            to_json(&client.account_balance_single_address(address).await?)
        }
        FtmscanCommand::Balance { address, .. } => {
            to_json(&client.account_balance_ftm(address).await?)
        }
        FtmscanCommand::Txs {
            address,
            start_block,
            end_block,
        } => to_json(
            &client
                .tx_receipt_list(address, start_block, end_block)
                .await?,
        ),
    }
}

async fn cmc(command: CmcCommand, config: &CawConfig, save_dir: Option<&Path>) -> Result<Value> {
    let client = config.coinmarketcap()?;
    match command {
        CmcCommand::IdMap { symbols } => to_json(&client.cmc_id_map(&symbols, save_dir).await?),
        CmcCommand::Info { symbols } => to_json(&client.cryptocurrency_info(&symbols).await?),
        CmcCommand::Quotes { symbols, convert } => {
            to_json(&client.quotes_latest(&symbols, convert.as_deref()).await?)
        }
    }
}

async fn messari(command: MessariCommand, config: &CawConfig) -> Result<Value> {
    let client = config.messari()?;
    match command {
        MessariCommand::Assets {
            page,
            limit,
            metric,
        } => {
            let query = AssetQuery {
                page,
                limit,
                fields: Vec::new(),
                metric,
            };
            to_json(&client.get_all_assets_table(&query).await?)
        }
        MessariCommand::Asset { slugs, fields } => {
            to_json(&client.get_asset(&slugs, &fields).await?)
        }
        MessariCommand::Profile { slugs, metric } => {
            to_json(&client.get_asset_profile(&slugs, metric.as_deref()).await?)
        }
        MessariCommand::Metrics { slugs, metric } => {
            to_json(&client.get_asset_metrics(&slugs, metric.as_deref()).await?)
        }
        MessariCommand::MarketData { slugs } => {
            to_json(&client.get_asset_market_data(&slugs).await?)
        }
        MessariCommand::Markets => to_json(&client.get_all_markets().await?),
        MessariCommand::Timeseries {
            slugs,
            metric,
            start,
            end,
            interval,
        } => to_json(
            &client
                .get_metric_timeseries(&slugs, &metric, start, end, &interval)
                .await?,
        ),
    }
}

async fn llama(command: LlamaCommand, config: &CawConfig) -> Result<Value> {
    let client = config.defillama()?;
    match command {
        LlamaCommand::Protocols => to_json(&client.get_protocols().await?),
        LlamaCommand::ProtocolTvl { slugs, range } => to_json(
            &client
                .get_protocol_tvl_timeseries(&slugs, range.start, range.end)
                .await?,
        ),
        LlamaCommand::GlobalTvl { range } => to_json(
            &client
                .get_global_tvl_timeseries(range.start, range.end)
                .await?,
        ),
        LlamaCommand::ChainTvl { chains, range } => to_json(
            &client
                .get_chain_tvl_timeseries(&chains, range.start, range.end)
                .await?,
        ),
        LlamaCommand::CurrentTvl { slugs } => to_json(&client.get_current_tvl(&slugs).await?),
        LlamaCommand::Chains => to_json(&client.get_chains().await?),
    }
}
