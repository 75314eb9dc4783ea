// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Etherscan API integration
//!
//! Transactions, logs, receipts, ABIs, gas and ETH price statistics for
//! Ethereum mainnet. All calls go through the shared [`ExplorerClient`]; the
//! token info endpoint is additionally throttled to two calls per second.

use std::{
    collections::BTreeMap,
    fmt,
    path::Path,
    str::FromStr,
    sync::Arc,
};

use abi_decoder::{AbiCache, ContractDecoder};
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, B256, U256};
use api_client::{ApiClient, ApiError, ApiKey, HealthStatus, RateLimiter};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use shared_types::{Chain, GasInfo};
use tracing::{debug, info, warn};

use crate::{
    explorer::{
        EventLog, ExplorerClient, ExplorerConfig, InternalTx, LATEST_BLOCK, NormalTx, TxReceipt,
    },
    persist::{merge_json_map, resolve_save_path},
    serde_helpers::{f64_lenient, u64_lenient, u256_quantity},
};

/// Call rate allowed on the `tokeninfo` endpoint
pub const TOKEN_INFO_REQUESTS_PER_SECOND: u32 = 2;

/// File that token info lookups are merged into
pub const TOKEN_INFO_FILENAME: &str = "token_info.json";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Token metadata as returned by `tokeninfo`
pub type TokenInfo = Map<String, Value>;

/// Token metadata keyed by contract address
pub type TokenInfoMap = BTreeMap<String, TokenInfo>;

/// Which block to pick when no block has exactly the requested timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Closest {
    /// Last block before the timestamp
    #[default]
    Before,
    /// First block after the timestamp
    After,
}

impl Closest {
    /// Query parameter value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for Closest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Closest {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            other => Err(ApiError::invalid_input(format!(
                "closest must be 'before' or 'after', got '{other}'"
            ))),
        }
    }
}

/// Average gas price for one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGasPrice {
    /// Day
    #[serde(rename = "UTCDate")]
    pub utc_date: NaiveDate,
    /// Start of the day in unix seconds
    #[serde(rename = "unixTimeStamp", deserialize_with = "u64_lenient")]
    pub unix_timestamp: u64,
    /// Average gas price in wei
    #[serde(rename = "avgGasPrice_Wei", deserialize_with = "u256_quantity")]
    pub avg_gas_price_wei: U256,
}

/// ETH closing price in USD for one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEthPrice {
    /// Day
    #[serde(rename = "UTCDate")]
    pub utc_date: NaiveDate,
    /// Start of the day in unix seconds
    #[serde(rename = "unixTimeStamp", deserialize_with = "u64_lenient")]
    pub unix_timestamp: u64,
    /// Price in USD
    #[serde(deserialize_with = "f64_lenient")]
    pub value: f64,
}

/// Current gas price suggestions in gwei
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasOracle {
    /// Block the suggestions were computed at
    #[serde(rename = "LastBlock", deserialize_with = "u64_lenient")]
    pub last_block: u64,
    /// Low priority price
    #[serde(rename = "SafeGasPrice", deserialize_with = "f64_lenient")]
    pub safe_gas_price: f64,
    /// Standard price
    #[serde(rename = "ProposeGasPrice", deserialize_with = "f64_lenient")]
    pub propose_gas_price: f64,
    /// High priority price
    #[serde(rename = "FastGasPrice", deserialize_with = "f64_lenient")]
    pub fast_gas_price: f64,
    /// Base fee of the next block
    #[serde(rename = "suggestBaseFee", deserialize_with = "f64_lenient")]
    pub suggest_base_fee: f64,
    /// Gas used ratios of recent blocks, comma separated
    #[serde(rename = "gasUsedRatio", default)]
    pub gas_used_ratio: String,
}

/// Latest ETH price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthPrice {
    /// Price in BTC
    #[serde(deserialize_with = "f64_lenient")]
    pub ethbtc: f64,
    /// Unix seconds of the BTC quote
    #[serde(deserialize_with = "u64_lenient")]
    pub ethbtc_timestamp: u64,
    /// Price in USD
    #[serde(deserialize_with = "f64_lenient")]
    pub ethusd: f64,
    /// Unix seconds of the USD quote
    #[serde(deserialize_with = "u64_lenient")]
    pub ethusd_timestamp: u64,
}

/// Etherscan API client
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    explorer: ExplorerClient,
    token_info_limiter: Arc<RateLimiter>,
}

impl EtherscanClient {
    /// Create a new Etherscan API client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(config: ExplorerConfig) -> Result<Self, ApiError> {
        Ok(Self {
            explorer: ExplorerClient::new(Chain::Ethereum, config)?,
            token_info_limiter: Arc::new(RateLimiter::new(TOKEN_INFO_REQUESTS_PER_SECOND)?),
        })
    }

    /// Client for the public endpoint with default settings
    pub fn with_api_key(api_key: ApiKey) -> Result<Self, ApiError> {
        Self::new(ExplorerConfig::for_chain(Chain::Ethereum, api_key))
    }

    /// The underlying explorer client
    pub fn explorer(&self) -> &ExplorerClient {
        &self.explorer
    }

    /// Run an arbitrary `module`/`action` query
    pub async fn run_query<T>(
        &self,
        module: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.explorer.query(module, action, params).await
    }

    /// Receipt of a mined transaction
    pub async fn get_tx_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, ApiError> {
        self.explorer.tx_receipt(tx_hash).await
    }

    /// Logs emitted by `address` whose first topic is `topic0`
    pub async fn get_event_log(
        &self,
        address: Address,
        topic0: B256,
    ) -> Result<Vec<EventLog>, ApiError> {
        let address = address.to_string();
        let topic0 = topic0.to_string();
        self.run_query(
            "logs",
            "getLogs",
            &[("address", address.as_str()), ("topic0", topic0.as_str())],
        )
        .await
    }

    /// All normal transactions of `address`, oldest first
    pub async fn get_normal_transactions(&self, address: Address) -> Result<Vec<NormalTx>, ApiError> {
        self.explorer
            .normal_transactions(address, 0, LATEST_BLOCK)
            .await
    }

    /// All internal transactions of `address`, oldest first
    pub async fn get_internal_transactions(
        &self,
        address: Address,
    ) -> Result<Vec<InternalTx>, ApiError> {
        self.explorer.internal_transactions(address).await
    }

    /// Verified ABI of the contract at `address`
    pub async fn get_contract_abi(&self, address: Address) -> Result<JsonAbi, ApiError> {
        let json = self.explorer.contract_abi_json(address).await?;
        serde_json::from_str(&json)
            .map_err(|e| ApiError::invalid_response(format!("ABI for {address}: {e}")))
    }

    /// Decoder for `address`, fetching and parsing its ABI on a cache miss
    ///
    /// A contract the explorer has no usable ABI for is recorded in `cache`
    /// and answered from there afterwards. Transient failures are not recorded.
    pub async fn contract_decoder(
        &self,
        address: Address,
        cache: &AbiCache,
    ) -> Result<Arc<ContractDecoder>, ApiError> {
        if let Some(decoder) = cache.get(&address) {
            return Ok(decoder);
        }
        if let Some(reason) = cache.unavailable(&address) {
            return Err(ApiError::invalid_response(format!(
                "ABI for {address} unavailable: {reason}"
            )));
        }
        let parsed = match self.explorer.contract_abi_json(address).await {
            Ok(json) => ContractDecoder::from_json(&json)
                .map_err(|e| ApiError::invalid_response(format!("ABI for {address}: {e}"))),
            Err(error) => Err(error),
        };
        match parsed {
            Ok(decoder) => Ok(cache.insert(address, decoder)),
            Err(error @ (ApiError::Provider { .. } | ApiError::InvalidResponse { .. })) => {
                cache.mark_unavailable(address, error.to_string());
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    /// Block mined closest to `timestamp` (unix seconds)
    pub async fn get_block_number_by_timestamp(
        &self,
        timestamp: u64,
        closest: Closest,
    ) -> Result<u64, ApiError> {
        let timestamp = timestamp.to_string();
        let raw: String = self
            .run_query(
                "block",
                "getblocknobytime",
                &[
                    ("timestamp", timestamp.as_str()),
                    ("closest", closest.as_str()),
                ],
            )
            .await?;
        raw.trim()
            .parse()
            .map_err(|e| ApiError::invalid_response(format!("block number '{raw}': {e}")))
    }

    /// Daily average gas price between two days, inclusive
    pub async fn get_gas_price_daily_avg(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyGasPrice>, ApiError> {
        self.daily_stats("dailyavggasprice", start, end).await
    }

    /// Current gas price suggestions
    pub async fn gas_oracle(&self) -> Result<GasOracle, ApiError> {
        self.run_query("gastracker", "gasoracle", &[]).await
    }

    /// Latest ETH price
    pub async fn get_eth_price(&self) -> Result<EthPrice, ApiError> {
        self.run_query("stats", "ethprice", &[]).await
    }

    /// Daily ETH price between two days, inclusive
    pub async fn get_eth_daily_price(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyEthPrice>, ApiError> {
        self.daily_stats("ethdailyprice", start, end).await
    }

    async fn daily_stats<T>(
        &self,
        action: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        if start > end {
            return Err(ApiError::invalid_input(format!(
                "start date {start} is after end date {end}"
            )));
        }
        let start = start.format(DATE_FORMAT).to_string();
        let end = end.format(DATE_FORMAT).to_string();
        self.run_query(
            "stats",
            action,
            &[
                ("startdate", start.as_str()),
                ("enddate", end.as_str()),
                ("sort", "asc"),
            ],
        )
        .await
    }

    /// Gas used and effective gas price of a mined transaction
    ///
    /// The ETH price is left unset; attach one with [`GasInfo::with_eth_price`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the explorer has no receipt
    pub async fn get_tx_gas_info(&self, tx_hash: B256) -> Result<GasInfo, ApiError> {
        let receipt = self
            .get_tx_receipt(tx_hash)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("transaction receipt {tx_hash}"),
            })?;
        Ok(GasInfo::new(
            receipt.gas_used()?,
            receipt.effective_gas_price()?,
            tx_hash,
        ))
    }

    /// Token metadata for each contract address in `token_ids`
    ///
    /// Results are keyed by the lowercase `0x` address, so ids differing only in
    /// case are fetched once. Addresses the explorer knows nothing about are
    /// skipped. When `save_dir` is given the batch is merged into
    /// [`TOKEN_INFO_FILENAME`] there.
    pub async fn get_token_info(
        &self,
        token_ids: &[String],
        save_dir: Option<&Path>,
    ) -> Result<TokenInfoMap, ApiError> {
        if token_ids.is_empty() {
            return Err(ApiError::invalid_input("no token ids given"));
        }
        let mut addresses = Vec::with_capacity(token_ids.len());
        for token_id in token_ids {
            let address: Address = token_id.trim().parse().map_err(|e| {
                ApiError::invalid_input(format!("invalid token address '{token_id}': {e}"))
            })?;
            let key = format!("{address:#x}");
            if !addresses.contains(&key) {
                addresses.push(key);
            }
        }

        let mut tokens = TokenInfoMap::new();
        for token_id in addresses {
            let mut entries: Vec<TokenInfo> = self
                .explorer
                .query_limited(
                    Some(&self.token_info_limiter),
                    "token",
                    "tokeninfo",
                    &[("contractaddress", token_id.as_str())],
                )
                .await?;

            if entries.is_empty() {
                warn!(%token_id, "no token info returned, skipping");
                continue;
            }
            debug!(%token_id, "fetched token info");
            tokens.insert(token_id, entries.swap_remove(0));
        }
        info!(
            requested = token_ids.len(),
            found = tokens.len(),
            "fetched token info batch"
        );

        if save_dir.is_some() {
            self.save_token_info_json(&tokens, save_dir).await?;
        }
        Ok(tokens)
    }

    /// Merge `tokens` into [`TOKEN_INFO_FILENAME`] in `save_dir`
    pub async fn save_token_info_json(
        &self,
        tokens: &TokenInfoMap,
        save_dir: Option<&Path>,
    ) -> Result<BTreeMap<String, Value>, ApiError> {
        let path = resolve_save_path(save_dir, TOKEN_INFO_FILENAME)?;
        let entries = tokens
            .iter()
            .map(|(id, info)| (id.clone(), Value::Object(info.clone())))
            .collect();
        Ok(merge_json_map(&path, &entries).await?)
    }
}

impl ApiClient for EtherscanClient {
    async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        self.explorer.health_status().await
    }

    fn name(&self) -> &'static str {
        "etherscan"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn closest_parses_only_before_and_after() {
        assert_eq!("before".parse::<Closest>().unwrap(), Closest::Before);
        assert_eq!("after".parse::<Closest>().unwrap(), Closest::After);
        assert!("Before".parse::<Closest>().is_err());
        assert!("nearest".parse::<Closest>().is_err());
        assert_eq!(Closest::After.to_string(), "after");
    }

    #[test]
    fn stats_payloads() {
        let gas: DailyGasPrice = serde_json::from_value(json!({
            "UTCDate": "2019-02-01",
            "unixTimeStamp": "1548979200",
            "avgGasPrice_Wei": "17753840442"
        }))
        .unwrap();
        assert_eq!(gas.utc_date, NaiveDate::from_ymd_opt(2019, 2, 1).unwrap());
        assert_eq!(gas.avg_gas_price_wei, U256::from(17_753_840_442u64));

        let oracle: GasOracle = serde_json::from_value(json!({
            "LastBlock": "13053741",
            "SafeGasPrice": "20",
            "ProposeGasPrice": "22",
            "FastGasPrice": "24",
            "suggestBaseFee": "19.230609716",
            "gasUsedRatio": "0.370119078777807,0.8954731,0.550911766666667"
        }))
        .unwrap();
        assert_eq!(oracle.last_block, 13_053_741);
        assert!((oracle.fast_gas_price - 24.0).abs() < f64::EPSILON);

        let price: EthPrice = serde_json::from_value(json!({
            "ethbtc": "0.06116",
            "ethbtc_timestamp": "1624961308",
            "ethusd": "2149.18",
            "ethusd_timestamp": "1624961308"
        }))
        .unwrap();
        assert!((price.ethusd - 2149.18).abs() < f64::EPSILON);
    }
}
