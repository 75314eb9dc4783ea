// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared core for Etherscan-style block explorer APIs
//!
//! Etherscan and FTMScan expose the same query interface: every call is a GET
//! on one URL with `module`, `action` and `apikey` query parameters, and every
//! response is wrapped in a `{status, message, result}` envelope. Proxy
//! endpoints answer with a JSON-RPC body (`{jsonrpc, id, result | error}`)
//! instead.
//!
//! [`ExplorerClient`] builds those URLs, sends them through the shared
//! [`HttpFetcher`] and unwraps the envelope. Errors reported inside a `200`
//! body are mapped onto [`ApiError`] so that rate limit messages are retried
//! like HTTP 429s.

use alloy_primitives::{Address, B256, U256, hex};
use api_client::{
    ApiError, ApiKey, FetchSettings, HealthStatus, HttpFetcher, RateLimiter, build_url,
};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use shared_types::{Chain, units::parse_quantity};
use tracing::{debug, warn};
use url::Url;

use crate::serde_helpers::{optional_address, u64_lenient, u256_quantity};

/// Highest block number explorers accept as an open-ended range end
pub const LATEST_BLOCK: u64 = 99_999_999;

/// Retry delay reported for rate limit messages inside a response body
const BODY_RATE_LIMIT_RETRY_SECONDS: u64 = 1;

/// Configuration for an explorer API client
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// API endpoint, e.g. `https://api.etherscan.io/api`
    pub base_url: String,
    /// API key sent as the `apikey` query parameter
    pub api_key: ApiKey,
    /// Timeout, retry and rate limit settings
    pub fetch: FetchSettings,
}

impl ExplorerConfig {
    /// Default endpoint and request rate for `chain`
    pub fn for_chain(chain: Chain, api_key: ApiKey) -> Self {
        Self {
            base_url: chain.explorer_api_url().to_string(),
            api_key,
            fetch: FetchSettings::with_requests_per_second(default_requests_per_second(chain)),
        }
    }
}

/// Published free-tier call rate per explorer
pub const fn default_requests_per_second(chain: Chain) -> u32 {
    match chain {
        Chain::Ethereum => 30,
        Chain::Fantom => 5,
    }
}

/// Client for one explorer
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    chain: Chain,
    base_url: String,
    api_key: ApiKey,
    fetcher: HttpFetcher,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    message: String,
}

impl ExplorerClient {
    /// Create a client for `chain`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the fetcher cannot be built
    pub fn new(chain: Chain, config: ExplorerConfig) -> Result<Self, ApiError> {
        Url::parse(&config.base_url).map_err(|e| ApiError::Configuration {
            message: format!("invalid {} base URL '{}': {e}", chain.explorer_name(), config.base_url),
        })?;

        Ok(Self {
            chain,
            base_url: config.base_url,
            api_key: config.api_key,
            fetcher: HttpFetcher::new(chain.explorer_name(), &config.fetch)?,
        })
    }

    /// Chain this explorer indexes
    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// Provider name used in logs and errors
    pub fn provider(&self) -> &'static str {
        self.chain.explorer_name()
    }

    /// Query URL for `module`/`action` with extra parameters and the API key
    pub fn url(&self, module: &str, action: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut query = Vec::with_capacity(params.len() + 3);
        query.push(("module", module));
        query.push(("action", action));
        query.extend_from_slice(params);
        query.push(("apikey", self.api_key.expose()));
        build_url(&self.base_url, &[], &query)
    }

    /// Run a query and deserialize the envelope's `result`
    pub async fn query<T>(
        &self,
        module: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.query_limited(None, module, action, params).await
    }

    /// Like [`ExplorerClient::query`], also waiting on an endpoint limiter
    pub async fn query_limited<T>(
        &self,
        endpoint_limiter: Option<&RateLimiter>,
        module: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(module, action, params)?;
        let provider = self.provider();
        self.fetcher
            .get_json_validated(endpoint_limiter, &url, &HeaderMap::new(), |body| {
                let result = unwrap_envelope(provider, body)?;
                serde_json::from_value(result).map_err(|e| {
                    ApiError::invalid_response(format!("{provider} {module}/{action} result: {e}"))
                })
            })
            .await
    }

    /// Normal transactions of `address` between two blocks, oldest first
    pub async fn normal_transactions(
        &self,
        address: Address,
        start_block: u64,
        end_block: u64,
    ) -> Result<Vec<NormalTx>, ApiError> {
        let address = address.to_string();
        let start_block = start_block.to_string();
        let end_block = end_block.to_string();
        let txs: Vec<NormalTx> = self
            .query(
                "account",
                "txlist",
                &[
                    ("address", address.as_str()),
                    ("startblock", start_block.as_str()),
                    ("endblock", end_block.as_str()),
                    ("sort", "asc"),
                ],
            )
            .await?;
        debug!(provider = self.provider(), %address, count = txs.len(), "fetched transactions");
        Ok(txs)
    }

    /// Internal transactions of `address`, oldest first
    pub async fn internal_transactions(&self, address: Address) -> Result<Vec<InternalTx>, ApiError> {
        let address = address.to_string();
        self.query(
            "account",
            "txlistinternal",
            &[("address", address.as_str()), ("sort", "asc")],
        )
        .await
    }

    /// Native balance of `address` in wei at the latest block
    pub async fn balance(&self, address: Address) -> Result<U256, ApiError> {
        let address = address.to_string();
        let raw: String = self
            .query(
                "account",
                "balance",
                &[("address", address.as_str()), ("tag", "latest")],
            )
            .await?;
        parse_quantity(&raw).map_err(|e| ApiError::invalid_response(e.to_string()))
    }

    /// Receipt for `tx_hash`, `None` while the transaction is unknown or pending
    pub async fn tx_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, ApiError> {
        let tx_hash = tx_hash.to_string();
        self.query(
            "proxy",
            "eth_getTransactionReceipt",
            &[("txhash", tx_hash.as_str())],
        )
        .await
    }

    /// Verified contract ABI as the raw JSON document
    pub async fn contract_abi_json(&self, address: Address) -> Result<String, ApiError> {
        let address = address.to_string();
        self.query("contract", "getabi", &[("address", address.as_str())])
            .await
    }

    /// Latest block number
    pub async fn block_number(&self) -> Result<u64, ApiError> {
        let raw: String = self.query("proxy", "eth_blockNumber", &[]).await?;
        let number = parse_quantity(&raw).map_err(|e| ApiError::invalid_response(e.to_string()))?;
        u64::try_from(number).map_err(|e| ApiError::invalid_response(e.to_string()))
    }

    /// Health derived from a `block_number` call
    pub(crate) async fn health_status(&self) -> Result<HealthStatus, ApiError> {
        match self.block_number().await {
            Ok(block) => {
                debug!(provider = self.provider(), block, "explorer health check succeeded");
                Ok(HealthStatus::Up)
            }
            Err(ApiError::Authentication { message }) => Ok(HealthStatus::Down { reason: message }),
            Err(ApiError::RateLimitExceeded { .. }) => Ok(HealthStatus::Degraded {
                reason: "Rate limited".to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Unwrap an explorer response body into its `result`
///
/// # Errors
///
/// - JSON-RPC error object: [`ApiError::Provider`]
/// - `status == "0"` with a text result: [`ApiError::RateLimitExceeded`],
///   [`ApiError::Authentication`] or [`ApiError::Provider`] depending on the text
///
/// `status == "0"` with a list or missing result ("No transactions found")
/// yields an empty list.
pub fn unwrap_envelope(provider: &str, body: Value) -> Result<Value, ApiError> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| ApiError::invalid_response(format!("{provider} envelope: {e}")))?;

    if let Some(error) = envelope.error {
        warn!("{} API error: {} - {}", provider, error.code, error.message);
        return Err(ApiError::provider(provider, error.message));
    }

    if envelope.status.as_deref() != Some("0") {
        return Ok(envelope.result);
    }

    let message = envelope.message.unwrap_or_default();
    match envelope.result {
        Value::Array(_) | Value::Null => {
            debug!(provider, %message, "empty result");
            Ok(Value::Array(Vec::new()))
        }
        Value::String(text) => Err(classify_error_text(provider, &message, &text)),
        other => Err(ApiError::provider(provider, format!("{message}: {other}"))),
    }
}

fn classify_error_text(provider: &str, message: &str, text: &str) -> ApiError {
    let lowered = text.to_lowercase();
    if lowered.contains("rate limit") {
        ApiError::RateLimitExceeded {
            retry_after_seconds: BODY_RATE_LIMIT_RETRY_SECONDS,
        }
    } else if lowered.contains("api key") || lowered.contains("apikey") {
        ApiError::Authentication {
            message: format!("{provider}: {text}"),
        }
    } else {
        warn!("{} API error: {} - {}", provider, message, text);
        ApiError::provider(provider, format!("{message}: {text}"))
    }
}

fn decode_topics(topics: &[String]) -> Result<Vec<B256>, ApiError> {
    topics
        .iter()
        .map(|t| {
            t.parse::<B256>()
                .map_err(|e| ApiError::invalid_response(format!("invalid topic '{t}': {e}")))
        })
        .collect()
}

fn decode_hex(field: &str, raw: &str) -> Result<Vec<u8>, ApiError> {
    hex::decode(raw).map_err(|e| ApiError::invalid_response(format!("invalid {field} hex: {e}")))
}

fn quantity(field: &str, raw: &str) -> Result<U256, ApiError> {
    parse_quantity(raw).map_err(|e| ApiError::invalid_response(format!("{field}: {e}")))
}

/// Transaction receipt from `eth_getTransactionReceipt`
///
/// Quantities are kept as the hex strings the node returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_hash: B256,
    pub block_number: String,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    pub gas_used: String,
    #[serde(default)]
    pub cumulative_gas_used: String,
    #[serde(default)]
    pub effective_gas_price: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
    #[serde(default)]
    pub transaction_index: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl TxReceipt {
    /// Gas consumed by the transaction
    pub fn gas_used(&self) -> Result<U256, ApiError> {
        quantity("gasUsed", &self.gas_used)
    }

    /// Price paid per unit of gas, in wei
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidResponse`] if the node omitted the field
    /// (pre-London receipts)
    pub fn effective_gas_price(&self) -> Result<U256, ApiError> {
        let raw = self
            .effective_gas_price
            .as_deref()
            .ok_or_else(|| ApiError::invalid_response("receipt has no effectiveGasPrice"))?;
        quantity("effectiveGasPrice", raw)
    }

    /// Block the transaction was included in
    pub fn block_number(&self) -> Result<u64, ApiError> {
        let number = quantity("blockNumber", &self.block_number)?;
        u64::try_from(number).map_err(|e| ApiError::invalid_response(e.to_string()))
    }

    /// `Some(true)` for a successful transaction, `None` when the status is absent
    pub fn succeeded(&self) -> Option<bool> {
        self.status.as_deref().map(|s| s == "0x1")
    }
}

/// Log entry inside a [`TxReceipt`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ReceiptLog {
    pub address: Address,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(default)]
    pub block_number: String,
    #[serde(default)]
    pub log_index: String,
    #[serde(default)]
    pub removed: bool,
}

impl ReceiptLog {
    /// Topics as 32-byte words
    pub fn topics_b256(&self) -> Result<Vec<B256>, ApiError> {
        decode_topics(&self.topics)
    }

    /// Non-indexed log data
    pub fn data_bytes(&self) -> Result<Vec<u8>, ApiError> {
        decode_hex("log data", &self.data)
    }
}

/// Entry of the `txlist` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NormalTx {
    #[serde(deserialize_with = "u64_lenient")]
    pub block_number: u64,
    #[serde(deserialize_with = "u64_lenient")]
    pub time_stamp: u64,
    pub hash: B256,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub nonce: u64,
    #[serde(default)]
    pub block_hash: String,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub transaction_index: u64,
    pub from: Address,
    #[serde(default, deserialize_with = "optional_address")]
    pub to: Option<Address>,
    #[serde(deserialize_with = "u256_quantity")]
    pub value: U256,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub gas: u64,
    #[serde(default, deserialize_with = "u256_quantity")]
    pub gas_price: U256,
    #[serde(default)]
    pub is_error: String,
    #[serde(default, rename = "txreceipt_status")]
    pub tx_receipt_status: String,
    #[serde(default)]
    pub input: String,
    #[serde(default, deserialize_with = "optional_address")]
    pub contract_address: Option<Address>,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub gas_used: u64,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub confirmations: u64,
    #[serde(default)]
    pub method_id: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
}

impl NormalTx {
    /// Calldata bytes
    pub fn input_bytes(&self) -> Result<Vec<u8>, ApiError> {
        decode_hex("input", &self.input)
    }

    /// Whether the explorer flagged the transaction as reverted
    pub fn is_error(&self) -> bool {
        self.is_error == "1"
    }
}

/// Entry of the `txlistinternal` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct InternalTx {
    #[serde(deserialize_with = "u64_lenient")]
    pub block_number: u64,
    #[serde(deserialize_with = "u64_lenient")]
    pub time_stamp: u64,
    pub hash: B256,
    pub from: Address,
    #[serde(default, deserialize_with = "optional_address")]
    pub to: Option<Address>,
    #[serde(deserialize_with = "u256_quantity")]
    pub value: U256,
    #[serde(default, deserialize_with = "optional_address")]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub input: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub gas: u64,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub gas_used: u64,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub is_error: String,
    #[serde(default)]
    pub err_code: String,
}

/// Entry of the `getLogs` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EventLog {
    pub address: Address,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(deserialize_with = "u64_lenient")]
    pub block_number: u64,
    #[serde(deserialize_with = "u64_lenient")]
    pub time_stamp: u64,
    #[serde(default, deserialize_with = "u256_quantity")]
    pub gas_price: U256,
    #[serde(default, deserialize_with = "u256_quantity")]
    pub gas_used: U256,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub log_index: u64,
    pub transaction_hash: B256,
    #[serde(default, deserialize_with = "u64_lenient")]
    pub transaction_index: u64,
}

impl EventLog {
    /// Topics as 32-byte words
    pub fn topics_b256(&self) -> Result<Vec<B256>, ApiError> {
        decode_topics(&self.topics)
    }

    /// Non-indexed log data
    pub fn data_bytes(&self) -> Result<Vec<u8>, ApiError> {
        decode_hex("log data", &self.data)
    }
}
