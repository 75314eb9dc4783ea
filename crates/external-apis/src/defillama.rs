// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! DeFiLlama API integration
//!
//! Total value locked (TVL) per protocol, per chain and across DeFi. The API is
//! public and needs no key.
//!
//! Protocol TVL frames have three column levels, `{slug}/{chain}/{asset}`:
//!
//! - `chain` is a chain name from the protocol's `chains` list, or `all` for the
//!   protocol-wide totals;
//! - `asset` is `totalLiquidityUSD`, a token symbol (native amount) or
//!   `{symbol}_usd` (USD value of that token).

use std::collections::BTreeMap;

use api_client::{ApiClient, ApiError, FetchSettings, HealthStatus, HttpFetcher, build_url};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use shared_types::{RecordTable, TimeSeriesFrame, flatten_json};
use tracing::{debug, info, warn};
use url::Url;

use crate::serde_helpers::{f64_lenient, unix_seconds};

/// Default API endpoint
pub const DEFILLAMA_BASE_URL: &str = "https://api.llama.fi";

/// Column holding total TVL in USD
pub const TOTAL_LIQUIDITY_USD: &str = "totalLiquidityUSD";

/// Chain level name for protocol-wide totals
pub const ALL_CHAINS: &str = "all";

/// Suffix of token columns valued in USD
pub const USD_SUFFIX: &str = "_usd";

/// DeFiLlama endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlamaEndpoint {
    /// All protocols with their current TVL
    Protocols,
    /// Historical TVL of one protocol with token and chain breakdowns
    Protocol(String),
    /// Historical TVL across all chains
    GlobalCharts,
    /// Historical TVL of one chain
    ChainCharts(String),
    /// Current TVL of one protocol
    CurrentTvl(String),
    /// Current TVL of every chain
    Chains,
}

impl LlamaEndpoint {
    fn segments(&self) -> Vec<&str> {
        match self {
            Self::Protocols => vec!["protocols"],
            Self::Protocol(slug) => vec!["protocol", slug],
            Self::GlobalCharts => vec!["charts"],
            Self::ChainCharts(chain) => vec!["charts", chain],
            Self::CurrentTvl(slug) => vec!["tvl", slug],
            Self::Chains => vec!["chains"],
        }
    }
}

/// Current TVL of one chain, from `/chains`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTvl {
    /// Chain name as used by `/charts/{chain}`
    pub name: String,
    /// TVL in USD
    #[serde(deserialize_with = "f64_lenient")]
    pub tvl: f64,
    /// Native token symbol
    #[serde(rename = "tokenSymbol", default)]
    pub token_symbol: Option<String>,
    /// CoinGecko id of the native token
    #[serde(default)]
    pub gecko_id: Option<String>,
    /// CoinMarketCap id of the native token
    #[serde(rename = "cmcId", default)]
    pub cmc_id: Option<String>,
    /// EVM chain id, when the chain has one
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TvlPoint {
    #[serde(deserialize_with = "unix_seconds")]
    date: DateTime<Utc>,
    #[serde(rename = "totalLiquidityUSD", deserialize_with = "f64_lenient")]
    total_liquidity_usd: f64,
}

#[derive(Debug, Deserialize)]
struct TokenPoint {
    #[serde(deserialize_with = "unix_seconds")]
    date: DateTime<Utc>,
    #[serde(default)]
    tokens: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct TvlBreakdown {
    #[serde(default)]
    tvl: Vec<TvlPoint>,
    #[serde(default)]
    tokens: Option<Vec<TokenPoint>>,
    #[serde(rename = "tokensInUsd", default)]
    tokens_in_usd: Option<Vec<TokenPoint>>,
}

impl TvlBreakdown {
    fn to_frame(&self) -> TimeSeriesFrame {
        let mut frame = TimeSeriesFrame::new();
        for point in &self.tvl {
            frame.insert(point.date, TOTAL_LIQUIDITY_USD, point.total_liquidity_usd);
        }
        for (points, suffix) in [(&self.tokens, ""), (&self.tokens_in_usd, USD_SUFFIX)] {
            for point in points.iter().flatten() {
                for (symbol, amount) in &point.tokens {
                    if let Some(amount) = amount.as_f64() {
                        frame.insert(point.date, format!("{symbol}{suffix}"), amount);
                    }
                }
            }
        }
        frame
    }
}

#[derive(Debug, Deserialize)]
struct ProtocolTvl {
    #[serde(default)]
    chains: Vec<String>,
    #[serde(rename = "chainTvls", default)]
    chain_tvls: BTreeMap<String, TvlBreakdown>,
    #[serde(flatten)]
    total: TvlBreakdown,
}

impl ProtocolTvl {
    fn to_frame(&self, slug: &str) -> TimeSeriesFrame {
        let mut frame = TimeSeriesFrame::new();
        for chain in &self.chains {
            let Some(breakdown) = self.chain_tvls.get(chain) else {
                warn!(%slug, %chain, "chain listed without TVL breakdown, skipping");
                continue;
            };
            frame = frame.outer_join(breakdown.to_frame().with_prefix(chain));
        }
        frame.outer_join(self.total.to_frame().with_prefix(ALL_CHAINS))
    }
}

/// Configuration for the DeFiLlama API client
#[derive(Debug, Clone)]
pub struct DefiLlamaConfig {
    /// Base URL
    pub base_url: String,
    /// Timeout, retry and rate limit settings
    pub fetch: FetchSettings,
    /// Slug translations applied by [`DefiLlamaClient::translate`]
    pub taxonomy: BTreeMap<String, String>,
}

impl Default for DefiLlamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFILLAMA_BASE_URL.to_string(),
            fetch: FetchSettings::default(),
            taxonomy: BTreeMap::new(),
        }
    }
}

/// DeFiLlama API client
#[derive(Debug, Clone)]
pub struct DefiLlamaClient {
    base_url: String,
    taxonomy: BTreeMap<String, String>,
    fetcher: HttpFetcher,
}

impl DefiLlamaClient {
    /// Create a new DeFiLlama API client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid
    pub fn new(config: DefiLlamaConfig) -> Result<Self, ApiError> {
        Url::parse(&config.base_url).map_err(|e| ApiError::Configuration {
            message: format!("invalid DeFiLlama base URL '{}': {e}", config.base_url),
        })?;

        Ok(Self {
            base_url: config.base_url,
            taxonomy: config.taxonomy,
            fetcher: HttpFetcher::new("defillama", &config.fetch)?,
        })
    }

    /// URL of `endpoint`
    pub fn endpoint_url(&self, endpoint: &LlamaEndpoint) -> Result<Url, ApiError> {
        build_url(&self.base_url, &endpoint.segments(), &[])
    }

    /// Map slugs through the configured taxonomy; unknown slugs pass through
    pub fn translate(&self, slugs: &[String]) -> Vec<String> {
        slugs
            .iter()
            .map(|slug| self.taxonomy.get(slug).unwrap_or(slug).clone())
            .collect()
    }

    async fn get<T>(&self, endpoint: &LlamaEndpoint) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint)?;
        self.fetcher.get_json(&url, &HeaderMap::new()).await
    }

    /// Historical TVL of each protocol, broken down by chain and token
    pub async fn get_protocol_tvl_timeseries(
        &self,
        slugs: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeriesFrame, ApiError> {
        let slugs = self.translate(&validate_names(slugs)?);

        let mut frame = TimeSeriesFrame::new();
        for slug in &slugs {
            let protocol: ProtocolTvl = self.get(&LlamaEndpoint::Protocol(slug.clone())).await?;
            let protocol_frame = protocol.to_frame(slug);
            debug!(
                %slug,
                chains = protocol.chains.len(),
                rows = protocol_frame.len(),
                "fetched protocol TVL"
            );
            frame = frame.outer_join(protocol_frame.with_prefix(slug));
        }
        Ok(frame.filter_dates(start, end))
    }

    /// Historical TVL summed over every tracked protocol
    pub async fn get_global_tvl_timeseries(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeriesFrame, ApiError> {
        let points: Vec<TvlPoint> = self.get(&LlamaEndpoint::GlobalCharts).await?;
        Ok(points_to_frame(&points, TOTAL_LIQUIDITY_USD).filter_dates(start, end))
    }

    /// Historical TVL of each chain, one column per chain
    pub async fn get_chain_tvl_timeseries(
        &self,
        chains: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeriesFrame, ApiError> {
        let chains = validate_names(chains)?;

        let mut frame = TimeSeriesFrame::new();
        for chain in &chains {
            let points: Vec<TvlPoint> = self
                .get(&LlamaEndpoint::ChainCharts(chain.clone()))
                .await?;
            frame = frame.outer_join(points_to_frame(&points, chain));
        }
        Ok(frame.filter_dates(start, end))
    }

    /// Current TVL of each protocol in USD
    ///
    /// Slugs DeFiLlama does not know are logged and left out.
    pub async fn get_current_tvl(&self, slugs: &[String]) -> Result<BTreeMap<String, f64>, ApiError> {
        let slugs = validate_names(slugs)?;

        let mut tvls = BTreeMap::new();
        for slug in slugs {
            let result = self.get(&LlamaEndpoint::CurrentTvl(slug.clone())).await;
            let response: Value = match result {
                Ok(response) => response,
                Err(
                    error @ (ApiError::UnexpectedStatus { status: 400, .. }
                    | ApiError::NotFound { .. }),
                ) => {
                    warn!(%slug, %error, "unknown protocol, skipping");
                    continue;
                }
                Err(error) => return Err(error),
            };
            match response.as_f64() {
                Some(tvl) => {
                    tvls.insert(slug, tvl);
                }
                None => {
                    let message = response
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("non-numeric response");
                    warn!(%slug, message, "no current TVL, skipping");
                }
            }
        }
        Ok(tvls)
    }

    /// Every listed protocol keyed by slug
    pub async fn get_protocols(&self) -> Result<RecordTable, ApiError> {
        let protocols: Vec<Value> = self.get(&LlamaEndpoint::Protocols).await?;
        let table: RecordTable = protocols
            .iter()
            .filter_map(|p| {
                let slug = p.get("slug").and_then(Value::as_str)?;
                Some((slug.to_string(), flatten_json(p)))
            })
            .collect();
        info!(
            listed = protocols.len(),
            kept = table.len(),
            "fetched DeFiLlama protocols"
        );
        Ok(table)
    }

    /// Current TVL of every chain
    pub async fn get_chains(&self) -> Result<Vec<ChainTvl>, ApiError> {
        self.get(&LlamaEndpoint::Chains).await
    }
}

impl ApiClient for DefiLlamaClient {
    async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        let url = self.endpoint_url(&LlamaEndpoint::Chains)?;
        debug!(%url, "performing health check on DeFiLlama API");
        Ok(self.fetcher.check_health(&url, &HeaderMap::new()).await)
    }

    fn name(&self) -> &'static str {
        "defillama"
    }
}

fn validate_names(names: &[String]) -> Result<Vec<String>, ApiError> {
    if names.is_empty() || names.iter().any(|n| n.trim().is_empty()) {
        return Err(ApiError::invalid_input(
            "at least one non-empty protocol or chain name is required",
        ));
    }
    Ok(names.iter().map(|n| n.trim().to_string()).collect())
}

fn points_to_frame(points: &[TvlPoint], column: &str) -> TimeSeriesFrame {
    let mut frame = TimeSeriesFrame::new();
    for point in points {
        frame.insert(point.date, column, point.total_liquidity_usd);
    }
    frame
}
