// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! CoinMarketCap Pro API integration
//!
//! Endpoints are addressed as `/v1/{category}[/{resource}]/{path}`, e.g.
//! `cryptocurrency/map` or `cryptocurrency/quotes/latest`. Every response
//! carries a `status` object whose non-zero `error_code` marks a failure.

use std::{fmt, path::Path, str::FromStr};

use api_client::{
    ApiClient, ApiError, ApiKey, FetchSettings, HealthStatus, HttpFetcher, build_url,
};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::persist::{merge_json_list, resolve_save_path};

/// Default API endpoint
pub const COINMARKETCAP_BASE_URL: &str = "https://pro-api.coinmarketcap.com";

/// Default file that ID maps are merged into
pub const CMC_ID_MAPS_FILENAME: &str = "cmc_id_maps.json";

const API_VERSION: &str = "v1";
const API_KEY_HEADER: &str = "x-cmc_pro_api_key";

/// Symbols CoinMarketCap lists under a different ticker
const SYMBOL_ALIASES: &[(&str, &str)] = &[("EWTB", "EWT")];

/// Endpoint category, the first path segment after the version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmcCategory {
    /// Cryptocurrency listings, quotes and metadata
    Cryptocurrency,
    /// Exchange listings and market pairs
    Exchange,
    /// Aggregate market data
    GlobalMetrics,
    /// Price conversion utilities
    Tools,
    /// Block explorer statistics
    Blockchain,
    /// Fiat currency maps
    Fiat,
    /// Third-party data
    Partners,
    /// API key usage
    Key,
}

impl CmcCategory {
    /// All categories
    pub const ALL: [Self; 8] = [
        Self::Cryptocurrency,
        Self::Exchange,
        Self::GlobalMetrics,
        Self::Tools,
        Self::Blockchain,
        Self::Fiat,
        Self::Partners,
        Self::Key,
    ];

    /// Path segment
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cryptocurrency => "cryptocurrency",
            Self::Exchange => "exchange",
            Self::GlobalMetrics => "global-metrics",
            Self::Tools => "tools",
            Self::Blockchain => "blockchain",
            Self::Fiat => "fiat",
            Self::Partners => "partners",
            Self::Key => "key",
        }
    }
}

impl fmt::Display for CmcCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CmcCategory {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                ApiError::invalid_input(format!(
                    "unknown CoinMarketCap category '{s}', expected one of: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

/// Endpoint path, the last path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmcPath {
    /// Latest market data
    Latest,
    /// Historical market data
    Historical,
    /// Metadata
    Info,
    /// ID maps
    Map,
}

impl CmcPath {
    /// All paths
    pub const ALL: [Self; 4] = [Self::Latest, Self::Historical, Self::Info, Self::Map];

    /// Path segment
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Historical => "historical",
            Self::Info => "info",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for CmcPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CmcPath {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                ApiError::invalid_input(format!(
                    "unknown CoinMarketCap path '{s}', expected one of: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

/// A CoinMarketCap endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmcEndpoint {
    category: CmcCategory,
    resource: Option<String>,
    path: CmcPath,
}

impl CmcEndpoint {
    /// `{category}/{path}`
    pub fn new(category: CmcCategory, path: CmcPath) -> Self {
        Self {
            category,
            resource: None,
            path,
        }
    }

    /// Insert a resource segment, e.g. `quotes` in `cryptocurrency/quotes/latest`
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Full URL under `base`
    pub fn url(&self, base: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut segments = vec![API_VERSION, self.category.as_str()];
        if let Some(resource) = &self.resource {
            segments.push(resource.as_str());
        }
        segments.push(self.path.as_str());
        build_url(base, &segments, params)
    }
}

impl fmt::Display for CmcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(f, "{}/{resource}/{}", self.category, self.path),
            None => write!(f, "{}/{}", self.category, self.path),
        }
    }
}

/// Entry of `cryptocurrency/map`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct CmcIdMap {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    #[serde(default)]
    pub rank: Option<u64>,
    #[serde(default)]
    pub is_active: Option<u8>,
    #[serde(default)]
    pub first_historical_data: Option<String>,
    #[serde(default)]
    pub last_historical_data: Option<String>,
    #[serde(default)]
    pub platform: Option<Value>,
}

/// Configuration for the CoinMarketCap API client
#[derive(Debug, Clone)]
pub struct CoinMarketCapConfig {
    /// Base URL, without the version segment
    pub base_url: String,
    /// Pro API key
    pub api_key: ApiKey,
    /// Timeout, retry and rate limit settings
    pub fetch: FetchSettings,
}

impl CoinMarketCapConfig {
    /// Public endpoint with default settings
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            base_url: COINMARKETCAP_BASE_URL.to_string(),
            api_key,
            fetch: FetchSettings::default(),
        }
    }
}

/// CoinMarketCap API client
#[derive(Debug, Clone)]
pub struct CoinMarketCapClient {
    base_url: String,
    headers: HeaderMap,
    fetcher: HttpFetcher,
}

impl CoinMarketCapClient {
    /// Create a new CoinMarketCap API client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the key is not a valid header value
    pub fn new(config: CoinMarketCapConfig) -> Result<Self, ApiError> {
        Url::parse(&config.base_url).map_err(|e| ApiError::Configuration {
            message: format!("invalid CoinMarketCap base URL '{}': {e}", config.base_url),
        })?;

        let mut key = HeaderValue::from_str(config.api_key.expose()).map_err(|e| {
            ApiError::Configuration {
                message: format!("CoinMarketCap API key is not a valid header value: {e}"),
            }
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        Ok(Self {
            base_url: config.base_url,
            headers,
            fetcher: HttpFetcher::new("coinmarketcap", &config.fetch)?,
        })
    }

    /// Query `endpoint` and return the whole response body
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Provider`] when the body's `status.error_code` is non-zero
    pub async fn run_query(
        &self,
        endpoint: &CmcEndpoint,
        params: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let url = endpoint.url(&self.base_url, params)?;
        self.fetcher
            .get_json_validated(None, &url, &self.headers, check_status)
            .await
    }

    /// CoinMarketCap ids for `symbols`; `["all"]` maps every listed asset
    ///
    /// When `save_dir` is given the result is merged into
    /// [`CMC_ID_MAPS_FILENAME`] there.
    pub async fn cmc_id_map(
        &self,
        symbols: &[String],
        save_dir: Option<&Path>,
    ) -> Result<Vec<CmcIdMap>, ApiError> {
        let endpoint = CmcEndpoint::new(CmcCategory::Cryptocurrency, CmcPath::Map);
        let all = matches!(symbols, [only] if only == "all");
        let body = if all {
            self.run_query(&endpoint, &[]).await?
        } else {
            let symbol = join_symbols(symbols)?;
            self.run_query(&endpoint, &[("symbol", symbol.as_str())])
                .await?
        };

        let maps: Vec<CmcIdMap> = take_data(body)?;
        info!(count = maps.len(), "fetched CoinMarketCap id maps");

        if save_dir.is_some() {
            self.save_cmc_id_maps(&maps, None, save_dir).await?;
        }
        Ok(maps)
    }

    /// Merge `maps` into `filename` (default [`CMC_ID_MAPS_FILENAME`]), sorted by id
    ///
    /// Stored entries whose id is not in `maps` are kept.
    pub async fn save_cmc_id_maps(
        &self,
        maps: &[CmcIdMap],
        filename: Option<&str>,
        save_dir: Option<&Path>,
    ) -> Result<Vec<Value>, ApiError> {
        let path = resolve_save_path(save_dir, filename.unwrap_or(CMC_ID_MAPS_FILENAME))?;
        let entries = maps
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(merge_json_list(&path, entries, |entry| entry.get("id").and_then(Value::as_u64)).await?)
    }

    /// Static metadata (logo, description, urls) keyed by symbol
    pub async fn cryptocurrency_info(&self, symbols: &[String]) -> Result<Map<String, Value>, ApiError> {
        let symbol = join_symbols(symbols)?;
        let endpoint = CmcEndpoint::new(CmcCategory::Cryptocurrency, CmcPath::Info);
        let body = self
            .run_query(&endpoint, &[("symbol", symbol.as_str())])
            .await?;
        take_data(body)
    }

    /// Latest quotes keyed by symbol, converted to `convert` (default USD)
    pub async fn quotes_latest(
        &self,
        symbols: &[String],
        convert: Option<&str>,
    ) -> Result<Map<String, Value>, ApiError> {
        let symbol = join_symbols(symbols)?;
        let endpoint = CmcEndpoint::new(CmcCategory::Cryptocurrency, CmcPath::Latest)
            .with_resource("quotes");
        let mut params = vec![("symbol", symbol.as_str())];
        if let Some(convert) = convert {
            params.push(("convert", convert));
        }
        let body = self.run_query(&endpoint, &params).await?;
        take_data(body)
    }
}

impl ApiClient for CoinMarketCapClient {
    async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        let url = CmcEndpoint::new(CmcCategory::Key, CmcPath::Info).url(&self.base_url, &[])?;
        debug!(%url, "performing health check on CoinMarketCap API");
        Ok(self.fetcher.check_health(&url, &self.headers).await)
    }

    fn name(&self) -> &'static str {
        "coinmarketcap"
    }
}

fn join_symbols(symbols: &[String]) -> Result<String, ApiError> {
    if symbols.is_empty() || symbols.iter().any(|s| s.trim().is_empty()) {
        return Err(ApiError::invalid_input("symbols must be non-empty"));
    }
    Ok(symbols
        .iter()
        .map(|s| {
            let s = s.trim();
            SYMBOL_ALIASES
                .iter()
                .find(|(from, _)| *from == s)
                .map_or(s, |(_, to)| *to)
        })
        .collect::<Vec<_>>()
        .join(","))
}

fn check_status(body: Value) -> Result<Value, ApiError> {
    let status = body.get("status");
    let error_code = status
        .and_then(|s| s.get("error_code"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if error_code != 0 {
        let message = status
            .and_then(|s| s.get("error_message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        warn!("coinmarketcap API error: {} - {}", error_code, message);
        return Err(ApiError::provider("coinmarketcap", message));
    }
    Ok(body)
}

fn take_data<T>(mut body: Value) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    let data = body
        .get_mut("data")
        .map(Value::take)
        .ok_or_else(|| ApiError::invalid_response("coinmarketcap response has no data"))?;
    serde_json::from_value(data)
        .map_err(|e| ApiError::invalid_response(format!("coinmarketcap data: {e}")))
}
