// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Messari API integration
//!
//! Asset metadata, profiles, metrics, markets and metric time series. Every
//! response is wrapped in `{status, data}`; nested `data` objects are flattened
//! with `_` so that `market_data.price_usd` becomes the column
//! `market_data_price_usd`.

use std::{collections::BTreeMap, fmt};

use api_client::{ApiClient, ApiError, ApiKey, FetchSettings, HealthStatus, HttpFetcher, build_url};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{
    Deserialize, Deserializer,
    de::{IgnoredAny, MapAccess, Visitor},
};
use serde_json::{Map, Value};
use shared_types::{RecordTable, TimeSeriesFrame, flatten_json, frame::COLUMN_LEVEL_SEPARATOR};
use tracing::{debug, info, warn};
use url::Url;

/// Default API endpoint
pub const MESSARI_BASE_URL: &str = "https://data.messari.io/api";

/// Default time series interval
pub const DEFAULT_INTERVAL: &str = "1d";

const API_KEY_HEADER: &str = "x-messari-api-key";
const TIMESTAMP_FIELD: &str = "timestamp";

/// Parameters for the `v2/assets` listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Assets per page
    pub limit: Option<u32>,
    /// Fields to return, e.g. `["id", "slug", "metrics"]`
    pub fields: Vec<String>,
    /// Single metric group to include, e.g. `mining_stats`
    pub metric: Option<String>,
}

impl AssetQuery {
    fn fields_param(&self) -> Option<String> {
        let mut fields = self.fields.clone();
        if let Some(metric) = &self.metric {
            if fields.is_empty() {
                fields.extend(["id", "name", "slug", "symbol"].map(String::from));
            }
            fields.push(format!("metrics/{metric}"));
        }
        (!fields.is_empty()).then(|| fields.join(","))
    }
}

/// Configuration for the Messari API client
#[derive(Debug, Clone)]
pub struct MessariConfig {
    /// Base URL
    pub base_url: String,
    /// Optional key; anonymous access has a lower rate limit
    pub api_key: Option<ApiKey>,
    /// Timeout, retry and rate limit settings
    pub fetch: FetchSettings,
}

impl Default for MessariConfig {
    fn default() -> Self {
        Self {
            base_url: MESSARI_BASE_URL.to_string(),
            api_key: None,
            fetch: FetchSettings::default(),
        }
    }
}

/// Messari API client
#[derive(Debug, Clone)]
pub struct MessariClient {
    base_url: String,
    headers: HeaderMap,
    fetcher: HttpFetcher,
}

impl MessariClient {
    /// Create a new Messari API client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the key is not a valid header value
    pub fn new(config: MessariConfig) -> Result<Self, ApiError> {
        Url::parse(&config.base_url).map_err(|e| ApiError::Configuration {
            message: format!("invalid Messari base URL '{}': {e}", config.base_url),
        })?;

        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key.expose()).map_err(|e| {
                ApiError::Configuration {
                    message: format!("Messari API key is not a valid header value: {e}"),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        Ok(Self {
            base_url: config.base_url,
            headers,
            fetcher: HttpFetcher::new("messari", &config.fetch)?,
        })
    }

    /// GET `segments` under the base URL and return the envelope's `data`
    pub async fn run_query(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = build_url(&self.base_url, segments, params)?;
        self.fetcher
            .get_json_validated(None, &url, &self.headers, take_data)
            .await
    }

    /// One page of the asset listing
    pub async fn get_all_assets(&self, query: &AssetQuery) -> Result<Vec<Value>, ApiError> {
        let page = query.page.map(|p| p.to_string());
        let limit = query.limit.map(|l| l.to_string());
        let fields = query.fields_param();

        let mut params = Vec::new();
        if let Some(page) = &page {
            params.push(("page", page.as_str()));
        }
        if let Some(limit) = &limit {
            params.push(("limit", limit.as_str()));
        }
        if let Some(fields) = &fields {
            params.push(("fields", fields.as_str()));
        }

        let data = self.run_query(&["v2", "assets"], &params).await?;
        let assets: Vec<Value> = serde_json::from_value(data)
            .map_err(|e| ApiError::invalid_response(format!("messari assets: {e}")))?;
        info!(count = assets.len(), "fetched Messari assets");
        Ok(assets)
    }

    /// Asset listing as a table keyed by slug
    pub async fn get_all_assets_table(&self, query: &AssetQuery) -> Result<RecordTable, ApiError> {
        let assets = self.get_all_assets(query).await?;
        Ok(keyed_table(&assets, "slug"))
    }

    /// Metadata of each asset
    pub async fn get_asset(&self, slugs: &[String], fields: &[String]) -> Result<RecordTable, ApiError> {
        validate_slugs(slugs)?;
        let fields = fields.join(",");
        let params: Vec<(&str, &str)> = if fields.is_empty() {
            Vec::new()
        } else {
            vec![("fields", fields.as_str())]
        };

        let mut table = RecordTable::new();
        for slug in slugs {
            let data = self.run_query(&["v1", "assets", slug.as_str()], &params).await?;
            table.insert_row(slug.clone(), flatten_json(&data));
        }
        Ok(table)
    }

    /// Profile of each asset, flattened with a `profile_` prefix
    ///
    /// `profile_metric` narrows the profile to one section, e.g. `investors`.
    pub async fn get_asset_profile(
        &self,
        slugs: &[String],
        profile_metric: Option<&str>,
    ) -> Result<BTreeMap<String, Map<String, Value>>, ApiError> {
        validate_slugs(slugs)?;
        let fields = profile_metric.map(|metric| format!("id,name,slug,symbol,profile/{metric}"));
        let params: Vec<(&str, &str)> = fields
            .as_deref()
            .map(|f| vec![("fields", f)])
            .unwrap_or_default();

        let mut profiles = BTreeMap::new();
        for slug in slugs {
            let data = self
                .run_query(&["v2", "assets", slug.as_str(), "profile"], &params)
                .await?;
            profiles.insert(slug.clone(), flatten_json(&data));
        }
        Ok(profiles)
    }

    /// All metrics of each asset, or one metric group when `metric` is given
    pub async fn get_asset_metrics(
        &self,
        slugs: &[String],
        metric: Option<&str>,
    ) -> Result<RecordTable, ApiError> {
        validate_slugs(slugs)?;
        let mut table = RecordTable::new();
        for slug in slugs {
            let mut segments = vec!["v1", "assets", slug.as_str(), "metrics"];
            if let Some(metric) = metric {
                segments.push(metric);
            }
            let data = self.run_query(&segments, &[]).await?;
            table.insert_row(slug.clone(), flatten_json(&data));
        }
        Ok(table)
    }

    /// Latest market data of each asset
    pub async fn get_asset_market_data(&self, slugs: &[String]) -> Result<RecordTable, ApiError> {
        self.get_asset_metrics(slugs, Some("market-data")).await
    }

    /// Exchange markets keyed by market id
    pub async fn get_all_markets(&self) -> Result<RecordTable, ApiError> {
        let data = self.run_query(&["v1", "markets"], &[]).await?;
        let markets: Vec<Value> = serde_json::from_value(data)
            .map_err(|e| ApiError::invalid_response(format!("messari markets: {e}")))?;
        Ok(keyed_table(&markets, "id"))
    }

    /// Time series of `metric` for each asset between two days
    ///
    /// Columns are `{slug}/{field}` for every field of the response schema
    /// except the timestamp.
    pub async fn get_metric_timeseries(
        &self,
        slugs: &[String],
        metric: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<TimeSeriesFrame, ApiError> {
        validate_slugs(slugs)?;
        if metric.trim().is_empty() {
            return Err(ApiError::invalid_input("metric must be non-empty"));
        }
        if start > end {
            return Err(ApiError::invalid_input(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let start = start.to_string();
        let end = end.to_string();
        let params = [
            ("start", start.as_str()),
            ("end", end.as_str()),
            ("interval", interval),
        ];

        let mut frame = TimeSeriesFrame::new();
        for slug in slugs {
            let data = self
                .run_query(
                    &["v1", "assets", slug.as_str(), "metrics", metric, "time-series"],
                    &params,
                )
                .await?;
            let series: TimeSeriesData = serde_json::from_value(data)
                .map_err(|e| ApiError::invalid_response(format!("messari time series: {e}")))?;
            let rows = series.insert_into(&mut frame, slug);
            debug!(%slug, metric, rows, "fetched Messari time series");
        }
        Ok(frame)
    }
}

impl ApiClient for MessariClient {
    async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        let url = build_url(&self.base_url, &["v2", "assets"], &[("limit", "1")])?;
        debug!(%url, "performing health check on Messari API");
        Ok(self.fetcher.check_health(&url, &self.headers).await)
    }

    fn name(&self) -> &'static str {
        "messari"
    }
}

fn validate_slugs(slugs: &[String]) -> Result<(), ApiError> {
    if slugs.is_empty() {
        return Err(ApiError::invalid_input("at least one asset slug is required"));
    }
    if slugs.iter().any(|s| s.trim().is_empty()) {
        return Err(ApiError::invalid_input("asset slugs must be non-empty"));
    }
    Ok(())
}

fn take_data(mut body: Value) -> Result<Value, ApiError> {
    if let Some(code) = body
        .get("status")
        .and_then(|s| s.get("error_code"))
        .filter(|c| !c.is_null())
    {
        let message = body
            .get("status")
            .and_then(|s| s.get("error_message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        warn!("messari API error: {} - {}", code, message);
        return Err(ApiError::provider("messari", message));
    }
    body.get_mut("data")
        .map(Value::take)
        .ok_or_else(|| ApiError::invalid_response("messari response has no data"))
}

fn keyed_table(items: &[Value], key: &str) -> RecordTable {
    items
        .iter()
        .filter_map(|item| {
            let id = match item.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    warn!(key, "messari item without key, skipping");
                    return None;
                }
            };
            Some((id, flatten_json(item)))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct TimeSeriesData {
    schema: TimeSeriesSchema,
    #[serde(default)]
    values: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesSchema {
    values_schema: OrderedKeys,
}

impl TimeSeriesData {
    /// Add this series' cells to `frame`, returning the number of rows read
    fn insert_into(self, frame: &mut TimeSeriesFrame, slug: &str) -> usize {
        let fields = self.schema.values_schema.0;
        let ts_index = fields
            .iter()
            .position(|f| f == TIMESTAMP_FIELD)
            .unwrap_or(0);
        let values = self.values.unwrap_or_default();

        for row in &values {
            let Some(timestamp) = row.get(ts_index).copied().flatten().and_then(millis_to_utc) else {
                warn!(%slug, "time series row without timestamp, skipping");
                continue;
            };
            for (i, field) in fields.iter().enumerate() {
                if i == ts_index {
                    continue;
                }
                if let Some(value) = row.get(i).copied().flatten() {
                    frame.insert(
                        timestamp,
                        format!("{slug}{COLUMN_LEVEL_SEPARATOR}{field}"),
                        value,
                    );
                }
            }
        }
        values.len()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis_to_utc(millis: f64) -> Option<DateTime<Utc>> {
    millis
        .is_finite()
        .then(|| DateTime::from_timestamp_millis(millis as i64))
        .flatten()
}

/// Object keys in document order; the values are ignored
#[derive(Debug)]
struct OrderedKeys(Vec<String>);

impl<'de> Deserialize<'de> for OrderedKeys {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeysVisitor;

        impl<'de> Visitor<'de> for KeysVisitor {
            type Value = OrderedKeys;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut keys = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, IgnoredAny)) = map.next_entry::<String, IgnoredAny>()? {
                    keys.push(key);
                }
                Ok(OrderedKeys(keys))
            }
        }

        deserializer.deserialize_map(KeysVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn asset_query_fields() {
        assert_eq!(AssetQuery::default().fields_param(), None);

        let query = AssetQuery {
            fields: vec!["id".to_string(), "metrics".to_string()],
            ..AssetQuery::default()
        };
        assert_eq!(query.fields_param().as_deref(), Some("id,metrics"));

        let query = AssetQuery {
            metric: Some("mining_stats".to_string()),
            ..AssetQuery::default()
        };
        assert_eq!(
            query.fields_param().as_deref(),
            Some("id,name,slug,symbol,metrics/mining_stats")
        );
    }

    #[test]
    fn envelope_error_code() {
        let body = json!({"status": {"error_code": null}, "data": {"id": "1"}});
        assert_eq!(take_data(body).unwrap(), json!({"id": "1"}));

        let body = json!({"status": {"error_code": 404, "error_message": "Asset with key = 'nope' not found."}});
        assert!(matches!(take_data(body), Err(ApiError::Provider { .. })));
    }

    #[test]
    fn slugs_are_validated() {
        assert!(validate_slugs(&[]).is_err());
        assert!(validate_slugs(&[String::new()]).is_err());
        assert!(validate_slugs(&["bitcoin".to_string()]).is_ok());
    }

    #[test]
    fn values_schema_keeps_document_order() {
        // alphabetical order would put "close" first
        let data: TimeSeriesData = serde_json::from_str(
            r#"{
                "schema": {"values_schema": {"timestamp": "t", "open": "o", "close": "c"}},
                "values": [[1590969600000, 9448.5, null], [1591056000000, 10208.1, 9518.2]]
            }"#,
        )
        .unwrap();
        assert_eq!(data.schema.values_schema.0, ["timestamp", "open", "close"]);

        let mut frame = TimeSeriesFrame::new();
        assert_eq!(data.insert_into(&mut frame, "bitcoin"), 2);
        assert_eq!(frame.columns(), ["bitcoin/open", "bitcoin/close"]);
        assert_eq!(frame.len(), 2);

        let first = DateTime::from_timestamp_millis(1_590_969_600_000).unwrap();
        assert_eq!(frame.get(first, "bitcoin/close"), None);
        assert_eq!(frame.get(first, "bitcoin/open"), Some(9448.5));
    }

    #[test]
    fn null_values_are_empty() {
        let data: TimeSeriesData = serde_json::from_value(json!({
            "schema": {"values_schema": {"timestamp": "t", "price": "p"}},
            "values": null
        }))
        .unwrap();
        let mut frame = TimeSeriesFrame::new();
        assert_eq!(data.insert_into(&mut frame, "tether"), 0);
        assert!(frame.is_empty());
    }
}
