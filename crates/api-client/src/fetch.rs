// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared GET-and-parse pipeline
//!
//! [`HttpFetcher`] is the single place where provider requests are sent. A call
//! goes through these stages:
//!
//! 1. wait for the provider rate limiter (and an optional endpoint limiter),
//! 2. send the GET under a timeout,
//! 3. map the status code onto [`ApiError`],
//! 4. parse the body as JSON.
//!
//! Retryable failures (transport errors, timeouts, 408, 429 and 5xx) are retried
//! with exponential backoff and jitter. After a rate limited attempt the next one
//! also waits out the reported `Retry-After`, capped at 30 seconds.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use reqwest::{
    Client, StatusCode,
    header::{HeaderMap, RETRY_AFTER},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_retry::{
    RetryIf,
    strategy::{ExponentialBackoff, jitter},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{ApiError, HealthStatus, RateLimitConfig, RateLimiter};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const REDACTED_QUERY_KEYS: &[&str] = &["apikey", "api_key"];

/// Per-provider request settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Extra attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    pub retry_base_delay_ms: u64,
    /// Provider-wide rate limit
    pub rate_limit: RateLimitConfig,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl FetchSettings {
    /// Defaults with a provider-specific request rate
    pub fn with_requests_per_second(requests_per_second: u32) -> Self {
        Self {
            rate_limit: RateLimitConfig::per_second(requests_per_second),
            ..Self::default()
        }
    }
}

/// Rate-limited, retrying JSON fetcher for one provider
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    provider: &'static str,
    client: Client,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay_ms: u64,
    retry_after_seconds: u64,
    limiter: Arc<RateLimiter>,
}

impl HttpFetcher {
    /// Create a fetcher for `provider`
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is zero or the HTTP client cannot be built
    pub fn new(provider: &'static str, settings: &FetchSettings) -> Result<Self, ApiError> {
        let timeout = Duration::from_secs(settings.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("caw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            provider,
            client,
            timeout,
            max_retries: settings.max_retries,
            retry_base_delay_ms: settings.retry_base_delay_ms,
            retry_after_seconds: settings.rate_limit.retry_after_seconds,
            limiter: Arc::new(RateLimiter::new(settings.rate_limit.requests_per_second)?),
        })
    }

    /// Name of the provider this fetcher serves
    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// GET `url` and parse the JSON body into `T`
    pub async fn get_json<T>(&self, url: &Url, headers: &HeaderMap) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.get_json_with(None, url, headers).await
    }

    /// Like [`HttpFetcher::get_json`], also waiting on an endpoint-specific limiter
    pub async fn get_json_with<T>(
        &self,
        endpoint_limiter: Option<&RateLimiter>,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.get_json_validated(endpoint_limiter, url, headers, |body| {
            serde_json::from_value(body).map_err(|e| {
                ApiError::invalid_response(format!("{} response: {e}", self.provider))
            })
        })
        .await
    }

    /// GET `url` and hand the JSON body to `validate`
    ///
    /// `validate` runs inside the retry loop, so providers that report errors in a
    /// successful body (for example a rate limit message) can return a retryable
    /// [`ApiError`] and have the request repeated.
    pub async fn get_json_validated<T, F>(
        &self,
        endpoint_limiter: Option<&RateLimiter>,
        url: &Url,
        headers: &HeaderMap,
        validate: F,
    ) -> Result<T, ApiError>
    where
        F: Fn(Value) -> Result<T, ApiError>,
    {
        // from_millis(2) doubles each step; factor scales the first delay to the base
        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor((self.retry_base_delay_ms / 2).max(1))
            .max_delay(MAX_RETRY_DELAY)
            .map(jitter)
            .take(usize::try_from(self.max_retries).unwrap_or(usize::MAX));

        // Earliest start of the next attempt, set by a rate limited response
        let not_before: Mutex<Option<Instant>> = Mutex::new(None);

        RetryIf::spawn(
            retry_strategy,
            || async {
                let wait_until = *not_before.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(deadline) = wait_until {
                    debug!(provider = self.provider, "waiting for rate limit window");
                    sleep_until(deadline).await;
                }

                let result = match self.attempt(endpoint_limiter, url, headers).await {
                    Ok(body) => validate(body),
                    Err(error) => Err(error),
                };
                if let Err(ApiError::RateLimitExceeded {
                    retry_after_seconds,
                }) = &result
                {
                    let delay = Duration::from_secs(*retry_after_seconds).min(MAX_RETRY_DELAY);
                    *not_before.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(Instant::now() + delay);
                }
                result
            },
            |error: &ApiError| {
                let retry = error.is_retryable();
                if retry {
                    warn!(
                        provider = self.provider,
                        url = %redact_url(url),
                        %error,
                        "request failed with retryable error, will retry"
                    );
                }
                retry
            },
        )
        .await
    }

    async fn attempt(
        &self,
        endpoint_limiter: Option<&RateLimiter>,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<Value, ApiError> {
        self.limiter.acquire().await;
        if let Some(limiter) = endpoint_limiter {
            limiter.acquire().await;
        }

        debug!(provider = self.provider, url = %redact_url(url), "sending request");

        let request = self.client.get(url.clone()).headers(headers.clone());
        let response = timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout {
                timeout_seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| ApiError::Http {
                message: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await.map_err(|e| ApiError::Http {
                    message: e.to_string(),
                })?;
                serde_json::from_str(&body).map_err(|e| {
                    ApiError::invalid_response(format!("{} returned non-JSON body: {e}", self.provider))
                })
            }
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Err(ApiError::Authentication {
                    message: format!("{} rejected credentials ({status})", self.provider),
                })
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound {
                resource: redact_url(url),
            }),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_seconds = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(self.retry_after_seconds);
                Err(ApiError::RateLimitExceeded {
                    retry_after_seconds,
                })
            }
            status if should_retry_status(status.as_u16()) => Err(ApiError::ServiceUnavailable {
                message: format!("{} returned status {}", self.provider, status.as_u16()),
            }),
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                warn!(
                    "{} API error: {} - {}",
                    self.provider,
                    status.as_u16(),
                    error_text
                );
                Err(ApiError::UnexpectedStatus {
                    status: status.as_u16(),
                    message: error_text,
                })
            }
        }
    }

    /// Single unretried request used for health checks
    pub async fn check_health(&self, url: &Url, headers: &HeaderMap) -> HealthStatus {
        self.limiter.acquire().await;
        debug!(provider = self.provider, url = %redact_url(url), "performing health check");

        let start_time = Instant::now();
        let request = self.client.get(url.clone()).headers(headers.clone());
        let response = match timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("{} health check failed: {}", self.provider, e);
                return HealthStatus::Down {
                    reason: format!("Request failed: {e}"),
                };
            }
            Err(_) => {
                warn!("{} health check timed out", self.provider);
                return HealthStatus::Down {
                    reason: format!("Timed out after {} seconds", self.timeout.as_secs()),
                };
            }
        };

        match response.status() {
            StatusCode::OK => {
                info!(
                    "{} health check passed in {:?}",
                    self.provider,
                    start_time.elapsed()
                );
                HealthStatus::Up
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("{} health check failed: unauthorized", self.provider);
                HealthStatus::Down {
                    reason: "Authentication failed".to_string(),
                }
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("{} health check failed: rate limited", self.provider);
                HealthStatus::Degraded {
                    reason: "Rate limited".to_string(),
                }
            }
            status => {
                warn!(
                    "{} health check failed with status: {}",
                    self.provider, status
                );
                HealthStatus::Degraded {
                    reason: format!("API returned status {}", status.as_u16()),
                }
            }
        }
    }
}

/// Determine if an HTTP status code should trigger a retry
fn should_retry_status(status: u16) -> bool {
    matches!(
        status,
        429 |           // Rate limit
        500
            ..=599 |     // Server errors
        408 // Request timeout
    )
}

/// Join `segments` onto `base` and append `query`
///
/// # Errors
///
/// Returns [`ApiError::Configuration`] when the result is not a valid URL
pub fn build_url(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ApiError> {
    let mut raw = base.trim_end_matches('/').to_string();
    for segment in segments {
        raw.push('/');
        raw.push_str(segment.trim_matches('/'));
    }

    let mut url = Url::parse(&raw).map_err(|e| ApiError::Configuration {
        message: format!("invalid URL '{raw}': {e}"),
    })?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Render `url` with API key query values masked
pub fn redact_url(url: &Url) -> String {
    if !url
        .query_pairs()
        .any(|(k, _)| REDACTED_QUERY_KEYS.contains(&k.as_ref()))
    {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if REDACTED_QUERY_KEYS.contains(&k.as_ref()) {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
