// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared client traits and HTTP plumbing for crypto data providers
//!
//! Every provider wrapper follows the same shape: build a URL, wait for the rate
//! limiter, send a GET, parse the JSON body. This crate holds the pieces that
//! shape is built from.
//!
//! # Core Abstractions
//!
//! - **`ApiClient` Trait**: health checks and a stable provider name
//! - **[`ApiError`]**: one error model for transport, status and provider-level failures
//! - **[`HttpFetcher`]**: timeout, rate limiting and retry with exponential backoff
//! - **[`RateLimiter`]**: minimum spacing between request starts, shareable across tasks
//! - **[`ApiKey`]**: secret wrapper that never prints the full key

use thiserror::Error;

pub mod api_key;
pub mod fetch;
pub mod health;
pub mod rate_limit;

pub use api_key::ApiKey;
pub use fetch::{FetchSettings, HttpFetcher, build_url, redact_url};
pub use health::*;
pub use rate_limit::{RateLimitConfig, RateLimiter};

/// Generic trait for provider API clients
pub trait ApiClient: Send + Sync {
    /// Check the health of this API client
    ///
    /// # Errors
    ///
    /// Returns an error if the health check could not be completed
    fn health_check(&self) -> impl Future<Output = Result<HealthStatus, ApiError>> + Send;

    /// Get the name/identifier of this API client
    fn name(&self) -> &'static str;
}

/// Common errors that can occur when working with API clients
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {message}")]
    Http { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Authentication failed
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Invalid response format
    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },

    /// Service unavailable
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Network timeout
    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    /// Requested resource does not exist
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Status code with no more specific mapping
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The provider reported an error inside a successful response body
    #[error("{provider} returned an error: {message}")]
    Provider { provider: String, message: String },

    /// Caller supplied an unusable argument
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Reading or writing persisted results failed
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Client independent error
    #[error(transparent)]
    Custom { error: anyhow::Error },
}

impl ApiError {
    /// Whether repeating the request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http { .. }
                | Self::Timeout { .. }
                | Self::RateLimitExceeded { .. }
                | Self::ServiceUnavailable { .. }
        )
    }

    /// Shorthand for [`ApiError::InvalidInput`]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Shorthand for [`ApiError::InvalidResponse`]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Shorthand for [`ApiError::Provider`]
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse {
            message: error.to_string(),
        }
    }
}
