// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request spacing
//!
//! Providers publish limits as calls per second. [`RateLimiter`] enforces a
//! minimum gap of `1 / rps` between the *starts* of consecutive requests. A slot
//! is reserved under the lock and the caller sleeps outside it, so concurrent
//! callers queue up in order without holding the mutex across the wait.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::{
    sync::Mutex,
    time::{Instant, sleep_until},
};

use crate::ApiError;

const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;
const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;

/// Configuration for rate limiting behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Wait suggested on a 429 without a `Retry-After` header
    pub retry_after_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            retry_after_seconds: DEFAULT_RETRY_AFTER_SECONDS,
        }
    }
}

impl RateLimitConfig {
    /// Default config with a different request rate
    pub fn per_second(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            ..Self::default()
        }
    }
}

/// Minimum-spacing rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` request starts per second
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when `requests_per_second` is zero
    pub fn new(requests_per_second: u32) -> Result<Self, ApiError> {
        if requests_per_second == 0 {
            return Err(ApiError::Configuration {
                message: "requests_per_second must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            interval: Duration::from_secs(1) / requests_per_second,
            next_slot: Mutex::new(None),
        })
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self {
            interval: Duration::ZERO,
            next_slot: Mutex::new(None),
        }
    }

    /// Gap enforced between request starts
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request may start
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let start = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(start + self.interval);
            start
        };

        sleep_until(start).await;
    }
}
