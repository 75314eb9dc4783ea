// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider API keys
//!
//! [`ApiKey`] is valid by construction: it always holds at least one
//! non-whitespace character. Its `Debug` and `Display` output shows only the
//! first four characters, so keys can sit in config structs that get logged.
//!
//! ```rust
//! use api_client::ApiKey;
//!
//! let key = ApiKey::new("QWERTY123456").unwrap();
//! assert_eq!(key.to_string(), "QWER****");
//! assert_eq!(key.expose(), "QWERTY123456");
//!
//! assert!(ApiKey::new("   ").is_err());
//! ```

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::ApiError;

const VISIBLE_PREFIX_CHARS: usize = 4;

/// A non-empty API secret
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(Box<str>);

impl ApiKey {
    /// Create a new key, rejecting empty or whitespace-only input
    pub fn new(key: impl Into<String>) -> Result<Self, ApiError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ApiError::Configuration {
                message: "API key cannot be empty or whitespace-only".to_string(),
            });
        }
        Ok(Self(key.into_boxed_str()))
    }

    /// The raw key, for request headers and query strings only
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn redacted(&self) -> String {
        let visible: String = if self.0.chars().count() > VISIBLE_PREFIX_CHARS {
            self.0.chars().take(VISIBLE_PREFIX_CHARS).collect()
        } else {
            String::new()
        };
        format!("{visible}****")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl FromStr for ApiKey {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_keys() {
        assert!(ApiKey::new("").is_err());
        assert!(ApiKey::new(" \t\n").is_err());
        assert!(matches!(
            "".parse::<ApiKey>(),
            Err(ApiError::Configuration { .. })
        ));
    }

    #[test]
    fn never_prints_full_key() {
        let key = ApiKey::new("ABCDEFGHIJ").unwrap();
        assert_eq!(key.to_string(), "ABCD****");
        assert_eq!(format!("{key:?}"), "ApiKey(\"ABCD****\")");
        assert_eq!(key.expose(), "ABCDEFGHIJ");

        let short = ApiKey::new("abc").unwrap();
        assert_eq!(short.to_string(), "****");
    }

    #[test]
    fn deserialises_with_validation() {
        let key: ApiKey = serde_json::from_str("\"secret-key\"").unwrap();
        assert_eq!(key.expose(), "secret-key");
        assert!(serde_json::from_str::<ApiKey>("\"  \"").is_err());
    }
}
