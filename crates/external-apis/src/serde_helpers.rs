// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Lenient deserializers for provider payloads
//!
//! Explorer and DeFiLlama responses encode numbers as strings, numbers, or
//! either depending on the endpoint.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error};
use shared_types::units::parse_quantity;

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Unsigned(u64),
    Float(f64),
}

/// `u64` from a number or a decimal/hex string
pub fn u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => {
            let value = parse_quantity(s.trim()).map_err(D::Error::custom)?;
            u64::try_from(value).map_err(D::Error::custom)
        }
        StringOrNumber::Unsigned(n) => Ok(n),
        StringOrNumber::Float(f) => Err(D::Error::custom(format!("expected integer, got {f}"))),
    }
}

/// `f64` from a number or a numeric string
pub fn f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.trim().parse().map_err(D::Error::custom),
        #[allow(clippy::cast_precision_loss)]
        StringOrNumber::Unsigned(n) => Ok(n as f64),
        StringOrNumber::Float(f) => Ok(f),
    }
}

/// `U256` from a decimal or `0x` hex string
pub fn u256_quantity<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => parse_quantity(s.trim()).map_err(D::Error::custom),
        StringOrNumber::Unsigned(n) => Ok(U256::from(n)),
        StringOrNumber::Float(f) => Err(D::Error::custom(format!("expected integer, got {f}"))),
    }
}

/// Optional address where an empty string or `null` means none
///
/// Explorers report contract creations with `"to": ""`.
pub fn optional_address<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(D::Error::custom),
    }
}

/// UTC timestamp from unix seconds given as a number or string
pub fn unix_seconds<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = u64_lenient(deserializer)?;
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or_else(|| D::Error::custom(format!("timestamp {seconds} out of range")))
}
