// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Ether denomination conversions
//!
//! Explorer APIs report quantities either as `0x`-prefixed hex (JSON-RPC proxy
//! endpoints) or as decimal strings (account endpoints). Everything is parsed
//! into [`U256`] wei first; float conversions are only for display.

use alloy_primitives::U256;
use thiserror::Error;

/// Number of wei in one gwei
pub const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Number of wei in one ether
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Errors from quantity parsing and conversion
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    /// The string is not a valid hex or decimal quantity
    #[error("invalid quantity '{0}'")]
    InvalidQuantity(String),

    /// The amount is negative, NaN or infinite
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Parse a quantity given as `0x`-prefixed hex or as a decimal string
pub fn parse_quantity(value: &str) -> Result<U256, UnitsError> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some("") => Ok(U256::ZERO),
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(trimmed, 10),
    };
    parsed.map_err(|_| UnitsError::InvalidQuantity(value.to_string()))
}

/// Converts wei to gwei
pub fn wei_to_gwei(wei: U256) -> f64 {
    to_f64(wei) / 1e9
}

/// Converts wei to ether
pub fn wei_to_ether(wei: U256) -> f64 {
    to_f64(wei) / 1e18
}

/// Converts gwei to wei, truncating any fraction of a wei
pub fn gwei_to_wei(gwei: f64) -> Result<U256, UnitsError> {
    scale_to_wei(gwei, 1e9)
}

/// Converts ether to wei, truncating any fraction of a wei
pub fn ether_to_wei(ether: f64) -> Result<U256, UnitsError> {
    scale_to_wei(ether, 1e18)
}

fn scale_to_wei(amount: f64, factor: f64) -> Result<U256, UnitsError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(UnitsError::InvalidAmount(amount.to_string()));
    }
    let wei = (amount * factor).trunc();
    // f64 has no exponent notation in `{:.0}` so this is always a plain integer
    U256::from_str_radix(&format!("{wei:.0}"), 10)
        .map_err(|_| UnitsError::InvalidAmount(amount.to_string()))
}

fn to_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::MAX)
}
