// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Blockchain identifiers for the supported block explorers
//!
//! Etherscan and FTMScan expose the same API shape against different chains.
//! [`Chain`] carries the per-chain constants the explorer clients need.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Chains with a supported block explorer API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Chain {
    /// Ethereum Mainnet - Chain ID: 1
    Ethereum = 1,
    /// Fantom Opera - Chain ID: 250
    Fantom = 250,
}

impl Chain {
    /// Returns the numeric chain ID
    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Fantom => 250,
        }
    }

    /// Returns the human-readable name of the chain
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Fantom => "Fantom",
        }
    }

    /// Returns the ticker of the chain's native currency
    pub const fn native_symbol(self) -> &'static str {
        match self {
            Self::Ethereum => "ETH",
            Self::Fantom => "FTM",
        }
    }

    /// Returns the default explorer API endpoint for the chain
    pub const fn explorer_api_url(self) -> &'static str {
        match self {
            Self::Ethereum => "https://api.etherscan.io/api",
            Self::Fantom => "https://api.ftmscan.com/api",
        }
    }

    /// Returns the name of the explorer serving this chain
    pub const fn explorer_name(self) -> &'static str {
        match self {
            Self::Ethereum => "etherscan",
            Self::Fantom => "ftmscan",
        }
    }

    /// Returns all supported chains
    pub const fn all() -> &'static [Self] {
        &[Self::Ethereum, Self::Fantom]
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Chain {
    type Err = ChainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u64>() {
            return Self::try_from(id);
        }

        match s.to_uppercase().as_str() {
            "ETHEREUM" | "ETH" | "MAINNET" => Ok(Self::Ethereum),
            "FANTOM" | "FTM" | "OPERA" => Ok(Self::Fantom),
            _ => Err(ChainParseError::InvalidName(s.to_string())),
        }
    }
}

impl TryFrom<u64> for Chain {
    type Error = ChainParseError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::Ethereum),
            250 => Ok(Self::Fantom),
            _ => Err(ChainParseError::InvalidId(id)),
        }
    }
}

impl Serialize for Chain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.chain_id().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Chain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChainVisitor;

        impl serde::de::Visitor<'_> for ChainVisitor {
            type Value = Chain;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "a chain ID (1, 250), a chain ID string or a chain name (Ethereum, Fantom)"
                )
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Chain::try_from(value).map_err(E::custom)
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let value = u64::try_from(value).map_err(E::custom)?;
                self.visit_u64(value)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Chain::from_str(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ChainVisitor)
    }
}

/// Error type for chain parsing
#[derive(Debug, thiserror::Error)]
pub enum ChainParseError {
    /// Invalid chain ID number
    #[error("unsupported chain ID: {0}. Supported chain IDs are: 1 (Ethereum), 250 (Fantom)")]
    InvalidId(u64),
    /// Invalid chain name
    #[error("unsupported chain name: {0}. Supported chain names are: Ethereum, Fantom")]
    InvalidName(String),
}
