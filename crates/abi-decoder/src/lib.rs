// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! ABI-based decoding of contract calls and event logs
//!
//! Transaction input and log data fetched from block explorers are raw bytes.
//! Given the contract's JSON ABI, [`ContractDecoder`] turns them into the name of
//! the function or event plus a JSON object of named, human-readable arguments:
//!
//! - bytes and fixed bytes become `0x` hex strings
//! - addresses become EIP-55 checksummed strings
//! - integers become decimal strings, so no precision is lost
//! - tuples become objects keyed by their component names
//!
//! [`AbiCache`] keeps parsed decoders per contract address so that decoding a
//! large batch of transactions parses each ABI once.

pub mod cache;
pub mod convert;
pub mod decode;
pub mod error;

pub use cache::{AbiCache, AbiCacheStats};
pub use decode::{ContractDecoder, DecodedCall, DecodedLog, decode_log, decode_tx};
pub use error::DecodeError;
