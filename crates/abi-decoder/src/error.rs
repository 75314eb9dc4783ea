// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Decoding errors

use alloy_primitives::{B256, Selector};
use thiserror::Error;

/// Errors that can occur while decoding calls and logs
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum DecodeError {
    /// No ABI was available for the contract
    #[error("no matching abi")]
    NoMatchingAbi,

    /// The ABI document could not be parsed
    #[error("invalid ABI JSON: {0}")]
    InvalidAbi(#[from] serde_json::Error),

    /// Call input is shorter than a function selector
    #[error("input is {len} bytes, too short for a function selector")]
    InputTooShort { len: usize },

    /// No function in the ABI has this selector
    #[error("no function with selector {selector}")]
    UnknownSelector { selector: Selector },

    /// The log has no topics, so the event cannot be identified
    #[error("log has no topics")]
    MissingTopic,

    /// No non-anonymous event in the ABI has this signature hash
    #[error("no event with topic {topic}")]
    UnknownEvent { topic: B256 },

    /// The data does not match the function or event parameters
    #[error("decode error: {0}")]
    Abi(#[from] alloy_dyn_abi::Error),
}
