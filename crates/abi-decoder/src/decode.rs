// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Function call and event log decoding against a JSON ABI

use std::collections::HashMap;

use alloy_dyn_abi::{DynSolValue, EventExt, JsonAbiExt};
use alloy_json_abi::{Event, Function, JsonAbi};
use alloy_primitives::{B256, Selector};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::{convert::named_values, error::DecodeError};

/// A decoded function call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCall {
    /// Function name
    pub function: String,
    /// Arguments keyed by parameter name
    pub params: Map<String, Value>,
    /// The function's input parameter definitions from the ABI
    pub schema: Value,
}

/// A decoded event log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedLog {
    /// Event name
    pub event: String,
    /// Arguments keyed by parameter name, indexed and non-indexed together
    pub params: Map<String, Value>,
    /// The event's input parameter definitions from the ABI
    pub schema: Value,
}

impl DecodedCall {
    /// Arguments as a JSON string
    pub fn params_json(&self) -> String {
        Value::Object(self.params.clone()).to_string()
    }

    /// Parameter definitions as a JSON string
    pub fn schema_json(&self) -> String {
        self.schema.to_string()
    }
}

impl DecodedLog {
    /// Arguments as a JSON string
    pub fn params_json(&self) -> String {
        Value::Object(self.params.clone()).to_string()
    }

    /// Parameter definitions as a JSON string
    pub fn schema_json(&self) -> String {
        self.schema.to_string()
    }
}

/// Decoder for one contract's ABI
///
/// Functions are indexed by 4-byte selector and non-anonymous events by their
/// signature hash (topic 0).
#[derive(Debug, Clone)]
pub struct ContractDecoder {
    abi: JsonAbi,
    functions: HashMap<Selector, Function>,
    events: HashMap<B256, Event>,
}

impl ContractDecoder {
    /// Index a parsed ABI
    pub fn new(abi: JsonAbi) -> Self {
        let functions = abi.functions().map(|f| (f.selector(), f.clone())).collect();
        let events = abi
            .events()
            .filter(|e| !e.anonymous)
            .map(|e| (e.selector(), e.clone()))
            .collect();

        Self {
            abi,
            functions,
            events,
        }
    }

    /// Parse an ABI JSON document, as returned by explorer `getabi` endpoints
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        let abi: JsonAbi = serde_json::from_str(json)?;
        Ok(Self::new(abi))
    }

    /// The underlying ABI
    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Decode transaction input: a selector followed by ABI-encoded arguments
    pub fn decode_call(&self, input: &[u8]) -> Result<DecodedCall, DecodeError> {
        let Some((head, args)) = input.split_at_checked(4) else {
            return Err(DecodeError::InputTooShort { len: input.len() });
        };
        let selector = Selector::from_slice(head);
        let function = self
            .functions
            .get(&selector)
            .ok_or(DecodeError::UnknownSelector { selector })?;

        trace!(function = %function.name, %selector, "decoding call input");

        let values = function.abi_decode_input(args)?;
        let params = named_values(
            function
                .inputs
                .iter()
                .map(|p| (p.name.as_str(), p.components.as_slice())),
            &values,
        );

        Ok(DecodedCall {
            function: function.name.clone(),
            params,
            schema: serde_json::to_value(&function.inputs)?,
        })
    }

    /// Decode an event log from its topics and data
    pub fn decode_log(&self, topics: &[B256], data: &[u8]) -> Result<DecodedLog, DecodeError> {
        let topic = topics.first().ok_or(DecodeError::MissingTopic)?;
        let event = self
            .events
            .get(topic)
            .ok_or(DecodeError::UnknownEvent { topic: *topic })?;

        trace!(event = %event.name, %topic, "decoding log");

        let decoded = event.decode_log_parts(topics.iter().copied(), data)?;

        // restore declaration order from the indexed/body split
        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let values: Vec<DynSolValue> = event
            .inputs
            .iter()
            .filter_map(|p| if p.indexed { indexed.next() } else { body.next() })
            .collect();

        let params = named_values(
            event
                .inputs
                .iter()
                .map(|p| (p.name.as_str(), p.components.as_slice())),
            &values,
        );

        Ok(DecodedLog {
            event: event.name.clone(),
            params,
            schema: serde_json::to_value(&event.inputs)?,
        })
    }
}

/// Decode call input when the contract's ABI may be unknown
///
/// # Errors
///
/// Returns [`DecodeError::NoMatchingAbi`] when `decoder` is `None`
pub fn decode_tx(
    decoder: Option<&ContractDecoder>,
    input: &[u8],
) -> Result<DecodedCall, DecodeError> {
    decoder.ok_or(DecodeError::NoMatchingAbi)?.decode_call(input)
}

/// Decode a log when the contract's ABI may be unknown
///
/// # Errors
///
/// Returns [`DecodeError::NoMatchingAbi`] when `decoder` is `None`
pub fn decode_log(
    decoder: Option<&ContractDecoder>,
    topics: &[B256],
    data: &[u8],
) -> Result<DecodedLog, DecodeError> {
    decoder
        .ok_or(DecodeError::NoMatchingAbi)?
        .decode_log(topics, data)
}
