// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Conversion of decoded ABI values into JSON

use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::Param;
use alloy_primitives::hex;
use serde_json::{Map, Value};

/// Key used for a parameter, falling back to `arg{index}` when it is unnamed
pub fn param_key(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("arg{index}")
    } else {
        name.to_string()
    }
}

/// Zip parameter descriptions with decoded values into a JSON object
///
/// Each item of `params` is the parameter name and its tuple components
/// (empty for non-tuple types).
pub fn named_values<'a, I>(params: I, values: &[DynSolValue]) -> Map<String, Value>
where
    I: IntoIterator<Item = (&'a str, &'a [Param])>,
{
    params
        .into_iter()
        .zip(values)
        .enumerate()
        .map(|(index, ((name, components), value))| {
            (param_key(name, index), value_to_json(value, components))
        })
        .collect()
}

/// Convert one decoded value
///
/// `components` describes tuple fields; for arrays of tuples it describes the
/// element type.
pub fn value_to_json(value: &DynSolValue, components: &[Param]) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(hex::encode_prefixed(&word[..(*size).min(32)]))
        }
        DynSolValue::Address(address) => Value::String(address.to_checksum(None)),
        DynSolValue::Function(function) => Value::String(hex::encode_prefixed(function.as_slice())),
        DynSolValue::Bytes(bytes) => Value::String(hex::encode_prefixed(bytes)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => Value::Array(
            items
                .iter()
                .map(|item| value_to_json(item, components))
                .collect(),
        ),
        DynSolValue::Tuple(fields) => Value::Object(named_values(
            components
                .iter()
                .map(|c| (c.name.as_str(), c.components.as_slice())),
            fields,
        )),
        // struct values only exist with the eip712 feature
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{other:?}")),
    }
}
