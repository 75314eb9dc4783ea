// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the crypto API wrappers
//!
//! This crate provides the types that more than one wrapper needs: chain
//! identifiers for block explorers, wei/gwei/ether conversions, transaction gas
//! accounting and the tabular structures responses are reshaped into.

pub mod chains;
pub mod frame;
pub mod gas;
pub mod units;

pub use chains::{Chain, ChainParseError};
pub use frame::{RecordTable, TimeSeriesFrame, flatten_json};
pub use gas::GasInfo;
pub use units::UnitsError;
