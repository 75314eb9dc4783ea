// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `caw`: a command line front end for the provider clients
//!
//! Configuration is layered from defaults, an optional `caw` file, `CAW__`
//! prefixed variables and finally the conventional `*_API_KEY` variables.
//! Each subcommand maps to one client call and prints its result as JSON.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Command};
pub use commands::{DecodedEventLog, DecodedTx, run};
pub use crate::config::CawConfig;
pub use error::{ConfigError, ConfigResult};
