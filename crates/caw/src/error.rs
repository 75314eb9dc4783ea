// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the command line tool

use api_client::ApiError;
use thiserror::Error;

/// Errors raised while loading configuration or building provider clients
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration sources could not be read or deserialised
    #[error("Configuration error: {source}")]
    Load {
        /// Underlying config crate error
        #[from]
        source: config::ConfigError,
    },

    /// A provider that needs a key was requested without one
    #[error("{provider} API key is not set; export {variable} or CAW__{variable}")]
    MissingApiKey {
        /// Provider name
        provider: &'static str,
        /// Conventional environment variable for the key
        variable: &'static str,
    },

    /// Client construction failed
    #[error("Failed to create {provider} client: {source}")]
    Client {
        /// Provider name
        provider: &'static str,
        /// Underlying client error
        #[source]
        source: ApiError,
    },
}

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_names_variable() {
        let error = ConfigError::MissingApiKey {
            provider: "etherscan",
            variable: "ETHERSCAN_API_KEY",
        };
        assert_eq!(
            error.to_string(),
            "etherscan API key is not set; export ETHERSCAN_API_KEY or CAW__ETHERSCAN_API_KEY"
        );
    }
}
