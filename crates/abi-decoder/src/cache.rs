// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Parsed ABI cache
//!
//! Decoding a batch of transactions usually touches a small set of contracts.
//! [`AbiCache`] keeps one parsed [`ContractDecoder`] per contract address so each
//! ABI document is parsed once. Entries never expire: an ABI for a deployed
//! contract does not change.
//!
//! Contracts whose ABI could not be obtained are remembered too, with the
//! reason, so a batch asks the explorer about each of them only once.

use std::sync::Arc;

use alloy_primitives::Address;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{ContractDecoder, DecodeError};

/// Concurrent map from contract address to parsed decoder
#[derive(Debug, Default)]
pub struct AbiCache {
    decoders: DashMap<Address, Arc<ContractDecoder>>,
    unavailable: DashMap<Address, String>,
    stats: DashMap<&'static str, u64>,
}

impl AbiCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the decoder for `address`, if cached
    pub fn get(&self, address: &Address) -> Option<Arc<ContractDecoder>> {
        if let Some(decoder) = self.decoders.get(address) {
            self.increment_stat("cache_hits");
            trace!(%address, "abi cache hit");
            return Some(Arc::clone(decoder.value()));
        }
        self.increment_stat("cache_misses");
        None
    }

    /// Store a decoder, replacing any previous entry
    pub fn insert(&self, address: Address, decoder: ContractDecoder) -> Arc<ContractDecoder> {
        let decoder = Arc::new(decoder);
        self.decoders.insert(address, Arc::clone(&decoder));
        self.increment_stat("cache_stores");
        trace!(%address, entries = self.decoders.len(), "stored abi in cache");
        decoder
    }

    /// Remember that no ABI could be obtained for `address`
    pub fn mark_unavailable(&self, address: Address, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(%address, %reason, "abi marked unavailable");
        self.unavailable.insert(address, reason);
        self.increment_stat("cache_failures");
    }

    /// Why no ABI is available for `address`, if a lookup already failed
    pub fn unavailable(&self, address: &Address) -> Option<String> {
        let reason = self.unavailable.get(address)?;
        self.increment_stat("cache_hits");
        trace!(%address, "abi cache hit for unavailable contract");
        Some(reason.value().clone())
    }

    /// Return the cached decoder or parse `abi_json` and cache the result
    ///
    /// # Errors
    ///
    /// Returns an error if `abi_json` is not a valid ABI; nothing is cached then
    pub fn get_or_parse(
        &self,
        address: Address,
        abi_json: &str,
    ) -> Result<Arc<ContractDecoder>, DecodeError> {
        if let Some(decoder) = self.get(&address) {
            return Ok(decoder);
        }
        let decoder = ContractDecoder::from_json(abi_json)?;
        Ok(self.insert(address, decoder))
    }

    /// Number of cached decoders
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Drop all decoders, failures and statistics
    pub fn clear(&self) {
        self.decoders.clear();
        self.unavailable.clear();
        self.stats.clear();
        debug!("cleared abi cache");
    }

    /// Get cache statistics
    pub fn stats(&self) -> AbiCacheStats {
        let cache_hits = self.get_stat("cache_hits");
        let cache_misses = self.get_stat("cache_misses");
        let total_requests = cache_hits + cache_misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if total_requests > 0 {
            cache_hits as f64 / total_requests as f64
        } else {
            0.0
        };

        AbiCacheStats {
            entry_count: self.decoders.len(),
            cache_hits,
            cache_misses,
            cache_stores: self.get_stat("cache_stores"),
            unavailable_count: self.unavailable.len(),
            hit_rate,
        }
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats.entry(key).and_modify(|v| *v += 1).or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> u64 {
        self.stats.get(key).map_or(0, |v| *v)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiCacheStats {
    /// Number of cached decoders
    pub entry_count: usize,
    /// Lookups served from the cache
    pub cache_hits: u64,
    /// Lookups that found nothing
    pub cache_misses: u64,
    /// Decoders stored
    pub cache_stores: u64,
    /// Contracts remembered as having no usable ABI
    pub unavailable_count: usize,
    /// Cache hit rate (0.0 to 1.0)
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_ABI: &str = r#"[{
        "type": "function",
        "name": "balanceOf",
        "inputs": [{"name": "owner", "type": "address"}],
        "outputs": [{"name": "", "type": "uint256"}],
        "stateMutability": "view"
    }]"#;

    #[test]
    fn get_or_parse_caches_once() {
        let cache = AbiCache::new();
        let address = Address::repeat_byte(0x11);

        assert!(cache.get(&address).is_none());
        let first = cache.get_or_parse(address, MINIMAL_ABI).unwrap();
        let second = cache.get_or_parse(address, "not even json").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 2);
        assert_eq!(stats.cache_stores, 1);
    }

    #[test]
    fn invalid_abi_is_not_cached() {
        let cache = AbiCache::new();
        let address = Address::repeat_byte(0x22);

        let result = cache.get_or_parse(address, "{\"nope\": true");
        assert!(matches!(result, Err(DecodeError::InvalidAbi(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn unavailable_contracts_are_remembered() {
        let cache = AbiCache::new();
        let address = Address::repeat_byte(0x44);

        assert!(cache.unavailable(&address).is_none());
        cache.mark_unavailable(address, "Contract source code not verified");

        assert_eq!(
            cache.unavailable(&address).as_deref(),
            Some("Contract source code not verified")
        );
        assert!(cache.get(&address).is_none());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.unavailable_count, 1);
        assert_eq!(stats.cache_hits, 1);

        cache.clear();
        assert!(cache.unavailable(&address).is_none());
    }

    #[test]
    fn clear_resets_entries_and_stats() {
        let cache = AbiCache::new();
        cache
            .get_or_parse(Address::repeat_byte(0x33), MINIMAL_ABI)
            .unwrap();
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().cache_stores, 0);
        assert!((cache.stats().hit_rate - 0.0).abs() < f64::EPSILON);
    }
}
