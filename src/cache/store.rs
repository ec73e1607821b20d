//! Cache Store Module
//!
//! Synchronous cache engine: HashMap storage with per-entry TTL,
//! least-recently-accessed eviction, and bulk invalidation. None of these
//! operations fail; absence and expiry are ordinary return values.

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::cache::{CacheCounters, CacheEntry, CacheStats};

// == Cache Store ==
/// In-memory key-value store with TTL expiry and capacity-bounded eviction.
///
/// Values are cloned out on read; the owning layer decides what `V` is and
/// how it is (de)serialized.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Hit/miss/eviction accounting
    counters: CacheCounters,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL applied when the caller does not provide one
    default_ttl: Duration,
}

impl<V: Clone + Serialize> CacheStore<V> {
    // == Constructor ==
    /// Creates a store with the given capacity bound and default TTL.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            counters: CacheCounters::new(),
            max_entries,
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value under `key`, unconditionally replacing any existing
    /// entry and resetting its creation time and access metadata.
    ///
    /// When inserting a new key at capacity, the entry with the oldest
    /// `last_accessed_at` is evicted first. Ties are broken by whichever
    /// entry the iteration happens to visit first.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(oldest) = self.least_recently_accessed() {
                self.entries.remove(&oldest);
                self.counters.record_eviction();
            }
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        let approx_bytes = key.len() + serialized_len(&value);
        self.entries.insert(key, CacheEntry::new(value, ttl, approx_bytes));
    }

    // == Get ==
    /// Retrieves the value for `key` if present and unexpired.
    ///
    /// Expired entries are deleted on the spot and counted as misses.
    /// A hit bumps the entry's hit count and access time.
    pub fn get(&mut self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get_mut(key) {
            if entry.is_expired() {
                self.entries.remove(key);
                self.counters.record_miss();
                None
            } else {
                entry.touch();
                self.counters.record_hit();
                Some(entry.value.clone())
            }
        } else {
            self.counters.record_miss();
            None
        }
    }

    // == Has ==
    /// Whether an unexpired entry exists for `key`.
    ///
    /// Applies the same expiry check as `get` (deleting expired entries as
    /// a side effect) but updates neither counters nor access metadata.
    pub fn has(&mut self, key: &str) -> bool {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                self.entries.remove(key);
                false
            } else {
                true
            }
        } else {
            false
        }
    }

    // == Delete ==
    /// Removes an entry; returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry and resets the hit/miss/eviction counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.counters.reset();
    }

    // == Invalidate Pattern ==
    /// Deletes every entry whose key matches `pattern`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_pattern(&mut self, pattern: &Regex) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.is_match(key))
            .cloned()
            .collect();

        for key in &matching {
            self.entries.remove(key);
        }
        matching.len()
    }

    // == Invalidate Prefix ==
    /// Deletes every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            self.entries.remove(key);
        }
        matching.len()
    }

    // == Update TTL ==
    /// Replaces the TTL of an existing unexpired entry, anchored at the
    /// entry's original creation time. Returns whether the key existed.
    pub fn update_ttl(&mut self, key: &str, new_ttl: Duration) -> bool {
        if let Some(entry) = self.entries.get_mut(key) {
            if entry.is_expired() {
                self.entries.remove(key);
                false
            } else {
                entry.set_ttl(new_ttl);
                true
            }
        } else {
            false
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries; returns how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }
        expired.len()
    }

    // == Stats ==
    /// Point-in-time snapshot of size, keys, footprint, and counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            keys: self.entries.keys().cloned().collect(),
            approx_memory_bytes: self.entries.values().map(|e| e.approx_bytes).sum(),
            hit_rate: self.counters.hit_rate(),
            total_hits: self.counters.hits,
            total_misses: self.counters.misses,
            evictions: self.counters.evictions,
        }
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key with the smallest `last_accessed_at`, if any.
    fn least_recently_accessed(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed_at)
            .map(|(key, _)| key.clone())
    }
}

fn serialized_len<V: Serialize>(value: &V) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}
