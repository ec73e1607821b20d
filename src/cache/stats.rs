//! Cache Statistics Module
//!
//! Process-lifetime hit/miss/eviction counters and the observable
//! snapshot derived from them.

use serde::Serialize;

// == Cache Counters ==
/// Running counters, reset only by an explicit `clear`.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    /// Successful cache retrievals
    pub hits: u64,
    /// Failed retrievals (key absent or expired)
    pub misses: u64,
    /// Entries removed by the capacity policy
    pub evictions: u64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// hits / (hits + misses), or 0.0 before the first access.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Cache Stats ==
/// Point-in-time observability snapshot of a cache instance.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,
    /// Every stored key, in no particular order
    pub keys: Vec<String>,
    /// Rough memory footprint of keys plus serialized values
    pub approx_memory_bytes: usize,
    /// hits / (hits + misses), 0.0 before the first access
    pub hit_rate: f64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub evictions: u64,
}
