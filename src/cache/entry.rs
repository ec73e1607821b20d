//! Cache Entry Module
//!
//! Per-entry bookkeeping: value, TTL, and access metadata used by the
//! eviction policy.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A single cached value with its expiry and access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Successful reads since creation
    pub hit_count: u64,
    /// Timestamp of the most recent successful read (Unix milliseconds);
    /// equals `created_at` until the entry is first read
    pub last_accessed_at: u64,
    /// Estimated footprint of key plus serialized value, in bytes
    pub approx_bytes: usize,
}

impl<V> CacheEntry<V> {
    /// Creates an entry expiring `ttl` after now.
    pub fn new(value: V, ttl: Duration, approx_bytes: usize) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl.as_millis() as u64,
            hit_count: 0,
            last_accessed_at: now,
            approx_bytes,
        }
    }

    /// Whether the entry's TTL has fully elapsed.
    ///
    /// An entry is still valid at the exact expiry instant; it becomes
    /// expired once the current time passes `expires_at`.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() > self.expires_at
    }

    /// Records a successful read.
    pub fn touch(&mut self) {
        self.hit_count += 1;
        self.last_accessed_at = current_timestamp_ms();
    }

    /// Replaces the TTL, keeping the original creation time as the anchor.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.expires_at = self.created_at + ttl.as_millis() as u64;
    }

    /// Remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let now = current_timestamp_ms();
        self.expires_at.saturating_sub(now)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
