//! Configuration Module
//!
//! Cache and client configuration, loadable from environment variables.
//! Both are fixed at construction time; the only runtime knob the cache
//! exposes afterwards is a per-key TTL update.

use std::env;
use std::time::Duration;

// == Cache Config ==
/// Parameters for a cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// TTL applied to entries stored without an explicit one
    pub default_ttl: Duration,
    /// Interval between background sweeps of expired entries
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Loads cache configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        Self {
            max_entries: env_parse("CACHE_MAX_ENTRIES", 1000),
            default_ttl: Duration::from_secs(env_parse("CACHE_DEFAULT_TTL", 300)),
            sweep_interval: Duration::from_secs(env_parse("CACHE_SWEEP_INTERVAL", 60)),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

// == Client Config ==
/// Parameters for the API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `https://api.example.com`
    pub base_url: String,
    /// API key sent with every request
    pub api_key: String,
    /// Deadline applied to every remote call; not overridable per call
    pub timeout: Duration,
}

impl ClientConfig {
    /// Loads client configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `SERPRANK_API_URL` - Backend base URL (default: http://localhost:54321)
    /// - `SERPRANK_API_KEY` - API key (default: empty)
    /// - `SERPRANK_TIMEOUT` - Request timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("SERPRANK_API_URL")
                .unwrap_or_else(|_| "http://localhost:54321".to_string()),
            api_key: env::var("SERPRANK_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(env_parse("SERPRANK_TIMEOUT", 30)),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}
