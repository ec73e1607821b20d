//! Cache Manager Module
//!
//! Shared async handle around [`CacheStore`]: clones of a manager point at
//! the same entries, so one instance can be threaded through every caller
//! that should share a cache. Instances are constructed explicitly and
//! injected; there is no process-global cache.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::cache::{spawn_sweep_task, CacheStats, CacheStore};
use crate::config::CacheConfig;

// == Cache Manager ==
/// TTL cache with background sweeping and bulk invalidation.
///
/// All operations are non-failing; `get_or_set` only surfaces the
/// producer's own error. Synchronous store mutations are serialized by the
/// internal lock, which is never held across an await point except around
/// the individual store call.
#[derive(Debug, Clone)]
pub struct CacheManager<V> {
    store: Arc<RwLock<CacheStore<V>>>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<V> CacheManager<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache and starts its background sweep task.
    pub fn new(config: &CacheConfig) -> Self {
        let store = Arc::new(RwLock::new(CacheStore::new(
            config.max_entries,
            config.default_ttl,
        )));
        let sweeper = spawn_sweep_task(Arc::downgrade(&store), config.sweep_interval);

        Self {
            store,
            sweeper: Arc::new(Mutex::new(Some(sweeper))),
        }
    }

    // == Set ==
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.store.write().await.set(key, value, ttl);
    }

    // == Get ==
    pub async fn get(&self, key: &str) -> Option<V> {
        self.store.write().await.get(key)
    }

    // == Has ==
    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    // == Delete ==
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    // == Clear ==
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, or runs `producer` and caches
    /// its result.
    ///
    /// The producer runs without the cache lock held, so concurrent
    /// callers missing on the same key each invoke their own producer and
    /// the last write wins. Producer failures are propagated unchanged and
    /// nothing is cached.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.store.write().await.get(key) {
            return Ok(value);
        }

        let value = producer().await?;
        self.store.write().await.set(key, value.clone(), ttl);
        Ok(value)
    }

    // == Invalidate Pattern ==
    pub async fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        self.store.write().await.invalidate_pattern(pattern)
    }

    // == Invalidate Prefix ==
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.store.write().await.invalidate_prefix(prefix)
    }

    // == Update TTL ==
    pub async fn update_ttl(&self, key: &str, new_ttl: Duration) -> bool {
        self.store.write().await.update_ttl(key, new_ttl)
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Length ==
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    // == Close ==
    /// Stops the background sweep task.
    ///
    /// Entries remain readable afterwards; only the periodic sweeping
    /// ends. Safe to call more than once, and affects every clone of this
    /// manager.
    pub fn close(&self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}
