//! Background sweep task
//!
//! Periodically removes expired entries so that keys which are never read
//! again do not accumulate. Lazy deletion in `get`/`has` handles the hot
//! path; the sweep bounds memory growth for the rest.

use std::sync::Weak;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a task that sweeps the store at a fixed interval.
///
/// The task holds only a weak reference: once every cache handle is
/// dropped, the next tick fails to upgrade and the loop exits on its own.
/// [`CacheManager::close`](crate::cache::CacheManager::close) aborts it
/// eagerly for deterministic teardown.
pub fn spawn_sweep_task<V>(
    store: Weak<RwLock<CacheStore<V>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    tokio::spawn(async move {
        debug!("cache sweep task started, interval {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(store) = store.upgrade() else {
                debug!("cache dropped, sweep task exiting");
                break;
            };

            let removed = {
                let mut guard = store.write().await;
                guard.cleanup_expired()
            };

            if removed > 0 {
                info!("cache sweep removed {} expired entries", removed);
            } else {
                debug!("cache sweep found no expired entries");
            }
        }
    })
}
