//! Realtime change feed
//!
//! Fan-out of row change events, keyed by table name. The backend's push
//! adapter publishes into a [`ChangeHub`]; client subscriptions consume
//! from it, invalidating the affected cache entries before the caller's
//! callback sees the event. A read through the cache after a notification
//! therefore never returns pre-change data.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Buffered events per table channel before slow receivers start lagging.
const CHANNEL_CAPACITY: usize = 64;

// == Change Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

// == Change Event ==
/// A single row change as delivered by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Table the change happened in
    pub table: String,
    pub kind: ChangeKind,
    /// Row state before the change (updates and deletes)
    pub old: Option<Value>,
    /// Row state after the change (inserts and updates)
    pub new: Option<Value>,
}

impl ChangeEvent {
    /// The most relevant row payload: the new state when present,
    /// otherwise the old one.
    pub fn row(&self) -> Option<&Value> {
        self.new.as_ref().or(self.old.as_ref())
    }
}

// == Change Hub ==
/// Per-table broadcast of change events.
///
/// Channels are created lazily on first use from either side, so the
/// publish and subscribe order does not matter.
#[derive(Debug, Default)]
pub struct ChangeHub {
    channels: Mutex<HashMap<String, broadcast::Sender<ChangeEvent>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a receiver for one table's change stream.
    pub fn subscribe(&self, table: &str) -> broadcast::Receiver<ChangeEvent> {
        self.sender(table).subscribe()
    }

    /// Delivers an event to every current subscriber of its table.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let sender = self.sender(&event.table);
        debug!(table = %event.table, kind = ?event.kind, "change event published");
        sender.send(event).unwrap_or(0)
    }

    fn sender(&self, table: &str) -> broadcast::Sender<ChangeEvent> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

// == Subscription ==
/// Handle to a running change listener.
///
/// Dropping the handle stops the listener; `unsubscribe` does the same
/// explicitly.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Stops the listener task.
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
