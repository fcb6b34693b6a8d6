//! In-memory document store
//!
//! A complete [`DocumentStore`] implementation backed by process memory.
//! Subscribers receive the current snapshot on subscribe and one snapshot
//! per write. Deliveries happen under the store's internal lock, which
//! guarantees in-order delivery per subscription; observers must therefore
//! not call back into the store. Used by the demo and the crate's own
//! tests; the fault-injection methods simulate the failure modes of a real
//! remote store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::interface::{
    DocumentStore, Snapshot, SnapshotObserver, StoreError, UnsubscribeHandle, WriteOp,
};

struct Watcher {
    id: u64,
    observer: Arc<dyn SnapshotObserver>,
}

#[derive(Default)]
struct Tables {
    documents: HashMap<String, Value>,
    watchers: HashMap<String, Vec<Watcher>>,
    next_watcher_id: u64,
    subscribe_calls: HashMap<String, u64>,
    next_write_error: Option<StoreError>,
    next_subscribe_error: Option<StoreError>,
}

impl Tables {
    fn notify(&self, path: &str, snapshot: &Snapshot) {
        if let Some(watchers) = self.watchers.get(path) {
            tracing::trace!(path = path, watchers = watchers.len(), "Notifying watchers");
            for watcher in watchers {
                watcher.observer.on_snapshot(snapshot.clone());
            }
        }
    }
}

/// In-memory document store with live subscriptions
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
        }
    }

    /// Insert a record without notifying watchers
    ///
    /// Used to set up initial state before any subscription exists.
    pub fn seed(&self, path: impl Into<String>, record: Value) {
        self.tables.lock().documents.insert(path.into(), record);
    }

    /// Number of live watchers on a path
    pub fn watcher_count(&self, path: &str) -> usize {
        self.tables
            .lock()
            .watchers
            .get(path)
            .map_or(0, |watchers| watchers.len())
    }

    /// Total number of subscribe calls ever made for a path
    pub fn subscribe_count(&self, path: &str) -> u64 {
        self.tables
            .lock()
            .subscribe_calls
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Fail the next write call with the given error
    pub fn inject_write_error(&self, error: StoreError) {
        self.tables.lock().next_write_error = Some(error);
    }

    /// Fail the next subscribe call with the given error
    pub fn inject_subscribe_error(&self, error: StoreError) {
        self.tables.lock().next_subscribe_error = Some(error);
    }

    /// Push a terminal listener error to every watcher of a path
    ///
    /// Simulates e.g. a permission revocation on a live subscription.
    pub fn emit_error(&self, path: &str, error: StoreError) {
        let tables = self.tables.lock();
        if let Some(watchers) = tables.watchers.get(path) {
            for watcher in watchers {
                watcher.observer.on_error(error.clone());
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(
        &self,
        path: &str,
        observer: Arc<dyn SnapshotObserver>,
    ) -> Result<UnsubscribeHandle, StoreError> {
        let mut tables = self.tables.lock();
        *tables.subscribe_calls.entry(path.to_string()).or_insert(0) += 1;

        if let Some(error) = tables.next_subscribe_error.take() {
            return Err(error);
        }

        let id = tables.next_watcher_id;
        tables.next_watcher_id += 1;

        let initial = match tables.documents.get(path) {
            Some(record) => Snapshot::Present(record.clone()),
            None => Snapshot::Missing,
        };

        tables
            .watchers
            .entry(path.to_string())
            .or_default()
            .push(Watcher {
                id,
                observer: Arc::clone(&observer),
            });

        tracing::debug!(path = path, watcher = id, "Watcher subscribed");

        // Delivered under the lock so no write can slip in between the
        // initial snapshot and later notifications
        observer.on_snapshot(initial);

        let tables = Arc::clone(&self.tables);
        let watched = path.to_string();
        Ok(UnsubscribeHandle::new(move || {
            let mut tables = tables.lock();
            if let Some(watchers) = tables.watchers.get_mut(&watched) {
                watchers.retain(|watcher| watcher.id != id);
            }
            tracing::debug!(path = %watched, watcher = id, "Watcher removed");
        }))
    }

    async fn get_once(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.tables.lock().documents.get(path).cloned())
    }

    async fn set_record(&self, path: &str, record: Value) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if let Some(error) = tables.next_write_error.take() {
            return Err(error);
        }

        tables.documents.insert(path.to_string(), record.clone());
        tables.notify(path, &Snapshot::Present(record));
        Ok(())
    }

    async fn batch_write(&self, writes: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if let Some(error) = tables.next_write_error.take() {
            return Err(error);
        }

        for write in &writes {
            match write {
                WriteOp::Set { path, record } => {
                    tables.documents.insert(path.clone(), record.clone());
                }
                WriteOp::Delete { path } => {
                    tables.documents.remove(path);
                }
            }
        }

        // Notify after the whole batch landed, like a transactional commit
        for write in &writes {
            match write {
                WriteOp::Set { path, record } => {
                    tables.notify(path, &Snapshot::Present(record.clone()));
                }
                WriteOp::Delete { path } => {
                    tables.notify(path, &Snapshot::Missing);
                }
            }
        }
        Ok(())
    }
}
