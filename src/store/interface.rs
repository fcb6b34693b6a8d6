//! Store traits and wire types

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure surface of the remote document store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The addressed record does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to read or write the addressed record
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The store could not be reached or refused the call
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One delivery from a live subscription
#[derive(Debug, Clone)]
pub enum Snapshot {
    /// The record exists with this content
    Present(Value),
    /// The record does not exist (deleted, or never created)
    Missing,
}

/// Receiver side of a live subscription
///
/// The store pushes every snapshot in order; delivery is sequential per
/// subscription but concurrent across subscriptions.
pub trait SnapshotObserver: Send + Sync {
    /// A new snapshot of the subscribed record
    fn on_snapshot(&self, snapshot: Snapshot);

    /// The subscription failed (e.g. permission revoked). Terminal; the
    /// store sends nothing further.
    fn on_error(&self, error: StoreError);
}

/// Owned token that cancels a live subscription when consumed
///
/// Returned by [`DocumentStore::subscribe`] and owned exclusively by the
/// registry entry of the subscribed entity.
pub struct UnsubscribeHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl UnsubscribeHandle {
    /// Wrap a cancel closure supplied by the store
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the remote subscription
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for UnsubscribeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsubscribeHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// A single write in a batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create or replace a record
    Set {
        /// Document path
        path: String,
        /// Full record content
        record: Value,
    },
    /// Delete a record
    Delete {
        /// Document path
        path: String,
    },
}

/// Narrow interface to the remote document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live subscription on a document path
    ///
    /// The observer receives the current snapshot followed by one snapshot
    /// per remote change, in order. The returned handle cancels the
    /// subscription when consumed.
    async fn subscribe(
        &self,
        path: &str,
        observer: Arc<dyn SnapshotObserver>,
    ) -> Result<UnsubscribeHandle, StoreError>;

    /// Read a record once
    async fn get_once(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Create or replace a record (last writer wins)
    async fn set_record(&self, path: &str, record: Value) -> Result<(), StoreError>;

    /// Apply a batch of writes atomically
    async fn batch_write(&self, writes: Vec<WriteOp>) -> Result<(), StoreError>;
}
