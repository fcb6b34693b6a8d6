//! Reported per-entity failures
//!
//! Remote-call failures are never swallowed: each one is logged and pushed
//! on the hub's failure channel as an [`EntityFailure`] so the owning
//! application can render the entity as unavailable. The layer itself never
//! retries and never panics the process.

use thiserror::Error;

use crate::entity::EntityRef;
use crate::store::StoreError;

/// What went wrong for one entity
#[derive(Debug, Clone, Error)]
pub enum FailureKind {
    /// The entity was deleted or never existed. Fatal for the entity; the
    /// publisher stops consuming pushes and waits for teardown.
    #[error("record not found")]
    NotFound,

    /// The remote subscription was rejected or revoked. Fatal for the
    /// entity; no retry.
    #[error("listener failed: {0}")]
    Listener(StoreError),

    /// The one-time schema upgrade could not be persisted. The pre-upgrade
    /// record stays cached and the next snapshot retries the merge.
    #[error("schema write-back failed: {0}")]
    WriteBack(StoreError),
}

/// A failure reported on the hub's failure channel
#[derive(Debug, Clone, Error)]
#[error("{entity}: {kind}")]
pub struct EntityFailure {
    /// Entity the failure belongs to
    pub entity: EntityRef,
    /// Failure classification
    pub kind: FailureKind,
}
