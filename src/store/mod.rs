//! Document store seam
//!
//! The remote document store is an external collaborator. This module
//! defines the narrow interface the sync layer consumes (live
//! subscriptions with pushed snapshots, one-shot reads, and writes) plus
//! an in-memory implementation used by the demo and the crate's own tests.

pub mod interface;
pub mod memory;

pub use interface::{
    DocumentStore, Snapshot, SnapshotObserver, StoreError, UnsubscribeHandle, WriteOp,
};
pub use memory::MemoryStore;
