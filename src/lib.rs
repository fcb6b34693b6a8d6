//! Live-document subscription multiplexing and caching
//!
//! docsync sits between a remote document store and many UI consumers that
//! watch the same workspace records (domains, members, workboxes). It
//! guarantees at most one live remote subscription per logical entity, fans
//! every update out to all interested consumers, replays cached state to
//! late joiners, runs a one-time schema upgrade on the first load of each
//! entity, links dependent entities so cross-entity writes show up without
//! extra round trips, and tears the remote subscription down exactly when
//! the last consumer leaves.
//!
//! # Architecture
//!
//! ```text
//!   UI consumers ──subscribe──► SubscriptionHub
//!                                    │ get-or-create per entity
//!                                    ▼
//!                            EntityPublisher ◄──push── DocumentStore
//!                             │  cached record          (remote)
//!                             │  one registry entry
//!                             ▼
//!                      fan-out to N consumers
//! ```
//!
//! The remote store, the UI layer, and billing aggregation are external
//! collaborators reached through the narrow seams in [`store`], [`publisher`]
//! and [`usage`]. There is no retry or backoff anywhere in this layer:
//! failed entities are reported on the hub's failure channel and rendered
//! as unavailable by the application.

pub mod config;
pub mod entity;
pub mod error;
pub mod hub;
pub mod publisher;
pub mod registry;
pub mod schema;
pub mod store;
pub mod usage;

pub use config::HubConfig;
pub use entity::{EntityKind, EntityRef};
pub use error::{EntityFailure, FailureKind};
pub use hub::{FailureReceiver, SubscriptionHub};
pub use publisher::{Consumer, ConsumerKey, EntityPublisher, PublisherPhase, SubscribeError};
pub use registry::{RegistryError, RetiredTotals, SubscriptionRegistry};
pub use schema::SchemaTemplates;
pub use store::{
    DocumentStore, MemoryStore, Snapshot, SnapshotObserver, StoreError, UnsubscribeHandle, WriteOp,
};
pub use usage::{UsageCounters, UsageSnapshot};
