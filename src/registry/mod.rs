//! Subscription registry
//!
//! The central table of live remote subscriptions, one entry per entity
//! key. The registry owns the one-subscription-per-key invariant and the
//! per-subscription bookkeeping: push call counts, the one-time
//! schema-checked flag, and the unsubscribe handle that tears the remote
//! subscription down.
//!
//! # Architecture
//!
//! ```text
//!                    Arc<SubscriptionRegistry>
//!               ┌────────────────────────────────┐
//!               │ entries: HashMap<EntityRef,    │
//!               │   RegistryEntry {              │
//!               │     unsubscribe, call_count,   │
//!               │     schema_checked,            │
//!               │   }                            │
//!               │ >                              │
//!               │ retired: RetiredTotals         │
//!               └───────────────┬────────────────┘
//!                               │
//!              one entry per live EntityPublisher;
//!              close() cancels the remote handle and
//!              folds call_count into the retired totals
//! ```
//!
//! The registry is an explicitly constructed service object, created once
//! at application start and shared by reference, never a process global.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::RegistryEntry;
pub use error::RegistryError;
pub use store::{RetiredTotals, SubscriptionRegistry};
