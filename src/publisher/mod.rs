//! Entity publishers
//!
//! One publisher per live entity multiplexes a single remote subscription
//! to any number of local consumers. The publisher caches the latest
//! record, replays it to late joiners, runs the one-time schema upgrade on
//! the first snapshot, and tears the remote subscription down exactly when
//! its last consumer leaves.
//!
//! # Architecture
//!
//! ```text
//!        DocumentStore ──push──► mpsc queue ──► driver task (one per entity)
//!                                                    │
//!                                      ┌─────────────┴─────────────┐
//!                                      │ Arc<EntityPublisher>      │
//!                                      │   cached record           │
//!                                      │   subscribers: Key → dyn  │
//!                                      │   Consumer                │
//!                                      └──────┬──────┬──────┬──────┘
//!                                             ▼      ▼      ▼
//!                                        on_update fan-out to every
//!                                        registered consumer
//! ```
//!
//! A workbox publisher additionally registers an internal consumer on its
//! domain's publisher; domain updates are forwarded into the workbox's own
//! event queue and patch the denormalized domain name before re-broadcast.

pub mod consumer;
mod driver;
pub mod entry;
mod link;
pub mod state;

pub use consumer::{Consumer, ConsumerKey};
pub use entry::{EntityPublisher, SubscribeError};
pub use state::PublisherPhase;
