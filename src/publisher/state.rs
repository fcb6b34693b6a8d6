//! Publisher lifecycle state
//!
//! The mutable half of a publisher lives in one struct behind one mutex:
//! the subscriber map and the cached record are guarded together, so a
//! snapshot fan-out and an unsubscribe can never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use super::consumer::{Consumer, ConsumerKey};
use super::driver::PublisherEvent;
use crate::entity::EntityRef;

/// Publisher lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherPhase {
    /// Created, remote subscribe not yet issued
    Unopened,
    /// Remote subscribe call in flight
    Opening,
    /// Subscription accepted, no snapshot delivered yet
    LiveEmpty,
    /// At least one snapshot cached
    LiveCached,
    /// Last consumer left; the remote subscription is torn down
    Closed,
}

impl PublisherPhase {
    /// Whether the remote subscription is open
    pub fn is_live(&self) -> bool {
        matches!(self, PublisherPhase::LiveEmpty | PublisherPhase::LiveCached)
    }
}

/// Identity of an established cross-entity link
pub(super) struct LinkState {
    /// Related entity this publisher denormalizes from
    pub related: EntityRef,
    /// Internal registration key on the related publisher
    pub consumer_key: ConsumerKey,
}

/// Mutable publisher state, guarded by a single mutex
pub(super) struct PublisherState {
    /// Current lifecycle phase
    pub phase: PublisherPhase,

    /// Last record received from the remote store (or patched by the
    /// cross-entity link); replayed to late joiners
    pub cached: Option<Value>,

    /// Registered consumers by key
    pub subscribers: HashMap<ConsumerKey, Arc<dyn Consumer>>,

    /// Cross-entity link, once established
    pub link: Option<LinkState>,

    /// Sender half of the driver's event queue; taken on close so the
    /// driver can drain and stop
    pub events: Option<mpsc::UnboundedSender<PublisherEvent>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_phases() {
        assert!(!PublisherPhase::Unopened.is_live());
        assert!(!PublisherPhase::Opening.is_live());
        assert!(PublisherPhase::LiveEmpty.is_live());
        assert!(PublisherPhase::LiveCached.is_live());
        assert!(!PublisherPhase::Closed.is_live());
    }
}
