//! Cross-entity link (workbox → domain)
//!
//! A workbox record carries a denormalized copy of its domain's name. On
//! its first cached record the workbox publisher registers an internal
//! consumer on the domain's publisher; domain updates are forwarded into
//! the workbox driver's own event queue, patch the denormalized field, and
//! re-broadcast exactly like a fresh remote snapshot, without a separate
//! remote fetch of the workbox document.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use super::consumer::{Consumer, ConsumerKey};
use super::driver::PublisherEvent;
use super::entry::EntityPublisher;
use super::state::{LinkState, PublisherPhase};
use crate::entity::{EntityKind, EntityRef};

const DOMAIN_ID_FIELD: &str = "domain_id";
const DOMAIN_NAME_FIELD: &str = "domain_name";
const NAME_FIELD: &str = "name";

/// Internal consumer a workbox publisher registers on its domain publisher
///
/// Forwards domain records into the workbox driver's event queue so
/// related updates are serialized with direct snapshots.
pub(super) struct LinkConsumer {
    events: mpsc::UnboundedSender<PublisherEvent>,
}

impl LinkConsumer {
    pub(super) fn new(events: mpsc::UnboundedSender<PublisherEvent>) -> Self {
        Self { events }
    }
}

impl Consumer for LinkConsumer {
    fn on_update(&self, record: &Value) {
        let _ = self.events.send(PublisherEvent::Related(record.clone()));
    }
}

impl EntityPublisher {
    /// Establish the cross-entity link once the first record is cached
    ///
    /// Only workbox publishers link; the domain id is read from the cached
    /// record. Records without a domain id are left unlinked.
    pub(super) fn ensure_link(self: &Arc<Self>, record: &Value) {
        if !self.config().link_related || self.entity().kind() != EntityKind::Workbox {
            return;
        }

        let events = {
            let state = self.state().lock();
            if state.link.is_some() || state.phase == PublisherPhase::Closed {
                return;
            }
            match state.events.clone() {
                Some(events) => events,
                None => return,
            }
        };

        let Some(domain_id) = record.get(DOMAIN_ID_FIELD).and_then(Value::as_str) else {
            tracing::warn!(entity = %self.entity(), "Workbox record has no domain id; link skipped");
            return;
        };

        let Some(hub) = self.hub_ref() else {
            return;
        };

        let related = EntityRef::domain(domain_id);
        let consumer_key = ConsumerKey::internal(self.entity());
        let consumer = Arc::new(LinkConsumer::new(events));
        hub.attach(related.clone(), consumer_key.clone(), consumer);

        let mut state = self.state().lock();
        if state.phase == PublisherPhase::Closed {
            // Raced a teardown; detach the registration we just made
            drop(state);
            if let Some(domain) = hub.publisher(&related) {
                domain.unsubscribe(&consumer_key);
            }
            return;
        }
        state.link = Some(LinkState {
            related: related.clone(),
            consumer_key,
        });
        drop(state);

        tracing::debug!(
            workbox = %self.entity(),
            domain = %related,
            "Cross-entity link established"
        );
    }

    /// Apply a forwarded update of the linked domain
    ///
    /// Every consumer sees the related record via `on_related_update`; if
    /// the domain's name differs from the cached record's denormalized
    /// copy, the field is patched and the record re-broadcast through
    /// `on_update`, indistinguishable from a direct snapshot.
    pub(super) fn apply_related(&self, related: &Value) {
        let mut state = self.state().lock();
        if state.phase == PublisherPhase::Closed {
            return;
        }

        for consumer in state.subscribers.values() {
            consumer.on_related_update(related);
        }

        let Some(new_name) = related.get(NAME_FIELD).cloned() else {
            return;
        };
        let Some(cached) = state.cached.as_mut() else {
            return;
        };
        if cached.get(DOMAIN_NAME_FIELD) == Some(&new_name) {
            return;
        }
        let Some(fields) = cached.as_object_mut() else {
            return;
        };
        fields.insert(DOMAIN_NAME_FIELD.to_string(), new_name);
        let record = cached.clone();

        tracing::debug!(entity = %self.entity(), "Denormalized domain name patched");
        for consumer in state.subscribers.values() {
            consumer.on_update(&record);
        }
    }
}
