//! Entity publisher implementation

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::consumer::{Consumer, ConsumerKey};
use super::driver::{self, PublisherEvent};
use super::state::{LinkState, PublisherPhase, PublisherState};
use crate::config::HubConfig;
use crate::entity::EntityRef;
use crate::error::{EntityFailure, FailureKind};
use crate::hub::SubscriptionHub;
use crate::registry::SubscriptionRegistry;
use crate::schema::SchemaTemplates;
use crate::store::DocumentStore;
use crate::usage::UsageCounters;

/// Error returned when subscribing to a torn-down publisher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    /// The publisher closed between lookup and subscribe; fetch a fresh one
    #[error("publisher closed: {0}")]
    PublisherClosed(EntityRef),
}

/// Multiplexes one remote subscription to many local consumers
///
/// One instance per live entity, shared by every consumer of that entity's
/// id. Lifetime runs from the first subscribe to the last unsubscribe; the
/// hub's table and the registry entry exist exactly as long as the
/// publisher does.
pub struct EntityPublisher {
    entity: EntityRef,
    state: Mutex<PublisherState>,
    hub: Weak<SubscriptionHub>,
    store: Arc<dyn DocumentStore>,
    registry: Arc<SubscriptionRegistry>,
    usage: Arc<UsageCounters>,
    templates: Arc<SchemaTemplates>,
    config: HubConfig,
    failures: mpsc::UnboundedSender<EntityFailure>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl EntityPublisher {
    /// Construct the publisher and spawn its driver task
    ///
    /// Called by the hub with the publisher table locked; the registry
    /// entry for the key has already been created.
    pub(crate) fn spawn(entity: EntityRef, hub: &Arc<SubscriptionHub>) -> Arc<Self> {
        let (events, receiver) = mpsc::unbounded_channel();

        let publisher = Arc::new(Self {
            entity,
            state: Mutex::new(PublisherState {
                phase: PublisherPhase::Unopened,
                cached: None,
                subscribers: HashMap::new(),
                link: None,
                events: Some(events),
            }),
            hub: Arc::downgrade(hub),
            store: Arc::clone(hub.store()),
            registry: Arc::clone(hub.registry()),
            usage: Arc::clone(hub.usage_counters()),
            templates: Arc::clone(hub.templates()),
            config: hub.config().clone(),
            failures: hub.failure_sender(),
            driver: Mutex::new(None),
        });

        let task = tokio::spawn(driver::run(Arc::clone(&publisher), receiver));
        *publisher.driver.lock() = Some(task);
        publisher
    }

    /// Entity this publisher serves
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> PublisherPhase {
        self.state.lock().phase
    }

    /// Whether the publisher has been torn down
    pub fn is_closed(&self) -> bool {
        self.phase() == PublisherPhase::Closed
    }

    /// Number of registered consumers (including internal link consumers
    /// of dependent publishers)
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Clone of the cached record, if any snapshot arrived yet
    pub fn cached_record(&self) -> Option<Value> {
        self.state.lock().cached.clone()
    }

    /// Register a consumer under a key
    ///
    /// Re-subscribing under the same key overwrites the previous
    /// registration. If a cached record exists it is replayed to the new
    /// consumer synchronously, before this call returns, so a late joiner
    /// does not wait for the next remote push.
    pub fn subscribe(
        &self,
        key: ConsumerKey,
        consumer: Arc<dyn Consumer>,
    ) -> Result<(), SubscribeError> {
        let mut state = self.state.lock();
        if state.phase == PublisherPhase::Closed {
            return Err(SubscribeError::PublisherClosed(self.entity.clone()));
        }

        state.subscribers.insert(key.clone(), Arc::clone(&consumer));
        tracing::debug!(
            entity = %self.entity,
            consumer = %key,
            subscribers = state.subscribers.len(),
            "Consumer subscribed"
        );

        if self.config.replay_on_subscribe {
            if let Some(cached) = state.cached.clone() {
                consumer.on_update(&cached);
            }
        }
        Ok(())
    }

    /// Remove a consumer registration
    ///
    /// When the last subscriber leaves the publisher closes: the
    /// cross-entity link is detached, the registry entry is closed (which
    /// cancels the remote subscription), and the publisher is retired from
    /// the hub's table. Unknown keys are ignored.
    pub fn unsubscribe(self: &Arc<Self>, key: &ConsumerKey) {
        let link = {
            let mut state = self.state.lock();
            if state.subscribers.remove(key).is_none() {
                tracing::debug!(
                    entity = %self.entity,
                    consumer = %key,
                    "Unsubscribe for unknown consumer"
                );
                return;
            }
            tracing::debug!(
                entity = %self.entity,
                consumer = %key,
                subscribers = state.subscribers.len(),
                "Consumer unsubscribed"
            );

            if !state.subscribers.is_empty() || state.phase == PublisherPhase::Closed {
                return;
            }
            state.phase = PublisherPhase::Closed;
            state.events = None;
            state.link.take()
        };

        self.finish_close(link);
    }

    /// Drop every consumer registration without closing the remote
    /// subscription
    ///
    /// For callers that drop their UI consumers before knowing whether they
    /// also hold the last physical reference; the closing path stays
    /// [`unsubscribe`](Self::unsubscribe) or the hub's shutdown.
    pub fn unsubscribe_all(&self) {
        let mut state = self.state.lock();
        let dropped = state.subscribers.len();
        state.subscribers.clear();
        tracing::debug!(entity = %self.entity, dropped = dropped, "All consumers dropped");
    }

    fn finish_close(self: &Arc<Self>, link: Option<LinkState>) {
        tracing::info!(entity = %self.entity, "Publisher closed");
        let hub = self.hub.upgrade();

        if let (Some(hub), Some(link)) = (hub.as_ref(), link) {
            if let Some(related) = hub.publisher(&link.related) {
                related.unsubscribe(&link.consumer_key);
            }
        }

        match hub {
            Some(hub) => hub.retire_publisher(self),
            None => {
                // Hub already gone; close the registry entry directly
                if self.registry.has(&self.entity) {
                    if let Err(error) = self.registry.close(&self.entity) {
                        tracing::error!(
                            entity = %self.entity,
                            error = %error,
                            "Registry close failed"
                        );
                    }
                }
                self.abort_driver();
            }
        }
    }

    /// Tear down without touching the registry
    ///
    /// Used by the hub's shutdown, which closes every registry entry
    /// itself.
    pub(crate) fn force_close(&self) {
        {
            let mut state = self.state.lock();
            state.phase = PublisherPhase::Closed;
            state.subscribers.clear();
            state.link = None;
            state.events = None;
        }
        self.abort_driver();
    }

    pub(crate) fn abort_driver(&self) {
        if let Some(task) = self.driver.lock().take() {
            task.abort();
        }
    }

    /// Apply a remote snapshot: cache it and fan it out
    ///
    /// Returns false if the publisher closed while the snapshot was queued.
    pub(super) fn apply_snapshot(&self, record: Value) -> bool {
        let mut state = self.state.lock();
        if state.phase == PublisherPhase::Closed {
            return false;
        }

        state.cached = Some(record.clone());
        state.phase = PublisherPhase::LiveCached;

        for consumer in state.subscribers.values() {
            consumer.on_update(&record);
        }
        true
    }

    pub(super) fn set_phase(&self, phase: PublisherPhase) {
        let mut state = self.state.lock();
        if state.phase != PublisherPhase::Closed {
            state.phase = phase;
        }
    }

    pub(super) fn mark_live(&self) {
        let mut state = self.state.lock();
        if state.phase == PublisherPhase::Opening {
            state.phase = PublisherPhase::LiveEmpty;
        }
    }

    pub(super) fn events_sender(&self) -> Option<mpsc::UnboundedSender<PublisherEvent>> {
        self.state.lock().events.clone()
    }

    /// Log and report a failure on the hub's failure channel
    pub(super) fn report(&self, kind: FailureKind) {
        tracing::error!(entity = %self.entity, error = %kind, "Entity failure");
        let _ = self.failures.send(EntityFailure {
            entity: self.entity.clone(),
            kind,
        });
    }

    pub(super) fn mark_schema_checked(&self) {
        if let Err(error) = self.registry.mark_schema_checked(&self.entity) {
            tracing::error!(
                entity = %self.entity,
                error = %error,
                "Schema flag update failed"
            );
        }
    }

    pub(super) fn state(&self) -> &Mutex<PublisherState> {
        &self.state
    }

    pub(super) fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub(super) fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub(super) fn usage(&self) -> &UsageCounters {
        &self.usage
    }

    pub(super) fn templates(&self) -> &SchemaTemplates {
        &self.templates
    }

    pub(super) fn config(&self) -> &HubConfig {
        &self.config
    }

    pub(super) fn hub_ref(&self) -> Option<Arc<SubscriptionHub>> {
        self.hub.upgrade()
    }
}
