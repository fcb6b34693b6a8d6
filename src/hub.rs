//! Subscription hub
//!
//! The hub is the single entry point UI consumers talk to: it hands out
//! entity publishers (creating them on first request), owns the registry,
//! the usage counters, and the schema templates, and carries the failure
//! channel every remote-call error is reported on.
//!
//! Constructed once at application start and shared by `Arc`; collaborators
//! receive it by reference, never through a process global.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::config::HubConfig;
use crate::entity::EntityRef;
use crate::error::EntityFailure;
use crate::publisher::{Consumer, ConsumerKey, EntityPublisher, SubscribeError};
use crate::registry::SubscriptionRegistry;
use crate::schema::SchemaTemplates;
use crate::store::DocumentStore;
use crate::usage::{UsageCounters, UsageSnapshot};

/// Receiver half of the hub's failure channel
pub type FailureReceiver = mpsc::UnboundedReceiver<EntityFailure>;

/// Hands out entity publishers and owns the layer's shared services
///
/// Thread-safe via `RwLock`. Lookups of live publishers take the read
/// path; creation and teardown take the write path and keep the publisher
/// table and the registry consistent within one critical section.
pub struct SubscriptionHub {
    store: Arc<dyn DocumentStore>,
    registry: Arc<SubscriptionRegistry>,
    usage: Arc<UsageCounters>,
    templates: Arc<SchemaTemplates>,
    config: HubConfig,
    publishers: RwLock<HashMap<EntityRef, Arc<EntityPublisher>>>,
    failures: mpsc::UnboundedSender<EntityFailure>,
}

impl SubscriptionHub {
    /// Create a hub and the receiver for its failure channel
    pub fn new(
        store: Arc<dyn DocumentStore>,
        templates: SchemaTemplates,
        config: HubConfig,
    ) -> (Arc<Self>, FailureReceiver) {
        let (failures, receiver) = mpsc::unbounded_channel();

        let hub = Arc::new(Self {
            store,
            registry: Arc::new(SubscriptionRegistry::new()),
            usage: Arc::new(UsageCounters::new()),
            templates: Arc::new(templates),
            config,
            publishers: RwLock::new(HashMap::new()),
            failures,
        });

        (hub, receiver)
    }

    /// Get the live publisher for an entity, creating one if absent
    ///
    /// Concurrent calls for the same key yield exactly one publisher, one
    /// registry entry, and one remote subscribe call. A publisher that
    /// closed but has not yet left the table is retired and replaced with a
    /// fresh one. Must be called from within a tokio runtime.
    pub fn get_or_create_publisher(self: &Arc<Self>, entity: EntityRef) -> Arc<EntityPublisher> {
        {
            let table = self.publishers.read();
            if let Some(existing) = table.get(&entity) {
                if !existing.is_closed() {
                    return Arc::clone(existing);
                }
            }
        }

        let mut table = self.publishers.write();
        if let Some(existing) = table.get(&entity) {
            if !existing.is_closed() {
                return Arc::clone(existing);
            }
            // A closed publisher still occupies the slot if its closing
            // thread has not reached the table yet; retire it here, under
            // the same lock that guards creation.
            let stale = Arc::clone(existing);
            table.remove(&entity);
            if self.registry.has(&entity) {
                if let Err(error) = self.registry.close(&entity) {
                    tracing::error!(entity = %entity, error = %error, "Registry close failed");
                }
            }
            stale.abort_driver();
        }

        if let Err(error) = self.registry.create(&entity) {
            // Cannot occur through this path; the registry fails loudly anyway
            tracing::error!(entity = %entity, error = %error, "Registry create failed");
        }

        let publisher = EntityPublisher::spawn(entity.clone(), self);
        table.insert(entity, Arc::clone(&publisher));
        tracing::info!(entity = %publisher.entity(), "Publisher created");
        publisher
    }

    /// Get-or-create plus subscribe in one call
    ///
    /// Retries when the publisher closes between lookup and subscribe, so
    /// the caller always ends up registered on a live publisher.
    pub fn attach(
        self: &Arc<Self>,
        entity: EntityRef,
        key: ConsumerKey,
        consumer: Arc<dyn Consumer>,
    ) -> Arc<EntityPublisher> {
        loop {
            let publisher = self.get_or_create_publisher(entity.clone());
            match publisher.subscribe(key.clone(), Arc::clone(&consumer)) {
                Ok(()) => return publisher,
                Err(SubscribeError::PublisherClosed(_)) => continue,
            }
        }
    }

    /// Look up the live publisher for an entity, if any
    pub fn publisher(&self, entity: &EntityRef) -> Option<Arc<EntityPublisher>> {
        self.publishers.read().get(entity).cloned()
    }

    /// Number of publishers currently in the table
    pub fn publisher_count(&self) -> usize {
        self.publishers.read().len()
    }

    /// Point-in-time view of the usage counters
    pub fn usage(&self) -> UsageSnapshot {
        self.usage.snapshot()
    }

    /// The document store this hub talks to
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// The subscription registry
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// The usage counters
    pub fn usage_counters(&self) -> &Arc<UsageCounters> {
        &self.usage
    }

    /// The schema template table
    pub fn templates(&self) -> &Arc<SchemaTemplates> {
        &self.templates
    }

    /// The hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Tear everything down; used at full sign-out
    ///
    /// Drops every consumer, closes every registry entry (cancelling the
    /// remote subscriptions), and empties the publisher table.
    pub fn shutdown(&self) {
        let mut table = self.publishers.write();
        let count = table.len();
        for (_, publisher) in table.drain() {
            publisher.force_close();
        }
        self.registry.close_all();
        drop(table);

        tracing::info!(publishers = count, "Subscription hub shut down");
    }

    /// Remove a closed publisher from the table and close its registry
    /// entry; no-op if the slot was already retired or replaced
    pub(crate) fn retire_publisher(&self, publisher: &Arc<EntityPublisher>) {
        let mut table = self.publishers.write();
        let entity = publisher.entity();

        let current = table
            .get(entity)
            .map_or(false, |existing| Arc::ptr_eq(existing, publisher));
        if !current {
            return;
        }

        table.remove(entity);
        if self.registry.has(entity) {
            if let Err(error) = self.registry.close(entity) {
                tracing::error!(entity = %entity, error = %error, "Registry close failed");
            }
        }
    }

    pub(crate) fn failure_sender(&self) -> mpsc::UnboundedSender<EntityFailure> {
        self.failures.clone()
    }
}
