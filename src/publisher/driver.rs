//! Per-entity driver task
//!
//! Every publisher owns one spawned task that issues the remote subscribe
//! and then consumes pushed events strictly in order. A blocking schema
//! write-back therefore queues same-entity snapshots behind it while other
//! entities proceed independently; no cross-entity lock is held during
//! delivery.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use super::entry::EntityPublisher;
use super::state::PublisherPhase;
use crate::entity::EntityRef;
use crate::error::FailureKind;
use crate::schema::{record_variant, upgrade};
use crate::store::{Snapshot, SnapshotObserver, StoreError};

/// Events consumed by a publisher's driver task
pub(super) enum PublisherEvent {
    /// A snapshot pushed by the remote store
    Snapshot(Snapshot),
    /// The remote subscription failed; terminal
    Failed(StoreError),
    /// An update of the linked related entity, forwarded by the link
    /// consumer so it is serialized with direct snapshots
    Related(Value),
}

/// Forwards store pushes into the publisher's event queue
struct QueueObserver {
    events: mpsc::UnboundedSender<PublisherEvent>,
}

impl SnapshotObserver for QueueObserver {
    fn on_snapshot(&self, snapshot: Snapshot) {
        let _ = self.events.send(PublisherEvent::Snapshot(snapshot));
    }

    fn on_error(&self, error: StoreError) {
        let _ = self.events.send(PublisherEvent::Failed(error));
    }
}

/// Driver task body: open the subscription, then consume events until the
/// queue closes or a fatal failure stops the entity
pub(super) async fn run(
    publisher: Arc<EntityPublisher>,
    mut events: mpsc::UnboundedReceiver<PublisherEvent>,
) {
    let Some(sender) = publisher.events_sender() else {
        // Closed before the driver ever ran
        return;
    };

    publisher.set_phase(PublisherPhase::Opening);
    let observer = Arc::new(QueueObserver { events: sender });
    let path = publisher.entity().path();

    match publisher.store().subscribe(&path, observer).await {
        Ok(handle) => match publisher
            .registry()
            .register_unsubscribe(publisher.entity(), handle)
        {
            Ok(()) => publisher.mark_live(),
            Err(error) => {
                // The entry closed while the subscribe call was in flight;
                // the registry has cancelled the handle.
                tracing::debug!(
                    entity = %publisher.entity(),
                    error = %error,
                    "Subscription closed before it opened"
                );
                return;
            }
        },
        Err(error) => {
            publisher.report(FailureKind::Listener(error));
            return;
        }
    }

    while let Some(event) = events.recv().await {
        match event {
            PublisherEvent::Snapshot(snapshot) => {
                if !handle_snapshot(&publisher, snapshot).await {
                    break;
                }
            }
            PublisherEvent::Failed(error) => {
                publisher.report(FailureKind::Listener(error));
                break;
            }
            PublisherEvent::Related(related) => publisher.apply_related(&related),
        }
    }

    tracing::debug!(entity = %publisher.entity(), "Publisher driver stopped");
}

/// Process one snapshot; returns false when the entity is done for good
async fn handle_snapshot(publisher: &Arc<EntityPublisher>, snapshot: Snapshot) -> bool {
    let entity = publisher.entity().clone();

    if let Err(error) = publisher.registry().increment_call_count(&entity, 1) {
        // Entry already closed; the publisher is being torn down
        tracing::debug!(entity = %entity, error = %error, "Snapshot after close");
        return false;
    }
    publisher.usage().add_reads(1);

    let record = match snapshot {
        Snapshot::Present(record) => record,
        Snapshot::Missing => {
            publisher.report(FailureKind::NotFound);
            return false;
        }
    };

    let record = upgrade_if_first(publisher, &entity, record).await;

    if !publisher.apply_snapshot(record.clone()) {
        return false;
    }

    publisher.ensure_link(&record);
    true
}

/// Run the one-time schema upgrade on the first snapshot of this entity
///
/// Returns the record to cache: the upgraded record once the write-back
/// succeeded, the stored record otherwise. The checked flag is only set on
/// success (or when nothing needed upgrading), so a failed write-back is
/// retried naturally by the next snapshot.
async fn upgrade_if_first(
    publisher: &Arc<EntityPublisher>,
    entity: &EntityRef,
    record: Value,
) -> Value {
    if !publisher.config().schema_upgrade {
        return record;
    }

    match publisher.registry().is_schema_checked(entity) {
        Ok(false) => {}
        // Already checked, or the entry closed under us
        Ok(true) | Err(_) => return record,
    }

    let collection = entity.kind().collection();
    let variant = record_variant(&record);
    let Some(template) = publisher.templates().get(collection, &variant) else {
        // No template registered for this shape: treat as current
        publisher.mark_schema_checked();
        return record;
    };

    let (merged, changed) = upgrade(&template, None, &record);
    if !changed {
        publisher.mark_schema_checked();
        return record;
    }

    // Unconditional write: last writer wins across processes
    publisher.usage().add_writes(1);
    match publisher
        .store()
        .set_record(&entity.path(), merged.clone())
        .await
    {
        Ok(()) => {
            publisher.mark_schema_checked();
            tracing::info!(
                entity = %entity,
                collection = collection,
                version = %variant,
                "Schema upgraded"
            );
            merged
        }
        Err(error) => {
            publisher.report(FailureKind::WriteBack(error));
            record
        }
    }
}
