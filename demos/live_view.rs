//! Live workspace view demo
//!
//! Run with: cargo run --example live_view
//!
//! Drives the subscription layer against the in-memory store: two panels
//! watch the same workbox through one remote subscription, the workbox's
//! domain gets renamed remotely, and the denormalized domain name shows up
//! in the next workbox broadcast without any extra round trip.

use std::sync::Arc;

use serde_json::{json, Value};

use docsync_rs::{
    Consumer, ConsumerKey, DocumentStore, EntityRef, HubConfig, MemoryStore, SchemaTemplates,
    SubscriptionHub,
};

/// Panel consumer that logs every update it receives
struct Panel {
    name: &'static str,
}

impl Consumer for Panel {
    fn on_update(&self, record: &Value) {
        tracing::info!(
            panel = self.name,
            workbox = %record["name"],
            domain = %record["domain_name"],
            "Panel refreshed"
        );
    }

    fn on_related_update(&self, related: &Value) {
        tracing::info!(panel = self.name, domain = %related["name"], "Domain details updated");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docsync_rs=debug".parse()?)
                .add_directive("live_view=info".parse()?),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    store.seed(
        "domains/d1",
        json!({
            "version": "1",
            "name": "Acme",
            "plan": "free",
            "settings": {"notifications": true, "public": false}
        }),
    );
    // Stored before the layout field existed; upgraded on first load
    store.seed(
        "workboxes/w1",
        json!({
            "version": "1",
            "name": "Inbox",
            "domain_id": "d1",
            "domain_name": "Acme",
            "archived": false
        }),
    );

    let remote: Arc<dyn docsync_rs::DocumentStore> = store.clone();
    let (hub, mut failures) =
        SubscriptionHub::new(remote, SchemaTemplates::builtin(), HubConfig::default());

    tokio::spawn(async move {
        while let Some(failure) = failures.recv().await {
            tracing::warn!(error = %failure, "Entity unavailable");
        }
    });

    // Two panels share one remote subscription
    let workbox = EntityRef::workbox("w1");
    hub.attach(
        workbox.clone(),
        ConsumerKey::new("list-panel"),
        Arc::new(Panel { name: "list" }),
    );
    hub.attach(
        workbox.clone(),
        ConsumerKey::new("detail-panel"),
        Arc::new(Panel { name: "detail" }),
    );

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // A remote rename of the domain; both panels see the new name in the
    // workbox broadcast without a workbox fetch
    store
        .set_record(
            "domains/d1",
            json!({
                "version": "1",
                "name": "Acme Corp",
                "plan": "free",
                "settings": {"notifications": true, "public": false}
            }),
        )
        .await?;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let usage = hub.usage();
    println!(
        "usage: reads={} writes={} creates={} deletes={}",
        usage.reads, usage.writes, usage.creates, usage.deletes
    );

    hub.shutdown();
    println!(
        "retired subscriptions: {}",
        hub.registry().lifetime_totals().subscriptions
    );

    Ok(())
}
