//! Consumer registrations

use std::fmt;

use serde_json::Value;

use crate::entity::EntityRef;

/// Key identifying one consumer registration on a publisher
///
/// Re-subscribing under the same key overwrites the previous registration.
/// Keys starting with `__` are reserved for the layer's own internal
/// registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumerKey(String);

impl ConsumerKey {
    /// Create a consumer key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Reserved key for a publisher's own cross-entity link registration
    pub(crate) fn internal(entity: &EntityRef) -> Self {
        Self(format!("__link.{}", entity))
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConsumerKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ConsumerKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Receiver of entity updates
///
/// Each UI consumer registers one trait object per entity it watches. The
/// publisher invokes `on_update` with every new record state (including
/// the synchronous cached replay at subscribe time) and never after the
/// consumer's unsubscribe has returned. Delivery order across sibling
/// consumers is unspecified; no consumer may depend on it.
///
/// Callbacks run under the publisher's state lock: keep them short and do
/// not call back into the publisher from inside one.
pub trait Consumer: Send + Sync {
    /// A new record state for the subscribed entity
    fn on_update(&self, record: &Value);

    /// An update of a linked related entity (the domain a workbox
    /// denormalizes from). Ignored by default.
    fn on_related_update(&self, related: &Value) {
        let _ = related;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_equality_and_display() {
        let key = ConsumerKey::new("panel-7");
        assert_eq!(key, ConsumerKey::from("panel-7"));
        assert_eq!(key.to_string(), "panel-7");
        assert_eq!(key.as_str(), "panel-7");
    }

    #[test]
    fn test_internal_keys_are_namespaced() {
        let key = ConsumerKey::internal(&EntityRef::workbox("w1"));
        assert_eq!(key.as_str(), "__link.Workbox.w1");
    }
}
