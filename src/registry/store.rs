//! Subscription registry implementation

use std::collections::HashMap;

use parking_lot::Mutex;

use super::entry::RegistryEntry;
use super::error::RegistryError;
use crate::entity::EntityRef;
use crate::store::UnsubscribeHandle;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Process-lifetime totals folded in from closed entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetiredTotals {
    /// Subscriptions opened and later closed
    pub subscriptions: u64,
    /// Remote pushes those subscriptions delivered over their lifetime
    pub calls: u64,
}

#[derive(Default)]
struct Tables {
    entries: HashMap<EntityRef, RegistryEntry>,
    retired: RetiredTotals,
}

/// Central table of live remote subscriptions
///
/// One entry per entity key; an entry exists exactly while some publisher
/// holds an open remote subscription for that key. All operations take one
/// internal mutex that is never held across an await.
pub struct SubscriptionRegistry {
    tables: Mutex<Tables>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Insert a fresh entry for a key
    ///
    /// Fails with [`RegistryError::DoubleCreate`] if the key is already
    /// live; correct call sequencing never triggers this.
    pub fn create(&self, key: &EntityRef) -> Result<()> {
        let mut tables = self.tables.lock();
        if tables.entries.contains_key(key) {
            return Err(RegistryError::DoubleCreate(key.clone()));
        }
        tables.entries.insert(key.clone(), RegistryEntry::new());

        tracing::debug!(entity = %key, "Subscription registered");
        Ok(())
    }

    /// Attach the unsubscribe handle returned by the remote store
    ///
    /// Called exactly once per `create`, when the subscribe call resolves.
    /// On error the incoming handle is cancelled before returning, so a
    /// rejected handle never leaves a dangling remote subscription.
    pub fn register_unsubscribe(&self, key: &EntityRef, handle: UnsubscribeHandle) -> Result<()> {
        let mut handle = Some(handle);
        let rejected = {
            let mut tables = self.tables.lock();
            match tables.entries.get_mut(key) {
                None => Some(RegistryError::KeyNotFound(key.clone())),
                Some(entry) if entry.unsubscribe.is_some() => {
                    Some(RegistryError::HandleAlreadyRegistered(key.clone()))
                }
                Some(entry) => {
                    entry.unsubscribe = handle.take();
                    None
                }
            }
        };

        match rejected {
            None => Ok(()),
            Some(error) => {
                if let Some(handle) = handle {
                    handle.cancel();
                }
                Err(error)
            }
        }
    }

    /// Whether a key has a live entry
    pub fn has(&self, key: &EntityRef) -> bool {
        self.tables.lock().entries.contains_key(key)
    }

    /// Add `n` to a key's push call count; returns the new count
    pub fn increment_call_count(&self, key: &EntityRef, n: u64) -> Result<u64> {
        let mut tables = self.tables.lock();
        let entry = tables
            .entries
            .get_mut(key)
            .ok_or_else(|| RegistryError::KeyNotFound(key.clone()))?;
        entry.call_count += n;
        Ok(entry.call_count)
    }

    /// Whether a key's first snapshot has been upgrade-checked
    pub fn is_schema_checked(&self, key: &EntityRef) -> Result<bool> {
        let tables = self.tables.lock();
        tables
            .entries
            .get(key)
            .map(|entry| entry.schema_checked)
            .ok_or_else(|| RegistryError::KeyNotFound(key.clone()))
    }

    /// Mark a key as upgrade-checked
    ///
    /// The flag transitions false → true exactly once per entry lifetime;
    /// a second call is an error.
    pub fn mark_schema_checked(&self, key: &EntityRef) -> Result<()> {
        let mut tables = self.tables.lock();
        let entry = tables
            .entries
            .get_mut(key)
            .ok_or_else(|| RegistryError::KeyNotFound(key.clone()))?;
        if entry.schema_checked {
            return Err(RegistryError::AlreadyChecked(key.clone()));
        }
        entry.schema_checked = true;
        Ok(())
    }

    /// Close a key's entry
    ///
    /// Cancels the stored unsubscribe handle (no-op if none was attached
    /// yet), folds the entry's call count into the retired totals, and
    /// deletes the entry. The remote unsubscribe completes before the entry
    /// is deleted. The caller guarantees no publisher still claims the key.
    pub fn close(&self, key: &EntityRef) -> Result<()> {
        let mut tables = self.tables.lock();
        match tables.entries.get_mut(key) {
            None => return Err(RegistryError::KeyNotFound(key.clone())),
            Some(entry) => {
                if let Some(handle) = entry.unsubscribe.take() {
                    handle.cancel();
                }
            }
        }

        if let Some(entry) = tables.entries.remove(key) {
            tables.retired.subscriptions += 1;
            tables.retired.calls += entry.call_count;
            tracing::info!(
                entity = %key,
                calls = entry.call_count,
                "Subscription closed"
            );
        }
        Ok(())
    }

    /// Close every entry; used at full sign-out
    pub fn close_all(&self) {
        let mut tables = self.tables.lock();
        let entries: Vec<(EntityRef, RegistryEntry)> = tables.entries.drain().collect();

        for (key, mut entry) in entries {
            if let Some(handle) = entry.unsubscribe.take() {
                handle.cancel();
            }
            tables.retired.subscriptions += 1;
            tables.retired.calls += entry.call_count;
            tracing::info!(
                entity = %key,
                calls = entry.call_count,
                "Subscription closed"
            );
        }
    }

    /// Number of live entries
    pub fn active_count(&self) -> usize {
        self.tables.lock().entries.len()
    }

    /// Totals folded in from entries closed so far
    pub fn lifetime_totals(&self) -> RetiredTotals {
        self.tables.lock().retired
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted_handle() -> (UnsubscribeHandle, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let handle = UnsubscribeHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (handle, fired)
    }

    #[test]
    fn test_create_and_double_create() {
        let registry = SubscriptionRegistry::new();
        let key = EntityRef::domain("d1");

        registry.create(&key).unwrap();
        assert!(registry.has(&key));

        let result = registry.create(&key);
        assert_eq!(result, Err(RegistryError::DoubleCreate(key)));
    }

    #[test]
    fn test_accessors_fail_on_absent_key() {
        let registry = SubscriptionRegistry::new();
        let key = EntityRef::workbox("w1");

        assert!(!registry.has(&key));
        assert_eq!(
            registry.increment_call_count(&key, 1),
            Err(RegistryError::KeyNotFound(key.clone()))
        );
        assert_eq!(
            registry.is_schema_checked(&key),
            Err(RegistryError::KeyNotFound(key.clone()))
        );
        assert_eq!(
            registry.mark_schema_checked(&key),
            Err(RegistryError::KeyNotFound(key.clone()))
        );
        assert_eq!(registry.close(&key), Err(RegistryError::KeyNotFound(key)));
    }

    #[test]
    fn test_call_count_accumulates() {
        let registry = SubscriptionRegistry::new();
        let key = EntityRef::domain("d1");
        registry.create(&key).unwrap();

        assert_eq!(registry.increment_call_count(&key, 1).unwrap(), 1);
        assert_eq!(registry.increment_call_count(&key, 3).unwrap(), 4);
    }

    #[test]
    fn test_schema_checked_transitions_once() {
        let registry = SubscriptionRegistry::new();
        let key = EntityRef::member("d1", "m1");
        registry.create(&key).unwrap();

        assert!(!registry.is_schema_checked(&key).unwrap());
        registry.mark_schema_checked(&key).unwrap();
        assert!(registry.is_schema_checked(&key).unwrap());

        assert_eq!(
            registry.mark_schema_checked(&key),
            Err(RegistryError::AlreadyChecked(key))
        );
    }

    #[test]
    fn test_register_unsubscribe_only_once() {
        let registry = SubscriptionRegistry::new();
        let key = EntityRef::domain("d1");
        registry.create(&key).unwrap();

        let (first, first_fired) = counted_handle();
        registry.register_unsubscribe(&key, first).unwrap();
        assert_eq!(first_fired.load(Ordering::SeqCst), 0);

        // A second handle is rejected and cancelled so it cannot dangle
        let (second, second_fired) = counted_handle();
        let result = registry.register_unsubscribe(&key, second);
        assert_eq!(result, Err(RegistryError::HandleAlreadyRegistered(key)));
        assert_eq!(second_fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_unsubscribe_after_close_cancels() {
        let registry = SubscriptionRegistry::new();
        let key = EntityRef::domain("d1");
        registry.create(&key).unwrap();
        registry.close(&key).unwrap();

        // The entry closed before the subscribe call resolved; the late
        // handle must be cancelled, nothing will ever own it.
        let (late, late_fired) = counted_handle();
        let result = registry.register_unsubscribe(&key, late);
        assert_eq!(result, Err(RegistryError::KeyNotFound(key)));
        assert_eq!(late_fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_cancels_handle_and_folds_counts() {
        let registry = SubscriptionRegistry::new();
        let key = EntityRef::workbox("w1");
        registry.create(&key).unwrap();

        let (handle, fired) = counted_handle();
        registry.register_unsubscribe(&key, handle).unwrap();
        registry.increment_call_count(&key, 5).unwrap();

        registry.close(&key).unwrap();
        assert!(!registry.has(&key));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let totals = registry.lifetime_totals();
        assert_eq!(totals.subscriptions, 1);
        assert_eq!(totals.calls, 5);
    }

    #[test]
    fn test_close_without_handle_is_a_noop_cancel() {
        let registry = SubscriptionRegistry::new();
        let key = EntityRef::domain("d1");
        registry.create(&key).unwrap();

        registry.close(&key).unwrap();
        assert_eq!(registry.lifetime_totals().subscriptions, 1);
    }

    #[test]
    fn test_close_all() {
        let registry = SubscriptionRegistry::new();
        let d1 = EntityRef::domain("d1");
        let w1 = EntityRef::workbox("w1");
        registry.create(&d1).unwrap();
        registry.create(&w1).unwrap();

        let (handle, fired) = counted_handle();
        registry.register_unsubscribe(&d1, handle).unwrap();
        registry.increment_call_count(&d1, 2).unwrap();
        registry.increment_call_count(&w1, 3).unwrap();

        registry.close_all();
        assert_eq!(registry.active_count(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let totals = registry.lifetime_totals();
        assert_eq!(totals.subscriptions, 2);
        assert_eq!(totals.calls, 5);
    }

    #[test]
    fn test_active_count() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.active_count(), 0);

        registry.create(&EntityRef::domain("d1")).unwrap();
        registry.create(&EntityRef::domain("d2")).unwrap();
        assert_eq!(registry.active_count(), 2);
    }
}
