//! Per-subscription bookkeeping

use crate::store::UnsubscribeHandle;

/// Bookkeeping for one live remote subscription
///
/// Exists if and only if exactly one publisher holds an open remote
/// subscription for the key.
#[derive(Debug)]
pub struct RegistryEntry {
    /// Token that cancels the remote subscription; attached once the
    /// subscribe call resolves, consumed on close
    pub(super) unsubscribe: Option<UnsubscribeHandle>,

    /// Remote pushes delivered since the entry was created
    pub(super) call_count: u64,

    /// Whether the first snapshot has been upgrade-checked; transitions
    /// false → true at most once
    pub(super) schema_checked: bool,
}

impl RegistryEntry {
    pub(super) fn new() -> Self {
        Self {
            unsubscribe: None,
            call_count: 0,
            schema_checked: false,
        }
    }

    /// Pushes delivered so far
    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Whether the first snapshot has been upgrade-checked
    pub fn schema_checked(&self) -> bool {
        self.schema_checked
    }

    /// Whether the unsubscribe handle has been attached
    pub fn has_unsubscribe(&self) -> bool {
        self.unsubscribe.is_some()
    }
}
