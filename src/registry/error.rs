//! Registry error types
//!
//! All four variants indicate a broken call sequence in the layer above,
//! not a remote failure.

use thiserror::Error;

use crate::entity::EntityRef;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// `create` called for a key that already has a live entry
    #[error("subscription already registered: {0}")]
    DoubleCreate(EntityRef),

    /// Accessor called for a key with no live entry
    #[error("no live subscription: {0}")]
    KeyNotFound(EntityRef),

    /// `register_unsubscribe` called for an entry that already owns a handle
    #[error("unsubscribe handle already attached: {0}")]
    HandleAlreadyRegistered(EntityRef),

    /// `mark_schema_checked` called for an entry that is already checked
    #[error("schema already checked: {0}")]
    AlreadyChecked(EntityRef),
}
