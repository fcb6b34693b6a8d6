//! Schema templates and the one-time record upgrade
//!
//! Stored records can predate the current expected shape. On the first
//! snapshot of each entity per process lifetime, the publisher merges the
//! record against the default-shape template registered for its
//! (collection, version) pair and writes the result back if anything was
//! missing. The merge itself is a pure function; persistence belongs to the
//! caller.

pub mod template;
pub mod upgrade;

pub use template::SchemaTemplates;
pub use upgrade::{record_variant, upgrade};
