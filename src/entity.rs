//! Typed entity references
//!
//! Every record tracked by the sync layer is identified by an [`EntityRef`]:
//! the entity kind plus the ids needed to locate its document in the remote
//! store. The reference doubles as the registry key (its `Display` form,
//! e.g. `Domain.d1`) and computes the document path (`domains/d1`).

use std::fmt;

/// Kind of entity tracked by the sync layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A workspace domain
    Domain,
    /// A member of a domain
    Member,
    /// A workbox belonging to a domain
    Workbox,
}

impl EntityKind {
    /// Collection name in the remote store
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Domain => "domains",
            EntityKind::Member => "members",
            EntityKind::Workbox => "workboxes",
        }
    }
}

/// Reference to a single entity record
///
/// Used as the key for the subscription registry and the publisher table:
/// at most one live remote subscription exists per distinct reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    /// A domain record
    Domain {
        /// Domain id
        id: String,
    },
    /// A member record, nested under its domain
    Member {
        /// Owning domain id
        domain_id: String,
        /// Member id
        id: String,
    },
    /// A workbox record
    Workbox {
        /// Workbox id
        id: String,
    },
}

impl EntityRef {
    /// Create a domain reference
    pub fn domain(id: impl Into<String>) -> Self {
        EntityRef::Domain { id: id.into() }
    }

    /// Create a member reference
    pub fn member(domain_id: impl Into<String>, id: impl Into<String>) -> Self {
        EntityRef::Member {
            domain_id: domain_id.into(),
            id: id.into(),
        }
    }

    /// Create a workbox reference
    pub fn workbox(id: impl Into<String>) -> Self {
        EntityRef::Workbox { id: id.into() }
    }

    /// Kind of the referenced entity
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Domain { .. } => EntityKind::Domain,
            EntityRef::Member { .. } => EntityKind::Member,
            EntityRef::Workbox { .. } => EntityKind::Workbox,
        }
    }

    /// Id of the referenced entity (without the owning domain for members)
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Domain { id } => id,
            EntityRef::Member { id, .. } => id,
            EntityRef::Workbox { id } => id,
        }
    }

    /// Document path of the record in the remote store
    pub fn path(&self) -> String {
        match self {
            EntityRef::Domain { id } => format!("domains/{}", id),
            EntityRef::Member { domain_id, id } => {
                format!("domains/{}/members/{}", domain_id, id)
            }
            EntityRef::Workbox { id } => format!("workboxes/{}", id),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Domain { id } => write!(f, "Domain.{}", id),
            EntityRef::Member { id, .. } => write!(f, "Member.{}", id),
            EntityRef::Workbox { id } => write!(f, "Workbox.{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keys() {
        assert_eq!(EntityRef::domain("d1").to_string(), "Domain.d1");
        assert_eq!(EntityRef::member("d1", "m1").to_string(), "Member.m1");
        assert_eq!(EntityRef::workbox("w1").to_string(), "Workbox.w1");
    }

    #[test]
    fn test_document_paths() {
        assert_eq!(EntityRef::domain("d1").path(), "domains/d1");
        assert_eq!(EntityRef::member("d1", "m1").path(), "domains/d1/members/m1");
        assert_eq!(EntityRef::workbox("w1").path(), "workboxes/w1");
    }

    #[test]
    fn test_collections() {
        assert_eq!(EntityRef::domain("d1").kind().collection(), "domains");
        assert_eq!(EntityRef::member("d1", "m1").kind().collection(), "members");
        assert_eq!(EntityRef::workbox("w1").kind().collection(), "workboxes");
    }

    #[test]
    fn test_distinct_keys() {
        // Same id under different kinds must never collide in a map
        assert_ne!(EntityRef::domain("x"), EntityRef::workbox("x"));
        assert_ne!(
            EntityRef::member("d1", "x"),
            EntityRef::member("d2", "x")
        );
    }
}
