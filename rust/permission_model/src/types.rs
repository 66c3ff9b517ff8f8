//! Value types shared across the permission model.

use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;

use crate::qname::QName;

/// Reserved bare name standing for every permission in the model.
pub const ALL_PERMISSIONS: &str = "All";

/// Result set of the closure queries.
pub type PermissionRefSet = AHashSet<PermissionReference>;

/// Identifies a permission or permission group: owning type/aspect + name.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct PermissionReference {
    owner: QName,
    name: Arc<str>,
}

impl PermissionReference {
    pub fn new(owner: QName, name: &str) -> Self {
        PermissionReference {
            owner,
            name: Arc::from(name),
        }
    }

    /// The reserved "all permissions" reference.
    pub fn all() -> Self {
        PermissionReference::new(QName::new("", ALL_PERMISSIONS), ALL_PERMISSIONS)
    }

    pub fn is_all(&self) -> bool {
        *self == PermissionReference::all()
    }

    pub fn owner(&self) -> &QName {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PermissionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// Where a required permission must hold, relative to the node being checked.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum RequiredTarget {
    Node,
    Parent,
    Children,
}

impl RequiredTarget {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "node" => Some(Self::Node),
            "parent" => Some(Self::Parent),
            "children" => Some(Self::Children),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Parent => "parent",
            Self::Children => "children",
        }
    }
}

impl fmt::Display for RequiredTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requirement edge of a permission: holding the owner also requires (or,
/// with `implies`, also confers) `reference` on the node, its parent or its
/// children.
///
/// Equality covers all fields, so two edges to the same permission that
/// differ only in `implies` stay distinct inside a set.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RequiredPermission {
    reference: PermissionReference,
    on: RequiredTarget,
    implies: bool,
}

impl RequiredPermission {
    pub fn new(reference: PermissionReference, on: RequiredTarget, implies: bool) -> Self {
        RequiredPermission {
            reference,
            on,
            implies,
        }
    }

    pub fn reference(&self) -> &PermissionReference {
        &self.reference
    }

    pub fn on(&self) -> RequiredTarget {
        self.on
    }

    pub fn implies(&self) -> bool {
        self.implies
    }
}

/// Default outcome for a permission with no explicit entry.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default)]
pub enum AccessStatus {
    Allowed,
    #[default]
    Denied,
}

impl AccessStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "allow" | "allowed" => Some(Self::Allowed),
            "deny" | "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

/// Authority that holds a permission everywhere, independent of node ACLs.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct GlobalPermissionEntry {
    authority: String,
    permission: PermissionReference,
}

impl GlobalPermissionEntry {
    pub fn new(authority: &str, permission: PermissionReference) -> Self {
        GlobalPermissionEntry {
            authority: authority.to_string(),
            permission,
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn permission(&self) -> &PermissionReference {
        &self.permission
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str) -> PermissionReference {
        PermissionReference::new(QName::new("urn:model:system", "base"), name)
    }

    #[test]
    fn references_compare_by_value() {
        assert_eq!(reference("Read"), reference("Read"));
        assert_ne!(reference("Read"), reference("Write"));
        assert_ne!(
            reference("Read"),
            PermissionReference::new(QName::new("urn:model:content", "base"), "Read")
        );
    }

    #[test]
    fn display_joins_owner_and_name() {
        assert_eq!(reference("Read").to_string(), "{urn:model:system}base.Read");
    }

    #[test]
    fn all_reference_is_recognised() {
        assert!(PermissionReference::all().is_all());
        assert!(!reference(ALL_PERMISSIONS).is_all());
    }

    #[test]
    fn required_permissions_differing_in_implies_stay_distinct() {
        let edge = |on, implies| RequiredPermission::new(reference("_ReadProperties"), on, implies);
        let mut set = AHashSet::new();
        set.insert(edge(RequiredTarget::Node, false));
        set.insert(edge(RequiredTarget::Node, false));
        set.insert(edge(RequiredTarget::Node, true));
        set.insert(edge(RequiredTarget::Parent, false));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn parse_target_and_access() {
        assert_eq!(RequiredTarget::parse("PARENT"), Some(RequiredTarget::Parent));
        assert_eq!(RequiredTarget::parse("children"), Some(RequiredTarget::Children));
        assert_eq!(RequiredTarget::parse("sibling"), None);
        assert_eq!(AccessStatus::parse("ALLOW"), Some(AccessStatus::Allowed));
        assert_eq!(AccessStatus::parse("deny"), Some(AccessStatus::Denied));
        assert_eq!(AccessStatus::parse("maybe"), None);
        assert_eq!(AccessStatus::default(), AccessStatus::Denied);
    }
}
