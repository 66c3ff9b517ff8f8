//! Permission groups: named bundles of permissions and other groups.

use ahash::AHashSet;

use crate::qname::QName;
use crate::types::PermissionReference;

/// A named collection of permission references declared on a type or aspect.
///
/// A group may `extend` the same-named group of a supertype (or of an
/// explicit override type); the first non-extending group of that chain is
/// its *base* group, which is what grants and requirements are keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGroup {
    reference: PermissionReference,
    extends: bool,
    type_override: Option<QName>,
    allow_full_control: bool,
    exposed: bool,
    requires_type: bool,
    includes: AHashSet<PermissionReference>,
}

impl PermissionGroup {
    pub fn new(owner: QName, name: &str) -> Self {
        PermissionGroup {
            reference: PermissionReference::new(owner, name),
            extends: false,
            type_override: None,
            allow_full_control: false,
            exposed: true,
            requires_type: true,
            includes: AHashSet::new(),
        }
    }

    /// Mark as extending; `type_override` replaces the dictionary parent walk.
    pub fn with_extends(mut self, type_override: Option<QName>) -> Self {
        self.extends = true;
        self.type_override = type_override;
        self
    }

    pub fn with_full_control(mut self, allow_full_control: bool) -> Self {
        self.allow_full_control = allow_full_control;
        self
    }

    pub fn with_exposed(mut self, exposed: bool) -> Self {
        self.exposed = exposed;
        self
    }

    pub fn with_requires_type(mut self, requires_type: bool) -> Self {
        self.requires_type = requires_type;
        self
    }

    pub fn with_include(mut self, group: PermissionReference) -> Self {
        self.includes.insert(group);
        self
    }

    pub fn reference(&self) -> &PermissionReference {
        &self.reference
    }

    pub fn owner(&self) -> &QName {
        self.reference.owner()
    }

    pub fn name(&self) -> &str {
        self.reference.name()
    }

    pub fn is_extends(&self) -> bool {
        self.extends
    }

    pub fn type_override(&self) -> Option<&QName> {
        self.type_override.as_ref()
    }

    pub fn allows_full_control(&self) -> bool {
        self.allow_full_control
    }

    pub fn is_exposed(&self) -> bool {
        self.exposed
    }

    /// Whether a node must carry the owning type/aspect for the group to apply.
    pub fn is_type_required(&self) -> bool {
        self.requires_type
    }

    /// Directly included groups (not transitive).
    pub fn included_permission_groups(&self) -> &AHashSet<PermissionReference> {
        &self.includes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_document_defaults() {
        let group = PermissionGroup::new(QName::new("urn:model:system", "base"), "Read");
        assert!(!group.is_extends());
        assert!(group.type_override().is_none());
        assert!(!group.allows_full_control());
        assert!(group.is_exposed());
        assert!(group.is_type_required());
        assert!(group.included_permission_groups().is_empty());
        assert_eq!(group.name(), "Read");
    }

    #[test]
    fn includes_are_a_set() {
        let base = QName::new("urn:model:system", "base");
        let read_properties = PermissionReference::new(base.clone(), "ReadProperties");
        let group = PermissionGroup::new(base, "Read")
            .with_include(read_properties.clone())
            .with_include(read_properties);
        assert_eq!(group.included_permission_groups().len(), 1);
    }
}
