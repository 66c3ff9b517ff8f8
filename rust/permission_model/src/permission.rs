//! Grantable permissions.

use ahash::AHashSet;

use crate::qname::QName;
use crate::types::{AccessStatus, PermissionReference, RequiredPermission, RequiredTarget};

/// A single grantable permission, granted through one or more groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    reference: PermissionReference,
    default_access: AccessStatus,
    exposed: bool,
    requires_type: bool,
    granted_to_groups: AHashSet<PermissionReference>,
    required_permissions: AHashSet<RequiredPermission>,
}

impl Permission {
    pub fn new(owner: QName, name: &str) -> Self {
        Permission {
            reference: PermissionReference::new(owner, name),
            default_access: AccessStatus::Denied,
            exposed: true,
            requires_type: true,
            granted_to_groups: AHashSet::new(),
            required_permissions: AHashSet::new(),
        }
    }

    pub fn with_default_access(mut self, default_access: AccessStatus) -> Self {
        self.default_access = default_access;
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

    pub fn with_granted_to(mut self, group: PermissionReference) -> Self {
        self.granted_to_groups.insert(group);
        self
    }

    pub fn with_required(mut self, required: RequiredPermission) -> Self {
        self.required_permissions.insert(required);
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

    pub fn default_access(&self) -> AccessStatus {
        self.default_access
    }

    pub fn is_exposed(&self) -> bool {
        self.exposed
    }

    pub fn is_type_required(&self) -> bool {
        self.requires_type
    }

    pub fn granted_to_groups(&self) -> &AHashSet<PermissionReference> {
        &self.granted_to_groups
    }

    pub fn required_permissions(&self) -> &AHashSet<RequiredPermission> {
        &self.required_permissions
    }

    /// Non-implying requirements on `on`, i.e. what must also hold for this
    /// permission to be usable.
    pub fn requirements_on(&self, on: RequiredTarget) -> impl Iterator<Item = &RequiredPermission> {
        self.required_permissions
            .iter()
            .filter(move |required| required.on() == on && !required.implies())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_on_skip_implied_edges() {
        let base = QName::new("urn:model:system", "base");
        let read_content = PermissionReference::new(base.clone(), "_ReadContent");
        let write_properties = PermissionReference::new(base.clone(), "_WriteProperties");
        let read_children = PermissionReference::new(base.clone(), "_ReadChildren");
        let permission = Permission::new(base, "_WriteContent")
            .with_required(RequiredPermission::new(read_content, RequiredTarget::Node, true))
            .with_required(RequiredPermission::new(
                write_properties.clone(),
                RequiredTarget::Node,
                false,
            ))
            .with_required(RequiredPermission::new(
                read_children,
                RequiredTarget::Parent,
                false,
            ));

        let on_node: Vec<_> = permission.requirements_on(RequiredTarget::Node).collect();
        assert_eq!(on_node.len(), 1);
        assert_eq!(on_node[0].reference(), &write_properties);
        assert_eq!(permission.requirements_on(RequiredTarget::Parent).count(), 1);
        assert_eq!(permission.requirements_on(RequiredTarget::Children).count(), 0);
        assert_eq!(permission.default_access(), AccessStatus::Denied);
    }
}
