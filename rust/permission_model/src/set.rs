//! Permission sets: everything declared for one type or aspect.

use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::group::PermissionGroup;
use crate::permission::Permission;
use crate::qname::QName;

/// Groups and permissions declared for one owner type or aspect.
///
/// `expose_all` makes every entry visible to permission pickers and lets the
/// exposed-permission walk continue into the owner's supertypes.
#[derive(Debug, Clone)]
pub struct PermissionSet {
    owner: QName,
    expose_all: bool,
    groups: Vec<Arc<PermissionGroup>>,
    permissions: Vec<Arc<Permission>>,
}

impl PermissionSet {
    pub fn new(owner: QName, expose_all: bool) -> Self {
        PermissionSet {
            owner,
            expose_all,
            groups: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn owner(&self) -> &QName {
        &self.owner
    }

    pub fn expose_all(&self) -> bool {
        self.expose_all
    }

    pub fn permission_groups(&self) -> &[Arc<PermissionGroup>] {
        &self.groups
    }

    pub fn permissions(&self) -> &[Arc<Permission>] {
        &self.permissions
    }

    pub fn permission_group(&self, name: &str) -> Option<&Arc<PermissionGroup>> {
        self.groups.iter().find(|group| group.name() == name)
    }

    pub fn permission(&self, name: &str) -> Option<&Arc<Permission>> {
        self.permissions
            .iter()
            .find(|permission| permission.name() == name)
    }

    /// Add a group. Groups must belong to this set's owner, and names are
    /// unique across the set's groups and permissions.
    pub fn add_permission_group(&mut self, group: PermissionGroup) -> Result<()> {
        self.check_new_name(group.owner(), group.name())?;
        self.groups.push(Arc::new(group));
        Ok(())
    }

    pub fn add_permission(&mut self, permission: Permission) -> Result<()> {
        self.check_new_name(permission.owner(), permission.name())?;
        self.permissions.push(Arc::new(permission));
        Ok(())
    }

    fn check_new_name(&self, owner: &QName, name: &str) -> Result<()> {
        if owner != &self.owner {
            return Err(ModelError::InvalidAttribute {
                attribute: "type",
                value: owner.to_string(),
            });
        }
        if self.permission_group(name).is_some() || self.permission(name).is_some() {
            return Err(ModelError::DuplicateDefinition {
                owner: self.owner.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let owner = QName::new("urn:model:system", "base");
        let mut set = PermissionSet::new(owner.clone(), true);
        set.add_permission_group(PermissionGroup::new(owner.clone(), "Read"))
            .unwrap();
        assert!(matches!(
            set.add_permission(Permission::new(owner.clone(), "Read")),
            Err(ModelError::DuplicateDefinition { .. })
        ));
        set.add_permission(Permission::new(owner, "_Read")).unwrap();
        assert_eq!(set.permission_groups().len(), 1);
        assert_eq!(set.permissions().len(), 1);
    }

    #[test]
    fn foreign_owner_is_rejected() {
        let mut set = PermissionSet::new(QName::new("urn:model:system", "base"), false);
        let foreign = PermissionGroup::new(QName::new("urn:model:content", "folder"), "Read");
        assert!(set.add_permission_group(foreign).is_err());
        assert!(!set.expose_all());
    }
}
