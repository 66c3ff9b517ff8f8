//! Base-group resolution and the granting/grantee closures.

use std::sync::Arc;

use ahash::AHashSet;

use super::PermissionModel;
use crate::error::{ModelError, Result};
use crate::group::PermissionGroup;
use crate::types::{PermissionRefSet, PermissionReference};
use crate::MAX_DEPTH;

impl PermissionModel {
    /// Root of the extension chain of the group named by `reference`.
    ///
    /// `None` when `reference` is not a group or its chain ends without a
    /// non-extending group.
    pub fn base_permission_group_or_none(
        &self,
        reference: &PermissionReference,
    ) -> Option<Arc<PermissionGroup>> {
        let group = self.index.group(reference)?;
        if let Some(cached) = self.caches.lookup(&self.caches.base_groups, reference) {
            return cached;
        }
        let base = self.index.resolve_base(group, self.dictionary.as_ref(), 0);
        self.caches
            .store(&self.caches.base_groups, reference.clone(), base)
    }

    pub fn base_permission_group(
        &self,
        reference: &PermissionReference,
    ) -> Result<Arc<PermissionGroup>> {
        if self.index.group(reference).is_none() {
            return Err(ModelError::PermissionGroupNotFound(reference.clone()));
        }
        self.base_permission_group_or_none(reference)
            .ok_or_else(|| ModelError::UnresolvedBaseGroup(reference.clone()))
    }

    /// Everything that, if held, satisfies a request for `reference`.
    ///
    /// Always contains `reference` itself. `None` yields an empty set.
    pub fn granting_permissions(
        &self,
        reference: Option<&PermissionReference>,
    ) -> Result<Arc<PermissionRefSet>> {
        let Some(reference) = reference else {
            return Ok(Arc::new(PermissionRefSet::new()));
        };
        let _guard = self.closure_lock.lock();
        if let Some(cached) = self.caches.lookup(&self.caches.granting, reference) {
            return Ok(cached);
        }
        tracing::debug!("computing granting permissions for {}", reference);

        let mut granting = PermissionRefSet::new();
        granting.insert(reference.clone());
        for set in self.index.sets.values() {
            for group in set.permission_groups() {
                if self.grants(group, reference, 0)? {
                    let base = self.base_permission_group(group.reference())?;
                    granting.insert(base.reference().clone());
                }
                if group.allows_full_control() {
                    granting.insert(group.reference().clone());
                }
            }
            for permission in set.permissions() {
                if permission.reference() == reference {
                    for granted_to in permission.granted_to_groups() {
                        if let Some(base) = self.base_permission_group_or_none(granted_to) {
                            granting.insert(base.reference().clone());
                        }
                    }
                }
                let implies_target = permission
                    .required_permissions()
                    .iter()
                    .any(|required| required.implies() && required.reference() == reference);
                if implies_target {
                    granting.insert(permission.reference().clone());
                }
            }
        }

        Ok(self
            .caches
            .store(&self.caches.granting, reference.clone(), Arc::new(granting)))
    }

    /// Everything that holding `reference` transitively grants.
    ///
    /// Always contains `reference` itself. `None` yields an empty set.
    pub fn grantee_permissions(
        &self,
        reference: Option<&PermissionReference>,
    ) -> Result<Arc<PermissionRefSet>> {
        let Some(reference) = reference else {
            return Ok(Arc::new(PermissionRefSet::new()));
        };
        let _guard = self.closure_lock.lock();
        self.grantee_closure(reference, &mut AHashSet::new())
    }

    /// One level of membership: included groups are added but not expanded.
    /// Extension chains and full control are still followed in full.
    pub fn immediate_grantee_permissions(
        &self,
        reference: Option<&PermissionReference>,
    ) -> Result<PermissionRefSet> {
        let Some(reference) = reference else {
            return Ok(PermissionRefSet::new());
        };
        self.grantee_expansion(reference, false, &mut AHashSet::new())
    }

    /// True when `reference` is full control, or extends a group that is.
    /// The reserved "all permissions" reference always is.
    pub fn has_full(&self, reference: Option<&PermissionReference>) -> bool {
        let Some(reference) = reference else {
            return false;
        };
        if reference.is_all() {
            return true;
        }
        let mut current = match self.index.group(reference) {
            Some(group) => Arc::clone(group),
            None => return false,
        };
        for _ in 0..MAX_DEPTH {
            if current.allows_full_control() {
                return true;
            }
            if !current.is_extends() {
                return false;
            }
            match self.index.ancestor_group(&current, self.dictionary.as_ref()) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    pub(crate) fn grantee_closure(
        &self,
        reference: &PermissionReference,
        visiting: &mut AHashSet<PermissionReference>,
    ) -> Result<Arc<PermissionRefSet>> {
        if let Some(cached) = self.caches.lookup(&self.caches.grantee, reference) {
            return Ok(cached);
        }
        tracing::debug!("computing grantee permissions for {}", reference);
        let grantees = self.grantee_expansion(reference, true, visiting)?;
        Ok(self
            .caches
            .store(&self.caches.grantee, reference.clone(), Arc::new(grantees)))
    }

    fn grantee_expansion(
        &self,
        reference: &PermissionReference,
        transitive: bool,
        visiting: &mut AHashSet<PermissionReference>,
    ) -> Result<PermissionRefSet> {
        if !visiting.insert(reference.clone()) {
            return Err(ModelError::CyclicDefinition(reference.clone()));
        }

        let mut grantees = PermissionRefSet::new();
        grantees.insert(reference.clone());

        if let Some(group) = self.index.group(reference) {
            for included in group.included_permission_groups() {
                if transitive {
                    grantees.extend(self.grantee_closure(included, visiting)?.iter().cloned());
                } else {
                    grantees.insert(included.clone());
                }
            }
            if group.is_extends() {
                if let Some(ancestor) = self.index.ancestor_group(group, self.dictionary.as_ref()) {
                    let inherited = if transitive {
                        self.grantee_closure(ancestor.reference(), visiting)?
                    } else {
                        Arc::new(self.grantee_expansion(ancestor.reference(), false, visiting)?)
                    };
                    grantees.extend(inherited.iter().cloned());
                }
            }
            if group.allows_full_control() {
                grantees.extend(self.index.all.iter().cloned());
            }
        }

        if let Some(base) = self.base_permission_group_or_none(reference) {
            for permission in self.index.permissions.values() {
                let granted = permission.granted_to_groups().iter().any(|granted_to| {
                    self.base_permission_group_or_none(granted_to)
                        .is_some_and(|candidate| candidate.reference() == base.reference())
                });
                if granted {
                    grantees.insert(permission.reference().clone());
                }
            }
        }

        visiting.remove(reference);
        Ok(grantees)
    }

    /// Whether holding `group` satisfies `reference`.
    fn grants(
        &self,
        group: &PermissionGroup,
        reference: &PermissionReference,
        depth: u32,
    ) -> Result<bool> {
        if depth >= MAX_DEPTH {
            return Err(ModelError::CyclicDefinition(group.reference().clone()));
        }
        if group.included_permission_groups().contains(reference) {
            return Ok(true);
        }
        if self
            .grantee_closure(group.reference(), &mut AHashSet::new())?
            .contains(reference)
        {
            return Ok(true);
        }
        for included in group.included_permission_groups() {
            if let Some(nested) = self.index.group(included) {
                if self.grants(nested, reference, depth + 1)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
