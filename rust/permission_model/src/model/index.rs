//! Lookup tables built from the loaded permission sets.
//!
//! Rebuilt from scratch on every load, before anything is committed to the
//! model, so a document that fails validation leaves the model untouched.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use crate::dictionary::Dictionary;
use crate::error::{ModelError, Result};
use crate::group::PermissionGroup;
use crate::permission::Permission;
use crate::qname::QName;
use crate::set::PermissionSet;
use crate::types::{PermissionRefSet, PermissionReference, RequiredTarget, ALL_PERMISSIONS};
use crate::MAX_DEPTH;

#[derive(Debug, Clone, Default)]
pub(crate) struct ModelIndex {
    pub(crate) sets: AHashMap<QName, PermissionSet>,
    pub(crate) groups: AHashMap<PermissionReference, Arc<PermissionGroup>>,
    pub(crate) permissions: AHashMap<PermissionReference, Arc<Permission>>,
    /// Every declared group and permission.
    pub(crate) all: Arc<PermissionRefSet>,
}

impl ModelIndex {
    pub(crate) fn build(sets: AHashMap<QName, PermissionSet>) -> Self {
        let mut groups = AHashMap::new();
        let mut permissions = AHashMap::new();
        for set in sets.values() {
            for group in set.permission_groups() {
                groups.insert(group.reference().clone(), Arc::clone(group));
            }
            for permission in set.permissions() {
                permissions.insert(permission.reference().clone(), Arc::clone(permission));
            }
        }
        let all = groups.keys().chain(permissions.keys()).cloned().collect();
        ModelIndex {
            sets,
            groups,
            permissions,
            all: Arc::new(all),
        }
    }

    pub(crate) fn group(&self, reference: &PermissionReference) -> Option<&Arc<PermissionGroup>> {
        self.groups.get(reference)
    }

    pub(crate) fn permission(&self, reference: &PermissionReference) -> Option<&Arc<Permission>> {
        self.permissions.get(reference)
    }

    /// Root of `group`'s extension chain, or `None` when the chain ends
    /// without a non-extending group.
    pub(crate) fn resolve_base(
        &self,
        group: &Arc<PermissionGroup>,
        dictionary: &dyn Dictionary,
        depth: u32,
    ) -> Option<Arc<PermissionGroup>> {
        if !group.is_extends() {
            return Some(Arc::clone(group));
        }
        if depth >= MAX_DEPTH {
            return None;
        }
        if let Some(override_type) = group.type_override() {
            let target = PermissionReference::new(override_type.clone(), group.name());
            let overridden = self.group(&target)?;
            return self.resolve_base(overridden, dictionary, depth + 1);
        }

        let mut class = dictionary.class(group.owner())?;
        for _ in depth..MAX_DEPTH {
            let parent = class.parent_name()?.clone();
            let candidate = PermissionReference::new(parent.clone(), group.name());
            if let Some(found) = self.group(&candidate) {
                if !found.is_extends() {
                    return Some(Arc::clone(found));
                }
            }
            class = dictionary.class(&parent)?;
        }
        None
    }

    /// Nearest same-named group declared on an ancestor of `group`'s owner,
    /// extending or not. Used when expanding an extension one step at a time.
    pub(crate) fn ancestor_group(
        &self,
        group: &PermissionGroup,
        dictionary: &dyn Dictionary,
    ) -> Option<Arc<PermissionGroup>> {
        if let Some(override_type) = group.type_override() {
            let target = PermissionReference::new(override_type.clone(), group.name());
            return self.group(&target).cloned();
        }
        let mut class = dictionary.class(group.owner())?;
        for _ in 0..MAX_DEPTH {
            let parent = class.parent_name()?.clone();
            let candidate = PermissionReference::new(parent.clone(), group.name());
            if let Some(found) = self.group(&candidate) {
                return Some(Arc::clone(found));
            }
            class = dictionary.class(&parent)?;
        }
        None
    }

    /// Bare name → reference, for names that resolve to a single target.
    ///
    /// Groups are keyed by their base group, so an extending group sharing a
    /// name with its base does not make the name ambiguous. Names declared by
    /// unrelated hierarchies are excluded.
    pub(crate) fn unique_names(
        &self,
        dictionary: &dyn Dictionary,
    ) -> Result<AHashMap<String, PermissionReference>> {
        let mut unique: AHashMap<String, PermissionReference> = AHashMap::new();
        let mut excluded: AHashSet<String> = AHashSet::new();

        let mut record = |name: &str, target: PermissionReference| {
            if excluded.contains(name) {
                return;
            }
            match unique.get(name) {
                Some(existing) if *existing != target => {
                    tracing::warn!(
                        "permission name '{}' is ambiguous ({} vs {}); bare lookups disabled",
                        name,
                        existing,
                        target
                    );
                    unique.remove(name);
                    excluded.insert(name.to_string());
                }
                Some(_) => {}
                None => {
                    unique.insert(name.to_string(), target);
                }
            }
        };

        for group in self.groups.values() {
            if group.name() == ALL_PERMISSIONS {
                return Err(ModelError::ReservedName(group.reference().to_string()));
            }
            let target = match self.resolve_base(group, dictionary, 0) {
                Some(base) => base.reference().clone(),
                None => {
                    tracing::warn!("no base permission group for {}", group.reference());
                    group.reference().clone()
                }
            };
            record(group.name(), target);
        }
        for permission in self.permissions.values() {
            if permission.name() == ALL_PERMISSIONS {
                return Err(ModelError::ReservedName(permission.reference().to_string()));
            }
            record(permission.name(), permission.reference().clone());
        }

        unique.insert(ALL_PERMISSIONS.to_string(), PermissionReference::all());
        Ok(unique)
    }

    /// Reject include cycles between groups and node-target requirement
    /// cycles between permissions.
    pub(crate) fn check_acyclic(&self) -> Result<()> {
        let mut edges: AHashMap<&PermissionReference, Vec<&PermissionReference>> = AHashMap::new();
        for (reference, group) in &self.groups {
            edges
                .entry(reference)
                .or_default()
                .extend(group.included_permission_groups().iter());
        }
        for (reference, permission) in &self.permissions {
            edges.entry(reference).or_default().extend(
                permission
                    .required_permissions()
                    .iter()
                    .filter(|required| required.on() == RequiredTarget::Node)
                    .map(|required| required.reference()),
            );
        }

        let mut done: AHashSet<&PermissionReference> = AHashSet::new();
        let mut on_path: AHashSet<&PermissionReference> = AHashSet::new();
        let mut roots: Vec<&PermissionReference> = edges.keys().copied().collect();
        roots.sort();
        for root in roots {
            visit(root, &edges, &mut on_path, &mut done)?;
        }
        Ok(())
    }
}

fn visit<'a>(
    node: &'a PermissionReference,
    edges: &AHashMap<&'a PermissionReference, Vec<&'a PermissionReference>>,
    on_path: &mut AHashSet<&'a PermissionReference>,
    done: &mut AHashSet<&'a PermissionReference>,
) -> Result<()> {
    if done.contains(node) {
        return Ok(());
    }
    if !on_path.insert(node) {
        return Err(ModelError::CyclicDefinition(node.clone()));
    }
    if let Some(next) = edges.get(node) {
        for &target in next {
            visit(target, edges, on_path, done)?;
        }
    }
    on_path.remove(node);
    done.insert(node);
    Ok(())
}
