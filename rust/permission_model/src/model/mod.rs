//! The permission model resolver.
//!
//! Holds the loaded permission sets, the global permission entries and the
//! memo tables, and answers the closure queries implemented in the
//! submodules:
//! - `closure`: base groups, granting/grantee closures, full control
//! - `exposure`: all (exposed) permissions of a type, aspect or node
//! - `required`: requirements on the node, its parent or its children

mod closure;
mod exposure;
mod index;
mod required;


use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;

use crate::cache::{CacheStats, ModelCaches};
use crate::config::ModelDocument;
use crate::dictionary::{Dictionary, NodeService};
use crate::error::{ModelError, Result};
use crate::group::PermissionGroup;
use crate::permission::Permission;
use crate::qname::QName;
use crate::set::PermissionSet;
use crate::types::{AccessStatus, GlobalPermissionEntry, PermissionRefSet, PermissionReference};

use index::ModelIndex;

pub struct PermissionModel {
    dictionary: Arc<dyn Dictionary>,
    nodes: Arc<dyn NodeService>,
    index: ModelIndex,
    unique_names: AHashMap<String, PermissionReference>,
    references_by_string: AHashMap<String, PermissionReference>,
    global_permissions: AHashSet<GlobalPermissionEntry>,
    default_access: AccessStatus,
    /// Serializes the granting/grantee closure computations.
    closure_lock: Mutex<()>,
    caches: ModelCaches,
}

impl PermissionModel {
    /// Empty model; every permission is denied by default.
    pub fn new(dictionary: Arc<dyn Dictionary>, nodes: Arc<dyn NodeService>) -> Self {
        PermissionModel {
            dictionary,
            nodes,
            index: ModelIndex::default(),
            unique_names: AHashMap::new(),
            references_by_string: AHashMap::new(),
            global_permissions: AHashSet::new(),
            default_access: AccessStatus::Denied,
            closure_lock: Mutex::new(()),
            caches: ModelCaches::default(),
        }
    }

    pub fn from_document(
        dictionary: Arc<dyn Dictionary>,
        nodes: Arc<dyn NodeService>,
        document: &ModelDocument,
    ) -> Result<Self> {
        let mut model = PermissionModel::new(dictionary, nodes);
        model.add_model(document)?;
        Ok(model)
    }

    /// Merge a document into the model.
    ///
    /// A type that already has a permission set is replaced. Either the whole
    /// document is applied or, on error, nothing is.
    pub fn add_model(&mut self, document: &ModelDocument) -> Result<()> {
        let parsed = document.resolve()?;

        let mut sets = self.index.sets.clone();
        for set in parsed.permission_sets {
            if sets.contains_key(set.owner()) {
                tracing::warn!("replacing permission set for {}", set.owner());
            }
            sets.insert(set.owner().clone(), set);
        }

        let index = ModelIndex::build(sets);
        index.check_acyclic()?;
        let unique_names = index.unique_names(self.dictionary.as_ref())?;

        let mut global_permissions = self.global_permissions.clone();
        for grant in &parsed.global_grants {
            let permission = match &grant.owner {
                Some(owner) => PermissionReference::new(owner.clone(), &grant.permission),
                None => unique_names
                    .get(&grant.permission)
                    .cloned()
                    .ok_or_else(|| ModelError::UnresolvedName(grant.permission.clone()))?,
            };
            global_permissions.insert(GlobalPermissionEntry::new(&grant.authority, permission));
        }

        let references_by_string = references_by_string(&index.all);

        tracing::info!(
            "loaded permission model '{}': {} sets, {} groups, {} permissions, {} unique names",
            parsed.name,
            index.sets.len(),
            index.groups.len(),
            index.permissions.len(),
            unique_names.len()
        );

        self.index = index;
        self.unique_names = unique_names;
        self.references_by_string = references_by_string;
        self.global_permissions = global_permissions;
        if let Some(default_access) = parsed.default_access {
            self.default_access = default_access;
        }
        self.caches = ModelCaches::default();
        Ok(())
    }

    pub fn dictionary(&self) -> &Arc<dyn Dictionary> {
        &self.dictionary
    }

    pub fn node_service(&self) -> &Arc<dyn NodeService> {
        &self.nodes
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn permission_sets(&self) -> impl Iterator<Item = &PermissionSet> {
        self.index.sets.values()
    }

    pub fn permission_set(&self, owner: &QName) -> Option<&PermissionSet> {
        self.index.sets.get(owner)
    }

    pub fn global_permission_entries(&self) -> &AHashSet<GlobalPermissionEntry> {
        &self.global_permissions
    }

    pub fn default_access(&self) -> AccessStatus {
        self.default_access
    }

    /// The permission's own default when `reference` names a declared
    /// permission, otherwise the model default.
    pub fn default_access_for(&self, reference: Option<&PermissionReference>) -> AccessStatus {
        reference
            .and_then(|reference| self.index.permission(reference))
            .map(|permission| permission.default_access())
            .unwrap_or(self.default_access)
    }

    /// Resolve a name: the bare-name index first, then `name` on `owner`.
    ///
    /// The owner form is not checked against the model; use
    /// `check_permission` for that.
    pub fn permission_reference(
        &self,
        owner: Option<&QName>,
        name: &str,
    ) -> Option<PermissionReference> {
        if let Some(unique) = self.unique_names.get(name) {
            return Some(unique.clone());
        }
        Some(PermissionReference::new(owner?.clone(), name))
    }

    pub fn permission_reference_by_name(&self, name: &str) -> Option<PermissionReference> {
        self.unique_names.get(name).cloned()
    }

    /// Resolve the `{uri}type.Name` form produced by `PermissionReference`'s
    /// `Display`. A string that more than one reference renders to (a dotted
    /// type or name) resolves to nothing.
    pub fn permission_reference_by_string(&self, value: &str) -> Option<PermissionReference> {
        self.references_by_string.get(value).cloned()
    }

    /// Whether the bare name of `reference` resolves to a single target.
    pub fn is_unique(&self, reference: &PermissionReference) -> bool {
        self.unique_names.contains_key(reference.name())
    }

    pub fn permission_group_or_none(
        &self,
        reference: &PermissionReference,
    ) -> Option<Arc<PermissionGroup>> {
        self.index.group(reference).cloned()
    }

    pub fn permission_group(
        &self,
        reference: &PermissionReference,
    ) -> Result<Arc<PermissionGroup>> {
        self.permission_group_or_none(reference)
            .ok_or_else(|| ModelError::PermissionGroupNotFound(reference.clone()))
    }

    pub fn permission_or_none(&self, reference: &PermissionReference) -> Option<Arc<Permission>> {
        self.index.permission(reference).cloned()
    }

    pub fn permission(&self, reference: &PermissionReference) -> Result<Arc<Permission>> {
        self.permission_or_none(reference)
            .ok_or_else(|| ModelError::PermissionNotFound(reference.clone()))
    }

    /// Fails unless `reference` is a declared group or permission.
    pub fn check_permission(&self, reference: &PermissionReference) -> Result<()> {
        if self.is_declared(reference) {
            Ok(())
        } else {
            Err(ModelError::PermissionNotFound(reference.clone()))
        }
    }

    /// Every declared group and permission.
    pub fn all_model_permissions(&self) -> Arc<PermissionRefSet> {
        Arc::clone(&self.index.all)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.caches.stats()
    }

    fn is_declared(&self, reference: &PermissionReference) -> bool {
        self.index.group(reference).is_some() || self.index.permission(reference).is_some()
    }
}

/// Index references by their display string, leaving out strings that more
/// than one reference renders to.
fn references_by_string(all: &PermissionRefSet) -> AHashMap<String, PermissionReference> {
    let mut by_string: AHashMap<String, PermissionReference> = AHashMap::new();
    let mut ambiguous: AHashSet<String> = AHashSet::new();
    for reference in all {
        let key = reference.to_string();
        if ambiguous.contains(&key) {
            continue;
        }
        if let Some(previous) = by_string.remove(&key) {
            tracing::warn!(
                "'{}' names both {:?} and {:?}; string lookup disabled for it",
                key,
                previous,
                reference
            );
            ambiguous.insert(key);
        } else {
            by_string.insert(key, reference.clone());
        }
    }
    by_string
}
