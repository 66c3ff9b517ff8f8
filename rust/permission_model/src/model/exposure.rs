//! All permissions applicable to a type, an aspect or a live node.

use std::sync::Arc;

use super::PermissionModel;
use crate::dictionary::NodeRef;
use crate::error::Result;
use crate::qname::QName;
use crate::types::PermissionRefSet;
use crate::MAX_DEPTH;

impl PermissionModel {
    /// Every permission and group that can apply to instances of `type_name`.
    ///
    /// For a content type this is the type-scoped entries of the type, its
    /// supertypes and their default aspects, plus the entries of every aspect
    /// that do not require the aspect to be present. For an aspect it is the
    /// aspect's own chain. Unknown classes yield an empty set.
    pub fn all_permissions(&self, type_name: &QName) -> Result<Arc<PermissionRefSet>> {
        self.type_permissions(type_name, false)
    }

    /// As `all_permissions`, restricted to entries visible to permission
    /// pickers. Supertypes are only walked through sets that expose all.
    pub fn all_exposed_permissions(&self, type_name: &QName) -> Result<Arc<PermissionRefSet>> {
        self.type_permissions(type_name, true)
    }

    /// `all_permissions` plus whatever the given aspects add beyond the type's
    /// default aspects.
    pub fn all_permissions_with_aspects(
        &self,
        type_name: &QName,
        aspects: &[QName],
    ) -> Result<PermissionRefSet> {
        self.permissions_with_aspects(type_name, aspects, false)
    }

    pub fn all_exposed_permissions_with_aspects(
        &self,
        type_name: &QName,
        aspects: &[QName],
    ) -> Result<PermissionRefSet> {
        self.permissions_with_aspects(type_name, aspects, true)
    }

    /// Permissions applicable to the live type and aspects of `node`. A node
    /// unknown to the node service yields an empty set.
    pub fn all_permissions_for_node(&self, node: &NodeRef) -> Result<PermissionRefSet> {
        let Some(type_name) = self.nodes.node_type(node) else {
            return Ok(PermissionRefSet::new());
        };
        let aspects: Vec<QName> = self.nodes.node_aspects(node).into_iter().collect();
        self.permissions_with_aspects(&type_name, &aspects, false)
    }

    fn type_permissions(
        &self,
        type_name: &QName,
        exposed_only: bool,
    ) -> Result<Arc<PermissionRefSet>> {
        let table = if exposed_only {
            &self.caches.type_permissions_exposed
        } else {
            &self.caches.type_permissions_unexposed
        };
        if let Some(cached) = self.caches.lookup(table, type_name) {
            return Ok(cached);
        }
        tracing::debug!(
            "computing {} permissions for {}",
            if exposed_only { "exposed" } else { "all" },
            type_name
        );

        let mut permissions = PermissionRefSet::new();
        if let Some(class) = self.dictionary.class(type_name) {
            if class.is_aspect() {
                self.add_aspect_permissions(type_name, &mut permissions, exposed_only, 0)?;
            } else {
                self.merge_general_aspect_permissions(&mut permissions, exposed_only)?;
                self.add_type_permissions(type_name, &mut permissions, exposed_only, 0)?;
            }
        }
        Ok(self
            .caches
            .store(table, type_name.clone(), Arc::new(permissions)))
    }

    fn permissions_with_aspects(
        &self,
        type_name: &QName,
        aspects: &[QName],
        exposed_only: bool,
    ) -> Result<PermissionRefSet> {
        let mut permissions: PermissionRefSet =
            self.type_permissions(type_name, exposed_only)?.iter().cloned().collect();
        if let Some(class) = self.dictionary.class(type_name) {
            for aspect in aspects {
                if !class.default_aspect_names().contains(aspect) {
                    self.add_aspect_permissions(aspect, &mut permissions, exposed_only, 0)?;
                }
            }
        }
        Ok(permissions)
    }

    /// Supertype chain is walked unless only exposed entries are wanted and
    /// this type's set selects them individually.
    fn walks_to_parent(&self, type_name: &QName, exposed_only: bool) -> bool {
        !exposed_only
            || self
                .index
                .sets
                .get(type_name)
                .map_or(true, |set| set.expose_all())
    }

    fn add_type_permissions(
        &self,
        type_name: &QName,
        permissions: &mut PermissionRefSet,
        exposed_only: bool,
        depth: u32,
    ) -> Result<()> {
        let Some(class) = self.dictionary.type_definition(type_name) else {
            return Ok(());
        };
        if depth < MAX_DEPTH && self.walks_to_parent(type_name, exposed_only) {
            if let Some(parent) = class.parent_name() {
                self.add_type_permissions(parent, permissions, exposed_only, depth + 1)?;
            }
        }
        for aspect in class.default_aspect_names() {
            self.add_aspect_permissions(aspect, permissions, exposed_only, 0)?;
        }
        self.merge_permissions(permissions, type_name, exposed_only, true)
    }

    fn add_aspect_permissions(
        &self,
        aspect: &QName,
        permissions: &mut PermissionRefSet,
        exposed_only: bool,
        depth: u32,
    ) -> Result<()> {
        let Some(class) = self.dictionary.aspect_definition(aspect) else {
            return Ok(());
        };
        if depth < MAX_DEPTH && self.walks_to_parent(aspect, exposed_only) {
            if let Some(parent) = class.parent_name() {
                self.add_aspect_permissions(parent, permissions, exposed_only, depth + 1)?;
            }
        }
        self.merge_permissions(permissions, aspect, exposed_only, true)
    }

    /// Entries of every aspect that apply without the aspect being present.
    fn merge_general_aspect_permissions(
        &self,
        permissions: &mut PermissionRefSet,
        exposed_only: bool,
    ) -> Result<()> {
        for aspect in self.dictionary.all_aspects() {
            self.merge_permissions(permissions, &aspect, exposed_only, false)?;
        }
        Ok(())
    }

    /// Add the entries of `owner`'s set whose type requirement matches
    /// `type_required`. An extending group stands for its base group and only
    /// contributes to the exposed view.
    fn merge_permissions(
        &self,
        permissions: &mut PermissionRefSet,
        owner: &QName,
        exposed_only: bool,
        type_required: bool,
    ) -> Result<()> {
        let Some(set) = self.index.sets.get(owner) else {
            return Ok(());
        };
        let visible = |exposed: bool| !exposed_only || set.expose_all() || exposed;

        for group in set.permission_groups() {
            if !visible(group.is_exposed()) || group.is_type_required() != type_required {
                continue;
            }
            if !group.is_extends() {
                permissions.insert(group.reference().clone());
            } else if exposed_only {
                let base = self.base_permission_group(group.reference())?;
                permissions.insert(base.reference().clone());
            }
        }
        for permission in set.permissions() {
            if visible(permission.is_exposed()) && permission.is_type_required() == type_required {
                permissions.insert(permission.reference().clone());
            }
        }
        Ok(())
    }
}
