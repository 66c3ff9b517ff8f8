//! Requirements that must also hold on a node, its parent or its children.

use std::sync::Arc;

use ahash::AHashSet;

use super::PermissionModel;
use crate::dictionary::NodeRef;
use crate::group::PermissionGroup;
use crate::qname::QName;
use crate::types::{PermissionRefSet, PermissionReference, RequiredTarget};

/// Concrete node shape a requirement is evaluated against.
#[derive(Clone, Copy)]
struct NodeShape<'a> {
    type_name: &'a QName,
    aspects: &'a [QName],
}

impl PermissionModel {
    /// Permissions that must also hold on `on` for `required` to be usable on
    /// a node of `type_name` carrying `aspects`.
    ///
    /// For a group this collects, across its included groups, the permissions
    /// granted to it that apply to the node (only meaningful for
    /// `RequiredTarget::Node`). For a leaf permission it is the permission's
    /// own non-implying requirements on `on`. `None` yields an empty set.
    pub fn required_permissions(
        &self,
        required: Option<&PermissionReference>,
        type_name: &QName,
        aspects: &[QName],
        on: RequiredTarget,
    ) -> Arc<PermissionRefSet> {
        let Some(required) = required else {
            return Arc::new(PermissionRefSet::new());
        };
        let key = self.caches.keys.required_key(required, type_name, aspects, on);
        if let Some(cached) = self.caches.lookup(&self.caches.required, &key) {
            return cached;
        }
        tracing::debug!(
            "computing {} requirements of {} for {}",
            on,
            required,
            type_name
        );
        let node = NodeShape { type_name, aspects };
        let permissions = self.requirements(required, on, Some(node));
        self.caches
            .store(&self.caches.required, key, Arc::new(permissions))
    }

    /// As `required_permissions`, without checking whether the granting groups
    /// apply to any particular node.
    pub fn unconditional_required_permissions(
        &self,
        required: Option<&PermissionReference>,
        on: RequiredTarget,
    ) -> Arc<PermissionRefSet> {
        let Some(required) = required else {
            return Arc::new(PermissionRefSet::new());
        };
        let key = (required.clone(), on);
        if let Some(cached) = self.caches.lookup(&self.caches.unconditional_required, &key) {
            return cached;
        }
        tracing::debug!("computing unconditional {} requirements of {}", on, required);
        let permissions = self.requirements(required, on, None);
        self.caches
            .store(&self.caches.unconditional_required, key, Arc::new(permissions))
    }

    /// `required_permissions` against the live type and aspects of `node`.
    pub fn required_permissions_for_node(
        &self,
        required: Option<&PermissionReference>,
        node: &NodeRef,
        on: RequiredTarget,
    ) -> Arc<PermissionRefSet> {
        let Some(type_name) = self.nodes.node_type(node) else {
            return Arc::new(PermissionRefSet::new());
        };
        let mut aspects: Vec<QName> = self.nodes.node_aspects(node).into_iter().collect();
        aspects.sort();
        self.required_permissions(required, &type_name, &aspects, on)
    }

    fn requirements(
        &self,
        required: &PermissionReference,
        on: RequiredTarget,
        node: Option<NodeShape<'_>>,
    ) -> PermissionRefSet {
        match self.base_permission_group_or_none(required) {
            Some(base) => {
                let mut permissions = PermissionRefSet::new();
                self.group_requirements(&base, on, node, &mut AHashSet::new(), &mut permissions);
                permissions
            }
            None => self
                .index
                .permission(required)
                .map(|permission| {
                    permission
                        .requirements_on(on)
                        .map(|edge| edge.reference().clone())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    fn group_requirements(
        &self,
        target: &Arc<PermissionGroup>,
        on: RequiredTarget,
        node: Option<NodeShape<'_>>,
        visiting: &mut AHashSet<PermissionReference>,
        permissions: &mut PermissionRefSet,
    ) {
        // Full-control groups reach every group, including ones that include
        // them back; each base is expanded once.
        if !visiting.insert(target.reference().clone()) {
            return;
        }

        for group in self.index.groups.values() {
            let Some(base) = self.base_permission_group_or_none(group.reference()) else {
                continue;
            };
            if !self.matches_target(target, &base, group.reference(), node) {
                continue;
            }
            for included in group.included_permission_groups() {
                if let Some(included_base) = self.base_permission_group_or_none(included) {
                    self.group_requirements(&included_base, on, node, visiting, permissions);
                }
            }
        }

        if on != RequiredTarget::Node {
            return;
        }
        for permission in self.index.permissions.values() {
            let applies = permission.granted_to_groups().iter().any(|granted_to| {
                self.base_permission_group_or_none(granted_to)
                    .is_some_and(|base| self.matches_target(target, &base, granted_to, node))
            });
            if applies {
                permissions.insert(permission.reference().clone());
            }
        }
    }

    /// `base` stands for `target` (or `target` is full control) and the
    /// declaring group applies to the node.
    fn matches_target(
        &self,
        target: &PermissionGroup,
        base: &PermissionGroup,
        declared: &PermissionReference,
        node: Option<NodeShape<'_>>,
    ) -> bool {
        if base.reference() != target.reference() && !target.allows_full_control() {
            return false;
        }
        match node {
            Some(node) => !base.is_type_required() || self.is_part_of_dynamic_group(declared, node),
            None => true,
        }
    }

    /// Whether the node's type or one of its aspects is (a subclass of) the
    /// owner of `group`.
    fn is_part_of_dynamic_group(&self, group: &PermissionReference, node: NodeShape<'_>) -> bool {
        let owner = group.owner();
        self.dictionary.is_sub_class(node.type_name, owner)
            || node
                .aspects
                .iter()
                .any(|aspect| self.dictionary.is_sub_class(aspect, owner))
    }
}
