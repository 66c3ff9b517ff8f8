//! Model document deserialization.
//!
//! A model document is JSON. It is deserialized into the raw schema types
//! below and then resolved into `PermissionSet`s: qualified names are
//! expanded against the document's namespace declarations, string enums are
//! validated, and omitted owner types default to the enclosing set's type.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ModelError, Result};
use crate::group::PermissionGroup;
use crate::permission::Permission;
use crate::qname::{NamespaceMap, QName};
use crate::set::PermissionSet;
use crate::types::{AccessStatus, PermissionReference, RequiredPermission, RequiredTarget};

fn default_true() -> bool {
    true
}

fn default_expose_mode() -> String {
    "all".to_string()
}

/// Top-level model document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    pub name: String,
    #[serde(default)]
    pub namespaces: Vec<NamespaceDecl>,
    #[serde(default)]
    pub default_permission: Option<String>,
    #[serde(default)]
    pub permission_sets: Vec<PermissionSetConfig>,
    #[serde(default)]
    pub global_permissions: Vec<GlobalPermissionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceDecl {
    pub prefix: String,
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSetConfig {
    #[serde(rename = "type")]
    pub owner: String,
    /// `"all"` or `"selected"`.
    #[serde(default = "default_expose_mode")]
    pub expose: String,
    #[serde(default)]
    pub permission_groups: Vec<PermissionGroupConfig>,
    #[serde(default)]
    pub permissions: Vec<PermissionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGroupConfig {
    pub name: String,
    #[serde(default)]
    pub extends: bool,
    /// Explicit type to extend instead of the dictionary parent.
    #[serde(rename = "type", default)]
    pub type_override: Option<String>,
    #[serde(default)]
    pub allow_full_control: bool,
    #[serde(default = "default_true")]
    pub expose: bool,
    #[serde(default = "default_true")]
    pub requires_type: bool,
    #[serde(default)]
    pub includes: Vec<GroupRefConfig>,
}

/// Reference to a group; `type` defaults to the enclosing set's owner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRefConfig {
    #[serde(rename = "type", default)]
    pub owner: Option<String>,
    pub permission_group: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub expose: bool,
    #[serde(default = "default_true")]
    pub requires_type: bool,
    #[serde(default)]
    pub default_permission: Option<String>,
    #[serde(default)]
    pub granted_to_groups: Vec<GroupRefConfig>,
    #[serde(default)]
    pub required_permissions: Vec<RequiredPermissionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequiredPermissionConfig {
    /// `"node"`, `"parent"` or `"children"`.
    pub on: String,
    #[serde(rename = "type", default)]
    pub owner: Option<String>,
    pub name: String,
    #[serde(default)]
    pub implies: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalPermissionConfig {
    pub permission: String,
    #[serde(rename = "type", default)]
    pub owner: Option<String>,
    pub authority: String,
}

// ============================================================================
// Resolution
// ============================================================================

/// A global grant as written; bare names are resolved once the unique-name
/// index has been rebuilt.
#[derive(Debug, Clone)]
pub struct GlobalGrant {
    pub authority: String,
    pub owner: Option<QName>,
    pub permission: String,
}

/// A fully resolved document, ready to merge into a model.
#[derive(Debug, Clone)]
pub struct ParsedModel {
    pub name: String,
    pub default_access: Option<AccessStatus>,
    pub permission_sets: Vec<PermissionSet>,
    pub global_grants: Vec<GlobalGrant>,
}

/// Parse a model document from a JSON string.
pub fn parse_model_document(json: &str) -> Result<ModelDocument> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a model document from disk.
pub fn read_model_document(path: &Path) -> Result<ModelDocument> {
    let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_model_document(&json)
}

fn parse_access(value: &str) -> Result<AccessStatus> {
    AccessStatus::parse(value).ok_or_else(|| ModelError::InvalidAttribute {
        attribute: "defaultPermission",
        value: value.to_string(),
    })
}

fn resolve_owner(
    namespaces: &NamespaceMap,
    owner: Option<&str>,
    fallback: &QName,
) -> Result<QName> {
    match owner {
        Some(name) => namespaces.resolve(name),
        None => Ok(fallback.clone()),
    }
}

impl ModelDocument {
    pub fn namespace_map(&self) -> NamespaceMap {
        let mut map = NamespaceMap::new();
        for decl in &self.namespaces {
            map.register(&decl.prefix, &decl.uri);
        }
        map
    }

    /// Resolve names and validate attribute values. Nothing is partially
    /// applied: any error aborts the whole document.
    pub fn resolve(&self) -> Result<ParsedModel> {
        let namespaces = self.namespace_map();
        let default_access = self
            .default_permission
            .as_deref()
            .map(parse_access)
            .transpose()?;

        let mut permission_sets = Vec::with_capacity(self.permission_sets.len());
        for set_config in &self.permission_sets {
            permission_sets.push(set_config.resolve(&namespaces)?);
        }

        let mut global_grants = Vec::with_capacity(self.global_permissions.len());
        for global in &self.global_permissions {
            let owner = global
                .owner
                .as_deref()
                .map(|name| namespaces.resolve(name))
                .transpose()?;
            global_grants.push(GlobalGrant {
                authority: global.authority.clone(),
                owner,
                permission: global.permission.clone(),
            });
        }

        Ok(ParsedModel {
            name: self.name.clone(),
            default_access,
            permission_sets,
            global_grants,
        })
    }
}

impl PermissionSetConfig {
    fn resolve(&self, namespaces: &NamespaceMap) -> Result<PermissionSet> {
        let owner = namespaces.resolve(&self.owner)?;
        let expose_all = match self.expose.to_ascii_lowercase().as_str() {
            "all" => true,
            "selected" => false,
            _ => {
                return Err(ModelError::InvalidAttribute {
                    attribute: "expose",
                    value: self.expose.clone(),
                })
            }
        };

        let mut set = PermissionSet::new(owner.clone(), expose_all);
        for group_config in &self.permission_groups {
            set.add_permission_group(group_config.resolve(namespaces, &owner)?)?;
        }
        for permission_config in &self.permissions {
            set.add_permission(permission_config.resolve(namespaces, &owner)?)?;
        }
        Ok(set)
    }
}

impl GroupRefConfig {
    fn resolve(&self, namespaces: &NamespaceMap, owner: &QName) -> Result<PermissionReference> {
        let group_owner = resolve_owner(namespaces, self.owner.as_deref(), owner)?;
        Ok(PermissionReference::new(group_owner, &self.permission_group))
    }
}

impl PermissionGroupConfig {
    fn resolve(&self, namespaces: &NamespaceMap, owner: &QName) -> Result<PermissionGroup> {
        let mut group = PermissionGroup::new(owner.clone(), &self.name)
            .with_full_control(self.allow_full_control)
            .with_exposed(self.expose)
            .with_requires_type(self.requires_type);
        if self.extends {
            let type_override = self
                .type_override
                .as_deref()
                .map(|name| namespaces.resolve(name))
                .transpose()?;
            group = group.with_extends(type_override);
        }
        for include in &self.includes {
            group = group.with_include(include.resolve(namespaces, owner)?);
        }
        Ok(group)
    }
}

impl PermissionConfig {
    fn resolve(&self, namespaces: &NamespaceMap, owner: &QName) -> Result<Permission> {
        let mut permission = Permission::new(owner.clone(), &self.name)
            .with_exposed(self.expose)
            .with_requires_type(self.requires_type);
        if let Some(value) = &self.default_permission {
            permission = permission.with_default_access(parse_access(value)?);
        }
        for granted in &self.granted_to_groups {
            permission = permission.with_granted_to(granted.resolve(namespaces, owner)?);
        }
        for required in &self.required_permissions {
            let on = RequiredTarget::parse(&required.on).ok_or_else(|| {
                ModelError::InvalidAttribute {
                    attribute: "on",
                    value: required.on.clone(),
                }
            })?;
            let required_owner = resolve_owner(namespaces, required.owner.as_deref(), owner)?;
            permission = permission.with_required(RequiredPermission::new(
                PermissionReference::new(required_owner, &required.name),
                on,
                required.implies,
            ));
        }
        Ok(permission)
    }
}
