//! `permission_model`: declarative permission model engine.
//!
//! Loads permission documents (permission sets per content type or aspect,
//! permission groups, grantable permissions and their requirements) and
//! answers closure queries against a live class dictionary: which permissions
//! grant a permission, what a held permission unlocks, what must also hold on
//! a node, its parent or its children, and whether a permission is full control.
//!
//! Modules:
//! - `qname`: qualified names and namespace prefix resolution
//! - `types`: value types (PermissionReference, RequiredPermission, ...)
//! - `group`: permission groups
//! - `permission`: grantable permissions
//! - `set`: per-type permission sets
//! - `config`: JSON model document schema
//! - `dictionary`: class dictionary / node service collaborators
//! - `cache`: memo tables behind the derived queries
//! - `model`: the `PermissionModel` resolver

pub mod cache;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod group;
pub mod model;
pub mod permission;
pub mod qname;
pub mod set;
pub mod types;

pub use cache::CacheStats;
pub use config::{parse_model_document, read_model_document, ModelDocument};
pub use dictionary::{
    parse_dictionary_document, ClassDefinition, Dictionary, DictionaryDocument, InMemoryDictionary,
    InMemoryNodeService, NodeRef, NodeService,
};
pub use error::{ModelError, Result};
pub use group::PermissionGroup;
pub use model::PermissionModel;
pub use permission::Permission;
pub use qname::{NamespaceMap, QName};
pub use set::PermissionSet;
pub use types::{
    AccessStatus, GlobalPermissionEntry, PermissionRefSet, PermissionReference,
    RequiredPermission, RequiredTarget, ALL_PERMISSIONS,
};

/// Maximum depth for class-hierarchy walks and extension chains.
pub const MAX_DEPTH: u32 = 50;
