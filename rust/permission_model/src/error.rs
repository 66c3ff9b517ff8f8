use std::path::PathBuf;

use thiserror::Error;

use crate::qname::QName;
use crate::types::PermissionReference;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model document parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value {value:?} for attribute '{attribute}'")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },

    #[error("unknown namespace prefix '{0}'")]
    UnknownPrefix(String),

    #[error("invalid qualified name '{0}'")]
    InvalidQName(String),

    #[error("'{0}' is reserved and cannot name a permission or permission group")]
    ReservedName(String),

    #[error("'{name}' is defined more than once for {owner}")]
    DuplicateDefinition { owner: QName, name: String },

    #[error("cyclic definition through {0}")]
    CyclicDefinition(PermissionReference),

    #[error("permission group not found: {0}")]
    PermissionGroupNotFound(PermissionReference),

    #[error("permission not found: {0}")]
    PermissionNotFound(PermissionReference),

    #[error("permission name '{0}' does not resolve to a unique permission")]
    UnresolvedName(String),

    #[error("no base permission group for {0}")]
    UnresolvedBaseGroup(PermissionReference),
}

pub type Result<T> = std::result::Result<T, ModelError>;
