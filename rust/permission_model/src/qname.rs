//! Qualified names: a namespace URI plus a local name.
//!
//! Documents refer to types and aspects either as `prefix:local` (resolved
//! against the document's namespace declarations) or in `{uri}local` form.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{ModelError, Result};

/// Qualified name of a content type or aspect.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct QName {
    namespace: Arc<str>,
    local_name: Arc<str>,
}

impl QName {
    pub fn new(namespace: &str, local_name: &str) -> Self {
        QName {
            namespace: Arc::from(namespace),
            local_name: Arc::from(local_name),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Parse the `{uri}local` form.
    pub fn parse_braced(s: &str) -> Result<Self> {
        let invalid = || ModelError::InvalidQName(s.to_string());
        let rest = s.strip_prefix('{').ok_or_else(invalid)?;
        let (namespace, local_name) = rest.split_once('}').ok_or_else(invalid)?;
        if local_name.is_empty() {
            return Err(invalid());
        }
        Ok(QName::new(namespace, local_name))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local_name)
    }
}

/// Prefix → namespace URI declarations of one document.
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    prefixes: AHashMap<String, String>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, prefix: &str, uri: &str) {
        self.prefixes.insert(prefix.to_string(), uri.to_string());
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Resolve `prefix:local`, `{uri}local`, or a bare local name in the
    /// default (empty-prefix) namespace.
    pub fn resolve(&self, name: &str) -> Result<QName> {
        if name.starts_with('{') {
            return QName::parse_braced(name);
        }
        let (prefix, local_name) = name.split_once(':').unwrap_or(("", name));
        if local_name.is_empty() {
            return Err(ModelError::InvalidQName(name.to_string()));
        }
        match self.uri(prefix) {
            Some(uri) => Ok(QName::new(uri, local_name)),
            None if prefix.is_empty() => Ok(QName::new("", local_name)),
            None => Err(ModelError::UnknownPrefix(prefix.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespaces() -> NamespaceMap {
        let mut map = NamespaceMap::new();
        map.register("sys", "urn:model:system");
        map.register("cm", "urn:model:content");
        map
    }

    #[test]
    fn resolve_prefixed_name() {
        let qname = namespaces().resolve("cm:folder").unwrap();
        assert_eq!(qname.namespace(), "urn:model:content");
        assert_eq!(qname.local_name(), "folder");
    }

    #[test]
    fn resolve_braced_name() {
        let qname = namespaces().resolve("{urn:other}thing").unwrap();
        assert_eq!(qname, QName::new("urn:other", "thing"));
    }

    #[test]
    fn unknown_prefix_is_rejected() {
        match namespaces().resolve("xx:thing") {
            Err(ModelError::UnknownPrefix(prefix)) => assert_eq!(prefix, "xx"),
            other => panic!("expected UnknownPrefix, got {:?}", other),
        }
    }

    #[test]
    fn empty_local_name_is_rejected() {
        assert!(matches!(
            namespaces().resolve("cm:"),
            Err(ModelError::InvalidQName(_))
        ));
        assert!(QName::parse_braced("{urn:x}").is_err());
        assert!(QName::parse_braced("{urn:x").is_err());
    }

    #[test]
    fn display_uses_braced_form() {
        let qname = QName::new("urn:model:system", "base");
        assert_eq!(qname.to_string(), "{urn:model:system}base");
        assert_eq!(QName::parse_braced(&qname.to_string()).unwrap(), qname);
    }
}
