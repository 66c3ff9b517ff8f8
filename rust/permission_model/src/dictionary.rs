//! Class dictionary and node service collaborators.
//!
//! The model never owns type information: it asks a `Dictionary` for class
//! definitions and subclass relations, and a `NodeService` for the live type
//! and aspects of a node. In-memory implementations are provided for
//! embedding and tests.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::config::NamespaceDecl;
use crate::error::Result;
use crate::qname::{NamespaceMap, QName};
use crate::MAX_DEPTH;

/// A content type or aspect as known to the dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    pub name: QName,
    pub parent: Option<QName>,
    pub aspect: bool,
    /// Mandatory aspects applied to every instance of this class.
    pub default_aspects: AHashSet<QName>,
}

impl ClassDefinition {
    pub fn is_aspect(&self) -> bool {
        self.aspect
    }

    pub fn parent_name(&self) -> Option<&QName> {
        self.parent.as_ref()
    }

    pub fn default_aspect_names(&self) -> &AHashSet<QName> {
        &self.default_aspects
    }
}

pub trait Dictionary: Send + Sync {
    fn class(&self, name: &QName) -> Option<Arc<ClassDefinition>>;

    fn all_aspects(&self) -> Vec<QName>;

    fn type_definition(&self, name: &QName) -> Option<Arc<ClassDefinition>> {
        self.class(name).filter(|class| !class.is_aspect())
    }

    fn aspect_definition(&self, name: &QName) -> Option<Arc<ClassDefinition>> {
        self.class(name).filter(|class| class.is_aspect())
    }

    /// True when `class` is `of` or one of its descendants.
    fn is_sub_class(&self, class: &QName, of: &QName) -> bool {
        let mut current = class.clone();
        for _ in 0..MAX_DEPTH {
            if &current == of {
                return true;
            }
            match self.class(&current).and_then(|c| c.parent.clone()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

/// Opaque node identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct NodeRef(pub String);

impl NodeRef {
    pub fn new(id: &str) -> Self {
        NodeRef(id.to_string())
    }
}

pub trait NodeService: Send + Sync {
    fn node_type(&self, node: &NodeRef) -> Option<QName>;

    fn node_aspects(&self, node: &NodeRef) -> AHashSet<QName>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryDictionary {
    classes: AHashMap<QName, Arc<ClassDefinition>>,
}

impl InMemoryDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, name: QName, parent: Option<QName>, default_aspects: &[QName]) {
        self.insert(name, parent, false, default_aspects);
    }

    pub fn add_aspect(&mut self, name: QName, parent: Option<QName>) {
        self.insert(name, parent, true, &[]);
    }

    fn insert(
        &mut self,
        name: QName,
        parent: Option<QName>,
        aspect: bool,
        default_aspects: &[QName],
    ) {
        let class = ClassDefinition {
            name: name.clone(),
            parent,
            aspect,
            default_aspects: default_aspects.iter().cloned().collect(),
        };
        self.classes.insert(name, Arc::new(class));
    }

    /// Build from a JSON dictionary document.
    pub fn from_document(document: &DictionaryDocument) -> Result<Self> {
        let mut namespaces = NamespaceMap::new();
        for decl in &document.namespaces {
            namespaces.register(&decl.prefix, &decl.uri);
        }
        let mut dictionary = InMemoryDictionary::new();
        for class in &document.classes {
            let name = namespaces.resolve(&class.name)?;
            let parent = class
                .parent
                .as_deref()
                .map(|p| namespaces.resolve(p))
                .transpose()?;
            let default_aspects = class
                .default_aspects
                .iter()
                .map(|a| namespaces.resolve(a))
                .collect::<Result<Vec<_>>>()?;
            dictionary.insert(name, parent, class.aspect, &default_aspects);
        }
        Ok(dictionary)
    }
}

impl Dictionary for InMemoryDictionary {
    fn class(&self, name: &QName) -> Option<Arc<ClassDefinition>> {
        self.classes.get(name).cloned()
    }

    fn all_aspects(&self) -> Vec<QName> {
        let mut aspects: Vec<QName> = self
            .classes
            .values()
            .filter(|class| class.is_aspect())
            .map(|class| class.name.clone())
            .collect();
        aspects.sort();
        aspects
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryDocument {
    #[serde(default)]
    pub namespaces: Vec<NamespaceDecl>,
    #[serde(default)]
    pub classes: Vec<ClassConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassConfig {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub aspect: bool,
    #[serde(default)]
    pub default_aspects: Vec<String>,
}

/// Parse a dictionary document from a JSON string.
pub fn parse_dictionary_document(json: &str) -> Result<DictionaryDocument> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Debug, Default)]
pub struct InMemoryNodeService {
    nodes: RwLock<AHashMap<NodeRef, (QName, AHashSet<QName>)>>,
}

impl InMemoryNodeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, node: NodeRef, node_type: QName, aspects: &[QName]) {
        self.nodes
            .write()
            .insert(node, (node_type, aspects.iter().cloned().collect()));
    }
}

impl NodeService for InMemoryNodeService {
    fn node_type(&self, node: &NodeRef) -> Option<QName> {
        self.nodes.read().get(node).map(|(node_type, _)| node_type.clone())
    }

    fn node_aspects(&self, node: &NodeRef) -> AHashSet<QName> {
        self.nodes
            .read()
            .get(node)
            .map(|(_, aspects)| aspects.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sys(local: &str) -> QName {
        QName::new("urn:model:system", local)
    }

    fn dictionary() -> InMemoryDictionary {
        let mut dictionary = InMemoryDictionary::new();
        dictionary.add_type(sys("base"), None, &[]);
        dictionary.add_type(sys("container"), Some(sys("base")), &[sys("referenceable")]);
        dictionary.add_type(sys("store_root"), Some(sys("container")), &[]);
        dictionary.add_aspect(sys("referenceable"), None);
        dictionary
    }

    #[test]
    fn sub_class_walks_parents() {
        let dictionary = dictionary();
        assert!(dictionary.is_sub_class(&sys("store_root"), &sys("base")));
        assert!(dictionary.is_sub_class(&sys("base"), &sys("base")));
        assert!(!dictionary.is_sub_class(&sys("base"), &sys("container")));
        assert!(!dictionary.is_sub_class(&sys("unknown"), &sys("base")));
    }

    #[test]
    fn type_and_aspect_lookups_are_disjoint() {
        let dictionary = dictionary();
        assert!(dictionary.type_definition(&sys("container")).is_some());
        assert!(dictionary.aspect_definition(&sys("container")).is_none());
        assert!(dictionary.aspect_definition(&sys("referenceable")).is_some());
        assert_eq!(dictionary.all_aspects(), vec![sys("referenceable")]);
        let container = dictionary.class(&sys("container")).unwrap();
        assert!(container.default_aspect_names().contains(&sys("referenceable")));
    }

    #[test]
    fn dictionary_document_resolves_prefixes() {
        let json = r#"{
            "namespaces": [{"prefix": "sys", "uri": "urn:model:system"}],
            "classes": [
                {"name": "sys:base"},
                {"name": "sys:container", "parent": "sys:base",
                 "defaultAspects": ["sys:referenceable"]},
                {"name": "sys:referenceable", "aspect": true}
            ]
        }"#;
        let document = parse_dictionary_document(json).unwrap();
        let dictionary = InMemoryDictionary::from_document(&document).unwrap();
        assert_eq!(
            dictionary.class(&sys("container")).unwrap().parent_name(),
            Some(&sys("base"))
        );
        assert!(dictionary.class(&sys("referenceable")).unwrap().is_aspect());
    }

    #[test]
    fn node_service_reports_type_and_aspects() {
        let nodes = InMemoryNodeService::new();
        let root = NodeRef::new("root");
        nodes.insert(root.clone(), sys("store_root"), &[sys("referenceable")]);
        assert_eq!(nodes.node_type(&root), Some(sys("store_root")));
        assert_eq!(nodes.node_aspects(&root).len(), 1);
        assert!(nodes.node_type(&NodeRef::new("missing")).is_none());
        assert!(nodes.node_aspects(&NodeRef::new("missing")).is_empty());
    }
}
