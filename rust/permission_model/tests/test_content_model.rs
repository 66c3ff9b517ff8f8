//! Integration tests against the content-model fixture.
//!
//! `tests/fixtures/content_model.json` declares the system base permissions,
//! the content roles (Consumer .. Coordinator), the lockable and ownable
//! aspects and the site roles; `tests/fixtures/dictionary.json` declares the
//! matching type hierarchy. The cardinalities asserted here are regression
//! values for that fixture.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use permission_model::{
    parse_dictionary_document, read_model_document, InMemoryDictionary, InMemoryNodeService,
    NodeRef, PermissionModel, PermissionReference, QName, RequiredTarget,
};

const SYS: &str = "urn:model:system";
const CM: &str = "urn:model:content";
const ST: &str = "urn:model:site";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(nodes: Arc<InMemoryNodeService>) -> PermissionModel {
    let dictionary_json = std::fs::read_to_string(fixture("dictionary.json")).unwrap();
    let dictionary =
        InMemoryDictionary::from_document(&parse_dictionary_document(&dictionary_json).unwrap())
            .unwrap();
    let document = read_model_document(&fixture("content_model.json")).unwrap();
    PermissionModel::from_document(Arc::new(dictionary), nodes, &document).unwrap()
}

fn model() -> PermissionModel {
    load(Arc::new(InMemoryNodeService::new()))
}

fn sys(local: &str) -> QName {
    QName::new(SYS, local)
}

fn cm(local: &str) -> QName {
    QName::new(CM, local)
}

fn by_name(model: &PermissionModel, name: &str) -> PermissionReference {
    model
        .permission_reference_by_name(name)
        .unwrap_or_else(|| panic!("'{}' should resolve to a unique reference", name))
}

#[test]
fn model_declares_every_group_and_permission() {
    let model = model();
    assert_eq!(model.all_model_permissions().len(), 63);
    assert_eq!(model.permission_sets().count(), 7);
    assert_eq!(model.global_permission_entries().len(), 5);
}

#[test]
fn role_grantee_cardinalities() {
    let model = model();
    for (role, expected) in [
        ("Consumer", 8),
        ("Contributor", 14),
        ("Editor", 17),
        ("Collaborator", 24),
        ("Coordinator", 63),
        ("RecordAdministrator", 19),
    ] {
        let reference = by_name(&model, role);
        assert_eq!(reference.owner(), &cm("cmobject"), "{} base", role);
        let grantees = model.grantee_permissions(Some(&reference)).unwrap();
        assert_eq!(grantees.len(), expected, "grantees of {}", role);
    }
}

#[test]
fn coordinator_grants_the_whole_model() {
    let model = model();
    let coordinator = by_name(&model, "Coordinator");
    assert_eq!(
        *model.grantee_permissions(Some(&coordinator)).unwrap(),
        *model.all_model_permissions()
    );
    assert!(model.has_full(Some(&coordinator)));
    assert!(model.has_full(Some(&PermissionReference::new(cm("folder"), "Coordinator"))));
    assert!(!model.has_full(Some(&PermissionReference::new(cm("folder"), "Consumer"))));
}

#[test]
fn granting_cardinalities() {
    let model = model();
    let read_properties = PermissionReference::new(sys("base"), "ReadProperties");
    let granting = model.granting_permissions(Some(&read_properties)).unwrap();
    assert_eq!(granting.len(), 16);
    assert!(granting.contains(&read_properties));
    assert!(granting.contains(&PermissionReference::new(cm("folder"), "Coordinator")));
    assert!(!granting.contains(&PermissionReference::new(cm("folder"), "Consumer")));

    let low_level = PermissionReference::new(sys("base"), "_ReadProperties");
    let granting = model.granting_permissions(Some(&low_level)).unwrap();
    assert_eq!(granting.len(), 17);
    assert!(granting.contains(&read_properties));
}

#[test]
fn checkout_requirements_on_the_root_node() {
    let nodes = Arc::new(InMemoryNodeService::new());
    let model = load(Arc::clone(&nodes));
    let root = NodeRef::new("workspace://SpacesStore/root");
    nodes.insert(
        root.clone(),
        sys("store_root"),
        &[sys("aspect_root"), sys("referenceable")],
    );

    let check_out = by_name(&model, "CheckOut");
    let required =
        model.required_permissions_for_node(Some(&check_out), &root, RequiredTarget::Node);
    assert_eq!(required.len(), 1);
    assert!(required.contains(&PermissionReference::new(cm("lockable"), "_CheckOut")));
}

#[test]
fn group_requirements_on_content() {
    let model = model();
    let read = PermissionReference::new(sys("base"), "Read");
    let required =
        model.required_permissions(Some(&read), &cm("content"), &[], RequiredTarget::Node);
    assert_eq!(required.len(), 3);
    for name in ["_ReadProperties", "_ReadChildren", "_ReadContent"] {
        assert!(required.contains(&PermissionReference::new(sys("base"), name)));
    }
}

#[test]
fn delete_node_requirements_by_target() {
    let model = model();
    let delete_node = PermissionReference::new(sys("base"), "_DeleteNode");
    let expect = |on, name: &str| {
        let required = model.unconditional_required_permissions(Some(&delete_node), on);
        assert_eq!(required.len(), 1, "{} requirements", on);
        assert!(required.contains(&PermissionReference::new(sys("base"), name)));
    };
    expect(RequiredTarget::Parent, "_DeleteChildren");
    expect(RequiredTarget::Children, "_DeleteNode");
    expect(RequiredTarget::Node, "_ReadProperties");

    let write_content = PermissionReference::new(sys("base"), "_WriteContent");
    assert!(model
        .required_permissions(Some(&write_content), &cm("content"), &[], RequiredTarget::Node)
        .is_empty());
}

#[test]
fn all_permissions_cardinalities() {
    let model = model();
    assert_eq!(model.all_permissions(&cm("cmobject")).unwrap().len(), 50);
    assert_eq!(
        model
            .all_permissions_with_aspects(&cm("cmobject"), &[cm("lockable")])
            .unwrap()
            .len(),
        56
    );
    // A default aspect adds nothing beyond the type walk.
    assert_eq!(
        model
            .all_permissions_with_aspects(&cm("cmobject"), &[cm("auditable")])
            .unwrap()
            .len(),
        50
    );
    assert_eq!(model.all_permissions(&cm("lockable")).unwrap().len(), 6);
    assert_eq!(
        model.all_permissions(&QName::new(ST, "site")).unwrap().len(),
        54
    );
}

#[test]
fn exposed_permissions_cardinalities() {
    let model = model();
    let cmobject = model.all_exposed_permissions(&cm("cmobject")).unwrap();
    assert_eq!(cmobject.len(), 6);
    assert!(cmobject.contains(&PermissionReference::new(cm("ownable"), "TakeOwnership")));
    assert!(!cmobject.contains(&PermissionReference::new(cm("cmobject"), "RecordAdministrator")));

    // Lockable exposes nothing of its own.
    assert_eq!(
        model
            .all_exposed_permissions_with_aspects(&cm("cmobject"), &[cm("lockable")])
            .unwrap(),
        *cmobject
    );

    assert_eq!(model.all_exposed_permissions(&cm("folder")).unwrap().len(), 6);
    assert_eq!(model.all_exposed_permissions(&cm("content")).unwrap().len(), 2);
    assert_eq!(
        model
            .all_exposed_permissions(&QName::new(ST, "site"))
            .unwrap()
            .len(),
        5
    );
}

#[test]
fn node_permissions_include_non_default_aspects() {
    let nodes = Arc::new(InMemoryNodeService::new());
    let model = load(Arc::clone(&nodes));
    let node = NodeRef::new("workspace://SpacesStore/doc");
    nodes.insert(node.clone(), cm("cmobject"), &[cm("auditable"), cm("lockable")]);
    assert_eq!(model.all_permissions_for_node(&node).unwrap().len(), 56);
}

#[test]
fn global_entries_resolve_bare_names() {
    let model = model();
    let lock_owner: Vec<_> = model
        .global_permission_entries()
        .iter()
        .filter(|entry| entry.authority() == "ROLE_LOCK_OWNER")
        .map(|entry| entry.permission().name().to_string())
        .collect();
    assert_eq!(lock_owner.len(), 3);
    let expected = ["Unlock", "CheckIn", "CancelCheckOut"];
    assert!(lock_owner
        .iter()
        .all(|name| expected.contains(&name.as_str())));
}
