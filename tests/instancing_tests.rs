//! Integration tests for master/instance relationships.

use std::rc::Rc;

use uscene::prelude::*;

fn instanced_scene() -> (MemStore, Context) {
    register_default_schemas();
    let store = MemStore::new();

    // shared master subtree
    store.create_prim("/__master1", "Mesh").unwrap();
    store.create_prim("/__master1/detail", "Points").unwrap();
    store.make_master("/__master1");

    // two instances and one plain node
    store.create_prim("/geo", "Xform").unwrap();
    store.create_prim("/geo/rock_a", "Xform").unwrap();
    store.create_prim("/geo/rock_b", "Xform").unwrap();
    store.create_prim("/geo/ground", "Mesh").unwrap();
    store.make_instance("/geo/rock_a", "/__master1");
    store.make_instance("/geo/rock_b", "/__master1");

    let mut ctx = Context::new(Rc::new(store.clone()));
    ctx.import().unwrap();
    (store, ctx)
}

#[test]
fn test_import_wires_masters_and_instances() {
    let (_store, ctx) = instanced_scene();

    let master = ctx.find_node("/__master1").unwrap();
    let a = ctx.find_node("/geo/rock_a").unwrap();
    let b = ctx.find_node("/geo/rock_b").unwrap();

    assert!(ctx.node(master).is_master());
    assert_eq!(ctx.node(master).num_instances(), 2);
    assert_eq!(ctx.node(a).master(), Some(master));
    assert_eq!(ctx.node(b).master(), Some(master));
    assert!(ctx.node(a).is_instance());
    assert!(!ctx.node(a).is_master());

    // the master subtree is not grafted into the main hierarchy
    let root = ctx.root().unwrap();
    let mut top = Vec::new();
    ctx.each_child(root, |n| top.push(n.path().to_string()));
    assert_eq!(top, vec!["/geo"]);

    let mut names = Vec::new();
    ctx.each_instance(master, |n| names.push(n.name().to_string()));
    assert_eq!(names, vec!["rock_a", "rock_b"]);
}

#[test]
fn test_exactly_one_of_plain_master_instance() {
    let (_store, ctx) = instanced_scene();

    let master = ctx.find_node("/__master1").unwrap();
    let a = ctx.find_node("/geo/rock_a").unwrap();
    let ground = ctx.find_node("/geo/ground").unwrap();

    assert!(ctx.node(master).is_master() && !ctx.node(master).is_instance());
    assert!(ctx.node(a).is_instance() && !ctx.node(a).is_master());
    assert!(!ctx.node(ground).is_instance() && !ctx.node(ground).is_master());
}

#[test]
fn test_as_typed_redirects_to_master() {
    let (_store, ctx) = instanced_scene();

    let a = ctx.find_node("/geo/rock_a").unwrap();
    // the instance's authoritative typed view is the master's Mesh
    assert!(ctx.as_typed::<Mesh>(a).is_some());
    // the instance's own authored type does not answer typed queries
    assert!(ctx.as_typed::<Xform>(a).is_none());

    let ground = ctx.find_node("/geo/ground").unwrap();
    assert!(ctx.as_typed::<Mesh>(ground).is_some());
}

#[test]
fn test_capabilities_redirect_to_master() {
    let (_store, ctx) = instanced_scene();

    let a = ctx.find_node("/geo/rock_a").unwrap();
    assert!(ctx.has_capability(a, Capability::Boundable));
    assert!(ctx.has_capability(a, Capability::Xformable));

    let geo = ctx.find_node("/geo").unwrap();
    assert!(!ctx.has_capability(geo, Capability::Boundable));
}

#[test]
fn test_editability() {
    let (_store, ctx) = instanced_scene();

    let a = ctx.find_node("/geo/rock_a").unwrap();
    let detail = ctx.find_node("/__master1/detail").unwrap();
    let ground = ctx.find_node("/geo/ground").unwrap();

    // instances and nodes inside a master are read-only views
    assert!(!ctx.node(a).is_editable());
    assert!(ctx.node(detail).is_in_master());
    assert!(!ctx.node(detail).is_editable());
    assert!(ctx.node(ground).is_editable());
}

#[test]
fn test_set_instanceable_does_not_change_relations() {
    let (store, mut ctx) = instanced_scene();

    let ground = ctx.find_node("/geo/ground").unwrap();
    assert!(!ctx.node(ground).is_instanceable());
    ctx.node_mut(ground).set_instanceable(true);
    assert!(ctx.node(ground).is_instanceable());
    assert!(!ctx.node(ground).is_instance());
    assert!(!ctx.node(ground).is_master());

    let prim = store.find("/geo/ground").unwrap();
    assert!(prim.is_instanceable());
}

#[test]
fn test_remove_instance_detaches_from_master() {
    let (_store, mut ctx) = instanced_scene();

    let master = ctx.find_node("/__master1").unwrap();
    let a = ctx.find_node("/geo/rock_a").unwrap();
    ctx.remove_node(a);

    assert_eq!(ctx.node(master).num_instances(), 1);
    assert!(ctx.find_node("/geo/rock_a").is_none());
}
