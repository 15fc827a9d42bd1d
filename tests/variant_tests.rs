//! Integration tests for variant sets and variant edit contexts.

use std::rc::Rc;

use uscene::prelude::*;

fn variant_ctx() -> (MemStore, Context, NodeId) {
    register_default_schemas();
    let store = MemStore::new();
    store.create_prim("/asset", "Xform").unwrap();
    store.add_variant_set("/asset", "looks", &["red", "blue"]);
    store.add_variant_set("/asset", "lod", &["high", "mid", "low"]);

    let mut ctx = Context::new(Rc::new(store.clone()));
    ctx.import().unwrap();
    let id = ctx.find_node("/asset").unwrap();
    (store, ctx, id)
}

#[test]
fn test_variant_sets_synced_from_store() {
    let (_store, ctx, id) = variant_ctx();
    let node = ctx.node(id);

    assert!(node.has_variants());
    assert_eq!(node.num_variant_sets(), 2);
    assert_eq!(node.variant_set_name(0), Some("looks"));
    assert_eq!(node.num_variants(1), 3);
    assert_eq!(node.variant_name(0, 1), Some("blue"));
    assert_eq!(node.find_variant_set("lod"), Some(1));
    assert_eq!(node.find_variant_set("nope"), None);
    assert_eq!(node.find_variant(0, "red"), Some(0));
    assert_eq!(node.find_variant(0, "green"), None);
    // nothing selected yet
    assert_eq!(node.variant_selection(0), None);
}

#[test]
fn test_out_of_range_selection_clears() {
    let (_store, mut ctx, id) = variant_ctx();

    assert!(ctx.set_variant_selection(id, 0, Some(1)));
    assert_eq!(ctx.node(id).variant_selection(0), Some(1));

    // stale index from a UI: cleared, not an error
    assert!(ctx.set_variant_selection(id, 0, Some(5)));
    assert_eq!(ctx.node(id).variant_selection(0), None);

    assert!(ctx.set_variant_selection(id, 0, None));
    assert_eq!(ctx.node(id).variant_selection(0), None);
}

#[test]
fn test_selection_propagates_to_store() {
    let (store, mut ctx, id) = variant_ctx();

    ctx.set_variant_selection(id, 0, Some(0));
    let prim = store.find("/asset").unwrap();
    assert_eq!(prim.variant_selection("looks").as_deref(), Some("red"));

    ctx.set_variant_selection(id, 0, None);
    assert_eq!(prim.variant_selection("looks"), None);
}

#[test]
fn test_selection_flags_and_force_update() {
    let (_store, mut ctx, id) = variant_ctx();

    ctx.set_variant_selection(id, 1, Some(2));
    assert!(ctx.take_force_update_request());

    ctx.update(0.0);
    let flags = ctx.node(id).update_flags();
    assert!(flags.contains(UpdateFlags::VARIANT_SELECTION_CHANGED));
    assert!(flags.contains(UpdateFlags::FORCE_UPDATE));
}

#[test]
fn test_edit_context_single_open() {
    let (_store, mut ctx, id) = variant_ctx();
    let node = ctx.node_mut(id);

    node.begin_edit_variant("looks", "red").unwrap();
    let err = node.begin_edit_variant("lod", "high");
    assert!(matches!(err, Err(Error::EditContextMisuse(_))));
    node.end_edit_variant().unwrap();
    assert!(matches!(
        node.end_edit_variant(),
        Err(Error::EditContextMisuse(_))
    ));
}

#[test]
fn test_edit_variant_redirects_authoring() {
    let (store, mut ctx, id) = variant_ctx();
    let node = ctx.node_mut(id);

    node.begin_edit_variant("looks", "blue").unwrap();
    node.create_attribute("tint", AttributeType::Float3, AttributeType::Unknown)
        .unwrap();
    node.end_edit_variant().unwrap();

    assert_eq!(
        store.attribute_variant("/asset", "tint"),
        Some(("looks".to_string(), "blue".to_string()))
    );
}

#[test]
fn test_begin_edit_authors_missing_variant() {
    let (_store, mut ctx, id) = variant_ctx();
    let node = ctx.node_mut(id);

    node.begin_edit_variant("rig", "anim").unwrap();
    node.end_edit_variant().unwrap();

    assert_eq!(node.find_variant_set("rig"), Some(2));
    let iset = node.find_variant_set("rig").unwrap();
    assert_eq!(node.find_variant(iset, "anim"), Some(0));
}

#[test]
fn test_edit_variants_uses_current_selections() {
    let (store, mut ctx, id) = variant_ctx();
    ctx.set_variant_selection(id, 0, Some(0)); // looks = red

    let node = ctx.node_mut(id);
    node.edit_variants(|n| {
        n.create_attribute("roughness", AttributeType::Float, AttributeType::Unknown)?;
        Ok(())
    })
    .unwrap();

    assert_eq!(
        store.attribute_variant("/asset", "roughness"),
        Some(("looks".to_string(), "red".to_string()))
    );
    assert!(!ctx.node(id).is_editing_variant());
}

#[test]
fn test_edit_variants_without_selection_runs_on_default() {
    let (store, mut ctx, id) = variant_ctx();

    let node = ctx.node_mut(id);
    node.edit_variants(|n| {
        n.create_attribute("plain", AttributeType::Int, AttributeType::Unknown)?;
        Ok(())
    })
    .unwrap();

    // no variant selected anywhere: authored into the default composition
    assert_eq!(store.attribute_variant("/asset", "plain"), None);
}

#[test]
fn test_child_creation_inside_edit_lands_in_variant() {
    let (store, mut ctx, id) = variant_ctx();

    ctx.node_mut(id).begin_edit_variant("looks", "red").unwrap();
    let child = ctx.create_node(id, "red_only", "Xform").unwrap();
    ctx.node_mut(id).end_edit_variant().unwrap();

    assert_eq!(ctx.node(child).name(), "red_only");
    assert_eq!(
        store.prim_variant("/asset/red_only"),
        Some(("looks".to_string(), "red".to_string()))
    );
}

#[test]
fn test_edit_variants_releases_on_failure() {
    let (_store, mut ctx, id) = variant_ctx();
    ctx.set_variant_selection(id, 0, Some(1));

    let node = ctx.node_mut(id);
    let out: Result<()> = node.edit_variants(|n| {
        assert!(n.is_editing_variant());
        Err(Error::other("body failed"))
    });
    assert!(out.is_err());
    assert!(!ctx.node(id).is_editing_variant());
    // the bracket API is usable again afterwards
    ctx.node_mut(id).begin_edit_variant("looks", "red").unwrap();
    ctx.node_mut(id).end_edit_variant().unwrap();
}
