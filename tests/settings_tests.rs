//! Integration tests for settings persistence and per-node overrides.

use std::rc::Rc;

use uscene::prelude::*;

#[test]
fn test_import_settings_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("import.json");

    let mut s = ImportSettings::default();
    s.scale = 0.01;
    s.swap_handedness = true;
    s.load_all_payloads = false;
    s.save(&path).unwrap();

    let loaded = ImportSettings::load(&path).unwrap();
    assert_eq!(loaded, s);
}

#[test]
fn test_export_settings_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");

    let mut s = ExportSettings::default();
    s.instanceable_by_default = true;
    s.save(&path).unwrap();

    let loaded = ExportSettings::load(&path).unwrap();
    assert_eq!(loaded, s);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let err = ImportSettings::load("/no/such/settings.json");
    assert!(matches!(err, Err(Error::Io(_))));
}

#[test]
fn test_node_override_wins_over_defaults() {
    register_default_schemas();
    let store = MemStore::new();
    store.create_prim("/n", "Xform").unwrap();

    let mut defaults = ImportSettings::default();
    defaults.scale = 100.0;
    let mut ctx =
        Context::with_settings(Rc::new(store.clone()), defaults, ExportSettings::default());
    ctx.import().unwrap();
    let n = ctx.find_node("/n").unwrap();

    assert_eq!(ctx.import_settings_for(n).scale, 100.0);

    let mut local = ImportSettings::default();
    local.scale = 0.01;
    ctx.set_import_settings(n, local);
    assert!(ctx.node(n).is_import_settings_overridden());
    assert_eq!(ctx.import_settings_for(n).scale, 0.01);

    // deactivating the override falls back without losing the local value
    ctx.node_mut(n).set_override_import_settings(false);
    assert_eq!(ctx.import_settings_for(n).scale, 100.0);
    assert_eq!(ctx.node(n).local_import_settings().scale, 0.01);

    ctx.node_mut(n).set_override_import_settings(true);
    assert_eq!(ctx.import_settings_for(n).scale, 0.01);
}

#[test]
fn test_export_settings_override_and_flag() {
    register_default_schemas();
    let store = MemStore::new();
    store.create_prim("/n", "Xform").unwrap();
    let mut ctx = Context::new(Rc::new(store.clone()));
    ctx.import().unwrap();
    let n = ctx.find_node("/n").unwrap();

    assert!(!ctx.node(n).is_export_settings_overridden());
    let mut local = ExportSettings::default();
    local.swap_faces = true;
    ctx.set_export_settings(n, local);
    assert!(ctx.node(n).is_export_settings_overridden());
    assert!(ctx.export_settings_for(n).swap_faces);
    assert!(ctx.take_config_update_request());
}

#[test]
fn test_instanceable_by_default_on_export() {
    register_default_schemas();
    let store = MemStore::new();
    let mut es = ExportSettings::default();
    es.instanceable_by_default = true;
    let mut ctx = Context::with_settings(Rc::new(store.clone()), ImportSettings::default(), es);
    let root = ctx.import().unwrap();

    let n = ctx.create_node(root, "rock", "Mesh").unwrap();
    assert!(ctx.node(n).is_instanceable());
}
