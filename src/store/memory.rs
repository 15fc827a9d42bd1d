//! In-memory reference store.
//!
//! Implements the [`Prim`]/[`Store`] handle traits over a plain in-process
//! table. This is the backing used by the test suite and by the export
//! (authoring) path; a production deployment would swap in a handle
//! implementation over the real scene-description engine.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::store::{AttributeDecl, Prim, PrimHandle, Store, TopologyVariance};
use crate::util::Time;

#[derive(Clone, Debug)]
struct MemAttr {
    name: String,
    decl: AttributeDecl,
    /// (set, variant) when authored under a variant edit target.
    variant: Option<(String, String)>,
}

#[derive(Clone, Debug)]
struct MemVariantSet {
    name: String,
    variants: Vec<String>,
    selection: Option<String>,
}

#[derive(Clone, Debug)]
struct PayloadArc {
    asset: Option<String>,
    prim_path: String,
    loaded: bool,
}

#[derive(Clone, Debug)]
struct ReferenceArc {
    asset: Option<String>,
    prim_path: String,
}

#[derive(Debug, Default)]
struct PrimData {
    path: String,
    type_name: String,
    children: Vec<usize>,
    attrs: Vec<MemAttr>,
    sample_times: Vec<Time>,
    payload: Option<PayloadArc>,
    references: Vec<ReferenceArc>,
    variant_sets: Vec<MemVariantSet>,
    instanceable: bool,
    master_path: Option<String>,
    is_master_root: bool,
    in_master: bool,
    topology: TopologyVariance,
    /// (set, variant) when the prim itself was authored under an edit target.
    variant: Option<(String, String)>,
}

struct StoreInner {
    prims: Vec<PrimData>,
    by_path: HashMap<String, usize>,
    /// type name -> parent type name ("" terminates the chain)
    type_parents: HashMap<String, String>,
    /// active authoring targets: (prim index, set, variant)
    edit_targets: Vec<(usize, String, String)>,
}

impl StoreInner {
    fn active_target_for(&self, prim: usize) -> Option<(String, String)> {
        self.edit_targets
            .iter()
            .rev()
            .find(|(p, _, _)| *p == prim)
            .map(|(_, s, v)| (s.clone(), v.clone()))
    }

    fn any_active_target(&self) -> Option<(String, String)> {
        self.edit_targets
            .last()
            .map(|(_, s, v)| (s.clone(), v.clone()))
    }
}

/// In-memory store. Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct MemStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl MemStore {
    /// Empty store with a pseudo-root and the builtin type hierarchy
    /// (Xform, and Mesh/Points/Camera specializing it).
    pub fn new() -> Self {
        let mut by_path = HashMap::new();
        by_path.insert("/".to_string(), 0);
        let root = PrimData {
            path: "/".to_string(),
            ..PrimData::default()
        };
        let mut type_parents = HashMap::new();
        type_parents.insert("Xform".to_string(), String::new());
        type_parents.insert("Mesh".to_string(), "Xform".to_string());
        type_parents.insert("Points".to_string(), "Xform".to_string());
        type_parents.insert("Camera".to_string(), "Xform".to_string());
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                prims: vec![root],
                by_path,
                type_parents,
                edit_targets: Vec::new(),
            })),
        }
    }

    /// Register an additional prim type, optionally specializing a parent.
    pub fn register_type(&self, name: &str, parent: Option<&str>) {
        self.inner
            .borrow_mut()
            .type_parents
            .insert(name.to_string(), parent.unwrap_or("").to_string());
    }

    /// Set authored sample times for a prim.
    pub fn set_sample_times(&self, path: &str, times: &[Time]) {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.by_path.get(path) {
            inner.prims[id].sample_times = times.to_vec();
            inner.prims[id]
                .sample_times
                .sort_by(|a, b| a.total_cmp(b));
        }
    }

    /// Author a variant set with its variant names on a prim.
    pub fn add_variant_set(&self, path: &str, set: &str, variants: &[&str]) {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.by_path.get(path) {
            inner.prims[id].variant_sets.push(MemVariantSet {
                name: set.to_string(),
                variants: variants.iter().map(|s| s.to_string()).collect(),
                selection: None,
            });
        }
    }

    /// Set the topology variance hint on a prim.
    pub fn set_topology_variance(&self, path: &str, v: TopologyVariance) {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.by_path.get(path) {
            inner.prims[id].topology = v;
        }
    }

    /// Mark a prim as the root of a master subtree; every descendant is
    /// flagged as living inside a master.
    pub fn make_master(&self, path: &str) {
        let mut inner = self.inner.borrow_mut();
        let Some(&id) = inner.by_path.get(path) else {
            return;
        };
        inner.prims[id].is_master_root = true;
        let mut stack = vec![id];
        while let Some(p) = stack.pop() {
            inner.prims[p].in_master = true;
            stack.extend(inner.prims[p].children.iter().copied());
        }
    }

    /// Turn a prim into an instance of the master at `master_path`.
    pub fn make_instance(&self, path: &str, master_path: &str) {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.by_path.get(path) {
            inner.prims[id].master_path = Some(master_path.to_string());
        }
    }

    /// Variant provenance of an authored attribute, for inspecting what an
    /// edit target captured.
    pub fn attribute_variant(&self, path: &str, attr: &str) -> Option<(String, String)> {
        let inner = self.inner.borrow();
        let &id = inner.by_path.get(path)?;
        inner.prims[id]
            .attrs
            .iter()
            .find(|a| a.name == attr)
            .and_then(|a| a.variant.clone())
    }

    /// Variant provenance of an authored prim.
    pub fn prim_variant(&self, path: &str) -> Option<(String, String)> {
        let inner = self.inner.borrow();
        let &id = inner.by_path.get(path)?;
        inner.prims[id].variant.clone()
    }

    /// Authored reference arcs of a prim: (asset path, prim path).
    pub fn references(&self, path: &str) -> Vec<(Option<String>, String)> {
        let inner = self.inner.borrow();
        let Some(&id) = inner.by_path.get(path) else {
            return Vec::new();
        };
        inner.prims[id]
            .references
            .iter()
            .map(|r| (r.asset.clone(), r.prim_path.clone()))
            .collect()
    }

    /// Remove an authored attribute. Exercises the schema layer's
    /// store-side-deletion limitation.
    pub fn remove_attribute(&self, path: &str, attr: &str) {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.by_path.get(path) {
            inner.prims[id].attrs.retain(|a| a.name != attr);
        }
    }

    fn handle(&self, id: usize) -> PrimHandle {
        Rc::new(MemPrim {
            inner: self.inner.clone(),
            id,
        })
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemStore {
    fn root(&self) -> PrimHandle {
        self.handle(0)
    }

    fn find(&self, path: &str) -> Option<PrimHandle> {
        let id = *self.inner.borrow().by_path.get(path)?;
        Some(self.handle(id))
    }

    fn masters(&self) -> Vec<PrimHandle> {
        let ids: Vec<usize> = {
            let inner = self.inner.borrow();
            inner
                .prims
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_master_root)
                .map(|(i, _)| i)
                .collect()
        };
        ids.into_iter().map(|i| self.handle(i)).collect()
    }

    fn create_prim(&self, path: &str, type_name: &str) -> Option<PrimHandle> {
        if !path.starts_with('/') || path == "/" {
            return None;
        }
        let parent_path = match path.rfind('/') {
            Some(0) => "/".to_string(),
            Some(pos) => path[..pos].to_string(),
            None => return None,
        };
        let id = {
            let mut inner = self.inner.borrow_mut();
            if inner.by_path.contains_key(path) {
                return None;
            }
            let &parent = inner.by_path.get(&parent_path)?;
            let variant = inner.any_active_target();
            let in_master = inner.prims[parent].in_master;
            let id = inner.prims.len();
            inner.prims.push(PrimData {
                path: path.to_string(),
                type_name: type_name.to_string(),
                in_master,
                variant,
                ..PrimData::default()
            });
            inner.prims[parent].children.push(id);
            inner.by_path.insert(path.to_string(), id);
            id
        };
        Some(self.handle(id))
    }
}

struct MemPrim {
    inner: Rc<RefCell<StoreInner>>,
    id: usize,
}

impl Prim for MemPrim {
    fn store_id(&self) -> u64 {
        self.id as u64
    }

    fn path(&self) -> String {
        self.inner.borrow().prims[self.id].path.clone()
    }

    fn type_name(&self) -> String {
        self.inner.borrow().prims[self.id].type_name.clone()
    }

    fn is_a(&self, type_name: &str) -> bool {
        let inner = self.inner.borrow();
        let mut current = inner.prims[self.id].type_name.clone();
        while !current.is_empty() {
            if current == type_name {
                return true;
            }
            current = inner
                .type_parents
                .get(&current)
                .cloned()
                .unwrap_or_default();
        }
        false
    }

    fn child_paths(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        inner.prims[self.id]
            .children
            .iter()
            .map(|&c| inner.prims[c].path.clone())
            .collect()
    }

    fn attribute_names(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        inner.prims[self.id]
            .attrs
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    fn attribute_decl(&self, name: &str) -> Option<AttributeDecl> {
        let inner = self.inner.borrow();
        inner.prims[self.id]
            .attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.decl)
    }

    fn author_attribute(&self, name: &str, decl: AttributeDecl) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.prims[self.id].attrs.iter().any(|a| a.name == name) {
            return false;
        }
        let variant = inner.active_target_for(self.id);
        inner.prims[self.id].attrs.push(MemAttr {
            name: name.to_string(),
            decl,
            variant,
        });
        true
    }

    fn sample_times(&self) -> Vec<Time> {
        self.inner.borrow().prims[self.id].sample_times.clone()
    }

    fn add_reference(&self, asset_path: Option<&str>, prim_path: &str) -> bool {
        if prim_path.is_empty() {
            return false;
        }
        // Local references must resolve inside this store.
        if asset_path.is_none() && !self.inner.borrow().by_path.contains_key(prim_path) {
            return false;
        }
        self.inner.borrow_mut().prims[self.id]
            .references
            .push(ReferenceArc {
                asset: asset_path.map(str::to_string),
                prim_path: prim_path.to_string(),
            });
        true
    }

    fn has_payload(&self) -> bool {
        self.inner.borrow().prims[self.id].payload.is_some()
    }

    fn is_payload_loaded(&self) -> bool {
        self.inner.borrow().prims[self.id]
            .payload
            .as_ref()
            .map(|p| p.loaded)
            .unwrap_or(false)
    }

    fn load_payload(&self) {
        if let Some(p) = self.inner.borrow_mut().prims[self.id].payload.as_mut() {
            p.loaded = true;
        }
    }

    fn unload_payload(&self) {
        if let Some(p) = self.inner.borrow_mut().prims[self.id].payload.as_mut() {
            p.loaded = false;
        }
    }

    fn set_payload(&self, asset_path: Option<&str>, prim_path: &str) -> bool {
        if prim_path.is_empty() {
            return false;
        }
        self.inner.borrow_mut().prims[self.id].payload = Some(PayloadArc {
            asset: asset_path.map(str::to_string),
            prim_path: prim_path.to_string(),
            loaded: false,
        });
        true
    }

    fn variant_sets(&self) -> Vec<(String, Vec<String>)> {
        let inner = self.inner.borrow();
        inner.prims[self.id]
            .variant_sets
            .iter()
            .map(|vs| (vs.name.clone(), vs.variants.clone()))
            .collect()
    }

    fn variant_selection(&self, set: &str) -> Option<String> {
        let inner = self.inner.borrow();
        inner.prims[self.id]
            .variant_sets
            .iter()
            .find(|vs| vs.name == set)
            .and_then(|vs| vs.selection.clone())
    }

    fn select_variant(&self, set: &str, variant: Option<&str>) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(vs) = inner.prims[self.id]
            .variant_sets
            .iter_mut()
            .find(|vs| vs.name == set)
        else {
            return false;
        };
        match variant {
            None => {
                vs.selection = None;
                true
            }
            Some(name) if vs.variants.iter().any(|v| v == name) => {
                vs.selection = Some(name.to_string());
                true
            }
            Some(_) => false,
        }
    }

    fn author_variant(&self, set: &str, variant: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        let prim = &mut inner.prims[self.id];
        match prim.variant_sets.iter_mut().find(|vs| vs.name == set) {
            Some(vs) => {
                if !vs.variants.iter().any(|v| v == variant) {
                    vs.variants.push(variant.to_string());
                }
            }
            None => prim.variant_sets.push(MemVariantSet {
                name: set.to_string(),
                variants: vec![variant.to_string()],
                selection: None,
            }),
        }
        true
    }

    fn begin_variant_edit(&self, set: &str, variant: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        let known = inner.prims[self.id]
            .variant_sets
            .iter()
            .any(|vs| vs.name == set && vs.variants.iter().any(|v| v == variant));
        if !known {
            return false;
        }
        inner
            .edit_targets
            .push((self.id, set.to_string(), variant.to_string()));
        true
    }

    fn end_variant_edit(&self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(pos) = inner
            .edit_targets
            .iter()
            .rposition(|(p, _, _)| *p == self.id)
        {
            inner.edit_targets.remove(pos);
        }
    }

    fn is_instance(&self) -> bool {
        self.inner.borrow().prims[self.id].master_path.is_some()
    }

    fn master_path(&self) -> Option<String> {
        self.inner.borrow().prims[self.id].master_path.clone()
    }

    fn is_master(&self) -> bool {
        self.inner.borrow().prims[self.id].is_master_root
    }

    fn is_in_master(&self) -> bool {
        self.inner.borrow().prims[self.id].in_master
    }

    fn is_instanceable(&self) -> bool {
        self.inner.borrow().prims[self.id].instanceable
    }

    fn set_instanceable(&self, v: bool) {
        self.inner.borrow_mut().prims[self.id].instanceable = v;
    }

    fn topology_variance(&self) -> TopologyVariance {
        self.inner.borrow().prims[self.id].topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AttributeType;

    #[test]
    fn test_create_and_find() {
        let store = MemStore::new();
        store.create_prim("/geo", "Xform").unwrap();
        let mesh = store.create_prim("/geo/body", "Mesh").unwrap();

        assert_eq!(mesh.name(), "body");
        assert_eq!(mesh.type_name(), "Mesh");
        assert!(store.find("/geo/body").is_some());
        assert!(store.find("/geo/missing").is_none());
        assert_eq!(store.root().child_paths(), vec!["/geo"]);
    }

    #[test]
    fn test_create_rejects_bad_paths() {
        let store = MemStore::new();
        assert!(store.create_prim("/", "Xform").is_none());
        assert!(store.create_prim("relative", "Xform").is_none());
        // missing parent
        assert!(store.create_prim("/a/b", "Xform").is_none());
        // duplicate
        store.create_prim("/a", "Xform").unwrap();
        assert!(store.create_prim("/a", "Xform").is_none());
    }

    #[test]
    fn test_type_ancestry() {
        let store = MemStore::new();
        let mesh = store.create_prim("/m", "Mesh").unwrap();
        assert!(mesh.is_a("Mesh"));
        assert!(mesh.is_a("Xform"));
        assert!(!mesh.is_a("Camera"));

        let xf = store.create_prim("/x", "Xform").unwrap();
        assert!(xf.is_a("Xform"));
        assert!(!xf.is_a("Mesh"));
    }

    #[test]
    fn test_payload_state() {
        let store = MemStore::new();
        let prim = store.create_prim("/p", "Xform").unwrap();
        assert!(!prim.has_payload());

        prim.set_payload(Some("asset.usd"), "/root");
        assert!(prim.has_payload());
        assert!(!prim.is_payload_loaded());

        prim.load_payload();
        assert!(prim.is_payload_loaded());
        prim.unload_payload();
        assert!(!prim.is_payload_loaded());
    }

    #[test]
    fn test_local_reference_requires_target() {
        let store = MemStore::new();
        let prim = store.create_prim("/p", "Xform").unwrap();
        assert!(!prim.add_reference(None, "/does/not/exist"));
        store.create_prim("/other", "Xform").unwrap();
        assert!(prim.add_reference(None, "/other"));
        // external references are not resolved here
        assert!(prim.add_reference(Some("ext.usd"), "/whatever"));
    }

    #[test]
    fn test_variant_edit_target_tags_attributes() {
        let store = MemStore::new();
        let prim = store.create_prim("/p", "Xform").unwrap();
        store.add_variant_set("/p", "looks", &["red", "blue"]);

        assert!(prim.begin_variant_edit("looks", "red"));
        prim.author_attribute("color", AttributeDecl::plain(AttributeType::Float3));
        prim.end_variant_edit();
        prim.author_attribute("plain", AttributeDecl::plain(AttributeType::Float));

        assert_eq!(
            store.attribute_variant("/p", "color"),
            Some(("looks".to_string(), "red".to_string()))
        );
        assert_eq!(store.attribute_variant("/p", "plain"), None);
    }

    #[test]
    fn test_master_flags() {
        let store = MemStore::new();
        store.create_prim("/__master", "Xform").unwrap();
        store.create_prim("/__master/shape", "Mesh").unwrap();
        store.make_master("/__master");

        let m = store.find("/__master").unwrap();
        assert!(m.is_master());
        assert!(m.is_in_master());
        let shape = store.find("/__master/shape").unwrap();
        assert!(!shape.is_master());
        assert!(shape.is_in_master());
        assert_eq!(store.masters().len(), 1);
    }
}
