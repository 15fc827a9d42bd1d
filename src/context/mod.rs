//! The owning context: node arena, import/export, time stepping.
//!
//! The context owns the memory lifetime of every schema node. Nodes refer
//! to each other with [`NodeId`] handles into the arena; slots are
//! tombstoned on removal and never reused, so an id stays unique for the
//! lifetime of the context. Everything runs on the thread that owns the
//! context; there is no internal locking.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::registry::registry;
use crate::schema::{Capability, NodeId, PrimBehavior, Schema, SchemaBehavior, UpdateFlags};
use crate::settings::{ExportSettings, ImportSettings};
use crate::store::{PrimHandle, StoreHandle};
use crate::util::{Error, Result, Time, TimeRange, INVALID_TIME};

/// Session object owning a tree of schema nodes over one store.
pub struct Context {
    store: StoreHandle,
    nodes: Vec<Option<Schema>>,
    by_path: HashMap<String, NodeId>,
    isettings: ImportSettings,
    esettings: ExportSettings,
    request_force_update: bool,
    request_config_update: bool,
    time: Time,
}

impl Context {
    pub fn new(store: StoreHandle) -> Self {
        Self::with_settings(store, ImportSettings::default(), ExportSettings::default())
    }

    pub fn with_settings(
        store: StoreHandle,
        isettings: ImportSettings,
        esettings: ExportSettings,
    ) -> Self {
        Self {
            store,
            nodes: Vec::new(),
            by_path: HashMap::new(),
            isettings,
            esettings,
            request_force_update: false,
            request_config_update: false,
            time: INVALID_TIME,
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Time of the most recent `update` call.
    pub fn time(&self) -> Time {
        self.time
    }

    // ------------------------------------------------------------------
    // arena access
    // ------------------------------------------------------------------

    /// Number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Borrow a node. Passing a removed node's id is a programming error
    /// and panics; use [`get`](Self::get) for soft access.
    pub fn node(&self, id: NodeId) -> &Schema {
        self.get(id)
            .unwrap_or_else(|| panic!("stale node id {id}"))
    }

    /// Mutably borrow a node. Panics on a removed node's id.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Schema {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("stale node id {id}"))
    }

    pub fn get(&self, id: NodeId) -> Option<&Schema> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Schema> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Ids of all live nodes, in construction order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Find a node by full path.
    pub fn find_node(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// The node built for the store's pseudo-root, once imported.
    pub fn root(&self) -> Option<NodeId> {
        self.find_node("/")
    }

    // ------------------------------------------------------------------
    // import (store -> nodes)
    // ------------------------------------------------------------------

    /// Build the node tree from the store: master subtrees first, then the
    /// main hierarchy, then instance wiring. Prims whose type no registered
    /// schema matches become base untyped nodes.
    pub fn import(&mut self) -> Result<NodeId> {
        let store = self.store.clone();
        for master in store.masters() {
            self.build_subtree(master)?;
        }
        let root = self.build_subtree(store.root())?;
        self.wire_instances();
        if self.isettings.load_all_payloads {
            self.load_all_payloads();
        }
        debug!("imported {} nodes from store", self.num_nodes());
        Ok(root)
    }

    fn build_subtree(&mut self, prim: PrimHandle) -> Result<NodeId> {
        if let Some(&id) = self.by_path.get(&prim.path()) {
            return Ok(id);
        }
        let in_master = prim.is_in_master();
        let id = self.construct_node(prim.clone())?;
        for child_path in prim.child_paths() {
            let child_prim = self
                .store
                .find(&child_path)
                .ok_or_else(|| Error::PrimNotFound(child_path.clone()))?;
            // master subtrees hang off the instance links, not the main tree
            if child_prim.is_in_master() && !in_master {
                continue;
            }
            let child = self.build_subtree(child_prim)?;
            self.add_child(id, child)?;
        }
        Ok(id)
    }

    fn construct_node(&mut self, prim: PrimHandle) -> Result<NodeId> {
        let resolved = registry().resolve(prim.as_ref());
        let (type_name, behavior): (String, Box<dyn SchemaBehavior>) = match resolved {
            Some(entry) => (entry.type_name.to_string(), (entry.factory)()),
            None => (prim.type_name(), Box::new(PrimBehavior)),
        };
        trace!("constructing node {} [{}]", prim.path(), type_name);
        let id = NodeId(self.nodes.len() as u32);
        let mut schema = Schema::new(id, prim, type_name, behavior);
        schema.sync_all();
        self.by_path.insert(schema.path().to_string(), id);
        self.nodes.push(Some(schema));
        Ok(id)
    }

    fn wire_instances(&mut self) {
        let ids: Vec<NodeId> = self.node_ids().collect();
        for id in ids {
            let node = self.node(id);
            if !node.is_instance() || node.master().is_some() {
                continue;
            }
            let Some(master_path) = node.prim().master_path() else {
                continue;
            };
            match self.find_node(&master_path) {
                Some(master) => self.add_instance(master, id),
                None => warn!(
                    "instance {} references unknown master {}",
                    self.node(id).path(),
                    master_path
                ),
            }
        }
    }

    fn load_all_payloads(&mut self) {
        for slot in &mut self.nodes {
            if let Some(node) = slot.as_mut() {
                node.load_payload();
            }
        }
    }

    // ------------------------------------------------------------------
    // export path (nodes -> store)
    // ------------------------------------------------------------------

    /// Author a new prim under `parent` and construct its node through the
    /// registry's factory for `type_name`. An empty type name creates a
    /// base untyped node.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        name: &str,
        type_name: &str,
    ) -> Result<NodeId> {
        let parent_path = self.node(parent).path().to_string();
        let path = if parent_path == "/" {
            format!("/{name}")
        } else {
            format!("{parent_path}/{name}")
        };

        let (resolved_name, behavior): (String, Box<dyn SchemaBehavior>) =
            if type_name.is_empty() {
                (String::new(), Box::new(PrimBehavior))
            } else {
                let entry = registry()
                    .find(type_name)
                    .ok_or_else(|| Error::UnknownSchemaType(type_name.to_string()))?;
                (entry.type_name.to_string(), (entry.factory)())
            };

        let prim = self
            .store
            .create_prim(&path, type_name)
            .ok_or_else(|| Error::PrimCreationFailed(path.clone()))?;

        let id = NodeId(self.nodes.len() as u32);
        let mut schema = Schema::new(id, prim, resolved_name, behavior);
        schema.sync_all();
        if self.esettings.instanceable_by_default {
            schema.set_instanceable(true);
        }
        self.by_path.insert(schema.path().to_string(), id);
        self.nodes.push(Some(schema));
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Remove a node and its subtree, detaching every parent/child and
    /// master/instance back-reference.
    pub fn remove_node(&mut self, id: NodeId) {
        if self.get(id).is_none() {
            return;
        }
        if let Some(parent) = self.node(id).parent() {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            stack.extend(node.children().iter().copied());
            let master = node.master();
            let instances: Vec<NodeId> = node.instances().to_vec();
            let path = node.path().to_string();

            if let Some(m) = master {
                if let Some(mnode) = self.get_mut(m) {
                    mnode.instances.retain(|i| *i != current);
                }
            }
            for inst in instances {
                if let Some(inode) = self.get_mut(inst) {
                    inode.master = None;
                }
            }
            self.by_path.remove(&path);
            self.nodes[current.0 as usize] = None;
        }
    }

    // ------------------------------------------------------------------
    // hierarchy
    // ------------------------------------------------------------------

    /// Append `child` to `parent`'s children and set the back-reference.
    /// A node can have at most one parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.node(child).parent().is_some() {
            return Err(Error::AlreadyParented(self.node(child).path().to_string()));
        }
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Append `instance` to `master`'s instance list and set the
    /// back-reference.
    pub fn add_instance(&mut self, master: NodeId, instance: NodeId) {
        if master == instance {
            return;
        }
        self.node_mut(master).instances.push(instance);
        self.node_mut(instance).master = Some(master);
    }

    /// Exact path match among direct children; with `recursive`, continues
    /// depth-first into each child's subtree and returns the first match.
    pub fn find_child(&self, node: NodeId, path: &str, recursive: bool) -> Option<NodeId> {
        for &c in self.node(node).children() {
            if self.node(c).path() == path {
                return Some(c);
            }
        }
        if recursive {
            for &c in self.node(node).children() {
                if let Some(found) = self.find_child(c, path, true) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Visit each direct child. The callback must not mutate the tree.
    pub fn each_child<F: FnMut(&Schema)>(&self, node: NodeId, mut f: F) {
        for &c in self.node(node).children() {
            f(self.node(c));
        }
    }

    /// Recursive `each_child`: visits a node's direct children before
    /// descending into them.
    pub fn each_child_r<F: FnMut(&Schema)>(&self, node: NodeId, mut f: F) {
        self.each_child_r_inner(node, &mut f);
    }

    fn each_child_r_inner<F: FnMut(&Schema)>(&self, node: NodeId, f: &mut F) {
        for &c in self.node(node).children() {
            f(self.node(c));
        }
        for &c in self.node(node).children() {
            self.each_child_r_inner(c, f);
        }
    }

    /// Visit each instance of a master node.
    pub fn each_instance<F: FnMut(&Schema)>(&self, node: NodeId, mut f: F) {
        for &i in self.node(node).instances() {
            f(self.node(i));
        }
    }

    // ------------------------------------------------------------------
    // typed views & instancing
    // ------------------------------------------------------------------

    /// Resolve to the authoritative typed view: for an instance this is
    /// the master's behavior (instance subtrees are virtual), otherwise
    /// the node's own. `None` when the concrete type does not match.
    pub fn as_typed<T: SchemaBehavior>(&self, id: NodeId) -> Option<&T> {
        let node = self.get(id)?;
        let target = if node.is_instance() {
            node.master().map(|m| self.node(m)).unwrap_or(node)
        } else {
            node
        };
        target.behavior().as_any().downcast_ref::<T>()
    }

    /// Capability query with the same master redirect as `as_typed`.
    pub fn has_capability(&self, id: NodeId, cap: Capability) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        let target = if node.is_instance() {
            node.master().map(|m| self.node(m)).unwrap_or(node)
        } else {
            node
        };
        target.capabilities().contains(&cap)
    }

    // ------------------------------------------------------------------
    // notifications
    // ------------------------------------------------------------------

    /// A node's cached derived state is stale; the host should rebuild on
    /// its next poll.
    pub fn notify_force_update(&mut self, id: NodeId) {
        self.node_mut(id).mark_next(UpdateFlags::FORCE_UPDATE);
        self.request_force_update = true;
    }

    /// A node's import configuration changed.
    pub fn notify_import_config_changed(&mut self, id: NodeId) {
        self.node_mut(id).mark_next(UpdateFlags::IMPORT_CONFIG_CHANGED);
        self.request_config_update = true;
    }

    /// Poll-and-clear the pending force-update request.
    pub fn take_force_update_request(&mut self) -> bool {
        std::mem::take(&mut self.request_force_update)
    }

    /// Poll-and-clear the pending configuration-change request.
    pub fn take_config_update_request(&mut self) -> bool {
        std::mem::take(&mut self.request_config_update)
    }

    // ------------------------------------------------------------------
    // notifying wrappers around node operations
    // ------------------------------------------------------------------

    /// Select a variant and flag the node for rebuild.
    pub fn set_variant_selection(
        &mut self,
        id: NodeId,
        iset: usize,
        ival: Option<usize>,
    ) -> bool {
        let changed = self.node_mut(id).set_variant_selection(iset, ival);
        if changed {
            self.notify_force_update(id);
        }
        changed
    }

    pub fn load_payload(&mut self, id: NodeId) {
        let loaded_before = self.node(id).is_payload_loaded();
        self.node_mut(id).load_payload();
        if !loaded_before && self.node(id).is_payload_loaded() {
            self.notify_force_update(id);
        }
    }

    pub fn unload_payload(&mut self, id: NodeId) {
        let loaded_before = self.node(id).is_payload_loaded();
        self.node_mut(id).unload_payload();
        if loaded_before && !self.node(id).is_payload_loaded() {
            self.notify_force_update(id);
        }
    }

    pub fn set_payload(&mut self, id: NodeId, asset_path: Option<&str>, prim_path: &str) -> bool {
        let ok = self.node_mut(id).set_payload(asset_path, prim_path);
        if ok {
            self.notify_force_update(id);
        }
        ok
    }

    pub fn add_reference(&mut self, id: NodeId, asset_path: Option<&str>, prim_path: &str) -> bool {
        let ok = self.node_mut(id).add_reference(asset_path, prim_path);
        if ok {
            self.notify_force_update(id);
        }
        ok
    }

    // ------------------------------------------------------------------
    // settings
    // ------------------------------------------------------------------

    pub fn default_import_settings(&self) -> &ImportSettings {
        &self.isettings
    }

    pub fn set_default_import_settings(&mut self, s: ImportSettings) {
        self.isettings = s;
        self.request_config_update = true;
    }

    pub fn default_export_settings(&self) -> &ExportSettings {
        &self.esettings
    }

    pub fn set_default_export_settings(&mut self, s: ExportSettings) {
        self.esettings = s;
        self.request_config_update = true;
    }

    /// Effective import settings for a node: its override when active,
    /// otherwise the context-wide defaults.
    pub fn import_settings_for(&self, id: NodeId) -> &ImportSettings {
        let node = self.node(id);
        if node.is_import_settings_overridden() {
            node.local_import_settings()
        } else {
            &self.isettings
        }
    }

    /// Effective export settings for a node.
    pub fn export_settings_for(&self, id: NodeId) -> &ExportSettings {
        let node = self.node(id);
        if node.is_export_settings_overridden() {
            node.local_export_settings()
        } else {
            &self.esettings
        }
    }

    /// Set a node-local import-settings override and flag the change.
    pub fn set_import_settings(&mut self, id: NodeId, s: ImportSettings) {
        self.node_mut(id).set_import_settings(s);
        self.request_config_update = true;
    }

    /// Set a node-local export-settings override.
    pub fn set_export_settings(&mut self, id: NodeId, s: ExportSettings) {
        self.node_mut(id).set_export_settings(s);
        self.request_config_update = true;
    }

    // ------------------------------------------------------------------
    // time stepping
    // ------------------------------------------------------------------

    /// Advance every live node to time `t`, rotating each node's
    /// update-flag triple.
    pub fn update(&mut self, t: Time) {
        trace!("updating context to t={}", t);
        for slot in &mut self.nodes {
            if let Some(node) = slot.as_mut() {
                node.update_sample(t);
            }
        }
        self.time = t;
    }

    /// Union of every node's authored time range. Invalid when nothing in
    /// the scene is time-varying.
    pub fn time_range(&self) -> TimeRange {
        let mut out = TimeRange::INVALID;
        for slot in self.nodes.iter().flatten() {
            let r = slot.time_range();
            if !r.is_valid() {
                continue;
            }
            if !out.is_valid() {
                out = r;
            } else {
                out.start = out.start.min(r.start);
                out.end = out.end.max(r.end);
            }
        }
        out
    }
}
