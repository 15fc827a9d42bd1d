//! The schema node: this library's in-memory, typed representation of one
//! prim plus its composition and time-tracking state.
//!
//! Nodes live in the [`Context`](crate::context::Context)'s arena; the
//! `parent`/`master`/`children`/`instances` fields are [`NodeId`] handles
//! into that arena, never owning pointers. Operations that only touch one
//! node live here; hierarchy traversal and anything that must notify the
//! owning context live on `Context`.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use smallvec::SmallVec;
use tracing::warn;

use crate::settings::{ExportSettings, ImportSettings};
use crate::store::{AttributeDecl, AttributeType, PrimHandle};
use crate::util::{Error, Result, Time, TimeRange, INVALID_TIME};

pub mod attribute;
pub mod behavior;
pub mod variant;

pub use attribute::Attribute;
pub use behavior::{Capability, PrimBehavior, SchemaBehavior};
pub use variant::VariantSet;

use variant::EditTarget;

// ============================================================================
// Node identity
// ============================================================================

/// Handle to a node in a context's arena. Unique within that context;
/// slots are never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Update flags
// ============================================================================

/// Accumulated dirtiness bits across a time-step transition.
///
/// Each node keeps three slots: the flags of the current step, the flags of
/// the previous step, and the bits accumulated for the next sync. At each
/// `update_sample` the triple rotates: previous takes current, current
/// takes the accumulated next (plus whatever the typed hook reports), next
/// resets to empty.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct UpdateFlags(u32);

impl UpdateFlags {
    pub const NONE: Self = Self(0);
    pub const SAMPLE_UPDATED: Self = Self(1 << 0);
    pub const TIME_RANGE_CHANGED: Self = Self(1 << 1);
    pub const TRANSFORM_CHANGED: Self = Self(1 << 2);
    pub const TOPOLOGY_CHANGED: Self = Self(1 << 3);
    pub const ATTRIBUTES_CHANGED: Self = Self(1 << 4);
    pub const VARIANT_SETS_CHANGED: Self = Self(1 << 5);
    pub const VARIANT_SELECTION_CHANGED: Self = Self(1 << 6);
    pub const PAYLOAD_LOADED: Self = Self(1 << 7);
    pub const PAYLOAD_UNLOADED: Self = Self(1 << 8);
    pub const IMPORT_CONFIG_CHANGED: Self = Self(1 << 9);
    pub const FORCE_UPDATE: Self = Self(1 << 10);

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for UpdateFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for UpdateFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// Settings override
// ============================================================================

/// Node-local settings that override the context-wide defaults when active.
#[derive(Clone, Debug, Default)]
struct SettingsOverride<T> {
    active: bool,
    value: T,
}

// ============================================================================
// Schema node
// ============================================================================

/// One scene node: identity, hierarchy links, attributes, variant sets,
/// instancing state, payload state, and time-sample update tracking.
pub struct Schema {
    id: NodeId,
    path: String,
    type_name: String,
    prim: PrimHandle,

    pub(crate) parent: Option<NodeId>,
    pub(crate) master: Option<NodeId>,
    pub(crate) children: SmallVec<[NodeId; 8]>,
    pub(crate) instances: SmallVec<[NodeId; 4]>,

    attributes: Vec<Attribute>,
    variant_sets: Vec<VariantSet>,
    edit_stack: Vec<EditTarget>,

    time_range: TimeRange,
    time_prev: Time,

    flags: UpdateFlags,
    flags_prev: UpdateFlags,
    flags_next: UpdateFlags,

    isettings: SettingsOverride<ImportSettings>,
    esettings: SettingsOverride<ExportSettings>,

    user_tag: u64,

    behavior: Box<dyn SchemaBehavior>,
}

impl Schema {
    pub(crate) fn new(
        id: NodeId,
        prim: PrimHandle,
        type_name: String,
        behavior: Box<dyn SchemaBehavior>,
    ) -> Self {
        let path = prim.path();
        Self {
            id,
            path,
            type_name,
            prim,
            parent: None,
            master: None,
            children: SmallVec::new(),
            instances: SmallVec::new(),
            attributes: Vec::new(),
            variant_sets: Vec::new(),
            edit_stack: Vec::new(),
            time_range: TimeRange::INVALID,
            time_prev: INVALID_TIME,
            flags: UpdateFlags::NONE,
            flags_prev: UpdateFlags::NONE,
            flags_next: UpdateFlags::NONE,
            isettings: SettingsOverride::default(),
            esettings: SettingsOverride::default(),
            user_tag: 0,
            behavior,
        }
    }

    /// Pull attributes, time range and variant sets from the store.
    pub(crate) fn sync_all(&mut self) {
        self.sync_attributes();
        self.sync_time_range();
        self.sync_variant_sets();
    }

    // ------------------------------------------------------------------
    // identity
    // ------------------------------------------------------------------

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Resolved schema type name. Empty for untyped base nodes.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The underlying store handle.
    pub fn prim(&self) -> &PrimHandle {
        &self.prim
    }

    pub fn behavior(&self) -> &dyn SchemaBehavior {
        self.behavior.as_ref()
    }

    /// Capabilities of this node's own type (no master redirect; for the
    /// redirecting query use `Context::has_capability`).
    pub fn capabilities(&self) -> &'static [Capability] {
        self.behavior.capabilities()
    }

    /// Host bookkeeping tag; not interpreted by the library.
    pub fn user_tag(&self) -> u64 {
        self.user_tag
    }

    pub fn set_user_tag(&mut self, tag: u64) {
        self.user_tag = tag;
    }

    // ------------------------------------------------------------------
    // hierarchy links (the graph operations live on Context)
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// The master this node instances, if any.
    pub fn master(&self) -> Option<NodeId> {
        self.master
    }

    pub fn instances(&self) -> &[NodeId] {
        &self.instances
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    // ------------------------------------------------------------------
    // instancing state (re-derived from the store on every query; the
    // store may be transiently inconsistent during editing, so these are
    // never cached here)
    // ------------------------------------------------------------------

    pub fn is_instance(&self) -> bool {
        self.prim.is_instance()
    }

    pub fn is_master(&self) -> bool {
        self.prim.is_master()
    }

    pub fn is_in_master(&self) -> bool {
        self.prim.is_in_master()
    }

    pub fn is_instanceable(&self) -> bool {
        self.prim.is_instanceable()
    }

    /// Mark the prim instanceable for future instancing. Does not change
    /// existing instance relationships.
    pub fn set_instanceable(&mut self, v: bool) {
        self.prim.set_instanceable(v);
    }

    /// Editable nodes are neither instances nor inside a master's subtree;
    /// edits to those must be redirected to the master.
    pub fn is_editable(&self) -> bool {
        !self.is_instance() && !self.is_in_master()
    }

    // ------------------------------------------------------------------
    // attributes
    // ------------------------------------------------------------------

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn attribute(&self, i: usize) -> Option<&Attribute> {
        self.attributes.get(i)
    }

    /// All wrappers, in registration order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Stable index of an attribute wrapper. Wrappers are only appended,
    /// so the index survives later syncs.
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name() == name)
    }

    /// Linear search by name; `AttributeType::Unknown` matches by name only.
    pub fn find_attribute(&self, name: &str, ty: AttributeType) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.matches(name, ty))
    }

    /// Create and register a new attribute wrapper bound to a newly
    /// authored store entry. Returns the wrapper index. An existing
    /// attribute with a compatible type is returned as-is; an incompatible
    /// type is a usage error.
    pub fn create_attribute(
        &mut self,
        name: &str,
        ty: AttributeType,
        internal: AttributeType,
    ) -> Result<usize> {
        if let Some(i) = self.attribute_index(name) {
            let existing = self.attributes[i].external_type();
            if existing.compatible_with(ty) {
                return Ok(i);
            }
            return Err(Error::AttributeTypeConflict {
                name: name.to_string(),
                existing: existing.to_string(),
                requested: ty.to_string(),
            });
        }
        let internal = if internal == AttributeType::Unknown {
            ty
        } else {
            internal
        };
        let decl = AttributeDecl::new(ty, internal);
        if !self.prim.author_attribute(name, decl) {
            return Err(Error::AttributeCreationFailed(name.to_string()));
        }
        self.attributes.push(Attribute::new(name.to_string(), decl));
        Ok(self.attributes.len() - 1)
    }

    /// Reconcile wrappers against the store's current attribute set.
    /// Newly authored attributes get wrappers; existing wrappers keep their
    /// identity. Wrappers whose attribute was deleted in the store are
    /// retained - a known limitation of this design.
    pub fn sync_attributes(&mut self) {
        let names = self.prim.attribute_names();
        for name in &names {
            if self.attribute_index(name).is_none() {
                if let Some(decl) = self.prim.attribute_decl(name) {
                    self.attributes.push(Attribute::new(name.clone(), decl));
                }
            }
        }
        for a in &self.attributes {
            if !names.iter().any(|n| n == a.name()) {
                warn!(
                    "attribute '{}' removed in store for {}, wrapper retained",
                    a.name(),
                    self.path
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // references & payload
    // ------------------------------------------------------------------

    /// Author a composition reference. `asset_path` of None references a
    /// prim within the same store (local reference).
    pub fn add_reference(&mut self, asset_path: Option<&str>, prim_path: &str) -> bool {
        self.prim.add_reference(asset_path, prim_path)
    }

    pub fn has_payload(&self) -> bool {
        self.prim.has_payload()
    }

    pub fn is_payload_loaded(&self) -> bool {
        self.prim.is_payload_loaded()
    }

    /// Bring the payload into the loaded state. Idempotent; a no-op when
    /// the node has no payload.
    pub fn load_payload(&mut self) {
        if !self.prim.has_payload() || self.prim.is_payload_loaded() {
            return;
        }
        self.prim.load_payload();
        self.flags_next |= UpdateFlags::PAYLOAD_LOADED;
    }

    /// Return the payload to the unloaded state. Idempotent; a no-op when
    /// the node has no payload.
    pub fn unload_payload(&mut self) {
        if !self.prim.has_payload() || !self.prim.is_payload_loaded() {
            return;
        }
        self.prim.unload_payload();
        self.flags_next |= UpdateFlags::PAYLOAD_UNLOADED;
    }

    /// Author or replace the payload target. A subsequent `load_payload`
    /// is required to bring it into the loaded state.
    pub fn set_payload(&mut self, asset_path: Option<&str>, prim_path: &str) -> bool {
        self.prim.set_payload(asset_path, prim_path)
    }

    // ------------------------------------------------------------------
    // variants
    // ------------------------------------------------------------------

    pub fn has_variants(&self) -> bool {
        !self.variant_sets.is_empty()
    }

    pub fn num_variant_sets(&self) -> usize {
        self.variant_sets.len()
    }

    pub fn variant_set(&self, iset: usize) -> Option<&VariantSet> {
        self.variant_sets.get(iset)
    }

    pub fn variant_set_name(&self, iset: usize) -> Option<&str> {
        self.variant_sets.get(iset).map(|vs| vs.name())
    }

    pub fn num_variants(&self, iset: usize) -> usize {
        self.variant_sets
            .get(iset)
            .map(|vs| vs.num_variants())
            .unwrap_or(0)
    }

    pub fn variant_name(&self, iset: usize, ival: usize) -> Option<&str> {
        self.variant_sets.get(iset).and_then(|vs| vs.variant_name(ival))
    }

    /// Current selection of a set; `None` when unset or `iset` is invalid.
    pub fn variant_selection(&self, iset: usize) -> Option<usize> {
        self.variant_sets.get(iset).and_then(|vs| vs.selection())
    }

    pub fn find_variant_set(&self, name: &str) -> Option<usize> {
        self.variant_sets.iter().position(|vs| vs.name() == name)
    }

    pub fn find_variant(&self, iset: usize, name: &str) -> Option<usize> {
        self.variant_sets.get(iset).and_then(|vs| vs.find_variant(name))
    }

    /// Select a variant by index, or clear with `None`. An out-of-range
    /// index clears the selection rather than erroring. Returns false only
    /// when `iset` itself is invalid.
    pub fn set_variant_selection(&mut self, iset: usize, ival: Option<usize>) -> bool {
        let Some(vs) = self.variant_sets.get_mut(iset) else {
            return false;
        };
        let sel = ival.filter(|&i| i < vs.variants.len());
        vs.selection = sel;
        let set_name = vs.name.clone();
        let name = sel.map(|i| vs.variants[i].clone());
        self.prim.select_variant(&set_name, name.as_deref());
        self.flags_next |= UpdateFlags::VARIANT_SELECTION_CHANGED;
        true
    }

    /// Open a scoped edit context redirecting subsequent authoring into
    /// the named variant. The set/variant are authored if missing.
    /// Exactly one edit context may be open per node.
    pub fn begin_edit_variant(&mut self, set: &str, variant: &str) -> Result<()> {
        if !self.edit_stack.is_empty() {
            return Err(Error::EditContextMisuse("edit context already open"));
        }
        let known = self
            .find_variant_set(set)
            .and_then(|iset| self.find_variant(iset, variant))
            .is_some();
        if !known {
            self.prim.author_variant(set, variant);
            self.sync_variant_sets();
            self.flags_next |= UpdateFlags::VARIANT_SETS_CHANGED;
        }
        if !self.prim.begin_variant_edit(set, variant) {
            return Err(Error::EditContextMisuse("store rejected the edit target"));
        }
        self.edit_stack.push(EditTarget {
            set: set.to_string(),
            variant: variant.to_string(),
        });
        Ok(())
    }

    /// Close the edit context opened by `begin_edit_variant`.
    pub fn end_edit_variant(&mut self) -> Result<()> {
        if self.edit_stack.pop().is_none() {
            return Err(Error::EditContextMisuse("no edit context open"));
        }
        self.prim.end_variant_edit();
        Ok(())
    }

    /// Run `body` with the currently selected variant of each set opened
    /// as the authoring target. The targets are released on every exit
    /// path, including when `body` returns an error. With no selections,
    /// `body` runs against the default (non-variant) composition.
    pub fn edit_variants<R>(
        &mut self,
        body: impl FnOnce(&mut Schema) -> Result<R>,
    ) -> Result<R> {
        let targets: Vec<(String, String)> = self
            .variant_sets
            .iter()
            .filter_map(|vs| {
                vs.selection
                    .map(|i| (vs.name.clone(), vs.variants[i].clone()))
            })
            .collect();
        let mut opened = 0usize;
        for (set, variant) in targets {
            if self.prim.begin_variant_edit(&set, &variant) {
                self.edit_stack.push(EditTarget { set, variant });
                opened += 1;
            }
        }
        let out = body(self);
        for _ in 0..opened {
            if self.edit_stack.pop().is_some() {
                self.prim.end_variant_edit();
            }
        }
        out
    }

    /// True while a variant edit context is open on this node.
    pub fn is_editing_variant(&self) -> bool {
        !self.edit_stack.is_empty()
    }

    /// Pull variant sets and selections from the store.
    pub fn sync_variant_sets(&mut self) {
        let sets = self.prim.variant_sets();
        self.variant_sets = sets
            .into_iter()
            .map(|(name, variants)| {
                let selection = self
                    .prim
                    .variant_selection(&name)
                    .and_then(|sel| variants.iter().position(|v| *v == sel));
                VariantSet {
                    name,
                    variants,
                    selection,
                }
            })
            .collect();
    }

    // ------------------------------------------------------------------
    // time & change tracking
    // ------------------------------------------------------------------

    /// Authored time range; invalid when the node has no time-varying data.
    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    /// Time of the previous `update_sample` call.
    pub fn time_prev(&self) -> Time {
        self.time_prev
    }

    pub fn update_flags(&self) -> UpdateFlags {
        self.flags
    }

    pub fn update_flags_prev(&self) -> UpdateFlags {
        self.flags_prev
    }

    /// Accumulate bits to apply at the next sync.
    pub(crate) fn mark_next(&mut self, flags: UpdateFlags) {
        self.flags_next |= flags;
    }

    /// Recompute the time range from the store's authored sample times.
    pub fn sync_time_range(&mut self) {
        let range = TimeRange::from_samples(&self.prim.sample_times());
        let changed = match (self.time_range.is_valid(), range.is_valid()) {
            (false, false) => false,
            (true, true) => {
                self.time_range.start != range.start || self.time_range.end != range.end
            }
            _ => true,
        };
        if changed {
            self.flags_next |= UpdateFlags::TIME_RANGE_CHANGED;
        }
        self.time_range = range;
    }

    /// Advance to time `t`: run the typed sampling hook, then rotate the
    /// update-flag triple and record `t` as the previous sampled time.
    /// Times outside the authored range are permitted; hold/extrapolation
    /// is the store's concern.
    pub fn update_sample(&mut self, t: Time) {
        let prev = self.time_prev;
        let hook = self.behavior.on_update_sample(self.prim.as_ref(), t, prev);
        self.flags_prev = self.flags;
        self.flags = self.flags_next | hook;
        self.flags_next = UpdateFlags::NONE;
        self.time_prev = t;
    }

    // ------------------------------------------------------------------
    // import/export settings overrides
    // ------------------------------------------------------------------

    pub fn is_import_settings_overridden(&self) -> bool {
        self.isettings.active
    }

    pub fn set_override_import_settings(&mut self, v: bool) {
        self.isettings.active = v;
        self.flags_next |= UpdateFlags::IMPORT_CONFIG_CHANGED;
    }

    /// Node-local import settings; meaningful when the override is active.
    pub fn local_import_settings(&self) -> &ImportSettings {
        &self.isettings.value
    }

    /// Set node-local import settings and activate the override.
    pub fn set_import_settings(&mut self, s: ImportSettings) {
        self.isettings.value = s;
        self.isettings.active = true;
        self.flags_next |= UpdateFlags::IMPORT_CONFIG_CHANGED;
    }

    pub fn is_export_settings_overridden(&self) -> bool {
        self.esettings.active
    }

    pub fn set_override_export_settings(&mut self, v: bool) {
        self.esettings.active = v;
    }

    pub fn local_export_settings(&self) -> &ExportSettings {
        &self.esettings.value
    }

    pub fn set_export_settings(&mut self, s: ExportSettings) {
        self.esettings.value = s;
        self.esettings.active = true;
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("type_name", &self.type_name)
            .field("parent", &self.parent)
            .field("master", &self.master)
            .field("children", &self.children)
            .field("instances", &self.instances)
            .finish_non_exhaustive()
    }
}
