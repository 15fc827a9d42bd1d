//! Process-wide schema type registry.
//!
//! Concrete schema types register a factory keyed by a compatibility
//! predicate and an inheritance depth. Resolution evaluates every
//! predicate against a prim handle and picks the deepest match, so the
//! most specific declared type wins.
//!
//! The registry is populated by an explicit initialization pass
//! ([`register_default_schemas`], plus whatever plugin modules register at
//! startup) before any context starts resolving types; single writer then
//! many readers, enforced by caller discipline.

use parking_lot::{const_rwlock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::schema::SchemaBehavior;
use crate::store::Prim;

/// One registered schema type.
#[derive(Clone, Copy)]
pub struct SchemaEntry {
    /// Declared type name, e.g. `Mesh`.
    pub type_name: &'static str,
    /// Specialization distance from the root base type:
    /// 1 + the depth of the type this one specializes.
    pub inherit_depth: u32,
    /// Compatibility test against a prim handle.
    pub is_compatible: fn(&dyn Prim) -> bool,
    /// Constructs the behavior for a node of this type.
    pub factory: fn() -> Box<dyn SchemaBehavior>,
}

/// Table of registered schema types.
///
/// Entries are registered once at startup and never removed. Duplicate
/// registration of the same concrete type is the caller's error and is
/// not detected here.
pub struct SchemaRegistry {
    entries: Vec<SchemaEntry>,
    defaults_registered: bool,
}

impl SchemaRegistry {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            defaults_registered: false,
        }
    }

    pub fn register(&mut self, entry: SchemaEntry) {
        debug!(
            "registering schema type '{}' (depth {})",
            entry.type_name, entry.inherit_depth
        );
        self.entries.push(entry);
    }

    /// Resolve a prim to the most specific compatible schema type.
    ///
    /// Among all entries whose predicate matches, the one with the
    /// greatest inheritance depth wins; at equal depth the
    /// last-registered entry wins. Returns `None` when nothing matches -
    /// the caller falls back to the base untyped node.
    pub fn resolve(&self, prim: &dyn Prim) -> Option<SchemaEntry> {
        let mut best: Option<SchemaEntry> = None;
        for entry in &self.entries {
            if !(entry.is_compatible)(prim) {
                continue;
            }
            match best {
                Some(b) if entry.inherit_depth < b.inherit_depth => {}
                _ => best = Some(*entry),
            }
        }
        best
    }

    /// Exact-name lookup, used by the export path where the caller names
    /// the type to create.
    pub fn find(&self, type_name: &str) -> Option<SchemaEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.type_name == type_name)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: RwLock<SchemaRegistry> = const_rwlock(SchemaRegistry::new());

/// Read access to the process-wide registry.
pub fn registry() -> RwLockReadGuard<'static, SchemaRegistry> {
    REGISTRY.read()
}

/// Write access to the process-wide registry, for registration at startup.
pub fn registry_mut() -> RwLockWriteGuard<'static, SchemaRegistry> {
    REGISTRY.write()
}

/// Register a schema type in the process-wide registry.
pub fn register_schema(entry: SchemaEntry) {
    REGISTRY.write().register(entry);
}

/// Explicit initialization pass registering the builtin schema types
/// (Xform, Mesh, Points, Camera). Idempotent; call once at startup before
/// any context resolves types.
pub fn register_default_schemas() {
    let mut reg = REGISTRY.write();
    if reg.defaults_registered {
        return;
    }
    reg.defaults_registered = true;
    crate::typed::register_all(&mut reg);
}
