//! Narrow interface to the underlying scene-description store.
//!
//! The storage engine itself (file format, attribute value I/O, composition
//! machinery) is an external collaborator. This module defines the handle
//! traits the schema layer consumes:
//! - [`Prim`] - one node in the store: identity, type introspection,
//!   child/attribute enumeration, sample times, composition arcs
//! - [`Store`] - pseudo-root access, path lookup, master enumeration,
//!   prim authoring
//!
//! Handles are capabilities: the schema layer never reaches behind them.
//! All access is single-threaded on the thread that owns the Context.

use std::fmt;
use std::rc::Rc;

use crate::util::Time;

pub mod memory;

pub use memory::MemStore;

/// Shared handle to a prim in the store.
pub type PrimHandle = Rc<dyn Prim>;

/// Shared handle to a store.
pub type StoreHandle = Rc<dyn Store>;

// ============================================================================
// Attribute declarations
// ============================================================================

/// Declared attribute type.
///
/// `Unknown` doubles as the wildcard in lookups: matching by name only.
/// Value storage and serialization belong to the store; the schema layer
/// only tracks declarations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AttributeType {
    #[default]
    Unknown,
    Bool,
    Int,
    UInt,
    Int64,
    UInt64,
    Half,
    Float,
    Double,
    Float2,
    Float3,
    Float4,
    Quat,
    Matrix4,
    Token,
    String,
    Asset,
}

impl AttributeType {
    /// Compatibility test used when creating attributes: equal types are
    /// compatible, and `Unknown` is compatible with anything.
    #[inline]
    pub fn compatible_with(self, other: AttributeType) -> bool {
        self == other || self == AttributeType::Unknown || other == AttributeType::Unknown
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// External (declared) and internal (storage) type of an attribute.
/// The two may differ for compressed or aliased encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AttributeDecl {
    pub external: AttributeType,
    pub internal: AttributeType,
}

impl AttributeDecl {
    pub fn new(external: AttributeType, internal: AttributeType) -> Self {
        Self { external, internal }
    }

    /// Declaration whose storage type equals the declared type.
    pub fn plain(ty: AttributeType) -> Self {
        Self {
            external: ty,
            internal: ty,
        }
    }
}

// ============================================================================
// Topology hint
// ============================================================================

/// How a geometric prim's topology varies over time.
///
/// Constant: nothing varies. Homogenous: vertices move, topology fixed.
/// Heterogenous: topology itself changes between samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TopologyVariance {
    #[default]
    Constant,
    Homogenous,
    Heterogenous,
}

// ============================================================================
// Prim
// ============================================================================

/// One node in the underlying store.
///
/// Identity is `store_id` within a store; paths are unique and stable.
/// Mutating operations author composition arcs through the store; the
/// schema layer re-derives its view afterwards via its sync operations.
pub trait Prim {
    /// Identity within the owning store.
    fn store_id(&self) -> u64;

    /// Full path, e.g. `/geo/body/mesh`.
    fn path(&self) -> String;

    /// Last path segment.
    fn name(&self) -> String {
        let path = self.path();
        match path.rfind('/') {
            Some(pos) => path[pos + 1..].to_string(),
            None => path,
        }
    }

    /// Authored type name, e.g. `Mesh`. Empty for untyped prims.
    fn type_name(&self) -> String;

    /// Type-ancestry test: true if the authored type is `type_name` or
    /// inherits from it. Drives registry compatibility predicates.
    fn is_a(&self, type_name: &str) -> bool;

    /// Paths of direct children, in authored order.
    fn child_paths(&self) -> Vec<String>;

    // ------------------------------------------------------------------
    // attributes
    // ------------------------------------------------------------------

    /// Names of authored attributes, in authored order.
    fn attribute_names(&self) -> Vec<String>;

    /// Declared types of an authored attribute.
    fn attribute_decl(&self, name: &str) -> Option<AttributeDecl>;

    /// Author a new attribute entry. Returns false if the store rejects it.
    fn author_attribute(&self, name: &str, decl: AttributeDecl) -> bool;

    // ------------------------------------------------------------------
    // time
    // ------------------------------------------------------------------

    /// Authored sample times for this prim, ascending.
    fn sample_times(&self) -> Vec<Time>;

    // ------------------------------------------------------------------
    // references & payload
    // ------------------------------------------------------------------

    /// Author a composition reference. `asset_path` of None creates a
    /// local reference to a prim within the same store.
    fn add_reference(&self, asset_path: Option<&str>, prim_path: &str) -> bool;

    fn has_payload(&self) -> bool;
    fn is_payload_loaded(&self) -> bool;
    fn load_payload(&self);
    fn unload_payload(&self);

    /// Author or replace the payload target. The payload starts unloaded.
    fn set_payload(&self, asset_path: Option<&str>, prim_path: &str) -> bool;

    // ------------------------------------------------------------------
    // variants
    // ------------------------------------------------------------------

    /// Authored variant sets: (set name, variant names), in authored order.
    fn variant_sets(&self) -> Vec<(String, Vec<String>)>;

    /// Currently selected variant of a set, if any.
    fn variant_selection(&self, set: &str) -> Option<String>;

    /// Select a variant by name, or clear with None. Returns false if the
    /// set or variant does not exist.
    fn select_variant(&self, set: &str, variant: Option<&str>) -> bool;

    /// Author a variant set and/or variant entry if missing.
    fn author_variant(&self, set: &str, variant: &str) -> bool;

    /// Push an authoring target: subsequent authoring on this prim lands
    /// in the named variant's composition arc.
    fn begin_variant_edit(&self, set: &str, variant: &str) -> bool;

    /// Pop the innermost authoring target for this prim.
    fn end_variant_edit(&self);

    // ------------------------------------------------------------------
    // instancing
    // ------------------------------------------------------------------

    fn is_instance(&self) -> bool;

    /// Path of the master this prim instances, when it is an instance.
    fn master_path(&self) -> Option<String>;

    fn is_master(&self) -> bool;

    /// True for prims inside a master's subtree.
    fn is_in_master(&self) -> bool;

    fn is_instanceable(&self) -> bool;

    /// Mark the prim instanceable for future instancing by the authoring
    /// tool. Does not change existing instance relationships.
    fn set_instanceable(&self, v: bool);

    // ------------------------------------------------------------------
    // geometry hint
    // ------------------------------------------------------------------

    /// Topology variance hint for geometric prims.
    fn topology_variance(&self) -> TopologyVariance {
        TopologyVariance::Constant
    }
}

// ============================================================================
// Store
// ============================================================================

/// Access to a whole store: root, lookup, masters, authoring.
pub trait Store {
    /// The pseudo-root prim.
    fn root(&self) -> PrimHandle;

    /// Find a prim by full path.
    fn find(&self, path: &str) -> Option<PrimHandle>;

    /// Roots of master subtrees shared by instances.
    fn masters(&self) -> Vec<PrimHandle>;

    /// Author a new prim. The parent prim must already exist.
    fn create_prim(&self, path: &str, type_name: &str) -> Option<PrimHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_compat() {
        assert!(AttributeType::Float.compatible_with(AttributeType::Float));
        assert!(AttributeType::Unknown.compatible_with(AttributeType::Token));
        assert!(AttributeType::Token.compatible_with(AttributeType::Unknown));
        assert!(!AttributeType::Float.compatible_with(AttributeType::Token));
    }
}
