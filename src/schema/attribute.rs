//! Per-node attribute wrappers.
//!
//! A node owns one wrapper per authored attribute, synchronized from the
//! store. Wrappers are only ever appended, so an index taken from
//! `Schema::attribute_index` stays valid across syncs.

use crate::store::{AttributeDecl, AttributeType};

/// Wrapper for one authored attribute of a node.
#[derive(Clone, Debug)]
pub struct Attribute {
    name: String,
    decl: AttributeDecl,
}

impl Attribute {
    pub(crate) fn new(name: String, decl: AttributeDecl) -> Self {
        Self { name, decl }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared external type.
    pub fn external_type(&self) -> AttributeType {
        self.decl.external
    }

    /// Internal storage type (may differ from the declared type for
    /// compressed or aliased encodings).
    pub fn internal_type(&self) -> AttributeType {
        self.decl.internal
    }

    /// Name match plus type match, where `Unknown` matches any type.
    pub fn matches(&self, name: &str, ty: AttributeType) -> bool {
        self.name == name && (ty == AttributeType::Unknown || self.decl.external == ty)
    }
}
