//! Xform schema: a node carrying a transform.

use std::any::Any;

use crate::registry::SchemaEntry;
use crate::schema::{Capability, SchemaBehavior, UpdateFlags};
use crate::store::Prim;
use crate::util::{samples_crossed, Time};

/// Transformable node. Transform values themselves live in the store;
/// this behavior tracks when the authored transform crosses a sample.
#[derive(Debug, Default)]
pub struct Xform;

impl Xform {
    pub const TYPE_NAME: &'static str = "Xform";
    pub const INHERIT_DEPTH: u32 = 1;

    pub fn entry() -> SchemaEntry {
        SchemaEntry {
            type_name: Self::TYPE_NAME,
            inherit_depth: Self::INHERIT_DEPTH,
            is_compatible: |p| p.is_a(Xform::TYPE_NAME),
            factory: || Box::new(Xform),
        }
    }
}

impl SchemaBehavior for Xform {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Xformable]
    }

    fn on_update_sample(&mut self, prim: &dyn Prim, t: Time, prev: Time) -> UpdateFlags {
        if samples_crossed(&prim.sample_times(), prev, t) {
            UpdateFlags::SAMPLE_UPDATED | UpdateFlags::TRANSFORM_CHANGED
        } else {
            UpdateFlags::NONE
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
