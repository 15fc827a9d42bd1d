//! Points schema: point clouds.

use std::any::Any;

use crate::registry::SchemaEntry;
use crate::schema::{Capability, SchemaBehavior, UpdateFlags};
use crate::store::Prim;
use crate::util::{samples_crossed, Time};

/// Point cloud node. Specializes [`Xform`](crate::typed::Xform).
#[derive(Debug, Default)]
pub struct Points;

impl Points {
    pub const TYPE_NAME: &'static str = "Points";
    pub const INHERIT_DEPTH: u32 = 2;

    pub fn entry() -> SchemaEntry {
        SchemaEntry {
            type_name: Self::TYPE_NAME,
            inherit_depth: Self::INHERIT_DEPTH,
            is_compatible: |p| p.is_a(Points::TYPE_NAME),
            factory: || Box::new(Points),
        }
    }
}

impl SchemaBehavior for Points {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::Xformable,
            Capability::Boundable,
            Capability::Imageable,
        ]
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
