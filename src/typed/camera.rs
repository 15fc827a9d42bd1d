//! Camera schema.

use std::any::Any;

use crate::registry::SchemaEntry;
use crate::schema::{Capability, SchemaBehavior, UpdateFlags};
use crate::store::Prim;
use crate::util::{samples_crossed, Time};

/// Camera node. Specializes [`Xform`](crate::typed::Xform); camera
/// parameters are store attributes and follow the same sampling.
#[derive(Debug, Default)]
pub struct Camera;

impl Camera {
    pub const TYPE_NAME: &'static str = "Camera";
    pub const INHERIT_DEPTH: u32 = 2;

    pub fn entry() -> SchemaEntry {
        SchemaEntry {
            type_name: Self::TYPE_NAME,
            inherit_depth: Self::INHERIT_DEPTH,
            is_compatible: |p| p.is_a(Camera::TYPE_NAME),
            factory: || Box::new(Camera),
        }
    }
}

impl SchemaBehavior for Camera {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Xformable, Capability::Imageable]
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
