//! Mesh schema: polygonal geometry.

use std::any::Any;

use crate::registry::SchemaEntry;
use crate::schema::{Capability, SchemaBehavior, UpdateFlags};
use crate::store::{Prim, TopologyVariance};
use crate::util::{samples_crossed, Time};

/// Polygonal geometry node. Specializes [`Xform`](crate::typed::Xform).
///
/// The store's topology variance hint decides how a crossed sample is
/// reported: constant and homogenous topology only dirty the sampled
/// data, heterogenous topology dirties the topology itself.
#[derive(Debug, Default)]
pub struct Mesh;

impl Mesh {
    pub const TYPE_NAME: &'static str = "Mesh";
    pub const INHERIT_DEPTH: u32 = 2;

    pub fn entry() -> SchemaEntry {
        SchemaEntry {
            type_name: Self::TYPE_NAME,
            inherit_depth: Self::INHERIT_DEPTH,
            is_compatible: |p| p.is_a(Mesh::TYPE_NAME),
            factory: || Box::new(Mesh),
        }
    }
}

impl SchemaBehavior for Mesh {
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
        if !samples_crossed(&prim.sample_times(), prev, t) {
            return UpdateFlags::NONE;
        }
        let mut flags = UpdateFlags::SAMPLE_UPDATED | UpdateFlags::TRANSFORM_CHANGED;
        if prim.topology_variance() == TopologyVariance::Heterogenous {
            flags |= UpdateFlags::TOPOLOGY_CHANGED;
        }
        flags
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
