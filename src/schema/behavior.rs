//! Typed behavior attached to a schema node.
//!
//! Concrete schema types (Xform, Mesh, ...) plug in through this trait
//! instead of open-ended downcasting: each behavior names its type,
//! enumerates its capabilities, and implements the per-time-step sampling
//! hook. Resolution to a typed view goes through [`std::any::Any`].

use std::any::Any;

use crate::schema::UpdateFlags;
use crate::store::Prim;
use crate::util::Time;

/// Broad capabilities a concrete schema type can implement.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Capability {
    /// Carries a transform.
    Xformable,
    /// Has spatial extent.
    Boundable,
    /// Participates in imaging/rendering.
    Imageable,
}

/// Behavior of one concrete schema type.
///
/// The `on_update_sample` hook is called by `Schema::update_sample` with
/// the new time and the previously sampled time; the flags it returns are
/// merged into the node's current update flags for this step.
pub trait SchemaBehavior: Any {
    /// Registered type name. Empty for the base untyped behavior.
    fn type_name(&self) -> &'static str;

    /// Capabilities this type implements.
    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    /// Sample type-specific state at `t`. Base behavior samples nothing.
    fn on_update_sample(&mut self, _prim: &dyn Prim, _t: Time, _prev: Time) -> UpdateFlags {
        UpdateFlags::NONE
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Base untyped behavior; also the fallback when type resolution misses.
#[derive(Debug, Default)]
pub struct PrimBehavior;

impl SchemaBehavior for PrimBehavior {
    fn type_name(&self) -> &'static str {
        ""
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
