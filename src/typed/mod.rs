//! Builtin concrete schema types.
//!
//! - [`Xform`] - transformable node (depth 1)
//! - [`Mesh`] - polygonal geometry (depth 2)
//! - [`Points`] - point clouds (depth 2)
//! - [`Camera`] - cameras (depth 2)
//!
//! Mesh, Points and Camera specialize Xform, mirroring the store-side
//! type hierarchy. Plugin modules can add further types by registering
//! their own [`SchemaEntry`](crate::registry::SchemaEntry) at startup.

pub mod camera;
pub mod mesh;
pub mod points;
pub mod xform;

pub use camera::Camera;
pub use mesh::Mesh;
pub use points::Points;
pub use xform::Xform;

use crate::registry::SchemaRegistry;

/// Register every builtin schema type. Called from
/// `registry::register_default_schemas`.
pub(crate) fn register_all(reg: &mut SchemaRegistry) {
    reg.register(Xform::entry());
    reg.register(Mesh::entry());
    reg.register(Points::entry());
    reg.register(Camera::entry());
}
