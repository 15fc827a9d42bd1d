//! # uscene
//!
//! A USD-style scene-description schema layer: a tree of typed schema
//! nodes over an external scene-description store, with runtime type
//! resolution through a pluggable registry, master/instance sharing,
//! variant-set configuration, deferred payload loading, and per-time-step
//! change tracking.
//!
//! The storage engine itself is an external collaborator, consumed through
//! the narrow handle traits in [`store`]; an in-memory reference store is
//! included for tests and authoring.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (errors, time)
//! - [`store`] - Primitive-handle interface + in-memory reference store
//! - [`registry`] - Process-wide schema type registry
//! - [`schema`] - The schema node: attributes, variants, payloads, flags
//! - [`typed`] - Builtin concrete schema types (Xform, Mesh, Points, Camera)
//! - [`context`] - Owning session object: arena, import/export, stepping
//! - [`settings`] - Import/export configuration
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use uscene::prelude::*;
//!
//! uscene::registry::register_default_schemas();
//!
//! let store = MemStore::new();
//! store.create_prim("/geo", "Xform").unwrap();
//! store.create_prim("/geo/body", "Mesh").unwrap();
//!
//! let mut ctx = Context::new(Rc::new(store));
//! let root = ctx.import()?;
//! ctx.each_child_r(root, |node| println!("{}", node.path()));
//! ctx.update(1.0 / 24.0);
//! ```

pub mod context;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod store;
pub mod typed;
pub mod util;

// Re-export commonly used types
pub use context::Context;
pub use schema::{NodeId, Schema, UpdateFlags};
pub use util::{Error, Result, Time, TimeRange};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::registry::{register_default_schemas, SchemaEntry};
    pub use crate::schema::{
        Attribute, Capability, NodeId, Schema, SchemaBehavior, UpdateFlags, VariantSet,
    };
    pub use crate::settings::{ExportSettings, ImportSettings};
    pub use crate::store::{
        AttributeDecl, AttributeType, MemStore, Prim, PrimHandle, Store, StoreHandle,
        TopologyVariance,
    };
    pub use crate::typed::{Camera, Mesh, Points, Xform};
    pub use crate::util::{Error, Result, Time, TimeRange, INVALID_TIME};
}
