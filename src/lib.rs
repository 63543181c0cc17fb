//! Marcotte: declarative deep-cloning of connected object graphs.
//!
//! This crate copies the subgraph reachable from one or more root objects,
//! where the subgraph is described declaratively rather than by hand-written
//! traversal code:
//! - **Path patterns** name which relations to follow and how many hops:
//!   `"department+.(boss|employees).address"`. All scalar attributes are
//!   copied by default in this mode.
//! - **Property filters** give full control: [`deep_clone_node`] follows
//!   every relation the filter approves, to unbounded depth.
//! - Both combine: patterns select relations, the filter governs scalars.
//!
//! Guarantees: each distinct original maps to exactly one clone (identity
//! map), graphs with cycles and diamonds terminate, collections are rebuilt
//! as fresh containers of the matching kind (sorted containers keep their
//! ordering rule), owned relations are relinked to the owning clone, and
//! `x+` repetition is computed to a fixed point.
//!
//! Objects are reached through an injected [`ObjectModel`]; the bundled
//! [`Registry`] implements it as an explicit runtime type-registry. Each
//! top-level call builds a fresh clone session over an exclusive model
//! borrow, which is what makes the public functions safe to use from many
//! threads; compiled patterns are shared process-wide.
//!
//! # Name Origin: "Marcotte"
//!
//! A marcotte is the rooted branch produced by air-layering: a gardener
//! wounds a branch, wraps it, and grows a complete, independently rooted
//! copy of the plant while it is still attached to the parent. This crate
//! does the same to object graphs: it grows a complete, independently
//! linked copy of a chosen limb of the graph, severed from the original
//! only where the pattern or filter says the copy stops.
//!
//! # Example
//! ```
//! use marcotte::prelude::*;
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     Metadata::new("company")
//!         .scalar("name")
//!         .owned_relation("departments", "company"),
//! );
//! registry.register(Metadata::new("department").scalar("name"));
//!
//! let acme = registry.create("company");
//! registry.put(acme, "name", Value::text("acme"));
//! let dev = registry.create("department");
//! registry.put(dev, "name", Value::text("dev"));
//! registry.put(acme, "departments", Value::Seq(vec![Value::Node(dev)]));
//!
//! let copy = clone_node(&mut registry, acme, &["departments"]).unwrap();
//! assert_ne!(copy, acme);
//! assert_eq!(registry.value(copy, "name"), Some(Value::text("acme")));
//! ```

pub mod cache;
pub mod cloner;
pub mod explore;
pub mod model;
pub mod pattern;
pub mod registry;

pub use cloner::{
    clone_node, clone_node_with, clone_nodes, clone_nodes_with, deep_clone_node, deep_clone_nodes,
    CloneError, Cloner,
};
pub use explore::{deep_explore, Explorer, GraphExplorer, ItemSet};
pub use model::{
    AllowAll, InstantiationError, Item, Metadata, NodeId, ObjectModel, PropertyFilter, Scalar,
    SortOrder, Value,
};
pub use pattern::{compile, PathExpr, PatternSyntaxError};
pub use registry::Registry;

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::cloner::{
        clone_node, clone_node_with, clone_nodes, clone_nodes_with, deep_clone_node,
        deep_clone_nodes, CloneError, Cloner,
    };
    pub use crate::explore::{deep_explore, Explorer, GraphExplorer, ItemSet};
    pub use crate::model::{
        AllowAll, InstantiationError, Item, Metadata, NodeId, ObjectModel, PropertyFilter, Scalar,
        SortOrder, Value,
    };
    pub use crate::pattern::{compile, PathExpr, PatternSyntaxError};
    pub use crate::registry::Registry;
}
