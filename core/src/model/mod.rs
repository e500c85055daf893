//! ## Models and their lifecycle
//!
//! A `TypedModel` is an arena of nodes. Each node owns its operator and the
//! facts (element type and shape) of its outputs, and refers to its inputs
//! by `OutletId`: a (node id, output slot) pair. Node ids are stable until
//! the model is compacted.
//!
//! Rewriting never mutates a node in place: a rule builds a
//! `TypedModelPatch` containing replacement nodes, then the patch is applied,
//! rewiring every consumer of the replaced outlets. Nodes nobody consumes
//! anymore are discarded by `TypedModel::compact`.
mod compact;
pub mod fact;
mod graph;
mod node;
pub mod order;
mod patch;
mod rewriter;

pub use self::fact::{ShapeFact, TypedFact};
pub use self::graph::TypedModel;
pub use self::node::{InletId, Node, Outlet, OutletId, RuntimeInfo};
pub use self::order::eval_order;
pub use self::patch::TypedModelPatch;
pub use self::rewriter::Rewriter;

/// Node for TypedModel graph
pub type TypedNode = Node;
