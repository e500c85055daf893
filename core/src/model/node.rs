use crate::internal::*;
use std::collections::BTreeMap;
use std::fmt;

/// A Node in a TypedModel.
///
/// Parameterized by an operator, and the facts of its outputs.
#[derive(Debug, Clone)]
pub struct Node {
    /// node id in the model
    ///
    /// Caution: this id will not be persistent during networks transformation
    pub id: usize,
    /// name of the node
    ///
    /// This is also the friendly name preserved by rewriting: a substitute
    /// node takes over the name of the node it replaces.
    pub name: String,
    /// node inputs
    pub inputs: Vec<OutletId>,
    /// The actual operation the node performs.
    pub op: Box<dyn TypedOp>,
    /// Output facts and successors.
    pub outputs: TVec<Outlet>,
    /// Provenance metadata, carried over by rewrites.
    pub rt_info: RuntimeInfo,
}

impl fmt::Display for Node {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "#{} \"{}\" {}", self.id, self.name, self.op.name())
    }
}

impl Node {
    /// Access the op of the node
    pub fn op(&self) -> &dyn TypedOp {
        self.op.as_ref()
    }

    /// Try to downcast the node operation to O.
    pub fn op_as<O: TypedOp>(&self) -> Option<&O> {
        self.op().downcast_ref::<O>()
    }

    /// Try to downcast the node operation to O.
    pub fn op_as_mut<O: TypedOp>(&mut self) -> Option<&mut O> {
        self.op.downcast_mut::<O>()
    }

    /// Check if the node operation is of type O.
    pub fn op_is<O: TypedOp>(&self) -> bool {
        self.op_as::<O>().is_some()
    }

    /// Check that this node produce the same outputs as `other`.
    pub fn same_as(&self, other: &Node) -> bool {
        self.inputs == other.inputs && self.op.same_as(other.op.as_ref())
    }
}

/// Information for each outlet of a node
#[derive(Clone, Debug)]
pub struct Outlet {
    /// the tensor type information
    pub fact: TypedFact,
    /// where this outlet is used.
    pub successors: TVec<InletId>,
}

/// Identifier for a node output in the graph.
///
/// This happens to be a unique identifier of any variable tensor in the graph
/// (as the graph typically connect one single node output to one or several
/// inputs slots)
#[derive(Clone, Copy, PartialEq, Eq, Hash, new, Default, PartialOrd, Ord)]
pub struct OutletId {
    /// node identifier in the graph
    pub node: usize,
    /// rank of the input in the node
    pub slot: usize,
}

impl fmt::Debug for OutletId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}/{}>", self.node, self.slot)
    }
}

impl From<usize> for OutletId {
    fn from(node: usize) -> OutletId {
        OutletId::new(node, 0)
    }
}

impl From<(usize, usize)> for OutletId {
    fn from(pair: (usize, usize)) -> OutletId {
        OutletId::new(pair.0, pair.1)
    }
}

/// Identifier for a node input in the graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, new, Ord, PartialOrd)]
pub struct InletId {
    /// node identifier in the graph
    pub node: usize,
    /// rank of the input in the node
    pub slot: usize,
}

impl fmt::Debug for InletId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, ">{}/{}", self.node, self.slot)
    }
}

/// Free-form provenance attached to a node.
///
/// Frontends record where a node comes from (original layer names, fused
/// nodes...). A rewrite copies the entries of the node it replaces onto the
/// nodes it introduces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeInfo(BTreeMap<String, String>);

impl RuntimeInfo {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> RuntimeInfo {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| &**s)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (&**k, &**v))
    }

    /// Merge `other` into self. On a key collision, distinct values are
    /// joined with a comma.
    pub fn merge(&mut self, other: &RuntimeInfo) {
        for (k, v) in other.iter() {
            match self.0.get_mut(k) {
                Some(mine) if mine.split(',').any(|m| m == v) => (),
                Some(mine) => *mine = format!("{mine},{v}"),
                None => {
                    self.0.insert(k.to_string(), v.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_rt_info() {
        let mut a = RuntimeInfo::default().with("origin", "conv1");
        let b = RuntimeInfo::default().with("origin", "conv2").with("layer", "3");
        a.merge(&b);
        a.merge(&b);
        assert_eq!(a.get("origin"), Some("conv1,conv2"));
        assert_eq!(a.get("layer"), Some("3"));
    }
}
