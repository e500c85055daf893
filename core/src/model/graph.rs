use super::*;
use crate::internal::*;
use crate::ops::konst::Const;
use crate::ops::source::TypedSource;

/// Main model class: an arena of typed nodes.
#[derive(Clone, Debug, Default)]
pub struct TypedModel {
    /// all nodes in the model
    pub nodes: Vec<Node>,
    /// model inputs
    pub inputs: Vec<OutletId>,
    /// model outputs
    pub outputs: Vec<OutletId>,
}

impl TypedModel {
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op: impl Into<Box<dyn TypedOp>>,
        output_facts: TVec<TypedFact>,
    ) -> ConvPadResult<usize> {
        let op = op.into();
        let name = name.into();
        let id = self.nodes.len();
        let outputs =
            output_facts.into_iter().map(|fact| Outlet { fact, successors: tvec!() }).collect();
        let node = Node { id, name, op, inputs: vec![], outputs, rt_info: RuntimeInfo::default() };
        self.nodes.push(node);
        Ok(id)
    }

    /// Connect a node outlet to a node inlet.
    pub fn add_edge(&mut self, outlet: OutletId, inlet: InletId) -> ConvPadResult<()> {
        ensure!(outlet.node < self.nodes.len(), "Invalid outlet {:?}", outlet);
        ensure!(inlet.node < self.nodes.len(), "Invalid inlet {:?}", inlet);
        ensure!(
            outlet.slot < self.nodes[outlet.node].outputs.len(),
            "Invalid outlet {:?} for {}",
            outlet,
            self.nodes[outlet.node]
        );
        if let Some(previous) = self.nodes[inlet.node].inputs.get(inlet.slot).cloned() {
            self.nodes[previous.node].outputs[previous.slot]
                .successors
                .retain(|&mut succ| succ != inlet);
        }
        {
            let prec = &mut self.nodes[outlet.node];
            prec.outputs[outlet.slot].successors.push(inlet);
        }
        let succ = &mut self.nodes[inlet.node];
        #[allow(clippy::comparison_chain)]
        if inlet.slot == succ.inputs.len() {
            succ.inputs.push(outlet);
        } else if inlet.slot < succ.inputs.len() {
            succ.inputs[inlet.slot] = outlet;
        } else {
            bail!(
                "Edges must be added in order and consecutive. Trying to connect input {:?} of node {}",
                inlet.slot,
                succ
            )
        }
        Ok(())
    }

    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        fact: TypedFact,
    ) -> ConvPadResult<OutletId> {
        let id = self.add_node(name, TypedSource::new(fact.clone()), tvec!(fact))?;
        let id = OutletId::new(id, 0);
        self.inputs.push(id);
        Ok(id)
    }

    pub fn add_const(
        &mut self,
        name: impl Into<String>,
        v: impl IntoArcTensor,
    ) -> ConvPadResult<OutletId> {
        let v = v.into_arc_tensor();
        let fact = TypedFact::from(v.clone());
        self.add_node(name, Const::new(v), tvec!(fact)).map(|id| id.into())
    }

    /// Add a node and connect its inputs, inferring its output facts.
    ///
    /// Construction is validating: if the operator rejects its input facts,
    /// the model is left untouched and the error is returned.
    pub fn wire_node(
        &mut self,
        name: impl Into<String>,
        op: impl Into<Box<dyn TypedOp>>,
        inputs: &[OutletId],
    ) -> ConvPadResult<TVec<OutletId>> {
        let op = op.into();
        let name = name.into();
        self.wire_node_unchecked(&name, &*op, inputs)
            .with_context(|| format!("Wiring node \"{name}\", {op:?}"))
    }

    fn wire_node_unchecked(
        &mut self,
        name: &str,
        op: &dyn TypedOp,
        inputs: &[OutletId],
    ) -> ConvPadResult<TVec<OutletId>> {
        let output_facts = {
            let input_facts = inputs
                .iter()
                .map(|o| self.outlet_fact(*o))
                .collect::<ConvPadResult<TVec<_>>>()?;
            op.output_facts(&input_facts)
                .with_context(|| format!("in output_facts invocation for {name}: {}", op.name()))?
        };
        let id = self.add_node(name, dyn_clone::clone_box(op), output_facts)?;
        inputs.iter().enumerate().try_for_each(|(ix, i)| self.add_edge(*i, InletId::new(id, ix)))?;
        Ok((0..self.node(id).outputs.len()).map(|ix| OutletId::new(id, ix)).collect())
    }

    // Inputs

    /// Get model inputs.
    pub fn input_outlets(&self) -> ConvPadResult<&[OutletId]> {
        Ok(&self.inputs)
    }

    /// Change model inputs.
    pub fn set_input_outlets(&mut self, inputs: &[OutletId]) -> ConvPadResult<()> {
        self.inputs = inputs.to_vec();
        Ok(())
    }

    // Outputs

    /// Get model outputs.
    pub fn output_outlets(&self) -> ConvPadResult<&[OutletId]> {
        Ok(&self.outputs)
    }

    /// Change model outputs.
    pub fn set_output_outlets(&mut self, outputs: &[OutletId]) -> ConvPadResult<()> {
        self.outputs = outputs.to_vec();
        Ok(())
    }

    /// Change model outputs and return `self`.
    pub fn with_output_outlets(mut self, outputs: &[OutletId]) -> ConvPadResult<Self> {
        self.set_output_outlets(outputs)?;
        Ok(self)
    }

    /// Guess outputs from the topology: node or nodes with no successors.
    pub fn auto_outputs(&mut self) -> ConvPadResult<()> {
        let outputs = self
            .nodes
            .iter()
            .flat_map(|n| {
                let id = n.id;
                n.outputs.iter().enumerate().map(move |(ix, output_fact)| {
                    (OutletId::new(id, ix), output_fact.successors.len())
                })
            })
            .filter(|(_f, succs)| *succs == 0)
            .map(|(f, _)| f)
            .collect();
        self.outputs = outputs;
        Ok(())
    }

    /// Get the `ix`-th output tensor type information.
    pub fn output_fact(&self, ix: usize) -> ConvPadResult<&TypedFact> {
        let output = self
            .outputs
            .get(ix)
            .with_context(|| format!("Model has no output #{ix}"))?;
        self.outlet_fact(*output)
    }

    // nodes and their facts

    pub fn node_id_by_name(&self, name: &str) -> ConvPadResult<usize> {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.id)
            .with_context(|| format!("No node found for name: \"{name}\""))
    }

    /// Find a node by its name.
    pub fn node_by_name(&self, name: impl AsRef<str>) -> ConvPadResult<&Node> {
        let id: usize = self.node_id_by_name(name.as_ref())?;
        Ok(&self.nodes[id])
    }

    /// Find a node by its id.
    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    /// Find a node by its id.
    pub fn node_mut(&mut self, id: usize) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Access the nodes table.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Get input tensor information for a node.
    pub fn node_input_facts(&self, node_id: usize) -> ConvPadResult<TVec<&TypedFact>> {
        self.nodes[node_id].inputs.iter().map(|o| self.outlet_fact(*o)).collect()
    }

    /// Get output tensor information for a node.
    pub fn node_output_facts(&self, node_id: usize) -> ConvPadResult<TVec<&TypedFact>> {
        Ok(self.nodes[node_id].outputs.iter().map(|o| &o.fact).collect())
    }

    // outlets

    /// Get tensor information for a single outlet.
    pub fn outlet_fact(&self, outlet: OutletId) -> ConvPadResult<&TypedFact> {
        ensure!(outlet.node < self.nodes.len(), "Invalid outlet for graph");
        let outlets = &self.nodes[outlet.node].outputs;
        outlets
            .get(outlet.slot)
            .map(|o| &o.fact)
            .with_context(|| format!("Invalid outlet reference: {outlet:?}"))
    }

    /// Get the consumers of an outlet.
    pub fn outlet_successors(&self, outlet: OutletId) -> &[InletId] {
        &self.nodes[outlet.node].outputs[outlet.slot].successors
    }

    /// Compute the evaluation order of the nodes feeding the model outputs.
    pub fn eval_order(&self) -> ConvPadResult<Vec<usize>> {
        eval_order(self)
    }

    /// Drop the nodes no output depends on anymore, renumbering the others.
    pub fn compact(&mut self) -> ConvPadResult<()> {
        *self = compact::compact(self)?;
        Ok(())
    }

    pub fn into_compact(mut self) -> ConvPadResult<TypedModel> {
        self.compact()?;
        Ok(self)
    }

    /// Check edges are symmetric: every input is registered as a successor of
    /// the outlet it comes from, and reciprocally.
    pub fn check_edges(&self) -> ConvPadResult<()> {
        for node in &self.nodes {
            for (ix, input) in node.inputs.iter().enumerate() {
                let prec = self
                    .nodes
                    .get(input.node)
                    .with_context(|| format!("{node} input #{ix} refers to missing node"))?;
                let outlet = prec
                    .outputs
                    .get(input.slot)
                    .with_context(|| format!("{node} input #{ix} refers to missing outlet"))?;
                ensure!(
                    outlet.successors.contains(&InletId::new(node.id, ix)),
                    "Inconsistent model: {} input #{} comes from {:?}, which does not know it",
                    node,
                    ix,
                    input
                );
            }
            for (slot, outlet) in node.outputs.iter().enumerate() {
                for succ in &outlet.successors {
                    let consumer = self
                        .nodes
                        .get(succ.node)
                        .with_context(|| format!("{node} feeds missing node {succ:?}"))?;
                    ensure!(
                        consumer.inputs.get(succ.slot) == Some(&OutletId::new(node.id, slot)),
                        "Inconsistent model: {} is registered as a successor of {}, but does not consume it",
                        consumer,
                        node
                    );
                }
            }
        }
        for output in &self.outputs {
            self.outlet_fact(*output).context("Model output")?;
        }
        Ok(())
    }

    #[cfg(not(all(debug_assertions, feature = "paranoid_assertions")))]
    #[inline]
    pub fn check_consistency(&self) -> ConvPadResult<()> {
        self.check_edges()
    }

    #[cfg(all(debug_assertions, feature = "paranoid_assertions"))]
    pub fn check_consistency(&self) -> ConvPadResult<()> {
        self.check_edges()?;
        for node_id in &self.eval_order()? {
            let input_facts = self.node_input_facts(*node_id)?;
            let node = &self.nodes[*node_id];
            if node.id != *node_id {
                bail!("Node at position {} has id {}", node_id, node.id);
            }
            let output_facts = node.op.output_facts(&input_facts)?;
            if node.outputs.len() != output_facts.len() {
                bail!(
                    "Inconsistent model, node output count mismatch. Op says {}, node says {}. {}",
                    output_facts.len(),
                    node.outputs.len(),
                    node
                );
            }
            if node.outputs.iter().zip(output_facts.iter()).any(|(a, b)| !a.fact.same_as(b)) {
                bail!(
                    "Inconsistent model, output types mismatch. Op says: {:?}, node says: {:?}. {} with inputs {:?}.",
                    output_facts,
                    node.outputs.iter().map(|o| &o.fact).collect::<Vec<_>>(),
                    node,
                    input_facts
                )
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::array::Pad;

    fn padded_model() -> ConvPadResult<(TypedModel, OutletId)> {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::dt_shape(DatumType::F32, [1usize, 2, 5]))?;
        let b = model.add_const("b", rctensor1(&[0i64, 0, 1]))?;
        let e = model.add_const("e", rctensor1(&[0i64, 0, 2]))?;
        let v = model.add_const("v", Tensor::zero_scalar(DatumType::F32))?;
        let pad = model.wire_node("pad", Pad, &[x, b, e, v])?[0];
        model.set_output_outlets(&[pad])?;
        Ok((model, pad))
    }

    #[test]
    fn is_sync() {
        fn is_sync<T: Sync>() {}
        is_sync::<TypedModel>();
    }

    #[test]
    fn wire_infers_facts() {
        let (model, pad) = padded_model().unwrap();
        assert_eq!(model.outlet_fact(pad).unwrap().shape, ShapeFact::from([1usize, 2, 8]));
        model.check_consistency().unwrap();
        assert_eq!(model.node_by_name("pad").unwrap().id, pad.node);
        assert_eq!(model.outlet_successors(OutletId::new(0, 0)), &[InletId::new(pad.node, 0)]);
    }

    #[test]
    fn wire_rejects_invalid_inputs() {
        let (mut model, pad) = padded_model().unwrap();
        let before = model.nodes().len();
        let err = model.wire_node("bad", Pad, &[pad]).unwrap_err();
        assert!(err.to_string().starts_with("Wiring node \"bad\""));
        assert!(format!("{err:#}").contains("in output_facts invocation for bad: Pad"));
        assert_eq!(model.nodes().len(), before);
    }

    #[test]
    fn edges_must_be_consecutive() {
        let (mut model, pad) = padded_model().unwrap();
        let x = model.input_outlets().unwrap()[0];
        assert!(model.add_edge(x, InletId::new(pad.node, 7)).is_err());
    }

    #[test]
    fn rewiring_updates_successors() {
        let (mut model, pad) = padded_model().unwrap();
        let other = model.add_const("other_b", rctensor1(&[0i64, 0, 3])).unwrap();
        model.add_edge(other, InletId::new(pad.node, 1)).unwrap();
        assert!(model.outlet_successors(OutletId::new(1, 0)).is_empty());
        model.check_edges().unwrap();
    }

    #[test]
    fn auto_outputs() {
        let (mut model, pad) = padded_model().unwrap();
        model.set_output_outlets(&[]).unwrap();
        model.auto_outputs().unwrap();
        assert_eq!(model.output_outlets().unwrap(), &[pad]);
    }
}
