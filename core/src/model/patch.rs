use std::ops::{Deref, DerefMut};

use crate::internal::*;
use crate::model::*;
use crate::ops::source::TypedSource;

/// A change to apply to a model.
///
/// Actually structured around a model that represent the new nodes to be
/// inserted, plus information about how to connect these new nodes to the
/// pre-existing graph.
#[derive(Clone, Debug, Default)]
pub struct TypedModelPatch {
    /// patch label for auditing and debugging
    pub context: Vec<String>,
    /// the model-like 'patch' of nodes to add to the model
    pub model: TypedModel,
    /// map of patch inputs to model wires
    pub incoming: Vec<(OutletId, OutletId)>,
    /// map of old wires to be replaced by new wires
    pub shunt_outlet_by: Vec<(OutletId, OutletId)>,
}

impl Deref for TypedModelPatch {
    type Target = TypedModel;
    fn deref(&self) -> &TypedModel {
        &self.model
    }
}

impl DerefMut for TypedModelPatch {
    fn deref_mut(&mut self) -> &mut TypedModel {
        &mut self.model
    }
}

impl TypedModelPatch {
    pub fn new(s: impl Into<String>) -> Self {
        Self::default().with_context(s)
    }

    pub fn push_context(&mut self, s: impl Into<String>) {
        self.context.push(s.into());
    }

    pub fn with_context(mut self, s: impl Into<String>) -> Self {
        self.context.push(s.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.model.nodes.is_empty() && self.shunt_outlet_by.is_empty()
    }

    /// Draw a tap from a preexisting node.
    ///
    /// returns an OutletId usable in the little "patch" model
    pub fn tap_model(&mut self, model: &TypedModel, outlet: OutletId) -> ConvPadResult<OutletId> {
        if let Some((tap, _)) = self.incoming.iter().find(|(_, o)| *o == outlet) {
            return Ok(*tap);
        }
        let fact = model.outlet_fact(outlet)?.clone();
        let id = self.add_source(format!("incoming-{}/{}", outlet.node, outlet.slot), fact)?;
        self.incoming.push((id, outlet));
        Ok(id)
    }

    /// Draw taps from a preexisting nodes.
    ///
    /// returns OutletIds usable in the little "patch" model
    pub fn taps<'a>(
        &mut self,
        model: &TypedModel,
        outlets: impl IntoIterator<Item = &'a OutletId>,
    ) -> ConvPadResult<TVec<OutletId>> {
        outlets.into_iter().map(|o| self.tap_model(model, *o)).collect()
    }

    /// Replace an Outlet in the target model by one from the patch.
    pub fn shunt_outside(
        &mut self,
        model: &TypedModel,
        outlet: OutletId,
        by: OutletId,
    ) -> ConvPadResult<()> {
        let original_fact = model.outlet_fact(outlet)?;
        let new_fact = self.model.outlet_fact(by)?;
        if !original_fact.same_as(new_fact) {
            bail!(
                "Patch {}: trying to substitute a {:?} by {:?}",
                self.context.join(" > "),
                original_fact,
                new_fact
            );
        }
        self.shunt_outlet_by.retain(|(o, _)| *o != outlet);
        self.shunt_outlet_by.push((outlet, by));
        Ok(())
    }

    /// Merge the runtime info of a target model node into a patch node.
    pub fn copy_rt_info(&mut self, from: &TypedNode, to: usize) {
        self.model.node_mut(to).rt_info.merge(&from.rt_info);
    }

    /// Convenience method creating a patch that replace a single operation.
    pub fn replace_single_op<IO: Into<Box<dyn TypedOp>>>(
        patched_model: &TypedModel,
        node: &TypedNode,
        inputs: &[OutletId],
        new_op: IO,
    ) -> ConvPadResult<TypedModelPatch> {
        let mut patch = TypedModelPatch::new(format!("replacing {node}"));
        let taps = patch.taps(patched_model, inputs)?;
        let wires = patch.wire_node(&node.name, new_op, &taps)?;
        patch.copy_rt_info(node, wires[0].node);
        for (ix, wire) in wires.iter().enumerate() {
            patch.shunt_outside(patched_model, OutletId::new(node.id, ix), *wire)?;
        }
        Ok(patch)
    }

    /// Apply all changes in the patch to the target model.
    pub fn apply(self, target: &mut TypedModel) -> ConvPadResult<()> {
        self.apply_tracked(target).map(|_| ())
    }

    /// Apply the patch, returning the ids of the target nodes that were
    /// added or got a new input wire.
    pub fn apply_tracked(self, target: &mut TypedModel) -> ConvPadResult<Vec<usize>> {
        let prior_target_inputs = target.input_outlets()?.len();
        let prior_target_outputs = target.output_outlets()?.len();
        let TypedModelPatch { model: patch, incoming, shunt_outlet_by, context } = self;
        let mut mapping: HashMap<OutletId, OutletId> = incoming.into_iter().collect();
        let mut all_inputs = vec![]; // (new_node_id_in_model, [patch_outlet_id])
        let mut touched = vec![];
        for node in patch.nodes {
            if node.op_is::<TypedSource>() {
                if mapping.contains_key(&OutletId::new(node.id, 0)) {
                    // this is a tap
                    continue;
                }
                bail!("Patch {} introduces a new model input: {}", context.join(" > "), node);
            }
            let Node { id, name, inputs, op, outputs, rt_info } = node;
            let n_outputs = outputs.len();
            let facts = outputs.into_iter().map(|of| of.fact).collect();
            let added_node_id = target.add_node(name, op, facts)?;
            target.node_mut(added_node_id).rt_info = rt_info;
            for ix in 0..n_outputs {
                mapping.insert(OutletId::new(id, ix), OutletId::new(added_node_id, ix));
            }
            all_inputs.push((added_node_id, inputs));
            touched.push(added_node_id);
        }
        for (outlet, by) in shunt_outlet_by {
            let fixed_by = *mapping
                .get(&by)
                .with_context(|| format!("Patch {}: unmapped wire {by:?}", context.join(" > ")))?;
            let succs = target.nodes()[outlet.node].outputs[outlet.slot].successors.clone();
            for succ in succs {
                target.add_edge(fixed_by, succ)?;
                if !touched.contains(&succ.node) {
                    touched.push(succ.node);
                }
            }
            for o in target.outputs.iter_mut() {
                if *o == outlet {
                    *o = fixed_by;
                }
            }
        }
        for (node, inputs) in all_inputs {
            for (ix, input) in inputs.into_iter().enumerate() {
                let mapped = *mapping.get(&input).with_context(|| {
                    format!("Patch {}: unmapped input {input:?}", context.join(" > "))
                })?;
                target.add_edge(mapped, InletId::new(node, ix))?;
            }
        }
        debug_assert_eq!(target.input_outlets()?.len(), prior_target_inputs);
        debug_assert_eq!(target.output_outlets()?.len(), prior_target_outputs);
        Ok(touched)
    }
}
