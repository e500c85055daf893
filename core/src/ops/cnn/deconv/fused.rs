use super::{output_shape_query, resolve_backprop};
use crate::internal::*;
use crate::ops::cnn::{ConvCaps, ConvKind, ConvParams, ResolvedConv};

/// A transposed convolution whose result is added to another tensor:
/// `deconv(data, filters[, output_shape]) + add`.
///
/// Inputs are data, filters, an optional output shape and the added tensor,
/// always last. The added tensor fact is captured when the node is wired:
/// its element type must be the convolution output type. Its shape is not
/// checked against the convolution output.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedDeconv {
    pub params: ConvParams,
    pub output_shape_input: bool,
    pub add_fact: TypedFact,
}

impl FusedDeconv {
    /// Wire a new node, capturing the fact of `add`.
    #[allow(clippy::too_many_arguments)]
    pub fn wire(
        model: &mut TypedModel,
        name: impl Into<String>,
        data: OutletId,
        filters: OutletId,
        output_shape: Option<OutletId>,
        add: OutletId,
        params: ConvParams,
    ) -> ConvPadResult<TVec<OutletId>> {
        let op = FusedDeconv {
            params,
            output_shape_input: output_shape.is_some(),
            add_fact: model.outlet_fact(add)?.without_value(),
        };
        let mut inputs: TVec<OutletId> = tvec!(data, filters);
        inputs.extend(output_shape);
        inputs.push(add);
        model.wire_node(name, op, &inputs)
    }

    /// Wire a node with the same attributes on different inputs.
    ///
    /// The input count must be the same as this node's: 3, or 4 with an
    /// output shape input.
    pub fn clone_with_new_inputs(
        &self,
        model: &mut TypedModel,
        name: impl Into<String>,
        new_inputs: &[OutletId],
    ) -> ConvPadResult<TVec<OutletId>> {
        let expected = self.caps().input_count();
        ensure!(
            new_inputs.len() == expected,
            "FusedConvBackpropData expects {} inputs, got {}",
            expected,
            new_inputs.len()
        );
        let add = new_inputs[expected - 1];
        let output_shape = self.output_shape_input.then(|| new_inputs[2]);
        Self::wire(model, name, new_inputs[0], new_inputs[1], output_shape, add, self.params.clone())
    }

    pub fn caps(&self) -> ConvCaps {
        ConvCaps { output_shape_input: self.output_shape_input, ..ConvKind::FusedConvBackpropData.caps() }
    }

    pub fn add_input_index(&self) -> usize {
        2 + self.output_shape_input as usize
    }

    fn check_inputs(&self, inputs: &[&TypedFact]) -> ConvPadResult<()> {
        ensure!(
            inputs.len() == self.caps().input_count(),
            "FusedConvBackpropData expects {} inputs, got {}",
            self.caps().input_count(),
            inputs.len()
        );
        Ok(())
    }

    fn output_shape_fact<'a>(&self, inputs: &[&'a TypedFact]) -> Option<&'a TypedFact> {
        self.output_shape_input.then(|| inputs[2])
    }

    pub fn output_shape_query(&self, inputs: &[&TypedFact]) -> ConvPadResult<ShapeFact> {
        self.check_inputs(inputs)?;
        output_shape_query(
            self.caps(),
            &self.params,
            inputs[0],
            inputs[1],
            self.output_shape_fact(inputs),
        )
    }

    pub fn resolve(&self, inputs: &[&TypedFact]) -> ConvPadResult<ResolvedConv> {
        self.check_inputs(inputs)?;
        resolve_backprop(
            self.caps(),
            &self.params,
            inputs[0],
            inputs[1],
            self.output_shape_fact(inputs),
        )
    }
}

impl TypedOp for FusedDeconv {
    fn name(&self) -> Cow<str> {
        "FusedConvBackpropData".into()
    }

    fn info(&self) -> ConvPadResult<Vec<String>> {
        let p = &self.params;
        Ok(vec![
            format!("Strides: {:?}, dilations: {:?}", p.strides, p.dilations),
            format!("Padding: {} {:?} {:?}", p.auto_pad, p.pads_begin, p.pads_end),
            format!("Output padding: {:?}", p.output_padding),
            format!("Add: {:?}", self.add_fact),
        ])
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> ConvPadResult<TVec<TypedFact>> {
        let resolved = self.resolve(inputs)?;
        let add = inputs[self.add_input_index()];
        ensure!(
            add.datum_type == self.add_fact.datum_type,
            "FusedConvBackpropData add input is {:?}, node was built for {:?}",
            add,
            self.add_fact
        );
        ensure!(
            resolved.fact.datum_type == self.add_fact.datum_type,
            "FusedConvBackpropData output type {} does not match add input type {}",
            resolved.fact.datum_type,
            self.add_fact.datum_type
        );
        Ok(tvec!(resolved.fact))
    }

    fn visit_attributes(&self, visitor: &mut dyn AttributeVisitor) -> ConvPadResult<()> {
        self.params.visit(visitor, true)
    }

    fn same_as(&self, other: &dyn TypedOp) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| {
            self.params == other.params
                && self.output_shape_input == other.output_shape_input
                && self.add_fact.same_as(&other.add_fact)
        })
    }
}
