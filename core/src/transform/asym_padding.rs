//! Rewriting of convolutions with asymmetric spatial padding.
//!
//! Forward convolutions get their padding moved to an explicit constant
//! `Pad` node ahead of the data input. Transposed convolutions are
//! recomputed without padding on an inflated output, then cropped back to
//! the original shape by a `StridedSlice`.
use crate::internal::*;
use crate::ops::array::{Pad, StridedSlice};
use crate::ops::cnn::padding::extend_with_batch_and_channel_zero_padding;
use crate::ops::cnn::{Conv, ConvKind, ConvParams, Deconv, FusedDeconv, ResolvedConv};

fn forward_asym_padding(
    model: &TypedModel,
    node: &TypedNode,
    name: &str,
    op: &Conv,
) -> ConvPadResult<Option<TypedModelPatch>> {
    if node.inputs.len() != 2 {
        return Ok(None);
    }
    let input_facts = model.node_input_facts(node.id)?;
    let resolved = op.resolve(&input_facts)?;
    if !resolved.pads_known {
        trace!("{node}: pads depend on unknown shapes");
        return Ok(None);
    }
    let pads_begin = extend_with_batch_and_channel_zero_padding(&resolved.params.pads_begin);
    let pads_end = extend_with_batch_and_channel_zero_padding(&resolved.params.pads_end);
    if pads_begin == pads_end {
        return Ok(None);
    }
    ensure!(
        pads_begin.len() == pads_end.len(),
        "{}: pads begin {:?} and end {:?} differ in length",
        node,
        resolved.params.pads_begin,
        resolved.params.pads_end
    );

    let mut patch = TypedModelPatch::new(format!("Moving asymmetric padding of {node} to a Pad"));
    let taps = patch.taps(model, &node.inputs)?;
    let begin = patch.add_const(format!("{name}.pads_begin"), rctensor1(&pads_begin))?;
    let end = patch.add_const(format!("{name}.pads_end"), rctensor1(&pads_end))?;
    let value =
        patch.add_const(format!("{name}.pad_value"), Tensor::zero_scalar(input_facts[0].datum_type))?;
    let padded = patch.wire_node(
        format!("{name}.pad"),
        Pad,
        &[taps[0], begin, end, value],
    )?;
    let conv = Conv::new(op.kind, resolved.params.unpadded());
    let wire = patch.wire_node(name, conv, &[padded[0], taps[1]])?[0];
    patch.copy_rt_info(node, wire.node);
    patch.shunt_outside(model, node.id.into(), wire)?;
    Ok(Some(patch))
}

/// What it takes to compute a transposed convolution without padding.
#[derive(Debug, Clone)]
struct Unpadding {
    params: ConvParams,
    /// spatial shape of the unpadded convolution output
    inflated: TVec<usize>,
}

fn plan_unpadding(
    node: &TypedNode,
    resolved: ResolvedConv,
    requested: ShapeFact,
) -> ConvPadResult<Option<Unpadding>> {
    if !resolved.pads_known {
        trace!("{node}: pads depend on unknown shapes");
        return Ok(None);
    }
    let params = resolved.params;
    if !params.is_asymmetric() {
        return Ok(None);
    }
    if params.pads_begin.iter().chain(params.pads_end.iter()).any(|p| *p < 0) {
        trace!("{node}: negative padding");
        return Ok(None);
    }
    ensure!(
        params.pads_begin.len() == params.pads_end.len(),
        "{}: pads begin {:?} and end {:?} differ in length",
        node,
        params.pads_begin,
        params.pads_end
    );
    let rank = params.pads_begin.len();
    let target = match requested.as_concrete() {
        Some(target) if target.len() == rank => target,
        _ => {
            let current = node.outputs[0].fact.shape.tail(2, rank)?;
            match current.iter().map(|d| d.as_option()).collect::<Option<TVec<usize>>>() {
                Some(target) => target,
                None => {
                    trace!("{node}: output shape is not known");
                    return Ok(None);
                }
            }
        }
    };
    let inflated = (0..rank)
        .map(|ax| target[ax] + (params.pads_begin[ax] + params.pads_end[ax]) as usize)
        .collect();
    Ok(Some(Unpadding { params, inflated }))
}

/// Crop the unpadded convolution output back to the shape of `node` and
/// substitute the crop for it.
fn slice_back(
    patch: &mut TypedModelPatch,
    model: &TypedModel,
    node: &TypedNode,
    name: &str,
    unpadded: OutletId,
    plan: &Unpadding,
) -> ConvPadResult<()> {
    let original = &node.outputs[0].fact;
    let replacement = patch.outlet_fact(unpadded)?;
    ensure!(
        !replacement.same_as(original),
        "{}: convolution without padding keeps the padded shape {:?}",
        node,
        original
    );
    let rank = plan.inflated.len();
    let mut begin: TVec<i64> = tvec!(0, 0);
    begin.extend(plan.params.pads_begin.iter().copied());
    let mut end: TVec<i64> = tvec!(0, 0);
    end.extend((0..rank).map(|ax| plan.inflated[ax] as i64 - plan.params.pads_end[ax]));
    let begin = patch.add_const(format!("{name}.slice_begin"), rctensor1(&begin))?;
    let end = patch.add_const(format!("{name}.slice_end"), rctensor1(&end))?;
    let strides = patch.add_const(format!("{name}.slice_strides"), rctensor1(&vec![1i64; rank + 2]))?;
    let sliced =
        patch.wire_node(name, StridedSlice::new(0b11, 0b11), &[unpadded, begin, end, strides])?[0];
    let sliced_fact = patch.outlet_fact(sliced)?;
    ensure!(
        sliced_fact.same_as(original),
        "{}: cropped output {:?} does not match original output {:?}",
        node,
        sliced_fact,
        original
    );
    patch.copy_rt_info(node, unpadded.node);
    patch.copy_rt_info(node, sliced.node);
    patch.shunt_outside(model, node.id.into(), sliced)?;
    Ok(())
}

fn deconv_asym_padding(
    model: &TypedModel,
    node: &TypedNode,
    name: &str,
    op: &Deconv,
) -> ConvPadResult<Option<TypedModelPatch>> {
    let input_facts = model.node_input_facts(node.id)?;
    let resolved = op.resolve(&input_facts)?;
    let requested = op.output_shape_query(&input_facts)?;
    let Some(plan) = plan_unpadding(node, resolved, requested)? else { return Ok(None) };

    let mut patch =
        TypedModelPatch::new(format!("Cropping {node} output instead of padding"));
    let data = patch.tap_model(model, node.inputs[0])?;
    let filters = patch.tap_model(model, node.inputs[1])?;
    let inflated: TVec<i64> = plan.inflated.iter().map(|d| *d as i64).collect();
    let output_shape =
        patch.add_const(format!("{name}.unpadded.output_shape"), rctensor1(&inflated))?;
    let unpadded = patch.wire_node(
        format!("{name}.unpadded"),
        Deconv::new(op.kind, plan.params.unpadded(), true),
        &[data, filters, output_shape],
    )?[0];
    slice_back(&mut patch, model, node, name, unpadded, &plan)?;
    Ok(Some(patch))
}

fn fused_deconv_asym_padding(
    model: &TypedModel,
    node: &TypedNode,
    name: &str,
    op: &FusedDeconv,
) -> ConvPadResult<Option<TypedModelPatch>> {
    let input_facts = model.node_input_facts(node.id)?;
    let resolved = op.resolve(&input_facts)?;
    let requested = op.output_shape_query(&input_facts)?;
    let Some(plan) = plan_unpadding(node, resolved, requested)? else { return Ok(None) };

    let mut patch =
        TypedModelPatch::new(format!("Cropping {node} output instead of padding"));
    let data = patch.tap_model(model, node.inputs[0])?;
    let filters = patch.tap_model(model, node.inputs[1])?;
    let add = patch.tap_model(model, node.inputs[op.add_input_index()])?;
    let output_shape = if op.output_shape_input {
        let inflated: TVec<i64> = plan.inflated.iter().map(|d| *d as i64).collect();
        Some(patch.add_const(format!("{name}.unpadded.output_shape"), rctensor1(&inflated))?)
    } else {
        None
    };
    let unpadded = FusedDeconv::wire(
        &mut patch,
        format!("{name}.unpadded"),
        data,
        filters,
        output_shape,
        add,
        plan.params.unpadded(),
    )?[0];
    slice_back(&mut patch, model, node, name, unpadded, &plan)?;
    Ok(Some(patch))
}

fn conv_rule(
    kind: ConvKind,
) -> impl Fn(&(), &TypedModel, &TypedNode, &str, &Conv) -> ConvPadResult<Option<TypedModelPatch>>
       + Send
       + Sync
       + 'static {
    move |_, model, node, name, op| {
        if op.kind != kind {
            return Ok(None);
        }
        forward_asym_padding(model, node, name, op)
    }
}

fn deconv_rule(
    kind: ConvKind,
) -> impl Fn(&(), &TypedModel, &TypedNode, &str, &Deconv) -> ConvPadResult<Option<TypedModelPatch>>
       + Send
       + Sync
       + 'static {
    move |_, model, node, name, op| {
        if op.kind != kind {
            return Ok(None);
        }
        deconv_asym_padding(model, node, name, op)
    }
}

macro_rules! asym_padding_pass {
    ($(#[$meta:meta])* $Pass:ident, $name:literal, $rewriter:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $Pass(Rewriter<()>);

        impl Default for $Pass {
            fn default() -> $Pass {
                $Pass($rewriter)
            }
        }

        impl $Pass {
            pub fn new() -> $Pass {
                $Pass::default()
            }
        }

        impl ModelTransform for $Pass {
            fn name(&self) -> Cow<str> {
                $name.into()
            }

            fn transform_with_budget(
                &self,
                model: &mut TypedModel,
                budget: Option<usize>,
            ) -> ConvPadResult<usize> {
                self.0
                    .rewrite_with_budget(&(), model, budget)
                    .with_context(|| format!("Running {}", $name))
            }
        }
    };
}

asym_padding_pass!(
    /// Moves asymmetric padding of plain convolutions to a `Pad` node.
    ConvolutionAsymPadding,
    "conv-asym-padding",
    Rewriter::default().with_rule_for("conv-asym-padding", conv_rule(ConvKind::Convolution))
);

asym_padding_pass!(
    /// Moves asymmetric padding of grouped convolutions to a `Pad` node.
    GroupConvolutionAsymPadding,
    "group-conv-asym-padding",
    Rewriter::default()
        .with_rule_for("group-conv-asym-padding", conv_rule(ConvKind::GroupConvolution))
);

asym_padding_pass!(
    /// Replaces asymmetric padding of transposed convolutions by a crop of
    /// their unpadded output.
    ConvBackpropDataAsymPadding,
    "conv-backprop-data-asym-padding",
    Rewriter::default().with_rule_for(
        "conv-backprop-data-asym-padding",
        deconv_rule(ConvKind::ConvolutionBackpropData)
    )
);

asym_padding_pass!(
    /// Same as [`ConvBackpropDataAsymPadding`], for grouped and fused
    /// transposed convolutions.
    GroupConvBackpropDataAsymPadding,
    "group-conv-backprop-data-asym-padding",
    Rewriter::default()
        .with_rule_for(
            "group-conv-backprop-data-asym-padding",
            deconv_rule(ConvKind::GroupConvolutionBackpropData)
        )
        .with_rule_for("fused-conv-backprop-data-asym-padding", |_: &(), model, node, name, op: &FusedDeconv| {
            fused_deconv_asym_padding(model, node, name, op)
        })
);
