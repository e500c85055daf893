use convpad_core::internal::*;
use convpad_core::ops::array::{Pad, StridedSlice};
use convpad_core::ops::cnn::{AutoPad, Conv, ConvKind, ConvParams, Deconv, FusedDeconv};
use convpad_core::ops::konst::Const;
use convpad_core::optim::Optimizer;
use proptest::prelude::*;

fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("CONVPAD_LOG").try_init();
}

fn konst(model: &TypedModel, name: &str) -> Vec<i64> {
    model.node_by_name(name).unwrap().op_as::<Const>().unwrap().0.as_i64s().unwrap()
}

fn optimized(mut model: TypedModel) -> TypedModel {
    setup_test_logger();
    let before: Vec<TypedFact> =
        (0..model.output_outlets().unwrap().len()).map(|ix| model.output_fact(ix).unwrap().clone()).collect();
    Optimizer::asym_padding().optimize(&mut model).unwrap();
    for (ix, fact) in before.iter().enumerate() {
        assert!(model.output_fact(ix).unwrap().same_as(fact));
    }
    model
}

fn forward(data: impl Into<ShapeFact>, filter: &[usize], kind: ConvKind, params: ConvParams) -> TypedModel {
    let mut model = TypedModel::default();
    let x = model.add_source("x", TypedFact::dt_shape(DatumType::F32, data)).unwrap();
    let w = model.add_const("w", Tensor::zero(DatumType::F32, filter)).unwrap();
    let conv = model.wire_node("conv", Conv::new(kind, params), &[x, w]).unwrap();
    model.set_output_outlets(&conv).unwrap();
    model
}

fn backward(
    data: &[usize],
    filter: &[usize],
    kind: ConvKind,
    params: ConvParams,
    output_shape: Option<&[i64]>,
) -> TypedModel {
    let mut model = TypedModel::default();
    let x = model.add_source("x", TypedFact::dt_shape(DatumType::F32, data)).unwrap();
    let w = model.add_const("w", Tensor::zero(DatumType::F32, filter)).unwrap();
    let mut inputs = tvec!(x, w);
    if let Some(shape) = output_shape {
        inputs.push(model.add_const("shape", rctensor1(shape)).unwrap());
    }
    let deconv = model
        .wire_node("deconv", Deconv::new(kind, params, output_shape.is_some()), &inputs)
        .unwrap();
    model.set_output_outlets(&deconv).unwrap();
    model
}

#[test]
fn forward_asymmetric_pads() {
    let params = ConvParams::default().with_pads([1, 0], [0, 1]);
    let model = forward([1usize, 3, 10, 10], &[8, 3, 3, 3], ConvKind::Convolution, params);
    assert_eq!(model.output_fact(0).unwrap().shape, ShapeFact::from([1usize, 8, 9, 9]));
    let model = optimized(model);
    assert_eq!(konst(&model, "conv.pads_begin"), vec![0, 0, 1, 0]);
    assert_eq!(konst(&model, "conv.pads_end"), vec![0, 0, 0, 1]);
    let pad_value = model.node_by_name("conv.pad_value").unwrap().op_as::<Const>().unwrap();
    assert_eq!(pad_value.0.rank(), 0);
    assert_eq!(pad_value.0.datum_type(), DatumType::F32);
    let pad = model.node_by_name("conv.pad").unwrap();
    assert!(pad.op_is::<Pad>());
    assert_eq!(model.outlet_fact(pad.id.into()).unwrap().shape, ShapeFact::from([1usize, 3, 11, 11]));
    let conv = model.node_by_name("conv").unwrap().op_as::<Conv>().unwrap();
    assert!(!conv.params.is_asymmetric());
    assert_eq!(conv.params.auto_pad, AutoPad::Explicit);
}

#[test]
fn forward_same_upper_resolves_to_asymmetric() {
    let params = ConvParams::default().with_auto_pad(AutoPad::SameUpper);
    let model = forward([1usize, 3, 10, 10], &[8, 3, 2, 2], ConvKind::Convolution, params);
    let model = optimized(model);
    assert_eq!(konst(&model, "conv.pads_begin"), vec![0, 0, 0, 0]);
    assert_eq!(konst(&model, "conv.pads_end"), vec![0, 0, 1, 1]);
    assert_eq!(model.output_fact(0).unwrap().shape, ShapeFact::from([1usize, 8, 10, 10]));
}

#[test]
fn forward_dynamic_batch() {
    let data = ShapeFact::from_dims([Dim::Dyn, Dim::Val(3), Dim::Val(10), Dim::Val(10)]);
    let params = ConvParams::default().with_pads([1, 0], [0, 1]);
    let model = optimized(forward(data, &[8, 3, 3, 3], ConvKind::Convolution, params));
    assert!(model.node_by_name("conv.pad").is_ok());
    assert_eq!(model.output_fact(0).unwrap().shape.dim(0).unwrap(), Dim::Dyn);
}

#[test]
fn forward_grouped() {
    let params = ConvParams::default().with_strides([2, 2]).with_pads([0, 2], [1, 0]);
    let model = forward([1usize, 4, 9, 9], &[2, 3, 2, 3, 3], ConvKind::GroupConvolution, params);
    let model = optimized(model);
    assert_eq!(konst(&model, "conv.pads_begin"), vec![0, 0, 0, 2]);
    assert_eq!(konst(&model, "conv.pads_end"), vec![0, 0, 1, 0]);
    assert_eq!(model.output_fact(0).unwrap().shape, ShapeFact::from([1usize, 6, 4, 5]));
}

#[test]
fn symmetric_models_are_untouched() {
    let params = ConvParams::default().with_pads([1, 1], [1, 1]);
    let mut model = forward([1usize, 3, 10, 10], &[8, 3, 3, 3], ConvKind::Convolution, params);
    let nodes = model.nodes().len();
    let optimizer = Optimizer::asym_padding();
    let mut session = optimizer.session();
    session.optimize(&mut model).unwrap();
    assert_eq!(session.patches_applied(), 0);
    assert_eq!(model.nodes().len(), nodes);
}

#[test]
fn rewriting_is_idempotent() {
    let params = ConvParams::default().with_pads([1, 0], [0, 1]);
    let mut model = forward([1usize, 3, 10, 10], &[8, 3, 3, 3], ConvKind::Convolution, params);
    let optimizer = Optimizer::asym_padding();
    optimizer.optimize(&mut model).unwrap();
    let nodes = model.nodes().len();
    let mut session = optimizer.session();
    session.optimize(&mut model).unwrap();
    assert_eq!(session.patches_applied(), 0);
    assert_eq!(model.nodes().len(), nodes);
}

#[test]
fn deconv_asymmetric_pads() {
    let params = ConvParams::default().with_strides([2, 2]).with_pads([1, 1], [0, 0]);
    let model = backward(&[1, 3, 5, 5], &[3, 8, 3, 3], ConvKind::ConvolutionBackpropData, params, None);
    assert_eq!(model.output_fact(0).unwrap().shape, ShapeFact::from([1usize, 8, 10, 10]));
    let model = optimized(model);
    assert_eq!(konst(&model, "deconv.unpadded.output_shape"), vec![11, 11]);
    assert_eq!(konst(&model, "deconv.slice_begin"), vec![0, 0, 1, 1]);
    assert_eq!(konst(&model, "deconv.slice_end"), vec![0, 0, 11, 11]);
    assert_eq!(konst(&model, "deconv.slice_strides"), vec![1, 1, 1, 1]);
    assert!(model.node_by_name("deconv").unwrap().op_is::<StridedSlice>());
    let unpadded = model.node_by_name("deconv.unpadded").unwrap();
    assert_eq!(model.outlet_fact(unpadded.id.into()).unwrap().shape, ShapeFact::from([1usize, 8, 11, 11]));
}

#[test]
fn deconv_with_output_shape() {
    let params = ConvParams::default().with_strides([2, 2]).with_pads([1, 0], [0, 1]);
    let model = backward(
        &[1, 3, 5, 5],
        &[3, 8, 3, 3],
        ConvKind::ConvolutionBackpropData,
        params,
        Some(&[10, 10]),
    );
    let model = optimized(model);
    assert_eq!(konst(&model, "deconv.unpadded.output_shape"), vec![11, 11]);
    assert_eq!(konst(&model, "deconv.slice_begin"), vec![0, 0, 1, 0]);
    assert_eq!(konst(&model, "deconv.slice_end"), vec![0, 0, 11, 10]);
}

#[test]
fn deconv_same_upper_with_output_shape() {
    let params = ConvParams::default().with_strides([2, 2]).with_auto_pad(AutoPad::SameUpper);
    let model = backward(
        &[1, 3, 5, 5],
        &[3, 8, 3, 3],
        ConvKind::ConvolutionBackpropData,
        params,
        Some(&[10, 10]),
    );
    let model = optimized(model);
    assert_eq!(konst(&model, "deconv.slice_begin"), vec![0, 0, 1, 1]);
    assert_eq!(konst(&model, "deconv.slice_end"), vec![0, 0, 11, 11]);
    assert_eq!(model.output_fact(0).unwrap().shape, ShapeFact::from([1usize, 8, 10, 10]));
}

#[test]
fn deconv_same_without_output_shape_is_untouched() {
    let params = ConvParams::default().with_strides([2, 2]).with_auto_pad(AutoPad::SameLower);
    let mut model =
        backward(&[1, 3, 5, 5], &[3, 8, 3, 3], ConvKind::ConvolutionBackpropData, params, None);
    let optimizer = Optimizer::asym_padding();
    let mut session = optimizer.session();
    session.optimize(&mut model).unwrap();
    assert_eq!(session.patches_applied(), 0);
}

#[test]
fn grouped_deconv() {
    let params = ConvParams::default().with_pads([2, 0], [0, 1]);
    let model =
        backward(&[1, 4, 5, 5], &[2, 2, 3, 3, 3], ConvKind::GroupConvolutionBackpropData, params, None);
    assert_eq!(model.output_fact(0).unwrap().shape, ShapeFact::from([1usize, 6, 5, 6]));
    let model = optimized(model);
    assert_eq!(konst(&model, "deconv.unpadded.output_shape"), vec![7, 7]);
    assert_eq!(konst(&model, "deconv.slice_begin"), vec![0, 0, 2, 0]);
    assert_eq!(konst(&model, "deconv.slice_end"), vec![0, 0, 7, 6]);
    let unpadded = model.node_by_name("deconv.unpadded").unwrap().op_as::<Deconv>().unwrap();
    assert_eq!(unpadded.kind, ConvKind::GroupConvolutionBackpropData);
}

fn fused(output_shape: Option<&[i64]>) -> TypedModel {
    let mut model = TypedModel::default();
    let x = model.add_source("x", TypedFact::dt_shape(DatumType::F32, [1usize, 4, 5, 5])).unwrap();
    let w = model.add_const("w", Tensor::zero(DatumType::F32, &[4, 2, 3, 3])).unwrap();
    let a = model.add_source("a", TypedFact::dt_shape(DatumType::F32, [1usize, 2, 6, 6])).unwrap();
    let shape = output_shape.map(|s| model.add_const("shape", rctensor1(s)).unwrap());
    let params = ConvParams::default().with_pads([0, 1], [1, 0]);
    let wire = FusedDeconv::wire(&mut model, "fused", x, w, shape, a, params).unwrap();
    model.set_output_outlets(&wire).unwrap();
    model
}

#[test]
fn fused_deconv() {
    let model = optimized(fused(None));
    let unpadded = model.node_by_name("fused.unpadded").unwrap();
    assert_eq!(unpadded.inputs.len(), 3);
    assert_eq!(konst(&model, "fused.slice_begin"), vec![0, 0, 0, 1]);
    assert_eq!(konst(&model, "fused.slice_end"), vec![0, 0, 6, 7]);
    assert_eq!(model.output_fact(0).unwrap().shape, ShapeFact::from([1usize, 2, 6, 6]));
}

#[test]
fn fused_deconv_with_output_shape() {
    let model = optimized(fused(Some(&[6, 6])));
    let unpadded = model.node_by_name("fused.unpadded").unwrap();
    assert_eq!(unpadded.inputs.len(), 4);
    assert!(unpadded.op_as::<FusedDeconv>().unwrap().output_shape_input);
    assert_eq!(konst(&model, "fused.unpadded.output_shape"), vec![7, 7]);
    assert_eq!(unpadded.inputs[3], OutletId::new(model.node_by_name("a").unwrap().id, 0));
    assert_eq!(konst(&model, "fused.slice_end"), vec![0, 0, 6, 7]);
}

#[test]
fn fused_deconv_with_output_shape_beyond_natural() {
    let mut model = TypedModel::default();
    let x = model.add_source("x", TypedFact::dt_shape(DatumType::F32, [1usize, 3, 5, 5])).unwrap();
    let w = model.add_const("w", Tensor::zero(DatumType::F32, &[3, 8, 3, 3])).unwrap();
    let shape = model.add_const("shape", rctensor1(&[11i64, 11])).unwrap();
    let a = model.add_source("a", TypedFact::dt_shape(DatumType::F32, [1usize, 8, 11, 11])).unwrap();
    let params = ConvParams::default().with_strides([2, 2]).with_pads([1, 1], [0, 0]);
    let wire = FusedDeconv::wire(&mut model, "fused", x, w, Some(shape), a, params).unwrap();
    model.set_output_outlets(&wire).unwrap();
    assert_eq!(model.output_fact(0).unwrap().shape, ShapeFact::from([1usize, 8, 11, 11]));

    let model = optimized(model);
    assert_eq!(konst(&model, "fused.unpadded.output_shape"), vec![12, 12]);
    assert_eq!(konst(&model, "fused.slice_begin"), vec![0, 0, 1, 1]);
    assert_eq!(konst(&model, "fused.slice_end"), vec![0, 0, 12, 12]);
    assert!(model.node_by_name("fused").unwrap().op_is::<StridedSlice>());
}

#[test]
fn fused_deconv_rejects_add_of_other_type() {
    let mut model = TypedModel::default();
    let x = model.add_source("x", TypedFact::dt_shape(DatumType::F32, [1usize, 4, 5, 5])).unwrap();
    let w = model.add_const("w", Tensor::zero(DatumType::F32, &[4, 2, 3, 3])).unwrap();
    let a = model.add_source("a", TypedFact::dt_shape(DatumType::I64, [1usize, 2, 7, 7])).unwrap();
    let nodes = model.nodes().len();
    assert!(FusedDeconv::wire(&mut model, "fused", x, w, None, a, ConvParams::default()).is_err());
    assert_eq!(model.nodes().len(), nodes);
}

#[test]
fn rt_info_is_carried_to_new_nodes() {
    let params = ConvParams::default().with_strides([2, 2]).with_pads([1, 1], [0, 0]);
    let mut model =
        backward(&[1, 3, 5, 5], &[3, 8, 3, 3], ConvKind::ConvolutionBackpropData, params, None);
    let id = model.node_id_by_name("deconv").unwrap();
    model.node_mut(id).rt_info.insert("origin", "up1");
    let model = optimized(model);
    for name in ["deconv", "deconv.unpadded"] {
        assert_eq!(model.node_by_name(name).unwrap().rt_info.get("origin"), Some("up1"));
    }
}

proptest! {
    #[test]
    fn output_shapes_are_preserved(
        size in 6usize..12,
        kernel in 1usize..4,
        stride in 1usize..3,
        pads in proptest::collection::vec(0i64..3, 4),
        backprop in any::<bool>(),
    ) {
        let params = ConvParams::default()
            .with_strides([stride, stride])
            .with_pads([pads[0], pads[1]], [pads[2], pads[3]]);
        let model = if backprop {
            backward(&[1, 2, size, size], &[2, 3, kernel, kernel], ConvKind::ConvolutionBackpropData, params, None)
        } else {
            forward([1usize, 2, size, size], &[3, 2, kernel, kernel], ConvKind::Convolution, params)
        };
        let asymmetric = pads[0] != pads[2] || pads[1] != pads[3];
        let model = optimized(model);
        let rewritten = model.nodes().iter().any(|n| n.op_is::<Pad>() || n.op_is::<StridedSlice>());
        prop_assert_eq!(rewritten, asymmetric);
    }
}
