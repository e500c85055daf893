use super::{output_shape_query, resolve_backprop};
use crate::internal::*;
use crate::ops::cnn::{ConvCaps, ConvKind, ConvParams, ResolvedConv};

/// Transposed convolution (backprop data), plain or grouped.
///
/// Inputs are the data `[N, C, spatial..]`, the filters (`[I, O, k..]` or
/// `[G, I/G, O/G, k..]`) and, when `output_shape_input` is set, a 1-D
/// integer tensor with the desired output spatial shape.
#[derive(Debug, Clone, new, PartialEq, Eq, Hash)]
pub struct Deconv {
    pub kind: ConvKind,
    pub params: ConvParams,
    pub output_shape_input: bool,
}

impl Deconv {
    pub fn caps(&self) -> ConvCaps {
        ConvCaps { output_shape_input: self.output_shape_input, ..self.kind.caps() }
    }

    fn check_inputs(&self, inputs: &[&TypedFact]) -> ConvPadResult<()> {
        ensure!(
            matches!(
                self.kind,
                ConvKind::ConvolutionBackpropData | ConvKind::GroupConvolutionBackpropData
            ),
            "{} is not a transposed convolution",
            self.kind
        );
        ensure!(
            inputs.len() == self.caps().input_count(),
            "{} expects {} inputs, got {}",
            self.kind,
            self.caps().input_count(),
            inputs.len()
        );
        Ok(())
    }

    /// Desired output spatial shape, as given by the output shape input.
    pub fn output_shape_query(&self, inputs: &[&TypedFact]) -> ConvPadResult<ShapeFact> {
        self.check_inputs(inputs)?;
        output_shape_query(
            self.caps(),
            &self.params,
            inputs[0],
            inputs[1],
            inputs.get(2).copied(),
        )
    }

    pub fn resolve(&self, inputs: &[&TypedFact]) -> ConvPadResult<ResolvedConv> {
        self.check_inputs(inputs)?;
        resolve_backprop(self.caps(), &self.params, inputs[0], inputs[1], inputs.get(2).copied())
    }
}

impl TypedOp for Deconv {
    fn name(&self) -> Cow<str> {
        self.kind.to_string().into()
    }

    fn info(&self) -> ConvPadResult<Vec<String>> {
        let p = &self.params;
        Ok(vec![
            format!("Strides: {:?}, dilations: {:?}", p.strides, p.dilations),
            format!("Padding: {} {:?} {:?}", p.auto_pad, p.pads_begin, p.pads_end),
            format!("Output padding: {:?}", p.output_padding),
        ])
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> ConvPadResult<TVec<TypedFact>> {
        Ok(tvec!(self.resolve(inputs)?.fact))
    }

    fn visit_attributes(&self, visitor: &mut dyn AttributeVisitor) -> ConvPadResult<()> {
        self.params.visit(visitor, true)
    }

    impl_op_same_as!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::cnn::AutoPad;

    fn facts(data: &[usize], filter: &[usize], output_shape: Option<&[i64]>) -> Vec<TypedFact> {
        let mut facts = vec![
            TypedFact::dt_shape(DatumType::F32, data),
            TypedFact::dt_shape(DatumType::F32, filter),
        ];
        if let Some(os) = output_shape {
            facts.push(rctensor1(os).into());
        }
        facts
    }

    fn resolve(op: &Deconv, facts: &[TypedFact]) -> ConvPadResult<ResolvedConv> {
        let refs: Vec<&TypedFact> = facts.iter().collect();
        op.resolve(&refs)
    }

    #[test]
    fn stride_2_asymmetric() {
        let op = Deconv::new(
            ConvKind::ConvolutionBackpropData,
            ConvParams::default().with_strides([2, 2]).with_pads([1, 1], [0, 0]),
            false,
        );
        let r = resolve(&op, &facts(&[1, 3, 5, 5], &[3, 8, 3, 3], None)).unwrap();
        assert_eq!(r.fact.shape, ShapeFact::from([1usize, 8, 10, 10]));
        assert!(r.pads_known);
    }

    #[test]
    fn grouped_channels() {
        let op = Deconv::new(ConvKind::GroupConvolutionBackpropData, ConvParams::default(), false);
        let r = resolve(&op, &facts(&[1, 4, 5, 5], &[2, 2, 3, 3, 3], None)).unwrap();
        assert_eq!(r.fact.shape, ShapeFact::from([1usize, 6, 7, 7]));
    }

    #[test]
    fn explicit_output_shape() {
        let op = Deconv::new(
            ConvKind::ConvolutionBackpropData,
            ConvParams::default().with_strides([2, 2]).with_pads([1, 1], [0, 0]),
            true,
        );
        let facts = facts(&[1, 3, 5, 5], &[3, 8, 3, 3], Some(&[11, 11]));
        let r = resolve(&op, &facts).unwrap();
        assert_eq!(r.fact.shape, ShapeFact::from([1usize, 8, 11, 11]));
        let refs: Vec<&TypedFact> = facts.iter().collect();
        assert_eq!(op.output_shape_query(&refs).unwrap(), ShapeFact::from([11usize, 11]));
    }

    #[test]
    fn same_upper_from_output_shape() {
        let op = Deconv::new(
            ConvKind::ConvolutionBackpropData,
            ConvParams::default().with_strides([2]).with_auto_pad(AutoPad::SameUpper),
            true,
        );
        let r = resolve(&op, &facts(&[1, 3, 5], &[3, 8, 3], Some(&[10]))).unwrap();
        assert_eq!(&*r.params.pads_begin, &[1]);
        assert_eq!(&*r.params.pads_end, &[0]);
        assert_eq!(r.fact.shape, ShapeFact::from([1usize, 8, 10]));
    }

    #[test]
    fn same_without_output_shape_zeroes_pads() {
        let op = Deconv::new(
            ConvKind::ConvolutionBackpropData,
            ConvParams::default().with_pads([1], [0]).with_auto_pad(AutoPad::SameLower),
            false,
        );
        let r = resolve(&op, &facts(&[1, 3, 5], &[3, 8, 3], None)).unwrap();
        assert_eq!(&*r.params.pads_begin, &[0]);
        assert_eq!(r.fact.shape, ShapeFact::from([1usize, 8, 7]));
    }

    #[test]
    fn query_without_output_shape_is_dynamic() {
        let op = Deconv::new(ConvKind::ConvolutionBackpropData, ConvParams::default(), false);
        let facts = facts(&[1, 3, 5, 5], &[3, 8, 3, 3], None);
        let refs: Vec<&TypedFact> = facts.iter().collect();
        assert_eq!(op.output_shape_query(&refs).unwrap(), ShapeFact::dynamic(2));

        let op = Deconv::new(ConvKind::GroupConvolutionBackpropData, ConvParams::default(), false);
        let facts = [
            TypedFact::dt_shape(DatumType::F32, ShapeFact::unknown()),
            TypedFact::dt_shape(DatumType::F32, [2usize, 2, 3, 3, 3]),
        ];
        let refs: Vec<&TypedFact> = facts.iter().collect();
        assert_eq!(op.output_shape_query(&refs).unwrap(), ShapeFact::dynamic(2));
    }

    #[test]
    fn non_constant_output_shape() {
        let op = Deconv::new(ConvKind::ConvolutionBackpropData, ConvParams::default(), true);
        let facts = [
            TypedFact::dt_shape(DatumType::F32, [1usize, 3, 5, 5]),
            TypedFact::dt_shape(DatumType::F32, [3usize, 8, 3, 3]),
            TypedFact::dt_shape(DatumType::I64, [2usize]),
        ];
        let refs: Vec<&TypedFact> = facts.iter().collect();
        assert_eq!(op.output_shape_query(&refs).unwrap(), ShapeFact::unknown());
        let r = op.resolve(&refs).unwrap();
        assert_eq!(r.fact.shape, ShapeFact::from_dims([Dim::Val(1), Dim::Val(8), Dim::Dyn, Dim::Dyn]));
    }

    #[test]
    fn input_count_checked() {
        let op = Deconv::new(ConvKind::ConvolutionBackpropData, ConvParams::default(), true);
        assert!(resolve(&op, &facts(&[1, 3, 5, 5], &[3, 8, 3, 3], None)).is_err());
    }

    #[test]
    fn attributes() {
        let op = Deconv::new(
            ConvKind::ConvolutionBackpropData,
            ConvParams::default().with_output_padding([1, 0]),
            false,
        );
        let dump = AttributeDump::of(&op).unwrap();
        assert_eq!(dump.get("output_padding"), Some("1,0"));
        assert_eq!(dump.0.len(), 6);
    }
}
