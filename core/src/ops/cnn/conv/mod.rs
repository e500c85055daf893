use super::padding::{infer_conv_output_spatial_shape, infer_same_padding, AutoPad};
use super::{ConvCaps, ConvKind, ConvParams, ResolvedConv};
use crate::internal::*;

/// Forward convolution, plain or grouped.
///
/// Inputs are the data `[N, C, spatial..]` and the filters, `[O, I, k..]`
/// for `Convolution`, `[G, O/G, I/G, k..]` for `GroupConvolution`.
#[derive(Debug, Clone, new, PartialEq, Eq, Hash)]
pub struct Conv {
    pub kind: ConvKind,
    pub params: ConvParams,
}

impl Conv {
    pub fn caps(&self) -> ConvCaps {
        self.kind.caps()
    }

    /// Resolve defaults and auto padding, and infer the output fact.
    pub fn resolve(&self, inputs: &[&TypedFact]) -> ConvPadResult<ResolvedConv> {
        let caps = self.caps();
        ensure!(!caps.backprop, "{} is not a forward convolution", self.kind);
        let (data, filter) = args_2!(inputs);
        let Some(datum_type) = data.datum_type.merge(filter.datum_type) else {
            bail!(
                "Element types for data batch and filters do not match (data batch element type: {}, filters element type: {})",
                data.datum_type,
                filter.datum_type
            )
        };
        let spatial_rank = data
            .rank()
            .map(|r| r.saturating_sub(2))
            .or_else(|| filter.rank().map(|r| r.saturating_sub(caps.filter_prefix())))
            .or_else(|| self.params.spatial_rank());
        let Some(spatial_rank) = spatial_rank else {
            return Ok(ResolvedConv {
                params: self.params.clone(),
                pads_known: !self.params.auto_pad.is_same(),
                fact: TypedFact::dt_shape(datum_type, ShapeFact::unknown()),
            });
        };
        if let Some(rank) = data.rank() {
            ensure!(rank >= 3, "Convolution data must have batch, channel and spatial axes, got {:?}", data);
        }
        if let Some(rank) = filter.rank() {
            ensure!(
                rank == spatial_rank + caps.filter_prefix(),
                "{} filters of rank {} do not match {} spatial axes",
                self.kind,
                rank,
                spatial_rank
            );
        }
        let mut params = self.params.with_defaults(spatial_rank);
        params.check_rank(spatial_rank)?;

        let channels = data.shape.dim(1)?;
        let expected = caps.filter_input_channels(&filter.shape)?;
        ensure!(
            channels.merge(&expected).is_some(),
            "{}: data has {} channels, filters expect {}",
            self.kind,
            channels,
            expected
        );

        let input = data.shape.tail(2, spatial_rank)?;
        let kernel = filter.shape.tail(caps.filter_prefix(), spatial_rank)?;
        let mut pads_known = true;
        match params.auto_pad {
            AutoPad::Explicit => (),
            AutoPad::Valid => {
                params.pads_begin.iter_mut().for_each(|p| *p = 0);
                params.pads_end.iter_mut().for_each(|p| *p = 0);
            }
            AutoPad::SameUpper | AutoPad::SameLower => {
                for ax in 0..spatial_rank {
                    if let (Some(i), Some(k)) = (input[ax].as_option(), kernel[ax].as_option()) {
                        let computed = infer_same_padding(
                            i,
                            k,
                            params.dilations[ax],
                            params.strides[ax],
                            params.auto_pad == AutoPad::SameUpper,
                        )?;
                        params.pads_begin[ax] = computed.pad_before as i64;
                        params.pads_end[ax] = computed.pad_after as i64;
                    } else {
                        pads_known = false;
                    }
                }
            }
        }
        let spatial = if pads_known {
            infer_conv_output_spatial_shape(
                &input,
                &kernel,
                &params.strides,
                &params.dilations,
                &params.pads_begin,
                &params.pads_end,
            )?
        } else {
            tvec!(Dim::Dyn; spatial_rank)
        };
        let mut shape: TVec<Dim> = tvec!(data.shape.dim(0)?, caps.filter_output_channels(&filter.shape)?);
        shape.extend(spatial);
        Ok(ResolvedConv {
            params,
            pads_known,
            fact: TypedFact::dt_shape(datum_type, ShapeFact::from(shape)),
        })
    }
}

impl TypedOp for Conv {
    fn name(&self) -> Cow<str> {
        self.kind.to_string().into()
    }

    fn info(&self) -> ConvPadResult<Vec<String>> {
        let p = &self.params;
        Ok(vec![
            format!("Strides: {:?}, dilations: {:?}", p.strides, p.dilations),
            format!("Padding: {} {:?} {:?}", p.auto_pad, p.pads_begin, p.pads_end),
        ])
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> ConvPadResult<TVec<TypedFact>> {
        Ok(tvec!(self.resolve(inputs)?.fact))
    }

    fn visit_attributes(&self, visitor: &mut dyn AttributeVisitor) -> ConvPadResult<()> {
        self.params.visit(visitor, false)
    }

    impl_op_same_as!();
}
