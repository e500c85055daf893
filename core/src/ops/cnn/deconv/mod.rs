use super::padding::{infer_conv_backprop_auto_padding, infer_transposed_conv_output_spatial_shape, AutoPad};
use super::{ConvCaps, ConvParams, ResolvedConv};
use crate::internal::*;

#[allow(clippy::module_inception)]
mod deconv;
mod fused;

pub use deconv::Deconv;
pub use fused::FusedDeconv;

/// Spatial shape requested through the output shape input, if it is a
/// constant.
fn requested_spatial_shape(output_shape: &TypedFact) -> ConvPadResult<Option<TVec<usize>>> {
    let Some(konst) = &output_shape.konst else { return Ok(None) };
    ensure!(konst.rank() == 1, "Output shape must be a 1-D tensor, got {:?}", konst);
    ensure!(
        konst.datum_type().is_integer(),
        "Output shape must be an integer tensor, got {:?}",
        konst
    );
    Ok(Some(konst.as_usizes()?.into_iter().collect()))
}

/// The output spatial shape a transposed convolution is asked for, before
/// any shape inference takes place.
///
/// With an output shape input, it is the value of that input, or a shape of
/// unknown rank when it is not a constant. Without one, it is a dynamic shape
/// of the spatial rank.
pub fn output_shape_query(
    caps: ConvCaps,
    params: &ConvParams,
    data: &TypedFact,
    filter: &TypedFact,
    output_shape: Option<&TypedFact>,
) -> ConvPadResult<ShapeFact> {
    if let Some(output_shape) = output_shape {
        return Ok(match requested_spatial_shape(output_shape)? {
            Some(spatial) => ShapeFact::from(&*spatial),
            None => ShapeFact::unknown(),
        });
    }
    let rank = if caps.grouped {
        data.rank().map(|r| r.saturating_sub(2)).or_else(|| filter.rank().map(|r| r.saturating_sub(3)))
    } else {
        data.rank().map(|r| r.saturating_sub(2)).or_else(|| params.spatial_rank())
    };
    Ok(rank.map(ShapeFact::dynamic).unwrap_or_else(ShapeFact::unknown))
}

/// Pure shape inference shared by all transposed convolutions.
///
/// Fills the attribute defaults, derives SAME pads from a constant output
/// shape, and computes the output fact `[N, C_out, spatial..]`.
pub fn resolve_backprop(
    caps: ConvCaps,
    params: &ConvParams,
    data: &TypedFact,
    filter: &TypedFact,
    output_shape: Option<&TypedFact>,
) -> ConvPadResult<ResolvedConv> {
    let Some(datum_type) = data.datum_type.merge(filter.datum_type) else {
        bail!(
            "Element types for data batch and filters do not match (data batch element type: {}, filters element type: {})",
            data.datum_type,
            filter.datum_type
        )
    };
    let requested = output_shape.map(requested_spatial_shape).transpose()?.flatten();
    let spatial_rank = data
        .rank()
        .map(|r| r.saturating_sub(2))
        .or_else(|| filter.rank().map(|r| r.saturating_sub(caps.filter_prefix())))
        .or_else(|| params.spatial_rank())
        .or_else(|| requested.as_ref().map(|r| r.len()));
    let Some(spatial_rank) = spatial_rank else {
        return Ok(ResolvedConv {
            params: params.clone(),
            pads_known: params.auto_pad == AutoPad::Explicit,
            fact: TypedFact::dt_shape(datum_type, ShapeFact::unknown()),
        });
    };
    if let Some(rank) = data.rank() {
        ensure!(rank >= 3, "Convolution data must have batch, channel and spatial axes, got {:?}", data);
    }
    if let Some(rank) = filter.rank() {
        ensure!(
            rank == spatial_rank + caps.filter_prefix(),
            "Filters of rank {} do not match {} spatial axes",
            rank,
            spatial_rank
        );
    }
    let mut params = params.with_defaults(spatial_rank);
    params.check_rank(spatial_rank)?;

    let channels = data.shape.dim(1)?;
    let expected = caps.filter_input_channels(&filter.shape)?;
    ensure!(
        channels.merge(&expected).is_some(),
        "Data has {} channels, filters expect {}",
        channels,
        expected
    );

    let input = data.shape.tail(2, spatial_rank)?;
    let kernel = filter.shape.tail(caps.filter_prefix(), spatial_rank)?;
    let mut pads_known = true;
    let spatial: TVec<Dim> = if output_shape.is_some() {
        if let Some(requested) = &requested {
            ensure!(
                requested.len() == spatial_rank,
                "Output shape should be specified only and for all spatial dimensions, got {:?} for {} axes",
                requested,
                spatial_rank
            );
        }
        match params.auto_pad {
            AutoPad::Explicit => (),
            AutoPad::Valid => {
                params.pads_begin.iter_mut().for_each(|p| *p = 0);
                params.pads_end.iter_mut().for_each(|p| *p = 0);
            }
            AutoPad::SameUpper | AutoPad::SameLower => {
                let input = input.iter().map(|d| d.as_option()).collect::<Option<TVec<_>>>();
                let kernel = kernel.iter().map(|d| d.as_option()).collect::<Option<TVec<_>>>();
                if let (Some(input), Some(kernel), Some(requested)) = (input, kernel, &requested) {
                    let (begin, end) = infer_conv_backprop_auto_padding(
                        &input,
                        &kernel,
                        requested,
                        &params.strides,
                        &params.dilations,
                        params.auto_pad,
                        &params.output_padding,
                    )?;
                    params.pads_begin = begin;
                    params.pads_end = end;
                } else {
                    pads_known = false;
                }
            }
        }
        match &requested {
            Some(requested) => requested.iter().map(|d| d.to_dim()).collect(),
            None => tvec!(Dim::Dyn; spatial_rank),
        }
    } else {
        if params.auto_pad != AutoPad::Explicit {
            params.pads_begin.iter_mut().for_each(|p| *p = 0);
            params.pads_end.iter_mut().for_each(|p| *p = 0);
        }
        infer_transposed_conv_output_spatial_shape(
            &input,
            &kernel,
            &params.strides,
            &params.dilations,
            &params.pads_begin,
            &params.pads_end,
            &params.output_padding,
        )?
    };
    let mut shape: TVec<Dim> =
        tvec!(data.shape.dim(0)?, caps.filter_output_channels(&filter.shape)?);
    shape.extend(spatial);
    Ok(ResolvedConv {
        params,
        pads_known,
        fact: TypedFact::dt_shape(datum_type, ShapeFact::from(shape)),
    })
}
