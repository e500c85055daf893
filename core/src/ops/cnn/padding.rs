use std::fmt;
use std::str::FromStr;

use crate::internal::*;

/// How a convolution derives its padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutoPad {
    /// Pads are taken literally.
    #[default]
    Explicit,
    /// Pads are derived so that the output is `ceil(input / stride)`, the
    /// odd unit going at the end (forward) or at the begin (backprop).
    SameUpper,
    /// Same as `SameUpper`, the odd unit going the other way.
    SameLower,
    /// No padding at all.
    Valid,
}

impl AutoPad {
    pub fn is_same(&self) -> bool {
        matches!(self, AutoPad::SameUpper | AutoPad::SameLower)
    }
}

impl fmt::Display for AutoPad {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AutoPad::Explicit => "explicit",
            AutoPad::SameUpper => "same_upper",
            AutoPad::SameLower => "same_lower",
            AutoPad::Valid => "valid",
        };
        write!(f, "{s}")
    }
}

impl FromStr for AutoPad {
    type Err = ConvPadError;
    fn from_str(s: &str) -> ConvPadResult<AutoPad> {
        Ok(match &*s.to_ascii_lowercase() {
            "explicit" | "notset" => AutoPad::Explicit,
            "same_upper" => AutoPad::SameUpper,
            "same_lower" => AutoPad::SameLower,
            "valid" => AutoPad::Valid,
            _ => bail!("Unknown auto pad mode {}", s),
        })
    }
}

#[derive(Debug, Clone, new, PartialEq, Eq)]
pub struct ComputedPaddedDim {
    pub input: usize,
    pub output: usize,
    pub pad_before: usize,
    pub pad_after: usize,
}

/// Prepend zero pads for the batch and channel axes.
pub fn extend_with_batch_and_channel_zero_padding(pad: &[i64]) -> TVec<i64> {
    let mut extended: TVec<i64> = tvec!(0, 0);
    extended.extend(pad.iter().copied());
    extended
}

pub fn default_strides(spatial_rank: usize) -> TVec<usize> {
    tvec!(1; spatial_rank)
}

pub fn default_padding(spatial_rank: usize) -> TVec<i64> {
    tvec!(0; spatial_rank)
}

fn check_lengths(spatial_rank: usize, lengths: &[(&str, usize)]) -> ConvPadResult<()> {
    for (what, len) in lengths {
        ensure!(
            *len == spatial_rank,
            "{} should be defined for all and only spatial axes: expected {} values, got {}",
            what,
            spatial_rank,
            len
        );
    }
    Ok(())
}

/// Spatial output shape of a transposed convolution.
///
/// `output = stride * (input - 1) + dilation * (filter - 1) + 1 - pads_begin - pads_end + output_padding`
/// when both input and filter extents are known, dynamic otherwise.
#[allow(clippy::too_many_arguments)]
pub fn infer_transposed_conv_output_spatial_shape(
    input: &[Dim],
    filter: &[Dim],
    strides: &[usize],
    dilations: &[usize],
    pads_begin: &[i64],
    pads_end: &[i64],
    output_padding: &[i64],
) -> ConvPadResult<TVec<Dim>> {
    check_lengths(
        input.len(),
        &[
            ("Filter shape", filter.len()),
            ("Strides", strides.len()),
            ("Dilations", dilations.len()),
            ("Pads begin", pads_begin.len()),
            ("Pads end", pads_end.len()),
            ("Output padding", output_padding.len()),
        ],
    )?;
    (0..input.len())
        .map(|ax| match (input[ax].as_option(), filter[ax].as_option()) {
            (Some(i), Some(f)) => {
                let out = strides[ax] as i64 * (i as i64 - 1)
                    + dilations[ax] as i64 * (f as i64 - 1)
                    + 1
                    - pads_begin[ax]
                    - pads_end[ax]
                    + output_padding[ax];
                Dim::from_i64(out).with_context(|| {
                    format!("Transposed convolution output on spatial axis {ax}")
                })
            }
            _ => Ok(Dim::Dyn),
        })
        .collect()
}

/// Spatial output shape of a forward convolution with explicit pads.
pub fn infer_conv_output_spatial_shape(
    input: &[Dim],
    filter: &[Dim],
    strides: &[usize],
    dilations: &[usize],
    pads_begin: &[i64],
    pads_end: &[i64],
) -> ConvPadResult<TVec<Dim>> {
    check_lengths(
        input.len(),
        &[
            ("Filter shape", filter.len()),
            ("Strides", strides.len()),
            ("Dilations", dilations.len()),
            ("Pads begin", pads_begin.len()),
            ("Pads end", pads_end.len()),
        ],
    )?;
    (0..input.len())
        .map(|ax| {
            ensure!(strides[ax] > 0, "Null stride on spatial axis {}", ax);
            ensure!(dilations[ax] > 0, "Null dilation on spatial axis {}", ax);
            let (Some(i), Some(f)) = (input[ax].as_option(), filter[ax].as_option()) else {
                return Ok(Dim::Dyn);
            };
            ensure!(f > 0, "Empty filter on spatial axis {}", ax);
            let field = ((f - 1) * dilations[ax] + 1) as i64;
            let padded = i as i64 + pads_begin[ax] + pads_end[ax];
            ensure!(
                padded >= field,
                "Filter field of {} does not fit in padded input of {} on spatial axis {}",
                field,
                padded,
                ax
            );
            Ok(Dim::Val(((padded - field) / strides[ax] as i64 + 1) as usize))
        })
        .collect()
}

/// SAME padding for one axis of a forward convolution.
pub fn infer_same_padding(
    input: usize,
    kernel: usize,
    dilation: usize,
    stride: usize,
    upper: bool,
) -> ConvPadResult<ComputedPaddedDim> {
    ensure!(stride > 0 && dilation > 0 && kernel > 0, "Invalid SAME geometry");
    let output = input.div_ceil(stride);
    let kernel_field = (kernel - 1) * dilation + 1;
    let pad = ((output.max(1) - 1) * stride + kernel_field).saturating_sub(input);
    let lower_pad = pad / 2;
    let higher_pad = pad - lower_pad;
    let (before, after) = if upper { (lower_pad, higher_pad) } else { (higher_pad, lower_pad) };
    Ok(ComputedPaddedDim::new(input, output, before, after))
}

/// Pads of a transposed convolution in SAME mode, derived from the
/// requested spatial output shape.
#[allow(clippy::too_many_arguments)]
pub fn infer_conv_backprop_auto_padding(
    input: &[usize],
    filter: &[usize],
    output: &[usize],
    strides: &[usize],
    dilations: &[usize],
    auto_pad: AutoPad,
    output_padding: &[i64],
) -> ConvPadResult<(TVec<i64>, TVec<i64>)> {
    check_lengths(
        input.len(),
        &[
            ("Filter shape", filter.len()),
            ("Output shape", output.len()),
            ("Strides", strides.len()),
            ("Dilations", dilations.len()),
            ("Output padding", output_padding.len()),
        ],
    )?;
    let mut pads_begin = tvec!();
    let mut pads_end = tvec!();
    for ax in 0..input.len() {
        let total = (strides[ax] as i64 * (input[ax] as i64 - 1)
            + dilations[ax] as i64 * (filter[ax] as i64 - 1)
            + 1
            - output[ax] as i64
            + output_padding[ax])
            .max(0);
        let (begin, end) = if auto_pad == AutoPad::SameUpper {
            (total - total / 2, total / 2)
        } else {
            (total / 2, total - total / 2)
        };
        pads_begin.push(begin);
        pads_end.push(end);
    }
    Ok((pads_begin, pads_end))
}
