use super::padding::{default_padding, default_strides, AutoPad};
use crate::internal::*;

/// Geometry attributes shared by every convolution-family node.
///
/// Empty sequences stand for "unspecified" and are filled by
/// [`ConvParams::with_defaults`] once the spatial rank is known: ones for
/// strides and dilations, zeros for pads and output padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConvParams {
    pub strides: TVec<usize>,
    pub dilations: TVec<usize>,
    pub pads_begin: TVec<i64>,
    pub pads_end: TVec<i64>,
    pub auto_pad: AutoPad,
    pub output_padding: TVec<i64>,
}

impl ConvParams {
    pub fn with_strides(self, strides: impl IntoIterator<Item = usize>) -> ConvParams {
        ConvParams { strides: strides.into_iter().collect(), ..self }
    }

    pub fn with_dilations(self, dilations: impl IntoIterator<Item = usize>) -> ConvParams {
        ConvParams { dilations: dilations.into_iter().collect(), ..self }
    }

    pub fn with_pads(
        self,
        pads_begin: impl IntoIterator<Item = i64>,
        pads_end: impl IntoIterator<Item = i64>,
    ) -> ConvParams {
        ConvParams {
            pads_begin: pads_begin.into_iter().collect(),
            pads_end: pads_end.into_iter().collect(),
            ..self
        }
    }

    pub fn with_auto_pad(self, auto_pad: AutoPad) -> ConvParams {
        ConvParams { auto_pad, ..self }
    }

    pub fn with_output_padding(self, output_padding: impl IntoIterator<Item = i64>) -> ConvParams {
        ConvParams { output_padding: output_padding.into_iter().collect(), ..self }
    }

    /// Same geometry, zero explicit padding.
    pub fn unpadded(&self) -> ConvParams {
        let rank = self.pads_begin.len().max(self.pads_end.len());
        ConvParams {
            pads_begin: default_padding(rank),
            pads_end: default_padding(rank),
            auto_pad: AutoPad::Explicit,
            ..self.clone()
        }
    }

    /// Spatial rank implied by the attributes alone, if any is set.
    pub fn spatial_rank(&self) -> Option<usize> {
        [
            self.strides.len(),
            self.dilations.len(),
            self.pads_begin.len(),
            self.pads_end.len(),
            self.output_padding.len(),
        ]
        .into_iter()
        .find(|l| *l > 0)
    }

    pub fn with_defaults(&self, spatial_rank: usize) -> ConvParams {
        let mut it = self.clone();
        if it.strides.is_empty() {
            it.strides = default_strides(spatial_rank);
        }
        if it.dilations.is_empty() {
            it.dilations = default_strides(spatial_rank);
        }
        if it.pads_begin.is_empty() {
            it.pads_begin = default_padding(spatial_rank);
        }
        if it.pads_end.is_empty() {
            it.pads_end = default_padding(spatial_rank);
        }
        if it.output_padding.is_empty() {
            it.output_padding = default_padding(spatial_rank);
        }
        it
    }

    pub fn check_rank(&self, spatial_rank: usize) -> ConvPadResult<()> {
        for (what, len) in [
            ("Strides", self.strides.len()),
            ("Dilations", self.dilations.len()),
            ("Pads begin", self.pads_begin.len()),
            ("Pads end", self.pads_end.len()),
            ("Output padding", self.output_padding.len()),
        ] {
            ensure!(
                len == spatial_rank,
                "{} should be defined for all and only spatial features ({} expected, got {})",
                what,
                spatial_rank,
                len
            );
        }
        ensure!(self.strides.iter().all(|s| *s > 0), "Null stride in {:?}", self.strides);
        ensure!(self.dilations.iter().all(|d| *d > 0), "Null dilation in {:?}", self.dilations);
        Ok(())
    }

    /// True if begin and end pads differ on at least one axis.
    pub fn is_asymmetric(&self) -> bool {
        self.pads_begin != self.pads_end
    }

    pub fn visit(&self, visitor: &mut dyn AttributeVisitor, output_padding: bool) -> ConvPadResult<()> {
        visitor.on_attribute("strides", Attribute::Usizes(self.strides.clone()))?;
        visitor.on_attribute("dilations", Attribute::Usizes(self.dilations.clone()))?;
        visitor.on_attribute("pads_begin", Attribute::Ints(self.pads_begin.clone()))?;
        visitor.on_attribute("pads_end", Attribute::Ints(self.pads_end.clone()))?;
        visitor.on_attribute("auto_pad", Attribute::Str(self.auto_pad.to_string()))?;
        if output_padding {
            visitor.on_attribute("output_padding", Attribute::Ints(self.output_padding.clone()))?;
        }
        Ok(())
    }
}

/// Outcome of shape inference on a convolution-family node.
///
/// `params` have their defaults filled and, for SAME modes, the pads they
/// resolve to. `pads_known` is false when SAME pads depend on shapes that are
/// not known yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConv {
    pub params: ConvParams,
    pub pads_known: bool,
    pub fact: TypedFact,
}
