use std::fmt;

use crate::internal::*;

pub mod conv;
pub mod deconv;
pub mod padding;
mod params;

pub use self::conv::Conv;
pub use self::deconv::{Deconv, FusedDeconv};
pub use self::padding::AutoPad;
pub use self::params::{ConvParams, ResolvedConv};

/// The convolution-family node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvKind {
    Convolution,
    GroupConvolution,
    ConvolutionBackpropData,
    GroupConvolutionBackpropData,
    FusedConvBackpropData,
}

impl ConvKind {
    /// Capabilities of the kind. Whether a node actually has an output-shape
    /// input is a per-node property, refined by the node itself.
    pub fn caps(&self) -> ConvCaps {
        use ConvKind::*;
        ConvCaps {
            grouped: matches!(self, GroupConvolution | GroupConvolutionBackpropData),
            backprop: !matches!(self, Convolution | GroupConvolution),
            output_shape_input: false,
            add_input: *self == FusedConvBackpropData,
        }
    }
}

impl fmt::Display for ConvKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a convolution node is made of, driving shape inference and rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConvCaps {
    /// filters carry a leading group axis
    pub grouped: bool,
    /// transposed convolution
    pub backprop: bool,
    /// an input gives the desired output spatial shape
    pub output_shape_input: bool,
    /// an input is added to the convolution result
    pub add_input: bool,
}

impl ConvCaps {
    /// Number of non-spatial axes in the filter shape.
    pub fn filter_prefix(&self) -> usize {
        2 + self.grouped as usize
    }

    pub fn input_count(&self) -> usize {
        2 + self.output_shape_input as usize + self.add_input as usize
    }

    /// Position of the output shape input, if any.
    pub fn output_shape_index(&self) -> Option<usize> {
        self.output_shape_input.then_some(2)
    }

    /// Position of the added input, if any.
    pub fn add_index(&self) -> Option<usize> {
        self.add_input.then_some(2 + self.output_shape_input as usize)
    }

    /// Input channel count implied by a filter shape.
    pub(crate) fn filter_input_channels(&self, filter: &ShapeFact) -> ConvPadResult<Dim> {
        self.filter_channels(filter, !self.backprop)
    }

    /// Output channel count implied by a filter shape.
    pub(crate) fn filter_output_channels(&self, filter: &ShapeFact) -> ConvPadResult<Dim> {
        self.filter_channels(filter, self.backprop)
    }

    // forward filters are [O, I, ..], transposed ones [I, O, ..], both
    // optionally behind a group axis holding per-group channel counts
    fn filter_channels(&self, filter: &ShapeFact, second: bool) -> ConvPadResult<Dim> {
        let axis = self.grouped as usize + second as usize;
        let per_group = filter.dim(axis)?;
        if !self.grouped {
            return Ok(per_group);
        }
        Ok(match (filter.dim(0)?, per_group) {
            (Dim::Val(g), Dim::Val(c)) => Dim::Val(g * c),
            _ => Dim::Dyn,
        })
    }
}
