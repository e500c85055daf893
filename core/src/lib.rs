//! # convpad
//!
//! Graph-compile-time rewriting of convolution-family nodes carrying
//! asymmetric spatial padding into equivalent subgraphs that only use
//! zero padding, plus explicit `Pad` (forward convolutions) or
//! `StridedSlice` (transposed convolutions) nodes.
//!
//! ## Example
//!
//! ```
//! use convpad_core::internal::*;
//! use convpad_core::ops::cnn::{AutoPad, Conv, ConvKind, ConvParams};
//!
//! let mut model = TypedModel::default();
//! let x = model.add_source("x", TypedFact::dt_shape(DatumType::F32, [1usize, 3, 10, 10])).unwrap();
//! let w = model.add_const("w", Tensor::zero(DatumType::F32, &[8, 3, 3, 3])).unwrap();
//! let params = ConvParams::default()
//!     .with_pads([1, 0], [0, 1])
//!     .with_auto_pad(AutoPad::Explicit);
//! let conv = model.wire_node("conv", Conv::new(ConvKind::Convolution, params), &[x, w]).unwrap();
//! model.set_output_outlets(&conv).unwrap();
//!
//! convpad_core::optim::Optimizer::asym_padding().optimize(&mut model).unwrap();
//! assert!(model.nodes().iter().any(|n| n.op_is::<convpad_core::ops::array::Pad>()));
//! ```

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;

pub extern crate convpad_data;

#[macro_use]
pub mod ops;
pub mod model;
pub mod optim;
pub mod transform;

pub mod prelude {
    pub use crate::model::{
        InletId, Node, Outlet, OutletId, RuntimeInfo, ShapeFact, TypedFact, TypedModel,
        TypedModelPatch, TypedNode,
    };
    pub use convpad_data::prelude::*;
}

pub mod internal {
    pub use crate::impl_op_same_as;
    pub use crate::model::Rewriter;
    pub use crate::ops::attributes::{Attribute, AttributeDump, AttributeVisitor};
    pub use crate::ops::TypedOp;
    pub use crate::prelude::*;
    pub use crate::transform::ModelTransform;
    pub use convpad_data::internal::*;
    pub use std::borrow::Cow;
    pub use std::collections::HashMap;
    pub use std::sync::Arc;
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("CONVPAD_LOG").try_init();
}
