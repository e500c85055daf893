#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used about everywhere in convpad, for node inputs and outputs, tensor
/// dimensions, or per-axis convolution parameters.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub type ConvPadResult<T> = anyhow::Result<T>;
pub type ConvPadError = anyhow::Error;

pub mod prelude {
    pub use crate::datum::{Datum, DatumType};
    pub use crate::dim::{Dim, ToDim};
    pub use crate::tensor::litteral::*;
    pub use crate::tensor::{IntoArcTensor, IntoTensor, Tensor, TensorData};
    pub use crate::tvec;
    pub use crate::TVec;
    pub use crate::{ConvPadError, ConvPadResult};
}

pub mod internal {
    pub use crate::prelude::*;
    pub use anyhow::{anyhow, bail, ensure, format_err, Context};
    pub use ndarray as convpad_ndarray;
    pub use smallvec as convpad_smallvec;
}

pub use anyhow;
pub use itertools as convpad_itertools;

mod datum;
mod dim;
mod tensor;
