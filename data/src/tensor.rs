//! Small constant tensors carried by graph nodes.
//!
//! Rewriting only needs constants for shapes, pads, slice bounds and fill
//! values, so storage is split in three families: booleans, integers
//! (widened to i64) and floats (widened to f64). The logical element type is
//! kept aside and reported by `datum_type()`.
use crate::datum::{Datum, DatumType};
use crate::ConvPadResult;
use anyhow::{bail, ensure};
use ndarray::{ArrayD, IxDyn};
use std::fmt;
use std::sync::Arc;

pub mod litteral;

#[derive(Clone, PartialEq, Debug)]
pub enum TensorData {
    Bool(ArrayD<bool>),
    Int(ArrayD<i64>),
    Float(ArrayD<f64>),
}

#[derive(Clone, PartialEq)]
pub struct Tensor {
    dt: DatumType,
    data: TensorData,
}

impl Tensor {
    pub fn from_array<T: Datum>(array: ArrayD<T>) -> Tensor {
        Tensor { dt: T::datum_type(), data: T::into_tensor_data(array) }
    }

    /// A tensor of the given element type and shape, filled with zero.
    pub fn zero(dt: DatumType, shape: &[usize]) -> Tensor {
        let data = match dt {
            DatumType::Bool => TensorData::Bool(ArrayD::from_elem(IxDyn(shape), false)),
            dt if dt.is_float() => TensorData::Float(ArrayD::zeros(IxDyn(shape))),
            _ => TensorData::Int(ArrayD::zeros(IxDyn(shape))),
        };
        Tensor { dt, data }
    }

    pub fn zero_scalar(dt: DatumType) -> Tensor {
        Tensor::zero(dt, &[])
    }

    pub fn datum_type(&self) -> DatumType {
        self.dt
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        match &self.data {
            TensorData::Bool(a) => a.shape(),
            TensorData::Int(a) => a.shape(),
            TensorData::Float(a) => a.shape(),
        }
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer content in logical order.
    pub fn as_i64s(&self) -> ConvPadResult<Vec<i64>> {
        match &self.data {
            TensorData::Int(a) => Ok(a.iter().copied().collect()),
            _ => bail!("Expected an integer tensor, got {:?}", self),
        }
    }

    /// Integer content as unsigned values, refusing negatives.
    pub fn as_usizes(&self) -> ConvPadResult<Vec<usize>> {
        self.as_i64s()?
            .into_iter()
            .map(|v| {
                ensure!(v >= 0, "Negative value {} in {:?}", v, self);
                Ok(v as usize)
            })
            .collect()
    }

    /// The only value of a single-element tensor, as a float.
    pub fn to_scalar_f64(&self) -> ConvPadResult<f64> {
        ensure!(self.len() == 1, "Expected a scalar, got {:?}", self);
        Ok(match &self.data {
            TensorData::Bool(a) => a.iter().next().map(|&b| b as u8 as f64).unwrap_or_default(),
            TensorData::Int(a) => a.iter().next().map(|&i| i as f64).unwrap_or_default(),
            TensorData::Float(a) => a.iter().next().copied().unwrap_or_default(),
        })
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use itertools::Itertools;
        let shape = self.shape().iter().join(",");
        let content = match &self.data {
            TensorData::Bool(a) => a.iter().take(8).join(", "),
            TensorData::Int(a) => a.iter().take(8).join(", "),
            TensorData::Float(a) => a.iter().take(8).join(", "),
        };
        let ellipsis = if self.len() > 8 { ", ..." } else { "" };
        write!(f, "{},{} [{content}{ellipsis}]", shape, self.dt)
    }
}

impl<T: Datum> From<ArrayD<T>> for Tensor {
    fn from(array: ArrayD<T>) -> Tensor {
        Tensor::from_array(array)
    }
}

pub trait IntoTensor: Sized {
    fn into_tensor(self) -> Tensor;
}

pub trait IntoArcTensor: Sized {
    fn into_arc_tensor(self) -> Arc<Tensor>;
}

impl IntoTensor for Tensor {
    fn into_tensor(self) -> Tensor {
        self
    }
}

impl<T: Datum> IntoTensor for ArrayD<T> {
    fn into_tensor(self) -> Tensor {
        Tensor::from_array(self)
    }
}

impl<T: IntoTensor> IntoArcTensor for T {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        Arc::new(self.into_tensor())
    }
}

impl IntoArcTensor for Arc<Tensor> {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::litteral::*;
    use super::*;

    #[test]
    fn int_content() {
        let t = tensor1(&[0i64, 0, 1, 0]);
        assert_eq!(t.datum_type(), DatumType::I64);
        assert_eq!(t.shape(), &[4]);
        assert_eq!(t.as_i64s().unwrap(), vec![0, 0, 1, 0]);
    }

    #[test]
    fn narrow_ints_are_widened() {
        let t = tensor1(&[3i32, 4]);
        assert_eq!(t.datum_type(), DatumType::I32);
        assert_eq!(t.as_usizes().unwrap(), vec![3, 4]);
    }

    #[test]
    fn float_is_not_an_index() {
        assert!(tensor1(&[1.0f32]).as_i64s().is_err());
    }

    #[test]
    fn zero_scalar() {
        let z = Tensor::zero_scalar(DatumType::F16);
        assert_eq!(z.datum_type(), DatumType::F16);
        assert_eq!(z.rank(), 0);
        assert_eq!(z.to_scalar_f64().unwrap(), 0.0);
    }

    #[test]
    fn negative_usizes_are_refused() {
        assert!(tensor1(&[-1i64]).as_usizes().is_err());
    }
}
