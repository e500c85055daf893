use super::Tensor;
use crate::datum::Datum;
use ndarray::{arr0, arr1};
use std::sync::Arc;

pub fn tensor0<A: Datum>(x: A) -> Tensor {
    Tensor::from_array(arr0(x).into_dyn())
}

pub fn tensor1<A: Datum>(xs: &[A]) -> Tensor {
    Tensor::from_array(arr1(xs).into_dyn())
}

pub fn rctensor0<A: Datum>(x: A) -> Arc<Tensor> {
    Arc::new(tensor0(x))
}

pub fn rctensor1<A: Datum>(xs: &[A]) -> Arc<Tensor> {
    Arc::new(tensor1(xs))
}
