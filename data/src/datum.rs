//! Tensor element types.
use crate::tensor::TensorData;
use ndarray::ArrayD;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DatumType {
    Bool,
    U8,
    I8,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl DatumType {
    pub fn is_float(&self) -> bool {
        matches!(self, DatumType::F16 | DatumType::F32 | DatumType::F64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DatumType::U8 | DatumType::I8 | DatumType::I32 | DatumType::I64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, DatumType::I8 | DatumType::I32 | DatumType::I64) || self.is_float()
    }

    pub fn size_of(&self) -> usize {
        match self {
            DatumType::Bool | DatumType::U8 | DatumType::I8 => 1,
            DatumType::F16 => 2,
            DatumType::I32 | DatumType::F32 => 4,
            DatumType::I64 | DatumType::F64 => 8,
        }
    }

    /// Common element type of two operands, if they are compatible.
    ///
    /// Convolution-family operators do not promote: both sides must agree.
    pub fn merge(self, other: DatumType) -> Option<DatumType> {
        if self == other { Some(self) } else { None }
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            DatumType::Bool => "bool",
            DatumType::U8 => "u8",
            DatumType::I8 => "i8",
            DatumType::I32 => "i32",
            DatumType::I64 => "i64",
            DatumType::F16 => "f16",
            DatumType::F32 => "f32",
            DatumType::F64 => "f64",
        };
        write!(f, "{s}")
    }
}

/// Rust scalar types that can be stored in a `Tensor`.
pub trait Datum: Clone + fmt::Debug + Send + Sync + 'static {
    fn datum_type() -> DatumType;
    fn into_tensor_data(array: ArrayD<Self>) -> TensorData;
}

macro_rules! datum_int {
    ($t:ty, $dt:ident) => {
        impl Datum for $t {
            fn datum_type() -> DatumType {
                DatumType::$dt
            }
            fn into_tensor_data(array: ArrayD<$t>) -> TensorData {
                TensorData::Int(array.mapv(|x| x as i64))
            }
        }
    };
}

macro_rules! datum_float {
    ($t:ty, $dt:ident) => {
        impl Datum for $t {
            fn datum_type() -> DatumType {
                DatumType::$dt
            }
            fn into_tensor_data(array: ArrayD<$t>) -> TensorData {
                TensorData::Float(array.mapv(|x| x as f64))
            }
        }
    };
}

datum_int!(u8, U8);
datum_int!(i8, I8);
datum_int!(i32, I32);
datum_int!(i64, I64);
datum_float!(f32, F32);
datum_float!(f64, F64);

impl Datum for bool {
    fn datum_type() -> DatumType {
        DatumType::Bool
    }
    fn into_tensor_data(array: ArrayD<bool>) -> TensorData {
        TensorData::Bool(array)
    }
}
