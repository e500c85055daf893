//! Partial and complete tensor types representations.
use crate::internal::*;
use convpad_data::convpad_itertools::Itertools;
use std::fmt;

/// Shape of a tensor, as known at graph compile time.
///
/// The rank itself may be unknown (`ShapeFact::unknown()`); when it is
/// known, each dimension is either an integer or dynamic.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ShapeFact {
    dims: Option<TVec<Dim>>,
}

impl ShapeFact {
    /// A shape with unknown rank.
    pub fn unknown() -> ShapeFact {
        ShapeFact { dims: None }
    }

    /// A shape of known rank where every dimension is dynamic.
    pub fn dynamic(rank: usize) -> ShapeFact {
        ShapeFact { dims: Some(tvec!(Dim::Dyn; rank)) }
    }

    pub fn from_dims<D: ToDim>(dims: impl IntoIterator<Item = D>) -> ShapeFact {
        ShapeFact { dims: Some(dims.into_iter().map(|d| d.to_dim()).collect()) }
    }

    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(|d| d.len())
    }

    pub fn dims(&self) -> Option<&[Dim]> {
        self.dims.as_deref()
    }

    /// Dimension of an axis. Dynamic when the rank is unknown.
    pub fn dim(&self, axis: usize) -> ConvPadResult<Dim> {
        match &self.dims {
            None => Ok(Dim::Dyn),
            Some(dims) => dims
                .get(axis)
                .copied()
                .with_context(|| format!("Axis {axis} out of range for shape {self:?}")),
        }
    }

    /// True when the rank and every dimension are known.
    pub fn is_static(&self) -> bool {
        self.dims.as_ref().is_some_and(|dims| dims.iter().all(|d| d.is_static()))
    }

    pub fn as_concrete(&self) -> Option<TVec<usize>> {
        self.dims.as_ref()?.iter().map(|d| d.as_option()).collect()
    }

    /// Dimensions from `axis` onward (the spatial part, with `axis == 2`).
    ///
    /// A shape of unknown rank yields `rank` dynamic dimensions when the caller
    /// knows how many to expect.
    pub fn tail(&self, axis: usize, rank: usize) -> ConvPadResult<TVec<Dim>> {
        match &self.dims {
            None => Ok(tvec!(Dim::Dyn; rank)),
            Some(dims) => {
                ensure!(
                    dims.len() == axis + rank,
                    "Expected a rank {} shape, got {:?}",
                    axis + rank,
                    self
                );
                Ok(dims[axis..].iter().copied().collect())
            }
        }
    }
}

impl<const N: usize> From<[usize; N]> for ShapeFact {
    fn from(it: [usize; N]) -> ShapeFact {
        ShapeFact::from_dims(it)
    }
}

impl From<&[usize]> for ShapeFact {
    fn from(it: &[usize]) -> ShapeFact {
        ShapeFact::from_dims(it.iter().copied())
    }
}

impl From<TVec<Dim>> for ShapeFact {
    fn from(dims: TVec<Dim>) -> ShapeFact {
        ShapeFact { dims: Some(dims) }
    }
}

impl fmt::Debug for ShapeFact {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match &self.dims {
            None => write!(fmt, ".."),
            Some(dims) => write!(fmt, "{}", dims.iter().join(",")),
        }
    }
}

/// Tensor information for TypedModel: element type, shape, and value when it
/// is a constant.
#[derive(Clone, PartialEq)]
pub struct TypedFact {
    /// tensor element type
    pub datum_type: DatumType,
    /// tensor shape
    pub shape: ShapeFact,
    /// optional constant value
    pub konst: Option<Arc<Tensor>>,
}

impl TypedFact {
    pub fn dt_shape<S: Into<ShapeFact>>(datum_type: DatumType, shape: S) -> TypedFact {
        TypedFact { datum_type, shape: shape.into(), konst: None }
    }

    pub fn dt_scalar(datum_type: DatumType) -> TypedFact {
        TypedFact::dt_shape(datum_type, [0usize; 0])
    }

    pub fn rank(&self) -> Option<usize> {
        self.shape.rank()
    }

    pub fn without_value(&self) -> TypedFact {
        TypedFact { konst: None, ..self.clone() }
    }

    /// Type and shape equality, ignoring constant values.
    pub fn same_as(&self, other: &TypedFact) -> bool {
        self.datum_type == other.datum_type && self.shape == other.shape
    }
}

impl From<Arc<Tensor>> for TypedFact {
    fn from(t: Arc<Tensor>) -> TypedFact {
        TypedFact {
            datum_type: t.datum_type(),
            shape: ShapeFact::from(t.shape()),
            konst: Some(t),
        }
    }
}

impl From<Tensor> for TypedFact {
    fn from(t: Tensor) -> TypedFact {
        TypedFact::from(Arc::new(t))
    }
}

impl fmt::Debug for TypedFact {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match &self.konst {
            Some(k) => write!(fmt, "{k:?}"),
            None if self.shape.rank() == Some(0) => write!(fmt, "{}", self.datum_type),
            None => write!(fmt, "{:?},{}", self.shape, self.datum_type),
        }
    }
}
