//! Tensor dimensions, either known at graph compile time or dynamic.
use crate::ConvPadResult;
use anyhow::{bail, ensure};
use std::fmt;

/// A single tensor dimension.
///
/// Graphs are rewritten before any input is known, so a dimension is either
/// a plain integer or `Dyn`, a placeholder for "resolved at runtime".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Dim {
    Val(usize),
    #[default]
    Dyn,
}

impl Dim {
    pub fn is_static(&self) -> bool {
        matches!(self, Dim::Val(_))
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    pub fn to_usize(&self) -> ConvPadResult<usize> {
        match self {
            Dim::Val(v) => Ok(*v),
            Dim::Dyn => bail!("Dimension is dynamic"),
        }
    }

    pub fn to_i64(&self) -> ConvPadResult<i64> {
        self.to_usize().map(|v| v as i64)
    }

    pub fn as_option(&self) -> Option<usize> {
        match self {
            Dim::Val(v) => Some(*v),
            Dim::Dyn => None,
        }
    }

    /// Builds a dimension from a signed extent, refusing negative values.
    pub fn from_i64(v: i64) -> ConvPadResult<Dim> {
        ensure!(v >= 0, "Negative dimension: {v}");
        Ok(Dim::Val(v as usize))
    }

    /// Adds a signed delta to a known dimension. Dynamic stays dynamic.
    pub fn offset(&self, delta: i64) -> ConvPadResult<Dim> {
        match self {
            Dim::Val(v) => Dim::from_i64(*v as i64 + delta),
            Dim::Dyn => Ok(Dim::Dyn),
        }
    }

    /// Unifies two views of the same dimension.
    pub fn merge(&self, other: &Dim) -> Option<Dim> {
        match (self, other) {
            (Dim::Dyn, d) | (d, Dim::Dyn) => Some(*d),
            (Dim::Val(a), Dim::Val(b)) if a == b => Some(Dim::Val(*a)),
            _ => None,
        }
    }
}

impl From<usize> for Dim {
    fn from(v: usize) -> Dim {
        Dim::Val(v)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dim::Val(v) => write!(f, "{v}"),
            Dim::Dyn => write!(f, "?"),
        }
    }
}

pub trait ToDim {
    fn to_dim(&self) -> Dim;
}

impl ToDim for usize {
    fn to_dim(&self) -> Dim {
        Dim::Val(*self)
    }
}

impl ToDim for Dim {
    fn to_dim(&self) -> Dim {
        *self
    }
}

impl ToDim for Option<usize> {
    fn to_dim(&self) -> Dim {
        self.map(Dim::Val).unwrap_or(Dim::Dyn)
    }
}
