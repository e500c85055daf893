mod pad;
mod strided_slice;

pub use self::pad::Pad;
pub use self::strided_slice::StridedSlice;

use crate::internal::*;

/// Read a constant 1-D i64 operand, with `what` naming it in errors.
pub(crate) fn const_i64s(fact: &TypedFact, what: &str) -> ConvPadResult<TVec<i64>> {
    let Some(konst) = &fact.konst else { bail!("{} must be a constant", what) };
    ensure!(konst.rank() == 1, "{} must be 1-D, got {:?}", what, konst);
    ensure!(konst.datum_type() == DatumType::I64, "{} must be i64, got {:?}", what, konst);
    Ok(konst.as_i64s()?.into_iter().collect())
}
