use super::const_i64s;
use crate::internal::*;

/// Python-style slicing, one `begin:end:stride` range per leading axis.
///
/// Inputs are the data and constant i64 vectors for begin, end and
/// (optionally) strides. Axes past the end of `begin` are kept whole. When
/// bit `i` of `begin_mask` (resp. `end_mask`) is set, the begin (resp. end)
/// value for axis `i` is ignored and the range starts (resp. stops) at the
/// edge of the axis.
#[derive(Debug, Clone, new, Default, PartialEq, Eq, Hash)]
pub struct StridedSlice {
    pub begin_mask: i64,
    pub end_mask: i64,
}

impl StridedSlice {
    fn ignores_begin(&self, axis: usize) -> bool {
        axis < 64 && (self.begin_mask >> axis) & 1 == 1
    }

    fn ignores_end(&self, axis: usize) -> bool {
        axis < 64 && (self.end_mask >> axis) & 1 == 1
    }

    /// Number of elements selected on an axis of length `dim`.
    pub fn slice_len(
        &self,
        axis: usize,
        dim: usize,
        begin: i64,
        end: i64,
        stride: i64,
    ) -> ConvPadResult<usize> {
        ensure!(stride != 0, "Null stride on axis {}", axis);
        let dim = dim as i64;
        let fix = |v: i64| if v < 0 { v + dim } else { v };
        let len = if stride > 0 {
            let b = if self.ignores_begin(axis) { 0 } else { fix(begin).clamp(0, dim) };
            let e = if self.ignores_end(axis) { dim } else { fix(end).clamp(0, dim) };
            (e - b + stride - 1).div_euclid(stride)
        } else {
            let b = if self.ignores_begin(axis) { dim - 1 } else { fix(begin).clamp(-1, dim - 1) };
            let e = if self.ignores_end(axis) { -1 } else { fix(end).clamp(-1, dim - 1) };
            (b - e - stride - 1).div_euclid(-stride)
        };
        Ok(len.max(0) as usize)
    }
}

impl TypedOp for StridedSlice {
    fn name(&self) -> Cow<str> {
        "StridedSlice".into()
    }

    fn info(&self) -> ConvPadResult<Vec<String>> {
        Ok(vec![format!("begin_mask: {:#b}, end_mask: {:#b}", self.begin_mask, self.end_mask)])
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> ConvPadResult<TVec<TypedFact>> {
        ensure!(
            inputs.len() == 3 || inputs.len() == 4,
            "StridedSlice expects 3 or 4 inputs, got {}",
            inputs.len()
        );
        let data = inputs[0];
        let begin = const_i64s(inputs[1], "StridedSlice begin")?;
        let end = const_i64s(inputs[2], "StridedSlice end")?;
        let strides = if let Some(strides) = inputs.get(3) {
            const_i64s(strides, "StridedSlice strides")?
        } else {
            tvec!(1; begin.len())
        };
        ensure!(
            begin.len() == end.len() && begin.len() == strides.len(),
            "StridedSlice begin, end and strides lengths differ: {:?} {:?} {:?}",
            begin,
            end,
            strides
        );
        let Some(dims) = data.shape.dims() else {
            return Ok(tvec!(TypedFact::dt_shape(data.datum_type, ShapeFact::unknown())));
        };
        ensure!(
            begin.len() <= dims.len(),
            "StridedSlice has {} ranges for an input of rank {}",
            begin.len(),
            dims.len()
        );
        let dims = dims
            .iter()
            .enumerate()
            .map(|(axis, dim)| {
                if axis >= begin.len() {
                    return Ok(*dim);
                }
                match dim {
                    Dim::Val(d) => self
                        .slice_len(axis, *d, begin[axis], end[axis], strides[axis])
                        .map(Dim::Val),
                    Dim::Dyn => {
                        ensure!(strides[axis] != 0, "Null stride on axis {}", axis);
                        Ok(Dim::Dyn)
                    }
                }
            })
            .collect::<ConvPadResult<TVec<Dim>>>()?;
        Ok(tvec!(TypedFact::dt_shape(data.datum_type, ShapeFact::from(dims))))
    }

    fn visit_attributes(&self, visitor: &mut dyn AttributeVisitor) -> ConvPadResult<()> {
        visitor.on_attribute("begin_mask", Attribute::Int(self.begin_mask))?;
        visitor.on_attribute("end_mask", Attribute::Int(self.end_mask))
    }

    impl_op_same_as!();
}
