use super::const_i64s;
use crate::internal::*;

/// Pads a tensor along every axis with a constant.
///
/// Inputs are the data, the per-axis begin and end pads as constant i64
/// vectors, and an optional scalar fill value of the data type (zero when
/// absent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pad;

impl TypedOp for Pad {
    fn name(&self) -> Cow<str> {
        "Pad".into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> ConvPadResult<TVec<TypedFact>> {
        ensure!(inputs.len() == 3 || inputs.len() == 4, "Pad expects 3 or 4 inputs, got {}", inputs.len());
        let data = inputs[0];
        let begin = const_i64s(inputs[1], "Pad begin")?;
        let end = const_i64s(inputs[2], "Pad end")?;
        ensure!(begin.len() == end.len(), "Pad begin and end lengths differ");
        if let Some(value) = inputs.get(3) {
            ensure!(
                value.datum_type == data.datum_type,
                "Pad value is {:?}, data is {:?}",
                value.datum_type,
                data.datum_type
            );
            ensure!(value.rank() == Some(0), "Pad value must be a scalar, got {:?}", value);
        }
        let shape = if let Some(dims) = data.shape.dims() {
            ensure!(
                dims.len() == begin.len(),
                "Pad expects {} pads for input {:?}, got {}",
                dims.len(),
                data,
                begin.len()
            );
            let dims = dims
                .iter()
                .zip(begin.iter().zip(end.iter()))
                .map(|(d, (b, e))| d.offset(b + e))
                .collect::<ConvPadResult<TVec<Dim>>>()?;
            ShapeFact::from(dims)
        } else {
            ShapeFact::dynamic(begin.len())
        };
        Ok(tvec!(TypedFact::dt_shape(data.datum_type, shape)))
    }

    impl_op_same_as!();
}
