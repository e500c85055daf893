use crate::internal::*;

#[derive(Debug, Clone, new, PartialEq)]
pub struct Const(pub Arc<Tensor>);

impl TypedOp for Const {
    fn name(&self) -> Cow<str> {
        "Const".into()
    }

    fn info(&self) -> ConvPadResult<Vec<String>> {
        Ok(vec![format!("{:?}", self.0)])
    }

    fn output_facts(&self, _inputs: &[&TypedFact]) -> ConvPadResult<TVec<TypedFact>> {
        Ok(tvec!(Arc::clone(&self.0).into()))
    }

    impl_op_same_as!();
}
