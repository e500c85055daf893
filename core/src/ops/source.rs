use crate::internal::*;

/// A model input.
#[derive(Debug, Clone, new, PartialEq)]
pub struct TypedSource {
    pub fact: TypedFact,
}

impl TypedOp for TypedSource {
    fn name(&self) -> Cow<str> {
        "Source".into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> ConvPadResult<TVec<TypedFact>> {
        ensure!(inputs.is_empty(), "Source takes no input");
        Ok(tvec!(self.fact.clone()))
    }

    fn same_as(&self, other: &dyn TypedOp) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| self.fact.same_as(&other.fact))
    }
}
