//! Ops
use std::fmt;

use downcast_rs::Downcast;
use dyn_clone::DynClone;

use crate::internal::*;

#[macro_use]
pub mod macros;

pub mod array;
pub mod attributes;
pub mod cnn;
pub mod konst;
pub mod source;

/// An operator of a typed model.
pub trait TypedOp: fmt::Debug + DynClone + Send + Sync + 'static + Downcast {
    fn name(&self) -> Cow<str>;

    /// Short (one-line) strings giving hints on internal implementation or
    /// important configuration details to be displayed in dumps.
    fn info(&self) -> ConvPadResult<Vec<String>> {
        Ok(vec![])
    }

    /// Deduce output facts from input facts.
    ///
    /// Fails if the inputs do not meet the operator expectations.
    fn output_facts(&self, inputs: &[&TypedFact]) -> ConvPadResult<TVec<TypedFact>>;

    /// Expose the operator configuration.
    fn visit_attributes(&self, _visitor: &mut dyn AttributeVisitor) -> ConvPadResult<()> {
        Ok(())
    }

    /// Compare two ops.
    fn same_as(&self, _other: &dyn TypedOp) -> bool {
        false
    }
}

downcast_rs::impl_downcast!(TypedOp);
dyn_clone::clone_trait_object!(TypedOp);

impl<O: TypedOp> From<O> for Box<dyn TypedOp> {
    fn from(it: O) -> Box<dyn TypedOp> {
        Box::new(it)
    }
}

impl fmt::Display for dyn TypedOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
