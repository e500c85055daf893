use std::fmt::Debug;

use crate::internal::*;

pub mod asym_padding;

pub use self::asym_padding::{
    ConvBackpropDataAsymPadding, ConvolutionAsymPadding, GroupConvBackpropDataAsymPadding,
    GroupConvolutionAsymPadding,
};

pub fn get_transform(name: &str) -> Option<Box<dyn ModelTransform>> {
    match name {
        "conv-asym-padding" => Some(Box::<ConvolutionAsymPadding>::default()),
        "group-conv-asym-padding" => Some(Box::<GroupConvolutionAsymPadding>::default()),
        "conv-backprop-data-asym-padding" => Some(Box::<ConvBackpropDataAsymPadding>::default()),
        "group-conv-backprop-data-asym-padding" => {
            Some(Box::<GroupConvBackpropDataAsymPadding>::default())
        }
        _ => None,
    }
}

/// A whole-model rewriting step.
pub trait ModelTransform: Debug + Send + Sync {
    fn name(&self) -> Cow<str>;

    /// Rewrite the model, applying at most `budget` patches. Returns the
    /// number of applied patches.
    fn transform_with_budget(
        &self,
        model: &mut TypedModel,
        budget: Option<usize>,
    ) -> ConvPadResult<usize>;

    fn transform(&self, model: &mut TypedModel) -> ConvPadResult<usize> {
        self.transform_with_budget(model, None)
    }

    fn transform_into(&self, model: &TypedModel) -> ConvPadResult<TypedModel> {
        let mut model = model.clone();
        self.transform(&mut model)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_by_name() {
        for name in [
            "conv-asym-padding",
            "group-conv-asym-padding",
            "conv-backprop-data-asym-padding",
            "group-conv-backprop-data-asym-padding",
        ] {
            let transform = get_transform(name).unwrap();
            assert_eq!(transform.name(), name);
        }
        assert!(get_transform("f32-to-f16").is_none());
    }
}
