use crate::internal::*;
use crate::transform::{
    ConvBackpropDataAsymPadding, ConvolutionAsymPadding, GroupConvBackpropDataAsymPadding,
    GroupConvolutionAsymPadding,
};

/// An ordered list of transforms, run until none of them applies.
#[derive(Debug)]
pub struct Optimizer {
    passes: Vec<Box<dyn ModelTransform>>,
    steps: Option<usize>,
}

impl Optimizer {
    pub fn passes(passes: Vec<Box<dyn ModelTransform>>) -> Optimizer {
        Optimizer { passes, steps: None }
    }

    pub fn with_pass(mut self, pass: impl ModelTransform + 'static) -> Optimizer {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn stopping_at(self, steps: usize) -> Optimizer {
        Optimizer { steps: Some(steps), ..self }
    }

    /// Rewrite asymmetric padding away from every convolution-family node.
    pub fn asym_padding() -> Optimizer {
        Optimizer::passes(vec![
            Box::new(ConvolutionAsymPadding::default()),
            Box::new(GroupConvolutionAsymPadding::default()),
            Box::new(ConvBackpropDataAsymPadding::default()),
            Box::new(GroupConvBackpropDataAsymPadding::default()),
        ])
    }

    pub fn pass_names(&self) -> Vec<Cow<str>> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn optimize(&self, model: &mut TypedModel) -> ConvPadResult<()> {
        model.check_consistency()?;
        model.compact()?;
        self.session().optimize(model)
    }

    pub fn session(&self) -> OptimizerSession {
        OptimizerSession { optimizer: self, counter: 0 }
    }
}

#[derive(Debug)]
pub struct OptimizerSession<'o> {
    optimizer: &'o Optimizer,
    counter: usize,
}

impl<'o> OptimizerSession<'o> {
    pub fn optimize(&mut self, model: &mut TypedModel) -> ConvPadResult<()> {
        for i in 0.. {
            let old = self.counter;
            self.run_all_passes(i, model)?;
            if old == self.counter || self.exhausted() {
                return Ok(());
            }
        }
        unreachable!()
    }

    /// Number of patches applied so far.
    pub fn patches_applied(&self) -> usize {
        self.counter
    }

    fn exhausted(&self) -> bool {
        self.optimizer.steps.is_some_and(|steps| self.counter >= steps)
    }

    pub fn run_all_passes(&mut self, i: usize, model: &mut TypedModel) -> ConvPadResult<()> {
        for p in &self.optimizer.passes {
            if self.exhausted() {
                break;
            }
            let budget = self.optimizer.steps.map(|steps| steps - self.counter);
            let applied = p
                .transform_with_budget(model, budget)
                .with_context(|| format!("Round {i}, pass {}", p.name()))?;
            if applied > 0 {
                debug!("Round {i}, pass {}: applied {applied} patch(es)", p.name());
                model.check_consistency().with_context(|| format!("after pass {}", p.name()))?;
            }
            self.counter += applied;
        }
        Ok(())
    }
}
