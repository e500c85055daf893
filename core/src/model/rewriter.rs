use std::any::TypeId;
use std::collections::VecDeque;
use std::fmt;

use crate::internal::*;

type GenRewriteRule<Ctx> =
    Box<dyn Fn(&Ctx, &TypedModel, &TypedNode) -> ConvPadResult<Option<TypedModelPatch>> + Send + Sync>;

/// A set of rewriting rules, each bound to an operator type.
///
/// Rules are tried on nodes in evaluation order. Whenever one produces a
/// patch, the patch is applied and the nodes it introduced or rewired are
/// queued for another look, so a single call reaches a fixpoint.
#[derive(Default)]
#[allow(clippy::type_complexity)]
pub struct Rewriter<Ctx> {
    rules: HashMap<TypeId, Vec<(Cow<'static, str>, GenRewriteRule<Ctx>)>>,
}

impl<Ctx> fmt::Debug for Rewriter<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.rule_names()).finish()
    }
}

impl<Ctx> Rewriter<Ctx> {
    pub fn with_rule_for<O: TypedOp>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        rule: impl Fn(&Ctx, &TypedModel, &TypedNode, &str, &O) -> ConvPadResult<Option<TypedModelPatch>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.rules.entry(TypeId::of::<O>()).or_default().push((
            name.into(),
            Box::new(move |c: &Ctx, m: &TypedModel, n: &TypedNode| {
                let Some(o) = n.op_as::<O>() else { return Ok(None) };
                rule(c, m, n, &n.name, o)
            }),
        ));
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> =
            self.rules.values().flat_map(|rules| rules.iter().map(|(n, _)| &**n)).collect();
        names.sort();
        names
    }

    /// Rewrite until no rule applies. Returns the number of applied patches.
    pub fn rewrite(&self, ctx: &Ctx, model: &mut TypedModel) -> ConvPadResult<usize> {
        self.rewrite_with_budget(ctx, model, None)
    }

    /// Rewrite until no rule applies or `budget` patches have been applied.
    pub fn rewrite_with_budget(
        &self,
        ctx: &Ctx,
        model: &mut TypedModel,
        budget: Option<usize>,
    ) -> ConvPadResult<usize> {
        let mut queue: VecDeque<usize> = model
            .eval_order()?
            .into_iter()
            .filter(|&n| self.rules.contains_key(&(*model.node(n).op).type_id()))
            .collect();
        let mut applied = 0;
        'queue: while let Some(n) = queue.pop_front() {
            if budget.is_some_and(|b| applied >= b) {
                break;
            }
            let Some(rules) = self.rules.get(&(*model.node(n).op).type_id()) else {
                continue;
            };
            // nodes bypassed by an earlier patch are left for compaction
            if model.node(n).outputs.iter().all(|o| o.successors.is_empty())
                && !model.output_outlets()?.iter().any(|o| o.node == n)
            {
                continue;
            }
            for (name, rule) in rules {
                let patch = (rule)(ctx, model, model.node(n)).with_context(|| {
                    format!("Evaluating rewriting rule \"{name}\" on node {}", model.node(n))
                })?;
                let Some(patch) = patch else {
                    trace!("Rule \"{name}\" declined {}", model.node(n));
                    continue;
                };
                debug!("Rule \"{name}\" rewrites {}", model.node(n));
                let node_desc = model.node(n).to_string();
                let touched = patch.apply_tracked(model).with_context(|| {
                    format!("Applying patch for rewriting rule \"{name}\" on node {node_desc}")
                })?;
                applied += 1;
                for t in touched {
                    if self.rules.contains_key(&(*model.node(t).op).type_id()) && !queue.contains(&t)
                    {
                        queue.push_back(t);
                    }
                }
                continue 'queue;
            }
        }
        if applied > 0 {
            model.compact()?;
        }
        Ok(applied)
    }
}
