//! Term evaluation: built-in hooks plus function and anywhere rules.
//!
//! Evaluation works bottom-up and is sound on symbolic terms: a function
//! rule is applied only when it matches and its conditions evaluate to
//! `true`. When an earlier rule might still apply to some instance of the
//! term, evaluation of that call stops rather than skipping to a later rule.

mod hooks;

pub use hooks::Hook;

use std::sync::Arc;

use kil_constraint::{match_all, ConjunctiveFormula};
use kil_ir::visit::{substitute, transform_bottom_up};
use kil_ir::{Name, Sort, Term};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::{Definition, LabelTable, Rule, RuleKind};

/// Variable id that renames rule variables apart from subject variables.
const APART: u32 = u32::MAX;

/// Budget and counters of one evaluation.
#[derive(Clone, Debug)]
pub struct EvalContext {
    fuel: usize,
    steps: usize,
    exhausted: bool,
    fresh: u64,
}

impl EvalContext {
    pub fn new(fuel: usize) -> Self {
        EvalContext {
            fuel,
            steps: 0,
            exhausted: false,
            fresh: 0,
        }
    }

    /// Rule applications performed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Whether some rule application was refused for lack of fuel.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn consume(&mut self) -> bool {
        if self.fuel == 0 {
            self.exhausted = true;
            return false;
        }
        self.fuel -= 1;
        self.steps += 1;
        true
    }

    /// A token of `sort` no earlier call returned.
    pub fn fresh_constant(&mut self, sort: Sort) -> Term {
        self.fresh += 1;
        if sort == Sort::int() {
            Term::int(i128::from(self.fresh))
        } else {
            Term::token(sort, &format!("{sort}!{}", self.fresh))
        }
    }
}

enum Attempt {
    Applied(Term),
    NotApplicable,
    Undecided,
}

/// Evaluates terms against a fixed rule set.
pub struct Evaluator<'d> {
    labels: &'d LabelTable,
    functions: Arc<FxHashSet<Name>>,
    function_rules: FxHashMap<Name, Vec<&'d Rule>>,
    anywhere_rules: FxHashMap<Name, Vec<&'d Rule>>,
}

impl<'d> Evaluator<'d> {
    pub fn new(definition: &'d Definition) -> Self {
        let mut function_rules: FxHashMap<Name, Vec<&'d Rule>> = FxHashMap::default();
        let mut anywhere_rules: FxHashMap<Name, Vec<&'d Rule>> = FxHashMap::default();
        for rule in definition.rules() {
            let Some(head) = rule.head_label() else {
                continue;
            };
            match rule.kind() {
                RuleKind::Function => function_rules.entry(head).or_default().push(rule),
                RuleKind::Anywhere => anywhere_rules.entry(head).or_default().push(rule),
                _ => {}
            }
        }
        Evaluator {
            labels: definition.labels(),
            functions: Arc::clone(definition.functions()),
            function_rules,
            anywhere_rules,
        }
    }

    pub fn evaluate(&self, term: &Term, ctx: &mut EvalContext) -> Term {
        transform_bottom_up(term, &mut |node| self.reduce(node, ctx))
    }

    /// Whether `condition` evaluates to `true`; `None` when undecided.
    pub fn holds(&self, condition: &Term, ctx: &mut EvalContext) -> Option<bool> {
        self.evaluate(condition, ctx)
            .as_token()
            .and_then(|token| token.as_bool())
    }

    fn hook(&self, label: Name) -> Option<Hook> {
        self.labels
            .hook(label)
            .and_then(Hook::from_hook)
            .or_else(|| Hook::from_label(label.as_str()))
    }

    /// One node whose children are already evaluated.
    fn reduce(&self, node: Term, ctx: &mut EvalContext) -> Term {
        let Some(app) = node.as_application() else {
            return node;
        };
        let Some(label) = app.constant_label() else {
            return node;
        };
        if let Some(hook) = self.hook(label) {
            if let Some(result) = hook.apply(app.args(), &self.functions) {
                trace!(%label, %result, "hook");
                return result;
            }
        }

        for rule in self.function_rules.get(&label).into_iter().flatten() {
            match self.attempt(rule, &node, ctx) {
                Attempt::Applied(result) => return self.fire(&node, result, ctx),
                Attempt::NotApplicable => {}
                Attempt::Undecided => break,
            }
        }
        for rule in self.anywhere_rules.get(&label).into_iter().flatten() {
            if let Attempt::Applied(result) = self.attempt(rule, &node, ctx) {
                return self.fire(&node, result, ctx);
            }
        }
        node
    }

    fn fire(&self, node: &Term, result: Term, ctx: &mut EvalContext) -> Term {
        if !ctx.consume() {
            return node.clone();
        }
        trace!(%node, %result, "rule");
        self.evaluate(&result, ctx)
    }

    fn attempt(&self, rule: &Rule, subject: &Term, ctx: &mut EvalContext) -> Attempt {
        let matches = match_all(rule.lhs(), subject);
        if matches.is_empty() {
            return if self.may_unify(rule.lhs(), subject) {
                Attempt::Undecided
            } else {
                Attempt::NotApplicable
            };
        }

        let mut undecided = false;
        'matches: for substitution in matches {
            let mut formula = ConjunctiveFormula::from_substitution(substitution)
                .with_functions(Arc::clone(&self.functions));
            formula.add_all(rule.lookups());
            formula.simplify();
            if formula.is_false() {
                continue;
            }
            if !formula.is_substitution() {
                undecided = true;
                continue;
            }
            for condition in rule.requires() {
                match self.holds(&formula.apply(condition), ctx) {
                    Some(true) => {}
                    Some(false) => continue 'matches,
                    None => {
                        undecided = true;
                        continue 'matches;
                    }
                }
            }
            return Attempt::Applied(formula.apply(rule.rhs()));
        }
        if undecided {
            Attempt::Undecided
        } else {
            Attempt::NotApplicable
        }
    }

    /// Whether some instance of `subject` could match `pattern`.
    ///
    /// Both share the head label, which is a function symbol, so only the
    /// arguments are unified.
    fn may_unify(&self, pattern: &Term, subject: &Term) -> bool {
        let (Some(pattern), Some(subject)) = (pattern.as_application(), subject.as_application())
        else {
            return false;
        };
        if pattern.args().len() != subject.args().len() {
            return false;
        }
        if subject
            .args()
            .iter()
            .all(|arg| arg.is_ground() && !self.calls_function(arg))
        {
            return false;
        }
        let mut formula = ConjunctiveFormula::new().with_functions(Arc::clone(&self.functions));
        for (p, s) in pattern.args().iter().zip(subject.args()) {
            formula.add(rename_apart(p), s.clone());
        }
        formula.simplify();
        !formula.is_false()
    }

    fn calls_function(&self, term: &Term) -> bool {
        let mut found = false;
        kil_ir::visit::for_each_subterm(term, &mut |t| {
            if t.constant_label().is_some_and(|l| self.functions.contains(&l)) {
                found = true;
            }
            !found
        });
        found
    }
}

fn rename_apart(pattern: &Term) -> Term {
    if pattern.is_ground() {
        return pattern.clone();
    }
    substitute(pattern, &|var| {
        (!var.is_dont_care()).then(|| Term::variable(var.with_id(APART)))
    })
}

#[cfg(test)]
mod tests;
