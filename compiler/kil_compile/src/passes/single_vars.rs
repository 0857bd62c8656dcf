//! Singleton `K` variables.
//!
//! A `K`-sorted variable of an ordinary rule that occurs exactly once, on
//! the left-hand side, constrains nothing; it becomes the don't-care
//! variable, which the matcher never binds and the automaton shares.

use kil_ir::visit::{substitute, variable_occurrences};
use kil_ir::{Sort, Term, Variable};
use rustc_hash::FxHashMap;

use super::{Pass, PassError, PassResult};
use crate::{CompileContext, Definition, Rule, RuleKind};

pub struct MarkSingleVariablesPass;

impl Pass for MarkSingleVariablesPass {
    fn name(&self) -> &'static str {
        "mark_single_variables"
    }

    fn run(&self, definition: &mut Definition, _ctx: &mut CompileContext) -> Result<PassResult, PassError> {
        let mut marked = Vec::new();
        for (id, rule) in definition.rules_of(RuleKind::Regular) {
            let singles = single_variables(rule);
            if singles.is_empty() {
                continue;
            }
            let dont_care = Term::variable(Variable::dont_care(Sort::k()));
            let rule = rule.map_terms(
                &mut |term| {
                    substitute(term, &|var| singles.contains(var).then(|| dont_care.clone()))
                },
                definition.indexing_data(),
            );
            marked.push((id, rule));
        }

        let count = marked.len();
        for (id, rule) in marked {
            definition.replace_rule(id, rule);
        }
        Ok(PassResult::from_count(count))
    }
}

/// `K` variables occurring once in `rule`, on its left-hand side.
fn single_variables(rule: &Rule) -> Vec<Variable> {
    let mut counts: FxHashMap<Variable, usize> = FxHashMap::default();
    for var in rule.variable_occurrences() {
        *counts.entry(var).or_default() += 1;
    }
    let lhs = variable_occurrences(rule.lhs());
    lhs.into_iter()
        .filter(|var| var.sort() == Sort::k() && !var.is_dont_care() && counts.get(var) == Some(&1))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "tests unwrap known-good fixtures")]

    use kil_ir::Att;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::kast::{KModule, KRule, KTerm, Production};
    use crate::test_helpers::lower;
    use crate::CompileOptions;

    fn k(name: &str) -> KTerm {
        KTerm::var(name, "K")
    }

    fn occurrences(rule: &Rule) -> Vec<Variable> {
        rule.variable_occurrences()
    }

    #[test]
    fn test_singletons_become_dont_care() {
        // a(X) ~> R => b ~> R
        let module = KModule::new("TEST")
            .production(Production::new("a", "KItem", 1))
            .production(Production::new("b", "KItem", 0))
            .rule(KRule::new(KTerm::rewrite(
                KTerm::seq(vec![KTerm::apply("a", vec![k("X")]), k("R")]),
                KTerm::seq(vec![KTerm::apply("b", vec![]), k("R")]),
            )));
        let (mut definition, mut ctx) = lower(module, CompileOptions::default());
        let result = MarkSingleVariablesPass.run(&mut definition, &mut ctx).unwrap();
        assert!(result.changed);

        let vars = occurrences(&definition.rules()[0]);
        let dont_cares = vars.iter().filter(|v| v.is_dont_care()).count();
        assert_eq!(dont_cares, 1);
        let frames = vars.iter().filter(|v| v.name().as_str() == "R").count();
        assert_eq!(frames, 2);
    }

    #[test]
    fn test_other_sorts_and_conditions_keep_variables() {
        let module = KModule::new("TEST")
            .production(Production::new("a", "KItem", 2))
            .production(Production::new("b", "KItem", 0))
            .rule(
                KRule::new(KTerm::rewrite(
                    KTerm::apply("a", vec![KTerm::var("N", "Int"), k("C")]),
                    KTerm::apply("b", vec![]),
                ))
                .requires(KTerm::apply("isKResult", vec![k("C")])),
            );
        let (mut definition, mut ctx) = lower(module, CompileOptions::default());
        let result = MarkSingleVariablesPass.run(&mut definition, &mut ctx).unwrap();
        assert!(!result.changed);
    }

    #[test]
    fn test_equations_are_left_alone() {
        let module = KModule::new("TEST")
            .production(Production::new("f", "KItem", 1).with_att(Att::new().with(Att::FUNCTION)))
            .production(Production::new("b", "KItem", 0))
            .rule(KRule::new(KTerm::rewrite(
                KTerm::apply("f", vec![k("X")]),
                KTerm::apply("b", vec![]),
            )));
        let (mut definition, mut ctx) = lower(module, CompileOptions::default());
        let result = MarkSingleVariablesPass.run(&mut definition, &mut ctx).unwrap();
        assert!(!result.changed);
        assert!(occurrences(&definition.rules()[0]).iter().all(|v| !v.is_dont_care()));
    }
}
