//! Partial evaluation of right-hand sides and conditions.
//!
//! Function and anywhere rules are evaluated against each other until a
//! round changes nothing, renaming every changed rule apart again. The
//! remaining kinds then get one round against the final equations.

use kil_diagnostic::{Diagnostic, ErrorCode};
use kil_ir::visit::transform;
use kil_ir::Term;
use tracing::{debug, warn};

use super::fresh::rename_variables;
use super::{Pass, PassError, PassResult};
use crate::eval::{EvalContext, Evaluator};
use crate::{CompileContext, Definition, Rule, RuleKind};

const EQUATIONS: &[RuleKind] = &[RuleKind::Function, RuleKind::Anywhere];
const OTHERS: &[RuleKind] = &[
    RuleKind::Regular,
    RuleKind::Macro,
    RuleKind::Pattern,
    RuleKind::PatternFolding,
];

pub struct PartialEvaluationPass;

impl Pass for PartialEvaluationPass {
    fn name(&self) -> &'static str {
        "partial_evaluation"
    }

    fn requires(&self) -> &[&'static str] {
        &["convert_lookups"]
    }

    fn run(&self, definition: &mut Definition, ctx: &mut CompileContext) -> Result<PassResult, PassError> {
        let fuel = ctx.options.evaluation_fuel;
        let max = ctx.options.max_fixpoint_iterations;
        let mut exhausted = false;
        let mut total = 0;

        let mut converged = false;
        for round in 1..=max {
            let changed = evaluate_rules(definition, EQUATIONS, fuel, &mut exhausted);
            debug!(round, changed = changed.len(), "partial evaluation of equations");
            if changed.is_empty() {
                converged = true;
                break;
            }
            total += changed.len();
            for (id, rule) in changed {
                let rule = rename_variables(&rule, None, ctx, definition.indexing_data());
                definition.replace_rule(id, rule);
            }
        }
        if !converged {
            warn!(max, "partial evaluation did not converge");
            ctx.emit_warning(
                Diagnostic::warning(ErrorCode::W4001)
                    .with_message(format!(
                        "Partial evaluation of function rules did not reach a fixpoint after {max} rounds."
                    ))
                    .with_note("the equations are used as evaluated so far"),
            );
        }

        let changed = evaluate_rules(definition, OTHERS, fuel, &mut exhausted);
        total += changed.len();
        for (id, rule) in changed {
            definition.replace_rule(id, rule);
        }

        if exhausted {
            ctx.emit_warning(
                Diagnostic::warning(ErrorCode::W4002)
                    .with_message(format!(
                        "Evaluation fuel of {fuel} steps ran out during partial evaluation."
                    ))
                    .with_note("the affected terms are kept partially evaluated"),
            );
        }
        Ok(PassResult::from_count(total))
    }
}

/// Evaluate every rule of `kinds`; returns only the rules that changed.
fn evaluate_rules(
    definition: &Definition,
    kinds: &[RuleKind],
    fuel: usize,
    exhausted: &mut bool,
) -> Vec<(usize, Rule)> {
    let evaluator = Evaluator::new(definition);
    let mut changed = Vec::new();
    for (id, rule) in definition.rules().iter().enumerate() {
        if !kinds.contains(&rule.kind()) {
            continue;
        }
        let mut ctx = EvalContext::new(fuel);
        if let Some(rule) = evaluate_rule(&evaluator, rule, definition, &mut ctx) {
            changed.push((id, rule));
        }
        *exhausted |= ctx.is_exhausted();
    }
    changed
}

fn evaluate_rule(
    evaluator: &Evaluator<'_>,
    rule: &Rule,
    definition: &Definition,
    ctx: &mut EvalContext,
) -> Option<Rule> {
    let mut changed = false;

    let body = transform(rule.body(), &mut |term| {
        let rewrite = term.as_rewrite()?;
        let right = evaluator.evaluate(&rewrite.right, ctx);
        if right == rewrite.right {
            return Some(term.clone());
        }
        changed = true;
        Some(Term::rewrite(rewrite.left.clone(), right))
    });

    let mut conditions = |conditions: &[Term]| -> Vec<Term> {
        let mut out = Vec::with_capacity(conditions.len());
        for condition in conditions {
            let evaluated = evaluator.evaluate(condition, ctx);
            if evaluated != *condition {
                changed = true;
            }
            if evaluated != Term::bool(true) {
                out.push(evaluated);
            }
        }
        out
    };
    let requires = conditions(rule.requires());
    let ensures = conditions(rule.ensures());

    changed.then(|| {
        rule.rebuild(
            body,
            requires,
            ensures,
            rule.lookup_equations().to_vec(),
            definition.indexing_data(),
        )
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "tests unwrap known-good fixtures")]

    use kil_ir::{Att, Sort};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::kast::{KModule, KRule, KTerm, Production};
    use crate::test_helpers::lower;
    use crate::CompileOptions;

    fn function(label: &str, arity: usize) -> Production {
        Production::new(label, "Int", arity).with_att(Att::new().with(Att::FUNCTION))
    }

    fn int(name: &str) -> KTerm {
        KTerm::var(name, "Int")
    }

    fn plus(a: KTerm, b: KTerm) -> KTerm {
        KTerm::apply("_+Int_", vec![a, b])
    }

    #[test]
    fn test_function_calls_in_right_sides_evaluate() {
        // double(X) => X +Int X ; quad(X) => double(double(X)) ; a(X) => quad(1) +Int X
        let module = KModule::new("TEST")
            .production(function("double", 1))
            .production(function("quad", 1))
            .production(Production::new("a", "KItem", 1))
            .rule(KRule::new(KTerm::rewrite(
                KTerm::apply("double", vec![int("X")]),
                plus(int("X"), int("X")),
            )))
            .rule(KRule::new(KTerm::rewrite(
                KTerm::apply("quad", vec![int("X")]),
                KTerm::apply("double", vec![KTerm::apply("double", vec![int("X")])]),
            )))
            .rule(KRule::new(KTerm::rewrite(
                KTerm::apply("a", vec![int("X")]),
                KTerm::apply("a", vec![plus(KTerm::apply("quad", vec![KTerm::int(1)]), int("X"))]),
            )));
        let (mut definition, mut ctx) = lower(module, CompileOptions::default());
        let result = PartialEvaluationPass.run(&mut definition, &mut ctx).unwrap();
        assert!(result.changed);

        let regular = &definition.rules()[2];
        let x = regular.lhs().as_application().unwrap().args()[0].clone();
        let sum = Term::apply_sorted(Sort::int(), "_+Int_", vec![Term::int(4), x]);
        let expected = Term::apply("a", vec![sum]);
        assert_eq!(regular.rhs(), &expected);
        assert!(!ctx.has_errors());
        assert_eq!(ctx.take_diagnostics().len(), 0);
    }

    #[test]
    fn test_true_conditions_are_dropped() {
        let module = KModule::new("TEST")
            .production(Production::new("a", "KItem", 0))
            .production(Production::new("b", "KItem", 0))
            .rule(
                KRule::new(KTerm::rewrite(KTerm::apply("a", vec![]), KTerm::apply("b", vec![])))
                    .requires(KTerm::apply("_<=Int_", vec![KTerm::int(1), KTerm::int(2)])),
            );
        let (mut definition, mut ctx) = lower(module, CompileOptions::default());
        PartialEvaluationPass.run(&mut definition, &mut ctx).unwrap();
        assert!(definition.rules()[0].requires().is_empty());
    }

    #[test]
    fn test_non_converging_equations_warn() {
        // loop(X) => loop(X +Int 1) never stabilizes.
        let module = KModule::new("TEST")
            .production(function("loop", 1))
            .production(function("g", 0))
            .rule(KRule::new(KTerm::rewrite(
                KTerm::apply("g", vec![]),
                KTerm::apply("loop", vec![KTerm::int(0)]),
            )))
            .rule(KRule::new(KTerm::rewrite(
                KTerm::apply("loop", vec![int("X")]),
                KTerm::apply("loop", vec![plus(int("X"), KTerm::int(1))]),
            )));
        let options = CompileOptions {
            max_fixpoint_iterations: 3,
            evaluation_fuel: 5,
            ..CompileOptions::default()
        };
        let (mut definition, mut ctx) = lower(module, options);
        PartialEvaluationPass.run(&mut definition, &mut ctx).unwrap();

        let codes: Vec<ErrorCode> = ctx.take_diagnostics().iter().map(|d| d.code).collect();
        assert!(codes.contains(&ErrorCode::W4001));
        assert!(codes.contains(&ErrorCode::W4002));
    }
}
