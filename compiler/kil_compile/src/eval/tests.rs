#![allow(clippy::unwrap_used, reason = "tests unwrap known-good fixtures")]

use kil_ir::{Att, Variable};
use pretty_assertions::assert_eq;

use super::*;
use crate::kast::{KModule, KRule, KTerm, Production};
use crate::test_helpers::lower;
use crate::CompileOptions;

fn n() -> KTerm {
    KTerm::var("N", "Int")
}

fn call(label: &str, args: Vec<KTerm>) -> KTerm {
    KTerm::apply(label, args)
}

/// `fact` by two equations plus an anywhere rule for `h`.
fn definition() -> Definition {
    let module = KModule::new("FACT")
        .production(Production::new("fact", "Int", 1).with_att(Att::new().with(Att::FUNCTION)))
        .production(Production::new("h", "Int", 1).with_att(Att::new().with(Att::ANYWHERE)))
        .production(Production::new("g", "KItem", 1))
        .rule(KRule::new(KTerm::rewrite(
            call("fact", vec![KTerm::int(0)]),
            KTerm::int(1),
        )))
        .rule(
            KRule::new(KTerm::rewrite(
                call("fact", vec![n()]),
                call(
                    "_*Int_",
                    vec![n(), call("fact", vec![call("_-Int_", vec![n(), KTerm::int(1)])])],
                ),
            ))
            .requires(call("_>Int_", vec![n(), KTerm::int(0)])),
        )
        .rule(KRule::new(KTerm::rewrite(call("h", vec![n()]), n())));
    lower(module, CompileOptions::default()).0
}

fn fact(arg: Term) -> Term {
    Term::apply_sorted(Sort::int(), "fact", vec![arg])
}

#[test]
fn test_function_rules_compute() {
    let definition = definition();
    let evaluator = Evaluator::new(&definition);
    let mut ctx = EvalContext::new(1_000);

    assert_eq!(evaluator.evaluate(&fact(Term::int(5)), &mut ctx), Term::int(120));
    assert!(ctx.steps() > 5);
    assert!(!ctx.is_exhausted());
}

#[test]
fn test_symbolic_call_stops_at_undecided_rule() {
    let definition = definition();
    let evaluator = Evaluator::new(&definition);
    let mut ctx = EvalContext::new(1_000);

    // fact(0) might still apply to fact(X), so the second rule is not tried.
    let symbolic = fact(Term::variable(Variable::new("X", Sort::int())));
    assert_eq!(evaluator.evaluate(&symbolic, &mut ctx), symbolic);
    assert_eq!(ctx.steps(), 0);
}

#[test]
fn test_fuel_bounds_work() {
    let definition = definition();
    let evaluator = Evaluator::new(&definition);
    let mut ctx = EvalContext::new(2);

    let result = evaluator.evaluate(&fact(Term::int(5)), &mut ctx);
    assert!(ctx.is_exhausted());
    assert!(result.as_token().is_none());
}

#[test]
fn test_anywhere_rules_apply_under_constructors() {
    let definition = definition();
    let evaluator = Evaluator::new(&definition);
    let mut ctx = EvalContext::new(1_000);

    let term = Term::apply(
        "g",
        vec![Term::apply_sorted(Sort::int(), "h", vec![Term::int(3)])],
    );
    assert_eq!(
        evaluator.evaluate(&term, &mut ctx),
        Term::apply("g", vec![Term::int(3)])
    );
}

#[test]
fn test_holds() {
    let definition = definition();
    let evaluator = Evaluator::new(&definition);
    let mut ctx = EvalContext::new(1_000);

    let lt = |a: Term, b: Term| Term::apply("_<Int_", vec![a, b]);
    assert_eq!(evaluator.holds(&lt(Term::int(1), Term::int(2)), &mut ctx), Some(true));
    assert_eq!(evaluator.holds(&lt(Term::int(2), Term::int(1)), &mut ctx), Some(false));
    let x = Term::variable(Variable::new("X", Sort::int()));
    assert_eq!(evaluator.holds(&lt(x, Term::int(1)), &mut ctx), None);
}

#[test]
fn test_fresh_constants_are_distinct() {
    let mut ctx = EvalContext::new(0);
    let a = ctx.fresh_constant(Sort::int());
    let b = ctx.fresh_constant(Sort::int());
    assert_ne!(a, b);
    assert!(a.as_token().unwrap().as_int().is_some());

    let id = ctx.fresh_constant(Sort::new("Id"));
    assert_eq!(id.as_token().unwrap().sort(), Sort::new("Id"));
}
