#![allow(clippy::unwrap_used, reason = "tests unwrap known-good fixtures")]

use kil_ir::Att;
use pretty_assertions::assert_eq;

use super::*;
use crate::kast::{KConfiguration, KModule, KRule, KTerm, Production, Sentence};
use crate::test_helpers::compile_module;
use crate::CompileContext;

fn int(name: &str) -> KTerm {
    KTerm::var(name, "Int")
}

fn f(a: KTerm, b: KTerm) -> KTerm {
    KTerm::apply("f", vec![a, b])
}

fn s(a: KTerm) -> KTerm {
    KTerm::apply("s", vec![a])
}

/// `f(X, 0) => X` and `f(X, s(Y)) => f(X *Int X, Y)`.
fn square_module() -> KModule {
    KModule::new("SQUARE")
        .production(Production::new("f", "KItem", 2))
        .production(Production::new("s", "Int", 1))
        .rule(KRule::new(KTerm::rewrite(f(int("X"), KTerm::int(0)), int("X"))))
        .rule(KRule::new(KTerm::rewrite(
            f(int("X"), s(int("Y"))),
            f(KTerm::apply("_*Int_", vec![int("X"), int("X")]), int("Y")),
        )))
        .rule(
            KRule::new(KTerm::rewrite(f(int("X"), int("Y")), KTerm::apply("big", vec![])))
                .requires(KTerm::apply("_>Int_", vec![int("X"), KTerm::int(100)])),
        )
}

fn lower_term(definition: &Definition, term: KTerm) -> Term {
    let mut ctx = CompileContext::default();
    definition.lower(&term, &mut ctx).unwrap()
}

/// Firings as a set.
fn normalized(mut firings: Vec<Firing>) -> Vec<Firing> {
    firings.sort_by_key(|firing| (firing.rule, firing.result.hash_value()));
    firings.dedup();
    firings
}

fn unmerged(definition: &Definition, subject: &Term) -> Vec<Firing> {
    let ids: Vec<usize> = definition.rules_of(RuleKind::Regular).map(|(id, _)| id).collect();
    fire_candidates(definition, &ids, subject)
}

#[test]
fn test_shared_prefix_has_one_disjunction() {
    let definition = compile_module(square_module());
    let automaton = definition.automaton().unwrap();
    assert_eq!(automaton.rules().len(), 3);
    // The first argument is shared; only the second diverges.
    assert_eq!(automaton.disjunction_count(), 1);
}

#[test]
fn test_base_case_fires_first_rule() {
    let definition = compile_module(square_module());
    let automaton = definition.automaton().unwrap();
    let subject = lower_term(&definition, f(KTerm::int(2), KTerm::int(0)));

    let firings = automaton.fire(&definition, &subject);
    assert_eq!(
        firings,
        vec![Firing {
            rule: 0,
            result: Term::int(2),
        }]
    );
}

#[test]
fn test_step_case_squares() {
    let definition = compile_module(square_module());
    let automaton = definition.automaton().unwrap();
    let subject = lower_term(&definition, f(KTerm::int(2), s(KTerm::int(3))));
    let expected = lower_term(&definition, f(KTerm::int(4), KTerm::int(3)));

    let firings = automaton.fire(&definition, &subject);
    assert_eq!(firings, vec![Firing { rule: 1, result: expected }]);
}

#[test]
fn test_conditions_filter_live_rules() {
    let definition = compile_module(square_module());
    let automaton = definition.automaton().unwrap();
    let subject = lower_term(&definition, f(KTerm::int(200), KTerm::int(0)));

    let rules: Vec<usize> = normalized(automaton.fire(&definition, &subject))
        .into_iter()
        .map(|firing| firing.rule)
        .collect();
    assert_eq!(rules, vec![0, 2]);
}

#[test]
fn test_automaton_agrees_with_single_rules() {
    let definition = compile_module(square_module());
    let automaton = definition.automaton().unwrap();
    let subjects = [
        f(KTerm::int(2), KTerm::int(0)),
        f(KTerm::int(2), s(KTerm::int(3))),
        f(KTerm::int(101), s(KTerm::int(1))),
        f(KTerm::int(7), KTerm::int(8)),
        s(KTerm::int(1)),
        KTerm::apply("big", vec![]),
    ];
    for subject in subjects {
        let subject = lower_term(&definition, subject);
        assert_eq!(
            normalized(automaton.fire(&definition, &subject)),
            normalized(unmerged(&definition, &subject)),
            "subject {subject}"
        );
    }
}

fn cell(label: &str, args: Vec<KTerm>) -> KTerm {
    KTerm::apply(label, args)
}

/// `<T> <k> K </k> </T>` with two rules rewriting the same redex.
fn cell_module() -> KModule {
    let k = |item: KTerm| cell("T", vec![cell("k", vec![item])]);
    let configuration = KConfiguration {
        body: cell(
            "T",
            vec![cell("k", vec![KTerm::var("$PGM", "K")]).with_att(Att::new().with(Att::CELL))],
        )
        .with_att(Att::new().with(Att::CELL)),
        att: Att::new(),
    };
    let step = |to: &str| {
        KRule::new(k(KTerm::seq(vec![
            KTerm::rewrite(KTerm::apply("a", vec![]), KTerm::apply(to, vec![])),
            KTerm::var("Rest", "K"),
        ])))
    };
    KModule::new("CELLS")
        .with(Sentence::Configuration(configuration))
        .production(Production::new("a", "KItem", 0))
        .production(Production::new("b", "KItem", 0))
        .production(Production::new("c", "KItem", 0))
        .production(Production::new("d", "KItem", 0))
        .rule(step("b"))
        .rule(step("c"))
}

fn configuration(items: Vec<KTerm>) -> KTerm {
    cell("T", vec![cell("k", vec![KTerm::seq(items)])])
}

#[test]
fn test_cell_rules_share_everything() {
    let definition = compile_module(cell_module());
    let automaton = definition.automaton().unwrap();
    assert_eq!(automaton.disjunction_count(), 0);

    let a = || KTerm::apply("a", vec![]);
    let d = || KTerm::apply("d", vec![]);
    let subject = lower_term(&definition, configuration(vec![a(), d()]));
    let mut results: Vec<Term> = definition
        .step(&subject)
        .into_iter()
        .map(|firing| firing.result)
        .collect();
    results.sort_by_key(Term::hash_value);

    let mut expected: Vec<Term> = ["b", "c"]
        .into_iter()
        .map(|to| lower_term(&definition, configuration(vec![KTerm::apply(to, vec![]), d()])))
        .collect();
    expected.sort_by_key(Term::hash_value);
    assert_eq!(results, expected);

    assert_eq!(
        normalized(automaton.fire(&definition, &subject)),
        normalized(unmerged(&definition, &subject))
    );
}

#[test]
fn test_no_regular_rules_no_automaton() {
    let module = KModule::new("EMPTY")
        .production(Production::new("f", "Int", 1).with_att(Att::new().with(Att::FUNCTION)))
        .rule(KRule::new(KTerm::rewrite(
            KTerm::apply("f", vec![int("X")]),
            int("X"),
        )));
    let definition = compile_module(module);
    assert!(definition.automaton().is_none());
}
