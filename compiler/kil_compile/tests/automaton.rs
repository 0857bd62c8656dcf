//! Property tests for the rule automaton.
//!
//! Stepping through the merged automaton must produce exactly the firings of
//! trying every indexed rule on its own.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use kil_compile::kast::{KDefinition, KModule, KRule, KTerm, Production};
use kil_compile::{compile, CompileContext, CompileOptions, Definition, Firing};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn int(name: &str) -> KTerm {
    KTerm::var(name, "Int")
}

fn f(a: KTerm, b: KTerm) -> KTerm {
    KTerm::apply("f", vec![a, b])
}

fn s(a: KTerm) -> KTerm {
    KTerm::apply("s", vec![a])
}

/// Overlapping rules on `f`: constant, constructor and conditional patterns.
fn definition() -> KDefinition {
    let module = KModule::new("OVERLAP")
        .production(Production::new("f", "KItem", 2))
        .production(Production::new("s", "Int", 1))
        .production(Production::new("big", "KItem", 0))
        .production(Production::new("same", "KItem", 0))
        .rule(KRule::new(KTerm::rewrite(f(int("X"), KTerm::int(0)), int("X"))))
        .rule(KRule::new(KTerm::rewrite(
            f(int("X"), s(int("Y"))),
            f(KTerm::apply("_*Int_", vec![int("X"), int("X")]), int("Y")),
        )))
        .rule(
            KRule::new(KTerm::rewrite(f(int("X"), int("Y")), KTerm::apply("big", vec![])))
                .requires(KTerm::apply("_>Int_", vec![int("X"), KTerm::int(100)])),
        )
        .rule(KRule::new(KTerm::rewrite(
            f(int("X"), int("X")),
            KTerm::apply("same", vec![]),
        )))
        .rule(KRule::new(KTerm::rewrite(
            f(s(int("X")), int("Y")),
            f(int("X"), s(int("Y"))),
        )));
    KDefinition::new("OVERLAP", vec![module])
}

fn compiled(build_automaton: bool) -> Definition {
    let options = CompileOptions {
        build_automaton,
        ..CompileOptions::default()
    };
    compile(&definition(), options).expect("definition compiles").definition
}

fn nested(depth: usize, base: i128) -> KTerm {
    (0..depth).fold(KTerm::int(base), |term, _| s(term))
}

fn normalized(mut firings: Vec<Firing>) -> Vec<Firing> {
    firings.sort_by_key(|firing| (firing.rule, firing.result.hash_value()));
    firings.dedup();
    firings
}

#[test]
fn test_automaton_is_built() {
    let definition = compiled(true);
    let automaton = definition.automaton().unwrap();
    assert_eq!(automaton.rules().len(), 5);
    assert!(automaton.disjunction_count() >= 1);
}

proptest! {
    #[test]
    fn automaton_matches_rule_by_rule(
        left in 0i128..200,
        left_depth in 0usize..3,
        right in 0i128..4,
        right_depth in 0usize..3,
    ) {
        let merged = compiled(true);
        let plain = compiled(false);
        let subject = f(nested(left_depth, left), nested(right_depth, right));

        let mut ctx = CompileContext::default();
        let merged_subject = merged.lower(&subject, &mut ctx).unwrap();
        let plain_subject = plain.lower(&subject, &mut ctx).unwrap();
        prop_assert_eq!(&merged_subject, &plain_subject);

        prop_assert_eq!(
            normalized(merged.step(&merged_subject)),
            normalized(plain.step(&plain_subject))
        );
    }
}
