#![allow(clippy::unwrap_used, reason = "tests unwrap known-good fixtures")]

use kil_ir::{Att, Sort, Variable};
use pretty_assertions::assert_eq;

use super::*;
use crate::kast::{KModule, KRule, KTerm, Production};
use crate::test_helpers::lower;
use crate::CompileOptions;

fn int(name: &str) -> KTerm {
    KTerm::var(name, "Int")
}

fn macro_rule(body: KTerm) -> KRule {
    KRule::new(body).with_att(Att::new().with(Att::MACRO))
}

/// `twice(X) => X +Int X` as a macro, used by `a(X) => a(twice(X))`.
fn twice_module() -> KModule {
    KModule::new("TWICE")
        .production(Production::new("twice", "Int", 1))
        .production(Production::new("a", "KItem", 1))
        .rule(macro_rule(KTerm::rewrite(
            KTerm::apply("twice", vec![int("X")]),
            KTerm::apply("_+Int_", vec![int("X"), int("X")]),
        )))
        .rule(KRule::new(KTerm::rewrite(
            KTerm::apply("a", vec![int("X")]),
            KTerm::apply("a", vec![KTerm::apply("twice", vec![int("X")])]),
        )))
}

#[test]
fn test_macros_expand_in_rules() {
    let (mut definition, mut ctx) = lower(twice_module(), CompileOptions::default());
    let result = ExpandMacrosPass.run(&mut definition, &mut ctx).unwrap();
    assert!(result.changed);

    let (_, rule) = definition.rules_of(RuleKind::Regular).next().unwrap();
    let x = Term::variable(Variable::new("X", Sort::int()));
    let sum = Term::apply_sorted(Sort::int(), "_+Int_", vec![x.clone(), x]);
    assert_eq!(rule.rhs(), &Term::apply("a", vec![sum]));
    // The macro rule itself stays in the definition.
    assert_eq!(definition.count_of(RuleKind::Macro), 1);
    assert!(!ctx.has_errors());
}

#[test]
fn test_expansion_is_idempotent() {
    let (definition, mut ctx) = lower(twice_module(), CompileOptions::default());
    let expander = MacroExpander::for_definition(&definition, 1024);

    let nested = KTerm::apply(
        "a",
        vec![KTerm::apply("twice", vec![KTerm::apply("twice", vec![KTerm::int(3)])])],
    );
    let term = definition.lower(&nested, &mut ctx).unwrap();
    let once = expander.expand(&term).unwrap();
    assert_ne!(once, term);
    assert_eq!(expander.expand(&once).unwrap(), once);
}

#[test]
fn test_conditional_macros_need_true_conditions() {
    // m(B) => b requires B
    let module = KModule::new("COND")
        .production(Production::new("m", "KItem", 1))
        .production(Production::new("b", "KItem", 0))
        .rule(
            macro_rule(KTerm::rewrite(
                KTerm::apply("m", vec![KTerm::var("B", "Bool")]),
                KTerm::apply("b", vec![]),
            ))
            .requires(KTerm::var("B", "Bool")),
        );
    let (definition, mut ctx) = lower(module, CompileOptions::default());
    let expander = MacroExpander::for_definition(&definition, 1024);

    let enabled = definition
        .lower(&KTerm::apply("m", vec![KTerm::bool(true)]), &mut ctx)
        .unwrap();
    assert_eq!(expander.expand(&enabled).unwrap(), Term::apply("b", vec![]));

    let disabled = definition
        .lower(&KTerm::apply("m", vec![KTerm::bool(false)]), &mut ctx)
        .unwrap();
    assert_eq!(expander.expand(&disabled).unwrap(), disabled);
}

#[test]
fn test_runaway_expansion_is_reported() {
    // loop(X) => loop(s(X)) never stops.
    let module = KModule::new("LOOP")
        .production(Production::new("loop", "KItem", 1))
        .production(Production::new("s", "KItem", 1))
        .production(Production::new("a", "KItem", 0))
        .rule(macro_rule(KTerm::rewrite(
            KTerm::apply("loop", vec![KTerm::var("X", "K")]),
            KTerm::apply("loop", vec![KTerm::apply("s", vec![KTerm::var("X", "K")])]),
        )))
        .rule(KRule::new(KTerm::rewrite(
            KTerm::apply("a", vec![]),
            KTerm::apply("loop", vec![KTerm::int(0)]),
        )));
    let options = CompileOptions {
        macro_expansion_limit: 4,
        ..CompileOptions::default()
    };
    let (mut definition, mut ctx) = lower(module, options);
    ExpandMacrosPass.run(&mut definition, &mut ctx).unwrap();

    assert!(ctx.has_errors());
    let diagnostics = ctx.take_diagnostics();
    assert_eq!(diagnostics[0].code, ErrorCode::E3001);
    assert_eq!(definition.count_of(RuleKind::Regular), 0);
}

#[test]
fn test_no_macros_no_change() {
    let module = KModule::new("PLAIN")
        .production(Production::new("a", "KItem", 0))
        .production(Production::new("b", "KItem", 0))
        .rule(KRule::new(KTerm::rewrite(
            KTerm::apply("a", vec![]),
            KTerm::apply("b", vec![]),
        )));
    let (mut definition, mut ctx) = lower(module, CompileOptions::default());
    let result = ExpandMacrosPass.run(&mut definition, &mut ctx).unwrap();
    assert!(!result.changed);
}
