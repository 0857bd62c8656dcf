#![allow(clippy::unwrap_used, reason = "tests unwrap known-good fixtures")]

use std::sync::Arc;

use kil_ir::well_known::names;
use kil_ir::{
    CellBuilder, CollectionOps, ListBuilder, MapBuilder, Multiplicity, Name, SequenceBuilder,
    SetBuilder, Sort, Term, Variable,
};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashSet;

use super::*;
use crate::unify;

fn var(name: &str, sort: Sort) -> Variable {
    Variable::new(name, sort)
}

fn a(label: &str) -> Term {
    Term::apply(label, vec![])
}

fn concrete_map(entries: &[(&str, i128)]) -> Term {
    let mut builder = MapBuilder::new(CollectionOps::map());
    for (key, value) in entries {
        builder.put(Term::string(key), Term::int(*value));
    }
    builder.build()
}

fn concrete_set(elements: &[i128]) -> Term {
    let mut builder = SetBuilder::new(CollectionOps::set());
    for e in elements {
        builder.add(Term::int(*e));
    }
    builder.build()
}

#[test]
fn test_unify_binds_both_sides() {
    let x = var("X", Sort::int());
    let y = var("Y", Sort::int());
    let formula = unify(
        &Term::apply("f", vec![Term::variable(x), Term::int(2)]),
        &Term::apply("f", vec![Term::int(1), Term::variable(y)]),
    );
    assert!(formula.is_substitution());
    assert_eq!(formula.substitution().get(&x), Some(&Term::int(1)));
    assert_eq!(formula.substitution().get(&y), Some(&Term::int(2)));
}

#[test]
fn test_label_clash_is_false() {
    assert!(unify(&a("f"), &a("g")).is_false());
    assert!(unify(&Term::int(1), &Term::int(2)).is_false());
}

#[test]
fn test_occurs_check() {
    let x = var("X", Sort::kitem());
    let formula = unify(
        &Term::variable(x),
        &Term::apply("s", vec![Term::variable(x)]),
    );
    assert!(formula.is_false());
}

#[test]
fn test_sort_mismatch_is_false() {
    let x = var("X", Sort::int());
    assert!(unify(&Term::variable(x), &Term::string("s")).is_false());
}

#[test]
fn test_sequence_frames() {
    let rest = var("Rest", Sort::k());
    let mut pattern = SequenceBuilder::new();
    pattern.add(&a("a"));
    pattern.add(&Term::variable(rest));
    let pattern = pattern.build();

    let mut subject = SequenceBuilder::new();
    subject.concatenate(&[a("a"), a("b")]);
    let formula = unify(&pattern, &subject.build());
    assert!(formula.is_substitution());
    assert_eq!(formula.substitution().get(&rest), Some(&a("b")));

    let closed = unify(&pattern, &Term::dot_k());
    assert!(closed.is_false());
}

#[test]
fn test_kitem_variable_against_open_sequence() {
    let x = var("X", Sort::kitem());
    let rest = var("Rest", Sort::k());
    let mut seq = SequenceBuilder::new();
    seq.add(&a("a"));
    seq.add(&Term::variable(rest));
    let formula = unify(&Term::variable(x), &seq.build());
    assert!(!formula.is_false());
    assert_eq!(formula.substitution().get(&x), Some(&a("a")));
    assert_eq!(formula.substitution().get(&rest), Some(&Term::dot_k()));
}

#[test]
fn test_map_decomposition_on_concrete_keys() {
    let v = var("V", Sort::int());
    let m = var("M", Sort::new("Map"));
    let mut pattern = MapBuilder::new(CollectionOps::map());
    pattern.put(Term::string("x"), Term::variable(v));
    pattern.concatenate(&Term::variable(m));

    let formula = unify(&pattern.build(), &concrete_map(&[("x", 1), ("y", 2)]));
    assert!(formula.is_substitution());
    assert_eq!(formula.substitution().get(&v), Some(&Term::int(1)));
    assert_eq!(
        formula.substitution().get(&m),
        Some(&concrete_map(&[("y", 2)]))
    );
}

#[test]
fn test_list_against_concrete() {
    let x = var("X", Sort::int());
    let l = var("L", Sort::new("List"));
    let mut pattern = ListBuilder::new(CollectionOps::list());
    pattern.add_item(Term::variable(x));
    pattern.concatenate(&Term::variable(l));

    let mut subject = ListBuilder::new(CollectionOps::list());
    subject.add_item(Term::int(7));
    let formula = unify(&pattern.build(), &subject.build());
    assert_eq!(formula.substitution().get(&x), Some(&Term::int(7)));
    assert!(formula.is_substitution());
}

#[test]
fn test_cells_bind_frame_to_missing_cells() {
    let frame = var("Rest", Sort::bag());
    let k = Name::intern("k");
    let state = Name::intern("state");

    let mut pattern = CellBuilder::new();
    pattern.put(k, Multiplicity::One, Term::variable(var("K", Sort::k())));
    pattern.concatenate(&Term::variable(frame));

    let mut subject = CellBuilder::new();
    subject.put(k, Multiplicity::One, a("run"));
    subject.put(state, Multiplicity::One, Term::int(0));

    let formula = unify(&pattern.build(), &subject.build());
    assert!(formula.is_substitution());
    let mut expected = CellBuilder::new();
    expected.put(state, Multiplicity::One, Term::int(0));
    assert_eq!(formula.substitution().get(&frame), Some(&expected.build()));
}

#[test]
fn test_function_symbols_leave_residuals() {
    let plus = Name::intern("_+Int_");
    let functions: FxHashSet<Name> = std::iter::once(plus).collect();
    let x = var("X", Sort::int());
    let mut formula = ConjunctiveFormula::new().with_functions(Arc::new(functions));
    formula.add(
        Term::apply_sorted(Sort::int(), plus, vec![Term::variable(x), Term::int(1)]),
        Term::int(3),
    );
    assert!(!formula.is_false());
    assert_eq!(formula.equalities().len(), 1);
}

#[test]
fn test_map_lookup_defers_until_key_known() {
    let key = var("K", Sort::string());
    let value = var("V", Sort::int());
    let lookup = Term::apply_sorted(
        Sort::int(),
        names().labels.map_lookup,
        vec![concrete_map(&[("x", 1)]), Term::variable(key)],
    );

    let mut formula = ConjunctiveFormula::new();
    formula.add(lookup, Term::variable(value));
    assert_eq!(formula.deferred().len(), 1);

    formula.add(Term::variable(key), Term::string("x"));
    formula.simplify();
    assert!(formula.is_substitution());
    assert_eq!(formula.substitution().get(&value), Some(&Term::int(1)));
}

#[test]
fn test_absent_key_in_concrete_map_is_false() {
    let lookup = Term::apply_sorted(
        Sort::int(),
        names().labels.map_lookup,
        vec![concrete_map(&[("x", 1)]), Term::string("y")],
    );
    let mut formula = ConjunctiveFormula::new();
    formula.add(lookup, Term::variable(var("V", Sort::int())));
    assert!(formula.is_false());
}

#[test]
fn test_set_membership_resolves_to_bool() {
    let member = Term::apply_sorted(
        Sort::bool(),
        names().labels.set_in,
        vec![Term::int(2), concrete_set(&[1, 2])],
    );
    let mut formula = ConjunctiveFormula::new();
    formula.add(member, Term::bool(true));
    assert!(formula.is_true());

    let absent = Term::apply_sorted(
        Sort::bool(),
        names().labels.set_in,
        vec![Term::int(5), concrete_set(&[1, 2])],
    );
    let mut formula = ConjunctiveFormula::new();
    formula.add(absent, Term::bool(true));
    assert!(formula.is_false());
}

#[test]
fn test_list_get_supports_negative_index() {
    let mut list = ListBuilder::new(CollectionOps::list());
    for i in 10..13 {
        list.add_item(Term::int(i));
    }
    let get = Term::apply_sorted(
        Sort::kitem(),
        names().labels.list_get,
        vec![list.build(), Term::int(-1)],
    );
    let v = var("V", Sort::kitem());
    let mut formula = ConjunctiveFormula::new();
    formula.add(get, Term::variable(v));
    assert_eq!(formula.substitution().get(&v), Some(&Term::int(12)));
}

#[test]
fn test_choices_enumerate_lazily() {
    let e = var("E", Sort::int());
    let f = var("F", Sort::int());
    let choice = |set: Term, target: Variable| Deferred::SetChoice {
        set,
        element: Term::variable(target),
    };

    let mut formula = ConjunctiveFormula::new();
    formula.add_deferred(choice(concrete_set(&[1, 2, 3]), e));
    formula.add_deferred(choice(concrete_set(&[4, 5]), f));
    assert_eq!(formula.deferred().len(), 2);

    let mut choices = formula.choices();
    let first = choices.next().unwrap();
    assert!(first.is_substitution());
    assert_eq!(choices.count(), 5);
}

#[test]
fn test_choices_skip_false_combinations() {
    let e = var("E", Sort::int());
    let mut formula = ConjunctiveFormula::new();
    formula.add_deferred(Deferred::SetChoice {
        set: concrete_set(&[1, 2]),
        element: Term::variable(e),
    });
    formula.add(
        Term::apply("pick", vec![Term::variable(e)]),
        Term::apply("pick", vec![Term::int(2)]),
    );
    let all: Vec<_> = formula.choices().collect();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_substitution());
    assert_eq!(all[0].substitution().get(&e), Some(&Term::int(2)));
}

#[test]
fn test_choice_on_empty_concrete_set_is_false() {
    let mut formula = ConjunctiveFormula::new();
    formula.add_deferred(Deferred::SetChoice {
        set: concrete_set(&[]),
        element: Term::variable(var("E", Sort::int())),
    });
    assert!(formula.is_false());
    assert_eq!(formula.choices().count(), 0);
}

#[test]
fn test_add_is_monotone() {
    let x = var("X", Sort::int());
    let mut formula = ConjunctiveFormula::new();
    formula.add(Term::variable(x), Term::int(1));
    formula.add(Term::variable(x), Term::int(2));
    assert!(formula.is_false());
    formula.add(Term::int(1), Term::int(1));
    assert!(formula.is_false());
}
