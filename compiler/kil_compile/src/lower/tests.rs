#![allow(clippy::unwrap_used, reason = "tests unwrap known-good fixtures")]

use kil_ir::{CellCollection, Location, Span};
use pretty_assertions::assert_eq;

use super::*;
use crate::kast::Production;

fn cell(label: &str, args: Vec<KTerm>) -> KTerm {
    KTerm::apply(label, args).with_att(Att::new().with(Att::CELL))
}

fn threads(args: Vec<KTerm>) -> KTerm {
    KTerm::apply("thread", args)
        .with_att(Att::new().with(Att::CELL).with_value(Att::MULTIPLICITY, "*"))
}

/// `<T> <k> $PGM </k> <thread>* .K </thread> </T>`
fn configuration() -> KConfiguration {
    KConfiguration {
        body: cell(
            "T",
            vec![
                cell("k", vec![KTerm::var("$PGM", "K")]),
                threads(vec![KTerm::apply("#EmptyK", vec![])]),
            ],
        ),
        att: Att::new(),
    }
}

fn labels() -> LabelTable {
    LabelTable::from_productions(&[
        Production::new("a", "KItem", 0),
        Production::new("b", "KItem", 0),
        Production::new("f", "Int", 1).with_att(Att::new().with(Att::FUNCTION)),
        Production::new("_List_", "List", 2)
            .with_att(Att::new().with_value(Att::HOOK, "LIST.concat")),
        Production::new("ListItem", "List", 1)
            .with_att(Att::new().with_value(Att::HOOK, "LIST.element")),
        Production::new(".List", "List", 0).with_att(Att::new().with_value(Att::HOOK, "LIST.unit")),
    ])
}

fn a() -> KTerm {
    KTerm::apply("a", vec![])
}

fn cells_of(term: &Term) -> &CellCollection {
    match term.kind() {
        TermKind::Cells(cells) => cells,
        _ => panic!("expected cells, got {term}"),
    }
}

#[test]
fn test_configuration_declares_cells() {
    let mut ctx = CompileContext::default();
    let cells = cell_config(&[configuration()], &mut ctx);

    assert_eq!(cells.len(), 3);
    assert_eq!(cells.multiplicity(Name::intern("k")), Multiplicity::One);
    assert_eq!(cells.multiplicity(Name::intern("thread")), Multiplicity::Any);
    assert_eq!(
        cells.get(Name::intern("k")).unwrap().parent,
        Some(Name::intern("T"))
    );
    assert!(!ctx.has_errors());
}

#[test]
fn test_rewrite_in_configuration_is_rejected() {
    let mut ctx = CompileContext::default();
    let location = Location::new("test.k", Span::new(3, 9));
    let body = cell(
        "T",
        vec![cell("k", vec![KTerm::rewrite(a(), KTerm::apply("b", vec![])).at(location)])],
    );
    let cells = cell_config(&[KConfiguration { body, att: Att::new() }], &mut ctx);

    assert!(cells.is_empty());
    let diagnostics = ctx.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::E1003);
}

#[test]
fn test_cells_become_collections() {
    let mut ctx = CompileContext::default();
    let cells = cell_config(&[configuration()], &mut ctx);
    let labels = labels();
    let lowering = Lowering::new(&labels, &cells);

    let term = KTerm::apply("T", vec![KTerm::apply("k", vec![a()]), KTerm::var("Rest", "Bag")]);
    let lowered = lowering.term(&term, &mut ctx).unwrap();

    let top = cells_of(&lowered);
    assert_eq!(top.cells().len(), 1);
    assert_eq!(top.cells()[0].label, Name::intern("T"));
    let inner = cells_of(&top.cells()[0].content);
    assert_eq!(inner.cells().len(), 1);
    assert_eq!(inner.cells()[0].content, Term::apply("a", vec![]));
    assert_eq!(inner.frames(), &[Variable::new("Rest", Sort::bag())]);
}

#[test]
fn test_bag_rewrites_are_lifted() {
    // <T> <k> a </k> (<thread> a </thread> => .Bag) </T>
    let mut ctx = CompileContext::default();
    let cells = cell_config(&[configuration()], &mut ctx);
    let labels = labels();
    let lowering = Lowering::new(&labels, &cells);

    let term = KTerm::apply(
        "T",
        vec![
            KTerm::apply("k", vec![a()]),
            KTerm::rewrite(KTerm::apply("thread", vec![a()]), KTerm::apply(".Bag", vec![])),
        ],
    );
    let lowered = lowering.term(&term, &mut ctx).unwrap();
    let content = &cells_of(&lowered).cells()[0].content;
    let rewrite = content.as_rewrite().unwrap();

    assert_eq!(cells_of(&rewrite.left).cells().len(), 2);
    let right = cells_of(&rewrite.right);
    assert_eq!(right.cells().len(), 1);
    assert_eq!(right.cells()[0].label, Name::intern("k"));
}

#[test]
fn test_non_cells_among_cells_are_rejected() {
    let mut ctx = CompileContext::default();
    let cells = cell_config(&[configuration()], &mut ctx);
    let labels = labels();
    let lowering = Lowering::new(&labels, &cells);

    let term = KTerm::apply("T", vec![KTerm::apply("k", vec![a()]), a()]);
    assert!(lowering.term(&term, &mut ctx).is_err());
    assert_eq!(ctx.take_diagnostics()[0].code, ErrorCode::E9001);
}

#[test]
fn test_sequences_hole_and_freezer() {
    let mut ctx = CompileContext::default();
    let cells = CellConfig::new();
    let labels = labels();
    let lowering = Lowering::new(&labels, &cells);

    let seq = KTerm::apply("#KSequence", vec![a(), KTerm::apply("b", vec![])]);
    let lowered = lowering.term(&seq, &mut ctx).unwrap();
    assert_eq!(lowered.as_sequence().unwrap().items().len(), 2);

    let empty = lowering.term(&KTerm::apply("#EmptyK", vec![]), &mut ctx).unwrap();
    assert!(empty.is_dot_k());

    let hole = lowering.term(&KTerm::apply("#hole", vec![]), &mut ctx).unwrap();
    assert_eq!(hole, Term::hole());

    let frozen = KTerm::apply("f", vec![KTerm::apply("#hole", vec![])]);
    let freezer = KTerm::apply("#freezer", vec![frozen, KTerm::int(1)]);
    let lowered = lowering.term(&freezer, &mut ctx).unwrap();
    let app = lowered.as_application().unwrap();
    assert_eq!(app.label().frozen_hole(), Some((Name::intern("f"), 0)));
    assert_eq!(app.args(), &[Term::int(1)]);
}

#[test]
fn test_hooked_labels_build_lists() {
    let mut ctx = CompileContext::default();
    let cells = CellConfig::new();
    let labels = labels();
    let lowering = Lowering::new(&labels, &cells);

    let item = |v| KTerm::apply("ListItem", vec![KTerm::int(v)]);
    let term = KTerm::apply(
        "_List_",
        vec![item(1), KTerm::apply("_List_", vec![item(2), KTerm::apply(".List", vec![])])],
    );
    let lowered = lowering.term(&term, &mut ctx).unwrap();
    let TermKind::List(list) = lowered.kind() else {
        panic!("expected a list, got {lowered}");
    };
    assert!(list.is_concrete());
    assert_eq!(list.left(), &[Term::int(1), Term::int(2)]);
}

#[test]
fn test_anonymous_variables_are_distinct() {
    let mut ctx = CompileContext::default();
    let cells = CellConfig::new();
    let labels = labels();
    let lowering = Lowering::new(&labels, &cells);

    let first = lowering.term(&KTerm::var("_", "K"), &mut ctx).unwrap();
    let second = lowering.term(&KTerm::var("_", "K"), &mut ctx).unwrap();
    assert_ne!(first, second);

    let named = lowering.term(&KTerm::var("X", "K"), &mut ctx).unwrap();
    assert_eq!(named.as_variable().unwrap().id(), 0);
}

#[test]
fn test_unknown_labels_default_to_kitem() {
    let mut ctx = CompileContext::default();
    let cells = CellConfig::new();
    let labels = labels();
    let lowering = Lowering::new(&labels, &cells);

    let known = lowering.term(&KTerm::apply("f", vec![KTerm::int(1)]), &mut ctx).unwrap();
    assert_eq!(known.sort(), Sort::int());
    let unknown = lowering.term(&KTerm::apply("mystery", vec![]), &mut ctx).unwrap();
    assert_eq!(unknown.sort(), Sort::kitem());
}

#[test]
fn test_rule_lowering() {
    let mut ctx = CompileContext::default();
    let cells = CellConfig::new();
    let labels = labels();
    let lowering = Lowering::new(&labels, &cells);

    let x = || KTerm::var("X", "Int");
    let location = Location::new("test.k", Span::new(10, 30));
    let lt = |v| KTerm::apply("_<Int_", vec![x(), KTerm::int(v)]);
    let rule = KRule::new(KTerm::rewrite(KTerm::apply("f", vec![x()]), x()).at(location))
        .requires(KTerm::apply("_andBool_", vec![lt(5), lt(9)]));

    let rule = lowering.rule(&rule, &IndexingData::default(), &mut ctx).unwrap();
    assert_eq!(rule.kind(), RuleKind::Function);
    assert_eq!(rule.requires().len(), 2);
    assert_eq!(rule.location(), Some(location));
    assert_eq!(rule.head_label(), Some(Name::intern("f")));
}
