use kil_constraint::match_all;
use kil_ir::visit::transform;
use kil_ir::{
    CellBuilder, CollectionOps, Label, ListBuilder, MapBuilder, Multiplicity, Name,
    SequenceBuilder, SetBuilder, Sort, Term, Variable,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn a(label: &str) -> Term {
    Term::apply(label, vec![])
}

fn seq(items: &[Term]) -> Term {
    let mut builder = SequenceBuilder::new();
    builder.concatenate(items);
    builder.build()
}

fn by_label(name: &str) -> Index {
    Index::ByLabel(Name::intern(name))
}

#[test]
fn test_sequence_pairs() {
    let frame = Term::variable(Variable::new("Rest", Sort::k()));

    assert_eq!(indexing_pair(&Term::dot_k()), IndexingPair::BOTTOM);
    assert_eq!(indexing_pair(&frame), IndexingPair::TOP);
    assert_eq!(
        indexing_pair(&seq(&[a("x"), frame.clone()])),
        IndexingPair::new(by_label("x"), Index::Top)
    );
    assert_eq!(
        indexing_pair(&a("x")),
        IndexingPair::new(by_label("x"), Index::Bottom)
    );
    assert_eq!(
        indexing_pair(&seq(&[a("x"), Term::int(1), a("z")])),
        IndexingPair::new(by_label("x"), Index::ByTokenSort(Sort::int()))
    );
}

#[test]
fn test_segment_item_ends_prefix() {
    let segment = Term::variable(Variable::new("S", Sort::k()));
    let term = seq(&[a("x"), segment, a("y")]);
    assert_eq!(
        indexing_pair(&term),
        IndexingPair::new(by_label("x"), Index::Top)
    );
}

#[test]
fn test_optional_and_any_cells_are_distinguished() {
    let c = Name::intern("c");
    let empty = CellBuilder::new().build();

    let mut three = CellBuilder::new();
    for i in 0..3 {
        three.put(c, Multiplicity::Any, Term::int(i));
    }
    let three = three.build();

    let empty_pair = indexing_pair(&empty);
    let three_pair = indexing_pair(&three);
    assert_eq!(empty_pair, IndexingPair::BOTTOM);
    assert_eq!(three_pair, IndexingPair::new(by_label("c"), by_label("c")));
    assert!(!empty_pair.is_unifiable(three_pair));
}

#[test]
fn test_cells_with_frame_are_open() {
    let mut cells = CellBuilder::new();
    cells.put(Name::intern("b"), Multiplicity::One, a("x"));
    cells.concatenate(&Term::variable(Variable::new("Rest", Sort::bag())));
    assert_eq!(indexing_pair(&cells.build()), IndexingPair::TOP);
}

#[test]
fn test_computation_cell_focus() {
    let k = Name::intern("k");
    let mut inner = CellBuilder::new();
    inner.put(k, Multiplicity::One, seq(&[a("run"), a("halt")]));
    inner.put(Name::intern("state"), Multiplicity::One, Term::int(0));
    let mut top = CellBuilder::new();
    top.put(Name::intern("T"), Multiplicity::One, inner.build());

    let data = IndexingData::default().with_computation_cell(k);
    assert_eq!(
        data.indexing_pair(&top.build()),
        IndexingPair::new(by_label("run"), by_label("halt"))
    );
}

#[test]
fn test_rewrite_uses_left_side() {
    let rule = Term::rewrite(seq(&[a("x"), a("y")]), Term::dot_k());
    assert_eq!(
        indexing_pair(&rule),
        IndexingPair::new(by_label("x"), by_label("y"))
    );
}

fn leaf() -> impl Strategy<Value = Term> {
    prop_oneof![
        (0i128..3).prop_map(Term::int),
        prop::sample::select(vec!["a", "b"]).prop_map(a),
        prop::sample::select(vec!["X", "Y"])
            .prop_map(|n| Term::variable(Variable::new(n, Sort::kitem()))),
        Just(Term::variable(Variable::new("N", Sort::int()))),
        Just(Term::variable(Variable::new("R", Sort::k()))),
    ]
}

fn term() -> impl Strategy<Value = Term> {
    leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            (
                prop::sample::select(vec!["f", "g"]),
                prop::collection::vec(inner.clone(), 1..3)
            )
                .prop_map(|(label, args)| Term::apply(label, args)),
            prop::collection::vec(inner, 0..4).prop_map(|items| seq(&items)),
        ]
    })
}

proptest! {
    #[test]
    fn incompatible_pairs_never_unify(left in term(), right in term()) {
        let compatible = indexing_pair(&left).is_unifiable(indexing_pair(&right));
        if !compatible {
            prop_assert!(kil_constraint::unify(&left, &right).is_false());
        }
    }
}

fn open(builder_base: bool, name: &str, sort: Sort) -> Option<Term> {
    builder_base.then(|| Term::variable(Variable::new(name, sort)))
}

fn freezer(hole_first: bool, args: Vec<Term>) -> Term {
    let frozen = if hole_first {
        Term::apply("_+_", vec![Term::hole(), Term::int(1)])
    } else {
        Term::apply("_+_", vec![Term::int(1), Term::hole()])
    };
    Term::apply(Label::Freezer(frozen), args)
}

fn cell_bag(cells: Vec<(&'static str, Term)>, frame: bool) -> Term {
    let mut builder = CellBuilder::new();
    for (label, content) in cells {
        let multiplicity = if label == "thread" {
            Multiplicity::Any
        } else {
            Multiplicity::One
        };
        builder.put(Name::intern(label), multiplicity, content);
    }
    if let Some(rest) = open(frame, "Rest", Sort::bag()) {
        builder.concatenate(&rest);
    }
    builder.build()
}

fn list(items: Vec<Term>, base: bool) -> Term {
    let mut builder = ListBuilder::new(CollectionOps::list());
    for item in items {
        builder.add_item(item);
    }
    if let Some(rest) = open(base, "L", Sort::new("List")) {
        builder.concatenate(&rest);
    }
    builder.build()
}

fn map(values: Vec<Term>, base: bool) -> Term {
    let mut builder = MapBuilder::new(CollectionOps::map());
    for (key, value) in (0i128..).zip(values) {
        builder.put(Term::int(key), value);
    }
    if let Some(rest) = open(base, "M", Sort::new("Map")) {
        builder.concatenate(&rest);
    }
    builder.build()
}

fn set(elements: Vec<Term>, base: bool) -> Term {
    let mut builder = SetBuilder::new(CollectionOps::set());
    for element in elements {
        builder.add(element);
    }
    if let Some(rest) = open(base, "S", Sort::new("Set")) {
        builder.concatenate(&rest);
    }
    builder.build()
}

/// Leaves plus user tokens and empty cell collections.
fn shaped_leaf() -> impl Strategy<Value = Term> {
    prop_oneof![
        leaf(),
        prop::sample::select(vec!["x", "y"]).prop_map(|t| Term::token(Sort::new("Id"), t)),
        any::<bool>().prop_map(|frame| cell_bag(Vec::new(), frame)),
    ]
}

/// Every shape with its own indexing rule: cells (closed and framed, single
/// and multi-instance), freezers, collections and sequences.
fn shaped_term() -> impl Strategy<Value = Term> {
    shaped_leaf().prop_recursive(3, 32, 3, |inner| {
        let items = || prop::collection::vec(inner.clone(), 0..3);
        prop_oneof![
            (prop::sample::select(vec!["f", "g"]), prop::collection::vec(inner.clone(), 1..3))
                .prop_map(|(label, args)| Term::apply(label, args)),
            items().prop_map(|items| seq(&items)),
            (any::<bool>(), prop::collection::vec(inner.clone(), 0..2))
                .prop_map(|(hole_first, args)| freezer(hole_first, args)),
            (
                prop::collection::vec(
                    (prop::sample::select(vec!["k", "env", "thread"]), inner.clone()),
                    0..4
                ),
                any::<bool>()
            )
                .prop_map(|(cells, frame)| cell_bag(cells, frame)),
            (items(), any::<bool>()).prop_map(|(items, base)| list(items, base)),
            (items(), any::<bool>()).prop_map(|(values, base)| map(values, base)),
            (items(), any::<bool>()).prop_map(|(elements, base)| set(elements, base)),
        ]
    })
}

/// `term` with the subterms picked by `mask` (pre-order, variables skipped)
/// replaced by fresh variables of their sort.
fn generalize(term: &Term, mask: &[bool]) -> Term {
    let mut position = 0;
    transform(term, &mut |t| {
        if t.is_variable() {
            return None;
        }
        let pick = mask.get(position).copied().unwrap_or(false);
        position += 1;
        pick.then(|| Term::variable(Variable::new(&format!("G{position}"), t.sort())))
    })
}

#[test]
fn test_kitem_variable_may_cover_cells() {
    let cells = cell_bag(vec![("env", a("x")), ("k", a("y"))], false);
    let any = Term::variable(Variable::new("Any", Sort::kitem()));
    assert!(!match_all(&any, &cells).is_empty());
    assert!(indexing_pair(&any).is_unifiable(indexing_pair(&cells)));
}

proptest! {
    #[test]
    fn matching_patterns_have_compatible_pairs(
        subject in shaped_term(),
        mask in prop::collection::vec(prop::bool::weighted(0.2), 0..32),
    ) {
        let pattern = generalize(&subject, &mask);
        if !match_all(&pattern, &subject).is_empty() {
            prop_assert!(
                indexing_pair(&pattern).is_unifiable(indexing_pair(&subject)),
                "{pattern} matches {subject}"
            );
        }

        let any = Term::variable(Variable::new("Any", Sort::kitem()));
        if !match_all(&any, &subject).is_empty() {
            prop_assert!(indexing_pair(&any).is_unifiable(indexing_pair(&subject)));
        }
    }
}
