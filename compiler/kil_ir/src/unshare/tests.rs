use pretty_assertions::assert_eq;

use super::*;
use crate::term::{CollectionOps, MapBuilder, TermKind};

fn mutable_map() -> Term {
    let mut builder = MapBuilder::new(CollectionOps::map());
    builder.put(Term::int(1), Term::string("one"));
    builder.build_mutable()
}

fn children(term: &Term) -> Vec<Term> {
    term.as_application()
        .map(|app| app.args().to_vec())
        .unwrap_or_default()
}

#[test]
fn test_shared_mutable_child_is_copied() {
    let map = mutable_map();
    let parent = Term::apply("pair", vec![map.clone(), map]);

    let unshared = eliminate_unsafe_sharing(&parent);
    let args = children(&unshared);
    assert_eq!(args.len(), 2);
    assert!(!Term::ptr_eq(&args[0], &args[1]));
    assert_eq!(args[0], args[1]);
    assert!(args[1].is_mutable());
}

#[test]
fn test_first_occurrence_is_kept() {
    let map = mutable_map();
    let parent = Term::apply("pair", vec![map.clone(), map.clone()]);
    let unshared = eliminate_unsafe_sharing(&parent);
    assert!(Term::ptr_eq(&children(&unshared)[0], &map));
}

#[test]
fn test_frozen_terms_are_shared() {
    let frozen = Term::apply("g", vec![Term::int(3)]);
    let parent = Term::apply("pair", vec![frozen.clone(), frozen.clone()]);
    let unshared = eliminate_unsafe_sharing(&parent);
    assert!(Term::ptr_eq(&unshared, &parent));
}

#[test]
fn test_edit_after_unsharing_is_private() {
    let map = mutable_map();
    let parent = Term::apply("pair", vec![map.clone(), map]);
    let unshared = eliminate_unsafe_sharing(&parent);
    let mut args = children(&unshared);
    drop(unshared);

    let mut second = args.pop().unwrap_or_else(Term::dot_k);
    let edited = second.try_edit(|kind| {
        if let TermKind::Map(map) = kind {
            map.insert(Term::int(2), Term::string("two"));
        }
    });
    assert_eq!(edited, Some(()));
    assert_ne!(second, args[0]);
}

#[test]
fn test_shared_mutable_node_refuses_edit() {
    let mut map = mutable_map();
    let _other = map.clone();
    assert_eq!(map.try_edit(|_| ()), None);
}

#[test]
fn test_freeze_clears_mutable_marker() {
    let parent = Term::apply("wrap", vec![mutable_map()]);
    assert!(parent.flags().contains(TermFlags::CONTAINS_MUTABLE));
    let frozen = freeze(&parent);
    assert!(!frozen.flags().contains(TermFlags::CONTAINS_MUTABLE));
    assert!(!children(&frozen)[0].is_mutable());
    assert_eq!(frozen, parent);
}

#[test]
fn test_siblings_get_private_copies() {
    let map = mutable_map();
    let left = Term::apply("left", vec![map.clone()]);
    let right = Term::apply("right", vec![map.clone()]);

    let mut unsharer = Unsharer::default();
    let left = unsharer.unshare(&left);
    let right = unsharer.unshare(&right);
    assert!(Term::ptr_eq(&children(&left)[0], &map));
    assert!(!Term::ptr_eq(&children(&right)[0], &map));
    assert_eq!(children(&right)[0], map);
}
