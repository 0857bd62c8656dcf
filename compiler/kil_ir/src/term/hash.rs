//! Structural hashing of term nodes.
//!
//! Children contribute their cached hash, so hashing a node is O(children).
//! Map, set and collection-base hashes are order-independent: the same
//! elements inserted in any order hash alike.

use std::hash::{Hash, Hasher};
use std::mem;

use rustc_hash::FxHasher;

use super::{Label, Term, TermKind};

/// Spread a hash before summing so that equal elements do not cancel out.
#[inline]
fn mix(hash: u64) -> u64 {
    (hash ^ (hash >> 29)).wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(23)
}

fn unordered(hashes: impl Iterator<Item = u64>) -> u64 {
    hashes.fold(0u64, |acc, h| acc.wrapping_add(mix(h)))
}

fn ordered(terms: &[Term], state: &mut FxHasher) {
    terms.len().hash(state);
    for term in terms {
        term.hash_value().hash(state);
    }
}

pub(super) fn structural_hash(kind: &TermKind) -> u64 {
    let mut state = FxHasher::default();
    mem::discriminant(kind).hash(&mut state);

    match kind {
        TermKind::Application(app) => {
            match &app.label {
                Label::Constant(name) => name.hash(&mut state),
                Label::Freezer(frozen) => frozen.hash_value().hash(&mut state),
            }
            app.sort.hash(&mut state);
            ordered(&app.args, &mut state);
        }
        TermKind::Token(token) => token.hash(&mut state),
        TermKind::Sequence(seq) => {
            ordered(&seq.items, &mut state);
            seq.frame.hash(&mut state);
        }
        TermKind::List(list) => {
            list.ops.hash(&mut state);
            ordered(&list.left, &mut state);
            ordered(&list.base, &mut state);
            ordered(&list.right, &mut state);
        }
        TermKind::Map(map) => {
            map.ops.hash(&mut state);
            unordered(map.entries.iter().map(|(k, v)| {
                let mut entry = FxHasher::default();
                k.hash_value().hash(&mut entry);
                v.hash_value().hash(&mut entry);
                entry.finish()
            }))
            .hash(&mut state);
            unordered(map.base.iter().map(Term::hash_value)).hash(&mut state);
        }
        TermKind::Set(set) => {
            set.ops.hash(&mut state);
            unordered(set.elements.iter().map(Term::hash_value)).hash(&mut state);
            unordered(set.base.iter().map(Term::hash_value)).hash(&mut state);
        }
        TermKind::Cells(cells) => {
            cells.cells.len().hash(&mut state);
            for cell in &cells.cells {
                cell.label.hash(&mut state);
                mem::discriminant(&cell.multiplicity).hash(&mut state);
                cell.content.hash_value().hash(&mut state);
            }
            cells.frames.hash(&mut state);
        }
        TermKind::Variable(var) => var.hash(&mut state),
        TermKind::Hole => {}
        TermKind::LabelInjection(label) => label.hash(&mut state),
        TermKind::Rewrite(rewrite) => {
            rewrite.left.hash_value().hash(&mut state);
            rewrite.right.hash_value().hash(&mut state);
        }
        TermKind::Disjunction(disjunction) => {
            disjunction.branches.len().hash(&mut state);
            for (pattern, rules) in &disjunction.branches {
                pattern.hash_value().hash(&mut state);
                rules.hash(&mut state);
            }
        }
        TermKind::InnerRhs(inner) => {
            for entry in &inner.by_rule {
                entry.as_ref().map(Term::hash_value).hash(&mut state);
            }
        }
    }

    state.finish()
}
