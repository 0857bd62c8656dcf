//! Copy-on-shared-access for still-mutable terms.
//!
//! A node built with `build_mutable` may be edited in place, which is only
//! sound while exactly one owner can reach it. Before a term is handed to two
//! independent consumers (two exploration branches, two rule instances),
//! [`eliminate_unsafe_sharing`] walks it once: the first occurrence of each
//! mutable node is kept, every later occurrence is replaced by a deep copy.
//! Frozen and interned nodes are always shared by reference.

use rustc_hash::FxHashSet;

use crate::stack::ensure_sufficient_stack;
use crate::term::{Term, TermFlags};
use crate::visit::map_children;

/// Replace repeated occurrences of mutable nodes by private copies.
pub fn eliminate_unsafe_sharing(term: &Term) -> Term {
    Unsharer::default().unshare(term)
}

/// Copy-on-shared-access over several terms at once.
///
/// Occurrences are remembered across calls, so a mutable node reachable from
/// two sibling results is copied for the second one.
#[derive(Default)]
pub struct Unsharer {
    seen: FxHashSet<usize>,
}

impl Unsharer {
    pub fn unshare(&mut self, term: &Term) -> Term {
        unshare(term, &mut self.seen)
    }
}

fn touches_mutable(term: &Term) -> bool {
    term.flags()
        .intersects(TermFlags::MUTABLE | TermFlags::CONTAINS_MUTABLE)
}

fn unshare(term: &Term, seen: &mut FxHashSet<usize>) -> Term {
    if !touches_mutable(term) {
        return term.clone();
    }
    ensure_sufficient_stack(|| {
        if term.is_mutable() && !seen.insert(term.address()) {
            return deep_copy(term);
        }
        map_children(term, &mut |child| unshare(child, seen))
    })
}

/// Fresh allocations for every mutable node under `term`.
pub fn deep_copy(term: &Term) -> Term {
    if !touches_mutable(term) {
        return term.clone();
    }
    ensure_sufficient_stack(|| {
        let copied = map_children(term, &mut deep_copy);
        if Term::ptr_eq(&copied, term) {
            term.shallow_copy()
        } else {
            copied
        }
    })
}

/// Clear the mutable marker on `term` and everything below it.
pub fn freeze(term: &Term) -> Term {
    if !touches_mutable(term) {
        return term.clone();
    }
    ensure_sufficient_stack(|| {
        let frozen = map_children(term, &mut freeze);
        frozen.into_frozen()
    })
}

#[cfg(test)]
mod tests;
