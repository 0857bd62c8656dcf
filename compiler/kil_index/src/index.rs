use std::fmt;

use kil_ir::{Name, Sort, Term, TermKind};

/// Fingerprint of a single term position.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Index {
    /// Application with a constant label.
    ByLabel(Name),
    /// Frozen application: label of the frozen term and position of its hole.
    ByFrozenLabel(Name, usize),
    /// Token of a built-in data sort.
    ByTokenSort(Sort),
    /// Anything may occupy this position.
    Top,
    /// Nothing occupies this position.
    Bottom,
}

impl Index {
    /// Whether terms with these two indices may occupy the same position.
    pub fn is_compatible(self, other: Index) -> bool {
        match (self, other) {
            (Index::Top, _) | (_, Index::Top) => true,
            (Index::Bottom, Index::Bottom) => true,
            (Index::Bottom, _) | (_, Index::Bottom) => false,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::ByLabel(label) => write!(f, "{label}"),
            Index::ByFrozenLabel(label, hole) => write!(f, "{label}[{hole}]"),
            Index::ByTokenSort(sort) => write!(f, "#token:{}", sort.name()),
            Index::Top => write!(f, "*"),
            Index::Bottom => write!(f, "_|_"),
        }
    }
}

/// Index of `term` with the default built-in token sorts.
pub fn index(term: &Term) -> Index {
    index_with(term, &|sort| sort.is_builtin_data())
}

pub(crate) fn index_with(term: &Term, is_builtin: &dyn Fn(Sort) -> bool) -> Index {
    match term.kind() {
        TermKind::Application(app) => match app.constant_label() {
            Some(label) => Index::ByLabel(label),
            None => app
                .label()
                .frozen_hole()
                .map_or(Index::Top, |(label, hole)| Index::ByFrozenLabel(label, hole)),
        },
        TermKind::Token(token) if is_builtin(token.sort()) => Index::ByTokenSort(token.sort()),
        TermKind::Rewrite(rewrite) => index_with(&rewrite.left, is_builtin),
        _ => Index::Top,
    }
}
