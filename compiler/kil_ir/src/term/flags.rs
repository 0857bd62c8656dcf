//! Pre-computed term metadata flags.
//!
//! `TermFlags` are computed once when a node is built and cached, so passes
//! can skip subtrees (no rewrites, no variables, nothing mutable) without
//! walking them.

use bitflags::bitflags;

use super::{Term, TermKind};

bitflags! {
    /// Cached per-node properties.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TermFlags: u16 {
        // === Presence Flags (bits 0-7) ===
        // Propagated from children to parents.

        /// Contains a variable (including frames and collection bases).
        const HAS_VARIABLE = 1 << 0;
        /// Contains a rewrite marker.
        const HAS_REWRITE = 1 << 1;
        /// Contains the hole.
        const HAS_HOLE = 1 << 2;
        /// Contains an automaton disjunction.
        const HAS_DISJUNCTION = 1 << 3;
        /// Contains the don't-care marker variable.
        const HAS_DONT_CARE = 1 << 4;
        /// Some strict descendant is still mutable.
        const CONTAINS_MUTABLE = 1 << 5;

        // === Node Flags (bits 8-15) ===
        // Describe this node only.

        /// Canonical interned instance.
        const INTERNED = 1 << 8;
        /// Built with `build_mutable` and not yet frozen.
        const MUTABLE = 1 << 9;

        /// Flags a parent inherits from its children.
        const PROPAGATE_MASK = Self::HAS_VARIABLE.bits()
            | Self::HAS_REWRITE.bits()
            | Self::HAS_HOLE.bits()
            | Self::HAS_DISJUNCTION.bits()
            | Self::HAS_DONT_CARE.bits()
            | Self::CONTAINS_MUTABLE.bits();
    }
}

fn inherited(term: &Term) -> TermFlags {
    let flags = term.flags();
    let mut out = flags & TermFlags::PROPAGATE_MASK;
    if flags.contains(TermFlags::MUTABLE) {
        out |= TermFlags::CONTAINS_MUTABLE;
    }
    out
}

fn variable_flags(var: &super::Variable) -> TermFlags {
    if var.is_dont_care() {
        TermFlags::HAS_VARIABLE | TermFlags::HAS_DONT_CARE
    } else {
        TermFlags::HAS_VARIABLE
    }
}

fn all<'a>(terms: impl IntoIterator<Item = &'a Term>) -> TermFlags {
    terms
        .into_iter()
        .fold(TermFlags::empty(), |acc, t| acc | inherited(t))
}

/// Compute the flags of a node from its children's cached flags.
pub(super) fn compute(kind: &TermKind) -> TermFlags {
    match kind {
        TermKind::Application(app) => {
            let label = match &app.label {
                super::Label::Freezer(frozen) => inherited(frozen),
                super::Label::Constant(_) => TermFlags::empty(),
            };
            label | all(&app.args)
        }
        TermKind::Token(_) | TermKind::LabelInjection(_) => TermFlags::empty(),
        TermKind::Sequence(seq) => {
            all(&seq.items) | seq.frame.as_ref().map_or(TermFlags::empty(), variable_flags)
        }
        TermKind::List(list) => all(&list.left) | all(&list.base) | all(&list.right),
        TermKind::Map(map) => {
            all(map.entries.keys()) | all(map.entries.values()) | all(&map.base)
        }
        TermKind::Set(set) => all(&set.elements) | all(&set.base),
        TermKind::Cells(cells) => {
            let contents = all(cells.cells.iter().map(|c| &c.content));
            cells
                .frames
                .iter()
                .fold(contents, |acc, v| acc | variable_flags(v))
        }
        TermKind::Variable(var) => variable_flags(var),
        TermKind::Hole => TermFlags::HAS_HOLE,
        TermKind::Rewrite(rewrite) => {
            TermFlags::HAS_REWRITE | inherited(&rewrite.left) | inherited(&rewrite.right)
        }
        TermKind::Disjunction(disjunction) => {
            TermFlags::HAS_DISJUNCTION | all(disjunction.branches.iter().map(|(t, _)| t))
        }
        TermKind::InnerRhs(inner) => all(inner.by_rule.iter().flatten()),
    }
}
