use std::fmt;

use kil_ir::well_known::names;
use kil_ir::{CellCollection, Name, Sequence, Sort, Term, TermKind};
use smallvec::SmallVec;

use crate::index::{index_with, Index};

/// Definition-level inputs to indexing.
#[derive(Clone, Debug)]
pub struct IndexingData {
    /// Sorts whose tokens are indexed by sort.
    pub builtin_sorts: SmallVec<[Sort; 8]>,
    /// When set, pairs are computed from the content of this cell.
    pub computation_cell: Option<Name>,
}

impl Default for IndexingData {
    fn default() -> Self {
        IndexingData {
            builtin_sorts: names().sorts.builtin_data.iter().copied().collect(),
            computation_cell: None,
        }
    }
}

impl IndexingData {
    pub fn with_computation_cell(mut self, cell: Name) -> Self {
        self.computation_cell = Some(cell);
        self
    }

    pub fn index(&self, term: &Term) -> Index {
        index_with(term, &|sort| self.builtin_sorts.contains(&sort))
    }

    /// Pair of `term`, looking through to the computation cell if configured.
    pub fn indexing_pair(&self, term: &Term) -> IndexingPair {
        let focus = self
            .computation_cell
            .and_then(|cell| find_cell(term, cell))
            .unwrap_or(term);
        self.pair_of(focus)
    }

    fn pair_of(&self, term: &Term) -> IndexingPair {
        match term.kind() {
            TermKind::Rewrite(rewrite) => self.pair_of(&rewrite.left),
            TermKind::Sequence(seq) => self.sequence_pair(seq),
            TermKind::Cells(cells) => cells_pair(cells),
            _ if is_segment(term) => IndexingPair::TOP,
            // A `KItem` variable also stands for a whole cell collection.
            TermKind::Variable(var) if var.sort() == Sort::kitem() => IndexingPair::TOP,
            _ => IndexingPair::new(self.index(term), Index::Bottom),
        }
    }

    fn sequence_pair(&self, seq: &Sequence) -> IndexingPair {
        // The concrete prefix ends at the first segment item.
        let prefix_len = seq
            .items()
            .iter()
            .position(is_segment)
            .unwrap_or(seq.items().len());
        let open = seq.frame().is_some() || prefix_len < seq.items().len();
        let prefix = &seq.items()[..prefix_len];
        positional_pair(prefix.iter().map(|item| self.index(item)), open)
    }
}

/// Pair of `term` with the default [`IndexingData`].
pub fn indexing_pair(term: &Term) -> IndexingPair {
    IndexingData::default().indexing_pair(term)
}

/// An item that may stand for any number of sequence items.
fn is_segment(term: &Term) -> bool {
    term.sort() == Sort::k() || (term.sort() == Sort::bag() && term.is_variable())
}

/// First two positions of an ordered prefix; missing positions are `Top` when
/// the term is open-ended and `Bottom` otherwise.
fn positional_pair(mut indices: impl Iterator<Item = Index>, open: bool) -> IndexingPair {
    let missing = if open { Index::Top } else { Index::Bottom };
    let first = indices.next().unwrap_or(missing);
    let second = indices.next().unwrap_or(missing);
    IndexingPair::new(first, second)
}

/// A frame may absorb cells sorting before the concrete ones, so only closed
/// collections are indexed by their cells.
fn cells_pair(cells: &CellCollection) -> IndexingPair {
    if !cells.is_concrete() {
        return IndexingPair::TOP;
    }
    positional_pair(cells.cells().iter().map(|c| Index::ByLabel(c.label)), false)
}

fn find_cell(term: &Term, label: Name) -> Option<&Term> {
    let term = match term.kind() {
        TermKind::Rewrite(rewrite) => &rewrite.left,
        _ => term,
    };
    let TermKind::Cells(cells) = term.kind() else {
        return None;
    };
    let mut direct = cells.cells_labeled(label);
    if let (Some(cell), None) = (direct.next(), direct.next()) {
        return Some(&cell.content);
    }
    cells
        .cells()
        .iter()
        .filter(|c| c.label != label)
        .find_map(|c| find_cell(&c.content, label))
}

/// Fingerprint of the first two positions of a term's top sequence.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct IndexingPair {
    pub first: Index,
    pub second: Index,
}

impl IndexingPair {
    pub const TOP: IndexingPair = IndexingPair {
        first: Index::Top,
        second: Index::Top,
    };

    pub const BOTTOM: IndexingPair = IndexingPair {
        first: Index::Bottom,
        second: Index::Bottom,
    };

    pub const fn new(first: Index, second: Index) -> Self {
        IndexingPair { first, second }
    }

    /// `false` only if no substitution can unify terms with these pairs.
    pub fn is_unifiable(self, other: IndexingPair) -> bool {
        self.first.is_compatible(other.first) && self.second.is_compatible(other.second)
    }
}

impl fmt::Display for IndexingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests build terms from known shapes")]
mod tests;
