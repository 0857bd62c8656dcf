//! Builders for sequences, collections and cell collections.
//!
//! Builders are uniquely owned and not `Clone`. `build` consumes the builder
//! and returns a frozen, shareable [`Term`]; `build_mutable` returns a node
//! that may still be edited in place while nothing else references it.
//!
//! Every builder normalizes as it goes: nested collections of the same kind
//! are flattened into the one being built, and a builder holding nothing but
//! a single unresolved base collapses to that base.

use std::mem;

use rustc_hash::{FxHashMap, FxHashSet};

use super::{
    Cell, CellCollection, CollectionOps, ListCollection, MapCollection, Sequence, SetCollection,
    Term, TermKind, Variable,
};
use crate::{Multiplicity, Name, Sort};

/// Builds `~>` sequences.
///
/// A `K`-sorted variable added last becomes the frame; adding anything after
/// it demotes it back to an ordinary item.
#[derive(Default)]
pub struct SequenceBuilder {
    items: Vec<Term>,
    frame: Option<Variable>,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, term: &Term) -> &mut Self {
        if term.is_dot_k() {
            return self;
        }
        if let Some(frame) = self.frame.take() {
            self.items.push(Term::variable(frame));
        }
        match term.kind() {
            TermKind::Sequence(seq) => {
                self.items.extend(seq.items.iter().cloned());
                self.frame = seq.frame;
            }
            TermKind::Variable(var) if var.sort() == Sort::k() => self.frame = Some(*var),
            _ => self.items.push(term.clone()),
        }
        self
    }

    pub fn concatenate(&mut self, terms: &[Term]) -> &mut Self {
        for term in terms {
            self.add(term);
        }
        self
    }

    pub fn build(self) -> Term {
        let SequenceBuilder { mut items, frame } = self;
        match (items.len(), frame) {
            (0, None) => Term::dot_k(),
            (0, Some(frame)) => Term::variable(frame),
            (1, None) => items.remove(0),
            (_, frame) => Term::new(TermKind::Sequence(Sequence { items, frame })),
        }
    }
}

/// Builds associative lists such as `List` or a user `assoc` operator.
///
/// Lists of a user operator (no element wrapper) hold the operands
/// themselves: the unit stands for the empty list and a single operand for
/// itself, so `build` never returns a list with fewer than two parts.
pub struct ListBuilder {
    ops: CollectionOps,
    left: Vec<Term>,
    base: Vec<Term>,
    right: Vec<Term>,
}

impl ListBuilder {
    pub fn new(ops: CollectionOps) -> Self {
        ListBuilder {
            ops,
            left: Vec::new(),
            base: Vec::new(),
            right: Vec::new(),
        }
    }

    pub fn add_item(&mut self, item: Term) -> &mut Self {
        if self.base.is_empty() {
            self.left.push(item);
        } else {
            self.right.push(item);
        }
        self
    }

    fn is_operator_list(&self) -> bool {
        self.ops.element.is_none()
    }

    fn is_unresolved(&self, term: &Term) -> bool {
        matches!(term.kind(), TermKind::Variable(var) if var.sort() == self.ops.sort)
    }

    /// Append a whole list, or an unresolved list-sorted term as a base.
    ///
    /// For operator lists only variables of the list sort are unresolved;
    /// any other operand is an item.
    pub fn concatenate(&mut self, term: &Term) -> &mut Self {
        match term.kind() {
            TermKind::List(list) if list.ops == self.ops => {
                for item in &list.left {
                    self.add_item(item.clone());
                }
                if !list.base.is_empty() {
                    self.flush_right();
                    self.base.extend(list.base.iter().cloned());
                    self.right.extend(list.right.iter().cloned());
                }
            }
            TermKind::Application(app)
                if app.constant_label() == Some(self.ops.unit) && app.args.is_empty() => {}
            _ if self.is_operator_list() && !self.is_unresolved(term) => {
                self.add_item(term.clone());
            }
            _ => {
                self.flush_right();
                self.base.push(term.clone());
            }
        }
        self
    }

    /// Elements between two bases are kept as a concrete sub-list.
    fn flush_right(&mut self) {
        if !self.right.is_empty() {
            let left = mem::take(&mut self.right);
            self.base.push(Term::new(TermKind::List(ListCollection {
                ops: self.ops,
                left,
                base: Vec::new(),
                right: Vec::new(),
            })));
        }
    }

    pub fn build(self) -> Term {
        let ListBuilder {
            ops,
            mut left,
            mut base,
            right,
        } = self;
        if left.is_empty() && right.is_empty() && base.len() == 1 {
            return base.remove(0);
        }
        if ops.element.is_none() && base.is_empty() {
            match left.len() {
                0 => return Term::apply_sorted(ops.sort, ops.unit, Vec::new()),
                1 => return left.remove(0),
                _ => {}
            }
        }
        Term::new(TermKind::List(ListCollection {
            ops,
            left,
            base,
            right,
        }))
    }

    pub fn build_mutable(self) -> Term {
        self.build().into_mutable()
    }
}

/// Builds maps from concrete entries and unresolved map bases.
pub struct MapBuilder {
    ops: CollectionOps,
    entries: FxHashMap<Term, Term>,
    base: Vec<Term>,
}

impl MapBuilder {
    pub fn new(ops: CollectionOps) -> Self {
        MapBuilder {
            ops,
            entries: FxHashMap::default(),
            base: Vec::new(),
        }
    }

    pub fn put(&mut self, key: Term, value: Term) -> &mut Self {
        self.entries.insert(key, value);
        self
    }

    pub fn concatenate(&mut self, term: &Term) -> &mut Self {
        match term.kind() {
            TermKind::Map(map) if map.ops == self.ops => {
                for (key, value) in &map.entries {
                    self.entries.insert(key.clone(), value.clone());
                }
                self.base.extend(map.base.iter().cloned());
            }
            TermKind::Application(app)
                if app.constant_label() == Some(self.ops.unit) && app.args.is_empty() => {}
            _ => self.base.push(term.clone()),
        }
        self
    }

    pub fn build(self) -> Term {
        let MapBuilder {
            ops,
            entries,
            mut base,
        } = self;
        if entries.is_empty() && base.len() == 1 {
            return base.remove(0);
        }
        base.sort_by_key(Term::hash_value);
        Term::new(TermKind::Map(MapCollection { ops, entries, base }))
    }

    pub fn build_mutable(self) -> Term {
        self.build().into_mutable()
    }
}

/// Builds sets from concrete elements and unresolved set bases.
pub struct SetBuilder {
    ops: CollectionOps,
    elements: FxHashSet<Term>,
    base: Vec<Term>,
}

impl SetBuilder {
    pub fn new(ops: CollectionOps) -> Self {
        SetBuilder {
            ops,
            elements: FxHashSet::default(),
            base: Vec::new(),
        }
    }

    pub fn add(&mut self, element: Term) -> &mut Self {
        self.elements.insert(element);
        self
    }

    pub fn concatenate(&mut self, term: &Term) -> &mut Self {
        match term.kind() {
            TermKind::Set(set) if set.ops == self.ops => {
                self.elements.extend(set.elements.iter().cloned());
                self.base.extend(set.base.iter().cloned());
            }
            TermKind::Application(app)
                if app.constant_label() == Some(self.ops.unit) && app.args.is_empty() => {}
            _ => self.base.push(term.clone()),
        }
        self
    }

    pub fn build(self) -> Term {
        let SetBuilder {
            ops,
            elements,
            mut base,
        } = self;
        if elements.is_empty() && base.len() == 1 {
            return base.remove(0);
        }
        base.sort_by_key(Term::hash_value);
        Term::new(TermKind::Set(SetCollection {
            ops,
            elements,
            base,
        }))
    }

    pub fn build_mutable(self) -> Term {
        self.build().into_mutable()
    }
}

/// Builds cell collections.
#[derive(Default)]
pub struct CellBuilder {
    cells: Vec<Cell>,
    frames: Vec<Variable>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, label: Name, multiplicity: Multiplicity, content: Term) -> &mut Self {
        self.cells.push(Cell {
            label,
            multiplicity,
            content,
        });
        self
    }

    /// Merge another cell collection, or add a frame variable.
    ///
    /// # Panics
    /// Panics on any other term: cell collections only ever absorb cells and
    /// frame variables.
    pub fn concatenate(&mut self, term: &Term) -> &mut Self {
        match term.kind() {
            TermKind::Cells(cells) => {
                self.cells.extend(cells.cells.iter().cloned());
                self.frames.extend(cells.frames.iter().copied());
            }
            TermKind::Variable(var) => self.frames.push(*var),
            _ => panic!("cell collection cannot absorb `{term}`"),
        }
        self
    }

    pub fn build(self) -> Term {
        let CellBuilder {
            mut cells,
            mut frames,
        } = self;
        if cells.is_empty() && frames.len() == 1 {
            return Term::variable(frames[0]);
        }
        cells.sort_by(|a, b| {
            a.label
                .as_str()
                .cmp(b.label.as_str())
                .then_with(|| a.content.hash_value().cmp(&b.content.hash_value()))
        });
        frames.sort_by(|a, b| {
            a.name()
                .as_str()
                .cmp(b.name().as_str())
                .then(a.id().cmp(&b.id()))
        });
        Term::new(TermKind::Cells(CellCollection { cells, frames }))
    }

    pub fn build_mutable(self) -> Term {
        self.build().into_mutable()
    }
}
