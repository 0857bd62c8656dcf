//! Generic traversals over terms.
//!
//! Every transformation is a plain function over [`TermKind`]: `map_children`
//! rebuilds one node from transformed children (through the builders, so
//! collections stay normalized), and `transform` / `transform_bottom_up`
//! compose it into pre-order and post-order rewrites.
//!
//! Frames and collection bases are visited as variable terms, so a
//! substitution that replaces a frame splices its value into the sequence.

use crate::stack::ensure_sufficient_stack;
use crate::term::{
    CellBuilder, Disjunction, InnerRhs, Label, ListBuilder, MapBuilder, SequenceBuilder,
    SetBuilder, Term, TermKind, Variable,
};

/// Rebuild `term` with `f` applied to each direct child.
///
/// Returns `term` itself (same allocation) when no child changed.
pub fn map_children(term: &Term, f: &mut dyn FnMut(&Term) -> Term) -> Term {
    let mut changed = false;
    let mut apply = |child: &Term| {
        let result = f(child);
        changed |= !Term::ptr_eq(&result, child);
        result
    };

    let rebuilt = match term.kind() {
        TermKind::Token(_)
        | TermKind::Variable(_)
        | TermKind::Hole
        | TermKind::LabelInjection(_) => return term.clone(),
        TermKind::Application(app) => {
            let label = match app.label() {
                Label::Freezer(frozen) => Label::Freezer(apply(frozen)),
                label @ Label::Constant(_) => label.clone(),
            };
            let args: Vec<Term> = app.args().iter().map(&mut apply).collect();
            if !changed {
                return term.clone();
            }
            Term::apply_sorted(app.sort(), label, args)
        }
        TermKind::Sequence(seq) => {
            let items: Vec<Term> = seq.items().iter().map(&mut apply).collect();
            let frame = seq.frame().map(|v| apply(&Term::variable(*v)));
            if !changed {
                return term.clone();
            }
            let mut builder = SequenceBuilder::new();
            builder.concatenate(&items);
            if let Some(frame) = &frame {
                builder.add(frame);
            }
            builder.build()
        }
        TermKind::List(list) => {
            let left: Vec<Term> = list.left().iter().map(&mut apply).collect();
            let base: Vec<Term> = list.base().iter().map(&mut apply).collect();
            let right: Vec<Term> = list.right().iter().map(&mut apply).collect();
            if !changed {
                return term.clone();
            }
            // Operands of a user operator may have become lists or the unit.
            let operands = list.ops().element.is_none();
            let mut builder = ListBuilder::new(list.ops());
            let add = |builder: &mut ListBuilder, item: Term| {
                if operands {
                    builder.concatenate(&item);
                } else {
                    builder.add_item(item);
                }
            };
            for item in left {
                add(&mut builder, item);
            }
            for b in &base {
                builder.concatenate(b);
            }
            for item in right {
                add(&mut builder, item);
            }
            builder.build()
        }
        TermKind::Map(map) => {
            let entries: Vec<(Term, Term)> = map
                .entries()
                .iter()
                .map(|(k, v)| (apply(k), apply(v)))
                .collect();
            let base: Vec<Term> = map.base().iter().map(&mut apply).collect();
            if !changed {
                return term.clone();
            }
            let mut builder = MapBuilder::new(map.ops());
            for (k, v) in entries {
                builder.put(k, v);
            }
            for b in &base {
                builder.concatenate(b);
            }
            builder.build()
        }
        TermKind::Set(set) => {
            let elements: Vec<Term> = set.elements().iter().map(&mut apply).collect();
            let base: Vec<Term> = set.base().iter().map(&mut apply).collect();
            if !changed {
                return term.clone();
            }
            let mut builder = SetBuilder::new(set.ops());
            for e in elements {
                builder.add(e);
            }
            for b in &base {
                builder.concatenate(b);
            }
            builder.build()
        }
        TermKind::Cells(cells) => {
            let contents: Vec<Term> = cells.cells().iter().map(|c| apply(&c.content)).collect();
            let frames: Vec<Term> = cells
                .frames()
                .iter()
                .map(|v| apply(&Term::variable(*v)))
                .collect();
            if !changed {
                return term.clone();
            }
            let mut builder = CellBuilder::new();
            for (cell, content) in cells.cells().iter().zip(contents) {
                builder.put(cell.label, cell.multiplicity, content);
            }
            for frame in &frames {
                builder.concatenate(frame);
            }
            builder.build()
        }
        TermKind::Rewrite(rewrite) => {
            let left = apply(&rewrite.left);
            let right = apply(&rewrite.right);
            if !changed {
                return term.clone();
            }
            Term::rewrite(left, right)
        }
        TermKind::Disjunction(disjunction) => {
            let branches: Vec<_> = disjunction
                .branches()
                .iter()
                .map(|(pattern, rules)| (apply(pattern), rules.clone()))
                .collect();
            if !changed {
                return term.clone();
            }
            Term::disjunction(Disjunction::new(branches))
        }
        TermKind::InnerRhs(inner) => {
            let entries: Vec<Option<Term>> = inner
                .entries()
                .iter()
                .map(|entry| entry.as_ref().map(&mut apply))
                .collect();
            if !changed {
                return term.clone();
            }
            Term::inner_rhs(InnerRhs::new(entries))
        }
    };

    if term.is_mutable() {
        rebuilt.into_mutable()
    } else {
        rebuilt
    }
}

/// Pre-order rewrite: `f` may replace a node outright, otherwise its
/// children are transformed.
pub fn transform(term: &Term, f: &mut dyn FnMut(&Term) -> Option<Term>) -> Term {
    ensure_sufficient_stack(|| {
        if let Some(replacement) = f(term) {
            return replacement;
        }
        map_children(term, &mut |child| transform(child, f))
    })
}

/// Post-order rewrite: children first, then `f` on the rebuilt node.
pub fn transform_bottom_up(term: &Term, f: &mut dyn FnMut(Term) -> Term) -> Term {
    ensure_sufficient_stack(|| {
        let rebuilt = map_children(term, &mut |child| transform_bottom_up(child, f));
        f(rebuilt)
    })
}

/// Call `f` on each direct child. Frames are passed as variable terms.
pub fn for_each_child(term: &Term, f: &mut dyn FnMut(&Term)) {
    match term.kind() {
        TermKind::Token(_)
        | TermKind::Variable(_)
        | TermKind::Hole
        | TermKind::LabelInjection(_) => {}
        TermKind::Application(app) => {
            if let Label::Freezer(frozen) = app.label() {
                f(frozen);
            }
            app.args().iter().for_each(f);
        }
        TermKind::Sequence(seq) => {
            seq.items().iter().for_each(&mut *f);
            if let Some(frame) = seq.frame() {
                f(&Term::variable(*frame));
            }
        }
        TermKind::List(list) => {
            list.left()
                .iter()
                .chain(list.base())
                .chain(list.right())
                .for_each(f);
        }
        TermKind::Map(map) => {
            for (k, v) in map.entries() {
                f(k);
                f(v);
            }
            map.base().iter().for_each(f);
        }
        TermKind::Set(set) => {
            set.elements().iter().chain(set.base()).for_each(f);
        }
        TermKind::Cells(cells) => {
            for cell in cells.cells() {
                f(&cell.content);
            }
            for frame in cells.frames() {
                f(&Term::variable(*frame));
            }
        }
        TermKind::Rewrite(rewrite) => {
            f(&rewrite.left);
            f(&rewrite.right);
        }
        TermKind::Disjunction(disjunction) => {
            for (pattern, _) in disjunction.branches() {
                f(pattern);
            }
        }
        TermKind::InnerRhs(inner) => inner.entries().iter().flatten().for_each(f),
    }
}

/// Pre-order walk; `f` returns whether to descend into the node's children.
pub fn for_each_subterm(term: &Term, f: &mut dyn FnMut(&Term) -> bool) {
    ensure_sufficient_stack(|| {
        if f(term) {
            for_each_child(term, &mut |child| for_each_subterm(child, f));
        }
    });
}

/// Every variable occurrence, in pre-order, with repetitions.
pub fn variable_occurrences(term: &Term) -> Vec<Variable> {
    let mut out = Vec::new();
    for_each_subterm(term, &mut |t| {
        if let TermKind::Variable(var) = t.kind() {
            out.push(*var);
        }
        !t.is_ground()
    });
    out
}

/// Replace variables by `lookup`; subtrees without variables are shared.
pub fn substitute(term: &Term, lookup: &dyn Fn(&Variable) -> Option<Term>) -> Term {
    transform(term, &mut |t| {
        if t.is_ground() {
            return Some(t.clone());
        }
        match t.kind() {
            TermKind::Variable(var) => Some(lookup(var).unwrap_or_else(|| t.clone())),
            _ => None,
        }
    })
}
