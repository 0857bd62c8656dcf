//! Eager structural decomposition of equalities.

use kil_ir::visit::for_each_subterm;
use kil_ir::{
    CellBuilder, CellCollection, Label, ListBuilder, ListCollection, MapBuilder, MapCollection,
    SequenceBuilder, SetBuilder, SetCollection, Sort, Term, TermKind, Variable,
};
use rustc_hash::FxHashMap;

use super::{ConjunctiveFormula, Deferred};
use crate::matcher::sequence_view;

/// What one equality reduces to.
enum Step {
    Done,
    Split(Vec<(Term, Term)>),
    Bind(Variable, Term),
    Residual(Term, Term),
    Fail,
}

impl ConjunctiveFormula {
    /// Decompose `left = right` into bindings and residuals.
    pub(super) fn unify(&mut self, left: Term, right: Term) {
        let mut work = vec![(left, right)];
        while let Some((left, right)) = work.pop() {
            if self.falsified {
                return;
            }
            let left = self.substitution.apply(&left);
            let right = self.substitution.apply(&right);
            if left == right {
                continue;
            }
            if let Some(deferred) = Deferred::from_equality(&left, &right) {
                self.add_deferred(deferred);
                continue;
            }
            match self.step(&left, &right) {
                Step::Done => {}
                Step::Split(pairs) => work.extend(pairs),
                Step::Bind(var, value) => self.substitution.extend(var, value),
                Step::Residual(left, right) => {
                    let exists = self
                        .equalities
                        .iter()
                        .any(|(l, r)| (*l == left && *r == right) || (*l == right && *r == left));
                    if !exists {
                        self.equalities.push((left, right));
                    }
                }
                Step::Fail => self.falsify("structural mismatch"),
            }
        }
    }

    fn step(&self, left: &Term, right: &Term) -> Step {
        if let TermKind::Rewrite(rewrite) = left.kind() {
            return Step::Split(vec![(rewrite.left.clone(), right.clone())]);
        }
        if let TermKind::Rewrite(rewrite) = right.kind() {
            return Step::Split(vec![(left.clone(), rewrite.left.clone())]);
        }

        let is_sequence = |t: &Term| matches!(t.kind(), TermKind::Sequence(_));
        match (left.kind(), right.kind()) {
            (TermKind::Variable(var), _) if var.sort() == Sort::k() || !is_sequence(right) => {
                return self.bind(*var, left, right);
            }
            (_, TermKind::Variable(var)) if var.sort() == Sort::k() || !is_sequence(left) => {
                return self.bind(*var, right, left);
            }
            _ => {}
        }
        if is_sequence(left) || is_sequence(right) {
            return sequences(left, right);
        }
        if self.is_function(left) || self.is_function(right) {
            return Step::Residual(left.clone(), right.clone());
        }

        match (left.kind(), right.kind()) {
            (TermKind::Application(a), TermKind::Application(b)) => {
                if a.args().len() != b.args().len() {
                    return Step::Fail;
                }
                let mut pairs: Vec<(Term, Term)> = match (a.label(), b.label()) {
                    (Label::Constant(x), Label::Constant(y)) if x == y => Vec::new(),
                    (Label::Freezer(x), Label::Freezer(y)) => vec![(x.clone(), y.clone())],
                    _ => return Step::Fail,
                };
                pairs.extend(a.args().iter().cloned().zip(b.args().iter().cloned()));
                Step::Split(pairs)
            }
            (TermKind::List(a), TermKind::List(b)) if a.ops() == b.ops() => lists(left, a, right, b),
            (TermKind::Map(a), TermKind::Map(b)) if a.ops() == b.ops() => maps(left, a, right, b),
            (TermKind::Set(a), TermKind::Set(b)) if a.ops() == b.ops() => sets(left, a, right, b),
            (TermKind::Cells(a), TermKind::Cells(b)) => cells(left, a, right, b),
            (TermKind::Disjunction(_) | TermKind::InnerRhs(_), _)
            | (_, TermKind::Disjunction(_) | TermKind::InnerRhs(_)) => {
                Step::Residual(left.clone(), right.clone())
            }
            (TermKind::List(a), _) => match ListCollection::operands_of(a.ops(), right) {
                Some(b) => lists(left, a, right, &b),
                None => Step::Fail,
            },
            (_, TermKind::List(b)) => match ListCollection::operands_of(b.ops(), left) {
                Some(a) => lists(left, &a, right, b),
                None => Step::Fail,
            },
            _ => Step::Fail,
        }
    }

    fn bind(&self, var: Variable, var_term: &Term, value: &Term) -> Step {
        if let TermKind::Variable(other) = value.kind() {
            // Orient towards the more general sort.
            if !other.sort().is_subsort_of(var.sort()) && var.sort().is_subsort_of(other.sort()) {
                return self.bind(*other, value, var_term);
            }
        }
        if !value.sort().is_subsort_of(var.sort()) {
            return if self.is_function(value) {
                Step::Residual(var_term.clone(), value.clone())
            } else {
                Step::Fail
            };
        }
        if var.is_dont_care() {
            return Step::Done;
        }
        if occurs(var, value) {
            return Step::Fail;
        }
        Step::Bind(var, value.clone())
    }
}

fn occurs(var: Variable, term: &Term) -> bool {
    let mut found = false;
    for_each_subterm(term, &mut |t| {
        if t.as_variable() == Some(&var) {
            found = true;
        }
        !found && !t.is_ground()
    });
    found
}

/// Items that may stand for any number of sequence items.
fn is_segment(term: &Term) -> bool {
    term.sort() == Sort::k()
}

fn rebuild(items: &[Term], frame: Option<Variable>) -> Term {
    let mut builder = SequenceBuilder::new();
    builder.concatenate(items);
    if let Some(frame) = frame {
        builder.add(&Term::variable(frame));
    }
    builder.build()
}

fn sequences(left: &Term, right: &Term) -> Step {
    let (a, a_frame) = sequence_view(left);
    let (b, b_frame) = sequence_view(right);
    let mut pairs = Vec::new();
    let mut i = 0;
    while i < a.len() && i < b.len() {
        if is_segment(&a[i]) || is_segment(&b[i]) {
            break;
        }
        pairs.push((a[i].clone(), b[i].clone()));
        i += 1;
    }
    let (a_rest, b_rest) = (&a[i..], &b[i..]);
    if a_rest.iter().chain(b_rest).any(is_segment) {
        if pairs.is_empty() {
            return Step::Residual(left.clone(), right.clone());
        }
        pairs.push((rebuild(a_rest, a_frame), rebuild(b_rest, b_frame)));
        return Step::Split(pairs);
    }
    if a_rest.is_empty() && b_rest.is_empty() {
        match (a_frame, b_frame) {
            (None, None) => {}
            (Some(f), None) | (None, Some(f)) => pairs.push((Term::variable(f), Term::dot_k())),
            (Some(f), Some(g)) => pairs.push((Term::variable(f), Term::variable(g))),
        }
    } else if a_rest.is_empty() {
        let Some(f) = a_frame else {
            return Step::Fail;
        };
        pairs.push((Term::variable(f), rebuild(b_rest, b_frame)));
    } else {
        let Some(g) = b_frame else {
            return Step::Fail;
        };
        pairs.push((rebuild(a_rest, a_frame), Term::variable(g)));
    }
    Step::Split(pairs)
}

fn single_variable_base(base: &[Term]) -> Option<&Term> {
    match base {
        [only] if only.is_variable() => Some(only),
        _ => None,
    }
}

fn lists(left: &Term, a: &ListCollection, right: &Term, b: &ListCollection) -> Step {
    match (a.is_concrete(), b.is_concrete()) {
        (true, true) => {
            if a.left().len() != b.left().len() {
                return Step::Fail;
            }
            Step::Split(a.left().iter().cloned().zip(b.left().iter().cloned()).collect())
        }
        (true, false) => list_against_concrete(b, a, right, left),
        (false, true) => list_against_concrete(a, b, left, right),
        (false, false) => Step::Residual(left.clone(), right.clone()),
    }
}

fn list_against_concrete(
    symbolic: &ListCollection,
    concrete: &ListCollection,
    symbolic_term: &Term,
    concrete_term: &Term,
) -> Step {
    let Some(base) = single_variable_base(symbolic.base()) else {
        return Step::Residual(symbolic_term.clone(), concrete_term.clone());
    };
    let items = concrete.left();
    let (l, r) = (symbolic.left().len(), symbolic.right().len());
    if l + r > items.len() {
        return Step::Fail;
    }
    let mut pairs: Vec<(Term, Term)> = symbolic
        .left()
        .iter()
        .cloned()
        .zip(items[..l].iter().cloned())
        .chain(
            symbolic
                .right()
                .iter()
                .cloned()
                .zip(items[items.len() - r..].iter().cloned()),
        )
        .collect();
    let mut middle = ListBuilder::new(concrete.ops());
    for item in &items[l..items.len() - r] {
        middle.add_item(item.clone());
    }
    pairs.push((base.clone(), middle.build()));
    Step::Split(pairs)
}

fn maps(left: &Term, a: &MapCollection, right: &Term, b: &MapCollection) -> Step {
    let ground_keys = |m: &MapCollection| m.entries().keys().all(Term::is_ground);
    if !ground_keys(a) || !ground_keys(b) {
        return Step::Residual(left.clone(), right.clone());
    }
    match (a.is_concrete(), b.is_concrete()) {
        (true, true) => {
            if a.entries().len() != b.entries().len() {
                return Step::Fail;
            }
            let mut pairs = Vec::new();
            for (key, value) in a.entries() {
                match b.get(key) {
                    Some(other) => pairs.push((value.clone(), other.clone())),
                    None => return Step::Fail,
                }
            }
            Step::Split(pairs)
        }
        (true, false) => map_against_concrete(b, a, right, left),
        (false, true) => map_against_concrete(a, b, left, right),
        (false, false) => Step::Residual(left.clone(), right.clone()),
    }
}

fn map_against_concrete(
    symbolic: &MapCollection,
    concrete: &MapCollection,
    symbolic_term: &Term,
    concrete_term: &Term,
) -> Step {
    let Some(base) = single_variable_base(symbolic.base()) else {
        return Step::Residual(symbolic_term.clone(), concrete_term.clone());
    };
    let mut pairs = Vec::new();
    let mut rest: FxHashMap<&Term, &Term> = concrete.entries().iter().collect();
    for (key, value) in symbolic.entries() {
        match rest.remove(key) {
            Some(other) => pairs.push((value.clone(), other.clone())),
            None => return Step::Fail,
        }
    }
    let mut remainder = MapBuilder::new(concrete.ops());
    for (key, value) in rest {
        remainder.put(key.clone(), value.clone());
    }
    pairs.push((base.clone(), remainder.build()));
    Step::Split(pairs)
}

fn sets(left: &Term, a: &SetCollection, right: &Term, b: &SetCollection) -> Step {
    let ground = |s: &SetCollection| s.elements().iter().all(Term::is_ground);
    if !ground(a) || !ground(b) {
        return Step::Residual(left.clone(), right.clone());
    }
    match (a.is_concrete(), b.is_concrete()) {
        // Equal concrete ground sets were caught by the equality check.
        (true, true) => Step::Fail,
        (true, false) => set_against_concrete(b, a, right, left),
        (false, true) => set_against_concrete(a, b, left, right),
        (false, false) => Step::Residual(left.clone(), right.clone()),
    }
}

fn set_against_concrete(
    symbolic: &SetCollection,
    concrete: &SetCollection,
    symbolic_term: &Term,
    concrete_term: &Term,
) -> Step {
    let Some(base) = single_variable_base(symbolic.base()) else {
        return Step::Residual(symbolic_term.clone(), concrete_term.clone());
    };
    if !symbolic.elements().iter().all(|e| concrete.contains(e)) {
        return Step::Fail;
    }
    let mut remainder = SetBuilder::new(concrete.ops());
    for element in concrete.elements() {
        if !symbolic.contains(element) {
            remainder.add(element.clone());
        }
    }
    Step::Split(vec![(base.clone(), remainder.build())])
}

fn cells(left: &Term, a: &CellCollection, right: &Term, b: &CellCollection) -> Step {
    let unique = |c: &CellCollection| {
        c.cells()
            .iter()
            .all(|cell| c.cells_labeled(cell.label).count() == 1)
    };
    if !unique(a) || !unique(b) || a.frames().len() > 1 || b.frames().len() > 1 {
        return Step::Residual(left.clone(), right.clone());
    }

    let mut pairs = Vec::new();
    let mut only_a = CellBuilder::new();
    let mut only_b = CellBuilder::new();
    let (mut a_extra, mut b_extra) = (false, false);
    for cell in a.cells() {
        match b.cells_labeled(cell.label).next() {
            Some(other) => pairs.push((cell.content.clone(), other.content.clone())),
            None => {
                only_a.put(cell.label, cell.multiplicity, cell.content.clone());
                a_extra = true;
            }
        }
    }
    for cell in b.cells() {
        if a.cells_labeled(cell.label).next().is_none() {
            only_b.put(cell.label, cell.multiplicity, cell.content.clone());
            b_extra = true;
        }
    }

    let frame = |c: &CellCollection| c.frames().first().map(|v| Term::variable(*v));
    match (frame(a), frame(b)) {
        (None, None) if a_extra || b_extra => return Step::Fail,
        (None, None) => {}
        (Some(f), None) => {
            if a_extra {
                return Step::Fail;
            }
            pairs.push((f, only_b.build()));
        }
        (None, Some(g)) => {
            if b_extra {
                return Step::Fail;
            }
            pairs.push((only_a.build(), g));
        }
        (Some(f), Some(g)) => match (a_extra, b_extra) {
            (false, _) => {
                only_b.concatenate(&g);
                pairs.push((f, only_b.build()));
            }
            (true, false) => {
                only_a.concatenate(&f);
                pairs.push((only_a.build(), g));
            }
            (true, true) => return Step::Residual(left.clone(), right.clone()),
        },
    }
    Step::Split(pairs)
}
