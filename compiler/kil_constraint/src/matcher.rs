//! One-way matching with backtracking.
//!
//! The matcher threads a list of [`MatchState`]s through the pattern: every
//! child either keeps, forks or kills the states that reach it. Collections
//! fork once per candidate element, so the result is every substitution
//! under which the pattern equals the subject.

use kil_ir::stack::ensure_sufficient_stack;
use kil_ir::{
    Application, CellBuilder, CellCollection, Label, ListBuilder, ListCollection, MapBuilder,
    MapCollection, RuleSet, SequenceBuilder, SetBuilder, SetCollection, Sort, Term, TermKind,
    Variable,
};
use smallvec::{smallvec, SmallVec};

use crate::Substitution;

/// One way of matching so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchState {
    pub substitution: Substitution,
    /// Rules still alive after the disjunctions passed so far; `None` until
    /// the first disjunction.
    pub rules: Option<RuleSet>,
}

type States = SmallVec<[MatchState; 2]>;

/// Every substitution under which `pattern` equals `subject`.
pub fn match_all(pattern: &Term, subject: &Term) -> Vec<Substitution> {
    match_from(pattern, subject, MatchState::default())
        .into_iter()
        .map(|state| state.substitution)
        .collect()
}

/// Continue matching from an existing state.
pub fn match_from(pattern: &Term, subject: &Term, state: MatchState) -> Vec<MatchState> {
    go(pattern, subject, state).into_vec()
}

fn go(pattern: &Term, subject: &Term, state: MatchState) -> States {
    if pattern.is_ground() && !pattern.has_rewrite() && !has_disjunction(pattern) {
        return if pattern == subject {
            smallvec![state]
        } else {
            SmallVec::new()
        };
    }
    ensure_sufficient_stack(|| match pattern.kind() {
        TermKind::Variable(var) => bind(var, subject, state),
        TermKind::Rewrite(rewrite) => go(&rewrite.left, subject, state),
        TermKind::Disjunction(disjunction) => {
            let mut out = States::new();
            for (branch, rules) in disjunction.candidates(subject) {
                let live = match &state.rules {
                    Some(live) => live.intersection(rules),
                    None => rules.clone(),
                };
                if live.is_empty() {
                    continue;
                }
                let mut forked = state.clone();
                forked.rules = Some(live);
                out.extend(go(branch, subject, forked));
            }
            out
        }
        TermKind::Application(p) => match subject.kind() {
            TermKind::Application(s) => application(p, s, state),
            _ => SmallVec::new(),
        },
        TermKind::Sequence(_) => {
            let (p_items, p_frame) = sequence_view(pattern);
            let (s_items, s_frame) = sequence_view(subject);
            sequence(&p_items, p_frame, &s_items, s_frame, state)
        }
        TermKind::List(p) => match subject.kind() {
            TermKind::List(s) if s.ops() == p.ops() => list(p, s, state),
            _ => match ListCollection::operands_of(p.ops(), subject) {
                Some(s) => list(p, &s, state),
                None => SmallVec::new(),
            },
        },
        TermKind::Map(p) => match subject.kind() {
            TermKind::Map(s) if s.ops() == p.ops() => map(p, s, state),
            _ => SmallVec::new(),
        },
        TermKind::Set(p) => match subject.kind() {
            TermKind::Set(s) if s.ops() == p.ops() => set(p, s, state),
            _ => SmallVec::new(),
        },
        TermKind::Cells(p) => match subject.kind() {
            TermKind::Cells(s) => cells(p, s, state),
            _ => SmallVec::new(),
        },
        TermKind::Token(_)
        | TermKind::Hole
        | TermKind::LabelInjection(_)
        | TermKind::InnerRhs(_) => SmallVec::new(),
    })
}

fn has_disjunction(term: &Term) -> bool {
    term.flags().contains(kil_ir::TermFlags::HAS_DISJUNCTION)
}

fn bind(var: &Variable, subject: &Term, mut state: MatchState) -> States {
    if !subject.sort().is_subsort_of(var.sort()) {
        return SmallVec::new();
    }
    if var.is_dont_care() || state.substitution.bind(*var, subject.clone()) {
        smallvec![state]
    } else {
        SmallVec::new()
    }
}

/// Thread `states` through pairwise matches of `patterns` against `subjects`.
fn all<'a>(
    pairs: impl IntoIterator<Item = (&'a Term, &'a Term)>,
    state: MatchState,
) -> States {
    let mut states: States = smallvec![state];
    for (p, s) in pairs {
        states = states.into_iter().flat_map(|st| go(p, s, st)).collect();
        if states.is_empty() {
            break;
        }
    }
    states
}

fn application(p: &Application, s: &Application, state: MatchState) -> States {
    if p.args().len() != s.args().len() {
        return SmallVec::new();
    }
    let states = match (p.label(), s.label()) {
        (Label::Constant(a), Label::Constant(b)) if a == b => smallvec![state],
        (Label::Freezer(a), Label::Freezer(b)) => go(a, b, state),
        _ => return SmallVec::new(),
    };
    states
        .into_iter()
        .flat_map(|st| all(p.args().iter().zip(s.args()), st))
        .collect()
}

/// Items and frame of a term read as a sequence.
pub(crate) fn sequence_view(term: &Term) -> (Vec<Term>, Option<Variable>) {
    match term.kind() {
        TermKind::Sequence(seq) => (seq.items().to_vec(), seq.frame().copied()),
        TermKind::Variable(var) if var.sort() == Sort::k() => (Vec::new(), Some(*var)),
        _ => (vec![term.clone()], None),
    }
}

fn is_segment_variable(term: &Term) -> Option<&Variable> {
    term.as_variable().filter(|v| v.sort() == Sort::k())
}

fn rebuild_sequence(items: &[Term], frame: Option<Variable>) -> Term {
    let mut builder = SequenceBuilder::new();
    builder.concatenate(items);
    if let Some(frame) = frame {
        builder.add(&Term::variable(frame));
    }
    builder.build()
}

fn sequence(
    p_items: &[Term],
    p_frame: Option<Variable>,
    s_items: &[Term],
    s_frame: Option<Variable>,
    state: MatchState,
) -> States {
    let Some((first, rest)) = p_items.split_first() else {
        return match p_frame {
            Some(frame) => bind(&frame, &rebuild_sequence(s_items, s_frame), state),
            None if s_items.is_empty() && s_frame.is_none() => smallvec![state],
            None => SmallVec::new(),
        };
    };

    if let Some(segment) = is_segment_variable(first) {
        // A trailing segment absorbs everything, including the subject's frame.
        if rest.is_empty() && p_frame.is_none() {
            return bind(segment, &rebuild_sequence(s_items, s_frame), state);
        }
        let mut out = States::new();
        for split in 0..=s_items.len() {
            let prefix = rebuild_sequence(&s_items[..split], None);
            for st in bind(segment, &prefix, state.clone()) {
                out.extend(sequence(rest, p_frame, &s_items[split..], s_frame, st));
            }
        }
        return out;
    }

    let Some((s_first, s_rest)) = s_items.split_first() else {
        return SmallVec::new();
    };
    go(first, s_first, state)
        .into_iter()
        .flat_map(|st| sequence(rest, p_frame, s_rest, s_frame, st))
        .collect()
}

fn list(p: &ListCollection, s: &ListCollection, state: MatchState) -> States {
    if !s.is_concrete() {
        // Symbolic subjects only match a pattern of the same shape.
        if p.left().len() != s.left().len()
            || p.right().len() != s.right().len()
            || p.base().len() != s.base().len()
        {
            return SmallVec::new();
        }
        let pairs = p
            .left()
            .iter()
            .zip(s.left())
            .chain(p.base().iter().zip(s.base()))
            .chain(p.right().iter().zip(s.right()));
        return all(pairs, state);
    }

    let items = s.left();
    let (left, right) = (p.left().len(), p.right().len());
    if left + right > items.len() || (p.base().is_empty() && left + right != items.len()) {
        return SmallVec::new();
    }
    let middle = &items[left..items.len() - right];
    let edges = p
        .left()
        .iter()
        .zip(&items[..left])
        .chain(p.right().iter().zip(&items[items.len() - right..]));
    all(edges, state)
        .into_iter()
        .flat_map(|st| list_middle(p, p.base(), middle, st))
        .collect()
}

/// Match the unresolved middle of a list pattern against concrete items.
fn list_middle(p: &ListCollection, bases: &[Term], items: &[Term], state: MatchState) -> States {
    let Some((first, rest)) = bases.split_first() else {
        return if items.is_empty() {
            smallvec![state]
        } else {
            SmallVec::new()
        };
    };
    if let TermKind::List(sub) = first.kind() {
        // A concrete run between two bases.
        let n = sub.left().len();
        if sub.is_concrete() && n <= items.len() {
            return all(sub.left().iter().zip(&items[..n]), state)
                .into_iter()
                .flat_map(|st| list_middle(p, rest, &items[n..], st))
                .collect();
        }
        return SmallVec::new();
    }
    let splits: Vec<usize> = if rest.is_empty() {
        vec![items.len()]
    } else {
        (0..=items.len()).collect()
    };
    let mut out = States::new();
    for split in splits {
        let mut builder = ListBuilder::new(p.ops());
        for item in &items[..split] {
            builder.add_item(item.clone());
        }
        let chunk = builder.build();
        for st in go(first, &chunk, state.clone()) {
            out.extend(list_middle(p, rest, &items[split..], st));
        }
    }
    out
}

fn map(p: &MapCollection, s: &MapCollection, state: MatchState) -> States {
    let entries: Vec<(&Term, &Term)> = p.entries().iter().collect();
    map_entries(p, s, &entries, &mut Vec::new(), state)
}

fn map_entries<'a>(
    p: &MapCollection,
    s: &'a MapCollection,
    pending: &[(&Term, &Term)],
    used: &mut Vec<&'a Term>,
    state: MatchState,
) -> States {
    let Some(((key, value), rest)) = pending.split_first() else {
        let mut remainder = MapBuilder::new(s.ops());
        for (k, v) in s.entries() {
            if !used.contains(&k) {
                remainder.put(k.clone(), v.clone());
            }
        }
        for base in s.base() {
            remainder.concatenate(base);
        }
        return frame(p.base(), remainder.build(), state);
    };

    let key = state.substitution.apply(key);
    let mut out = States::new();
    if key.is_ground() {
        if let Some((s_key, s_value)) = s.entries().get_key_value(&key) {
            if !used.contains(&s_key) {
                used.push(s_key);
                for st in go(value, s_value, state) {
                    out.extend(map_entries(p, s, rest, used, st));
                }
                used.pop();
            }
        }
        return out;
    }
    for (s_key, s_value) in s.entries() {
        if used.contains(&s_key) {
            continue;
        }
        used.push(s_key);
        for st in go(&key, s_key, state.clone()) {
            for st in go(value, s_value, st) {
                out.extend(map_entries(p, s, rest, used, st));
            }
        }
        used.pop();
    }
    out
}

fn set(p: &SetCollection, s: &SetCollection, state: MatchState) -> States {
    let elements: Vec<&Term> = p.elements().iter().collect();
    set_elements(p, s, &elements, &mut Vec::new(), state)
}

fn set_elements<'a>(
    p: &SetCollection,
    s: &'a SetCollection,
    pending: &[&Term],
    used: &mut Vec<&'a Term>,
    state: MatchState,
) -> States {
    let Some((element, rest)) = pending.split_first() else {
        let mut remainder = SetBuilder::new(s.ops());
        for e in s.elements() {
            if !used.contains(&e) {
                remainder.add(e.clone());
            }
        }
        for base in s.base() {
            remainder.concatenate(base);
        }
        return frame(p.base(), remainder.build(), state);
    };

    let element = state.substitution.apply(element);
    let mut out = States::new();
    for candidate in s.elements() {
        if used.contains(&candidate) || (element.is_ground() && element != *candidate) {
            continue;
        }
        used.push(candidate);
        for st in go(&element, candidate, state.clone()) {
            out.extend(set_elements(p, s, rest, used, st));
        }
        used.pop();
    }
    out
}

fn cells(p: &CellCollection, s: &CellCollection, state: MatchState) -> States {
    cell_list(p, s, 0, &mut Vec::new(), state)
}

fn cell_list(
    p: &CellCollection,
    s: &CellCollection,
    next: usize,
    used: &mut Vec<usize>,
    state: MatchState,
) -> States {
    let Some(cell) = p.cells().get(next) else {
        let mut remainder = CellBuilder::new();
        for (i, c) in s.cells().iter().enumerate() {
            if !used.contains(&i) {
                remainder.put(c.label, c.multiplicity, c.content.clone());
            }
        }
        for frame_var in s.frames() {
            remainder.concatenate(&Term::variable(*frame_var));
        }
        let frames: Vec<Term> = p.frames().iter().map(|v| Term::variable(*v)).collect();
        return frame(&frames, remainder.build(), state);
    };

    let mut out = States::new();
    for (i, candidate) in s.cells().iter().enumerate() {
        if candidate.label != cell.label || used.contains(&i) {
            continue;
        }
        used.push(i);
        for st in go(&cell.content, &candidate.content, state.clone()) {
            out.extend(cell_list(p, s, next + 1, used, st));
        }
        used.pop();
    }
    out
}

/// Match what is left of a collection against the pattern's bases.
fn frame(bases: &[Term], remainder: Term, state: MatchState) -> States {
    match bases {
        [] if is_empty_collection(&remainder) => smallvec![state],
        [] => SmallVec::new(),
        [base] => go(base, &remainder, state),
        _ => SmallVec::new(),
    }
}

fn is_empty_collection(term: &Term) -> bool {
    match term.kind() {
        TermKind::Map(m) => m.entries().is_empty() && m.base().is_empty(),
        TermKind::Set(s) => s.elements().is_empty() && s.base().is_empty(),
        TermKind::Cells(c) => c.cells().is_empty() && c.frames().is_empty(),
        _ => false,
    }
}
