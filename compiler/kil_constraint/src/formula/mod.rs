//! Conjunctions of equalities with deferred collection constraints.
//!
//! [`ConjunctiveFormula::add`] decomposes an equality structurally and binds
//! variables as soon as it can. What it cannot decide stays behind as a
//! residual equality (for instance an equality under a function symbol).
//!
//! Equalities over `Map:lookup`, `Set:in`, `List:get`, `Map:choice` and
//! `Set:choice` are [`Deferred`]: they wait until their collection and key
//! are concrete enough. A lookup of a key that is absent from a fully
//! concrete collection makes the whole conjunction false. Choices are never
//! resolved by `simplify`; [`ConjunctiveFormula::choices`] enumerates them.

use std::fmt;
use std::sync::Arc;

use kil_ir::well_known::names;
use kil_ir::{Name, Term, TermKind};
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::Substitution;

mod choices;
mod unify;

pub use choices::Choices;

/// A constraint waiting for its collection to become concrete.
#[derive(Clone, Debug, PartialEq)]
pub enum Deferred {
    /// `Map:lookup(map, key) = value`
    MapLookup { map: Term, key: Term, value: Term },
    /// `Set:in(element, set) = holds`
    SetMember { set: Term, element: Term, holds: Term },
    /// `List:get(list, index) = value`
    ListGet { list: Term, index: Term, value: Term },
    /// `Map:choice(map) = key`: `key` is some key of `map`.
    MapChoice { map: Term, key: Term },
    /// `Set:choice(set) = element`: `element` is some element of `set`.
    SetChoice { set: Term, element: Term },
}

impl Deferred {
    /// Recognize a deferred equality from either orientation.
    pub fn from_equality(left: &Term, right: &Term) -> Option<Deferred> {
        Self::from_call(left, right).or_else(|| Self::from_call(right, left))
    }

    fn from_call(call: &Term, result: &Term) -> Option<Deferred> {
        let app = call.as_application()?;
        let label = app.constant_label()?;
        let labels = &names().labels;
        let args = app.args();
        let result = result.clone();
        let deferred = match args {
            [map, key] if label == labels.map_lookup => Deferred::MapLookup {
                map: map.clone(),
                key: key.clone(),
                value: result,
            },
            [element, set] if label == labels.set_in => Deferred::SetMember {
                set: set.clone(),
                element: element.clone(),
                holds: result,
            },
            [list, index] if label == labels.list_get => Deferred::ListGet {
                list: list.clone(),
                index: index.clone(),
                value: result,
            },
            [map] if label == labels.map_choice_fn => Deferred::MapChoice {
                map: map.clone(),
                key: result,
            },
            [set] if label == labels.set_choice_fn => Deferred::SetChoice {
                set: set.clone(),
                element: result,
            },
            _ => return None,
        };
        Some(deferred)
    }

    fn apply(&self, subst: &Substitution) -> Deferred {
        match self {
            Deferred::MapLookup { map, key, value } => Deferred::MapLookup {
                map: subst.apply(map),
                key: subst.apply(key),
                value: subst.apply(value),
            },
            Deferred::SetMember { set, element, holds } => Deferred::SetMember {
                set: subst.apply(set),
                element: subst.apply(element),
                holds: subst.apply(holds),
            },
            Deferred::ListGet { list, index, value } => Deferred::ListGet {
                list: subst.apply(list),
                index: subst.apply(index),
                value: subst.apply(value),
            },
            Deferred::MapChoice { map, key } => Deferred::MapChoice {
                map: subst.apply(map),
                key: subst.apply(key),
            },
            Deferred::SetChoice { set, element } => Deferred::SetChoice {
                set: subst.apply(set),
                element: subst.apply(element),
            },
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, Deferred::MapChoice { .. } | Deferred::SetChoice { .. })
    }
}

/// Outcome of trying to resolve one deferred constraint.
enum Resolution {
    /// Replaced by an ordinary equality.
    Equality(Term, Term),
    /// Holds outright.
    Holds,
    /// Cannot hold.
    Fails,
    /// Not decidable yet.
    Pending(Deferred),
}

fn resolve(deferred: &Deferred) -> Resolution {
    let pending = || Resolution::Pending(deferred.clone());
    match deferred {
        Deferred::MapLookup { map, key, value } => match map.kind() {
            TermKind::Map(m) if key.is_ground() => match m.get(key) {
                Some(found) => Resolution::Equality(value.clone(), found.clone()),
                None if m.is_concrete() => Resolution::Fails,
                None => pending(),
            },
            _ => pending(),
        },
        Deferred::SetMember { set, element, holds } => match set.kind() {
            TermKind::Set(s) if element.is_ground() && s.contains(element) => {
                Resolution::Equality(holds.clone(), Term::bool(true))
            }
            TermKind::Set(s) if s.is_concrete() && (element.is_ground() || s.elements().is_empty()) => {
                Resolution::Equality(holds.clone(), Term::bool(false))
            }
            _ => pending(),
        },
        Deferred::ListGet { list, index, value } => {
            let position = index.as_token().and_then(|t| t.as_int());
            match (list.kind(), position) {
                (TermKind::List(l), Some(i)) if l.is_concrete() => {
                    let len = i128::try_from(l.left().len()).unwrap_or(i128::MAX);
                    let i = if i < 0 { i + len } else { i };
                    match usize::try_from(i).ok().and_then(|i| l.get(i)) {
                        Some(item) => Resolution::Equality(value.clone(), item.clone()),
                        None => Resolution::Fails,
                    }
                }
                _ => pending(),
            }
        }
        Deferred::MapChoice { map, key } => match map.kind() {
            TermKind::Map(m) if key.is_ground() && m.get(key).is_some() => Resolution::Holds,
            TermKind::Map(m) if m.is_concrete() && (key.is_ground() || m.entries().is_empty()) => {
                Resolution::Fails
            }
            _ => pending(),
        },
        Deferred::SetChoice { set, element } => match set.kind() {
            TermKind::Set(s) if element.is_ground() && s.contains(element) => Resolution::Holds,
            TermKind::Set(s)
                if s.is_concrete() && (element.is_ground() || s.elements().is_empty()) =>
            {
                Resolution::Fails
            }
            _ => pending(),
        },
    }
}

/// A conjunction of equalities.
#[derive(Clone, Default)]
pub struct ConjunctiveFormula {
    substitution: Substitution,
    equalities: Vec<(Term, Term)>,
    deferred: Vec<Deferred>,
    falsified: bool,
    /// Labels whose applications are not constructors.
    functions: Option<Arc<FxHashSet<Name>>>,
}

impl ConjunctiveFormula {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat applications of `functions` as undecidable instead of as
    /// constructors that must agree.
    #[must_use]
    pub fn with_functions(mut self, functions: Arc<FxHashSet<Name>>) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn from_substitution(substitution: Substitution) -> Self {
        ConjunctiveFormula {
            substitution,
            ..Self::default()
        }
    }

    /// Conjoin `left = right`.
    pub fn add(&mut self, left: Term, right: Term) -> &mut Self {
        if self.falsified {
            return self;
        }
        match Deferred::from_equality(&left, &right) {
            Some(deferred) => self.add_deferred(deferred),
            None => {
                self.unify(left, right);
                self
            }
        }
    }

    /// Conjoin a deferred constraint, resolving it right away if possible.
    pub fn add_deferred(&mut self, deferred: Deferred) -> &mut Self {
        if self.falsified {
            return self;
        }
        match resolve(&deferred.apply(&self.substitution)) {
            Resolution::Equality(left, right) => {
                self.unify(left, right);
            }
            Resolution::Holds => {}
            Resolution::Fails => self.falsify("absent collection key"),
            Resolution::Pending(deferred) => {
                if !self.deferred.contains(&deferred) {
                    self.deferred.push(deferred);
                }
            }
        }
        self
    }

    /// Conjoin every binding of `substitution`.
    pub fn add_substitution(&mut self, substitution: &Substitution) -> &mut Self {
        for (var, value) in substitution.iter() {
            self.add(Term::variable(*var), value.clone());
        }
        self
    }

    /// Conjoin everything `other` states.
    pub fn add_all(&mut self, other: &ConjunctiveFormula) -> &mut Self {
        if other.falsified {
            self.falsify("conjoined a false formula");
            return self;
        }
        self.add_substitution(&other.substitution);
        for (left, right) in &other.equalities {
            self.add(left.clone(), right.clone());
        }
        for deferred in &other.deferred {
            self.add_deferred(deferred.clone());
        }
        self
    }

    /// Re-apply the substitution to everything pending until nothing changes.
    pub fn simplify(&mut self) -> &mut Self {
        loop {
            if self.falsified {
                return self;
            }
            let before = (self.substitution.len(), self.equalities.len(), self.deferred.len());
            let equalities = std::mem::take(&mut self.equalities);
            let deferred = std::mem::take(&mut self.deferred);
            let snapshot = self.substitution.clone();
            for (left, right) in equalities {
                self.add(left, right);
            }
            for entry in deferred {
                self.add_deferred(entry);
            }
            let after = (self.substitution.len(), self.equalities.len(), self.deferred.len());
            if before == after && snapshot == self.substitution {
                return self;
            }
        }
    }

    pub(crate) fn falsify(&mut self, reason: &str) {
        trace!(reason, "constraint falsified");
        self.falsified = true;
        self.equalities.clear();
        self.deferred.clear();
    }

    pub fn is_false(&self) -> bool {
        self.falsified
    }

    /// Trivially true: nothing bound, nothing pending.
    pub fn is_true(&self) -> bool {
        !self.falsified
            && self.substitution.is_empty()
            && self.equalities.is_empty()
            && self.deferred.is_empty()
    }

    /// Satisfiable and fully described by its substitution.
    pub fn is_substitution(&self) -> bool {
        !self.falsified && self.equalities.is_empty() && self.deferred.is_empty()
    }

    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// Residual equalities that could not be decided.
    pub fn equalities(&self) -> &[(Term, Term)] {
        &self.equalities
    }

    pub fn deferred(&self) -> &[Deferred] {
        &self.deferred
    }

    /// Instantiate `term` with the current bindings.
    pub fn apply(&self, term: &Term) -> Term {
        self.substitution.apply(term)
    }

    /// Every way of resolving the pending choices, produced lazily.
    pub fn choices(&self) -> Choices {
        Choices::new(self)
    }

    fn is_function(&self, term: &Term) -> bool {
        let Some(functions) = &self.functions else {
            return false;
        };
        term.constant_label()
            .is_some_and(|label| functions.contains(&label))
    }
}

impl fmt::Debug for ConjunctiveFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for ConjunctiveFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.falsified {
            return f.write_str("false");
        }
        let mut parts: Vec<String> = Vec::new();
        let mut bindings: Vec<_> = self.substitution.iter().collect();
        bindings.sort_by_key(|(v, _)| (v.name().as_str(), v.id()));
        parts.extend(bindings.into_iter().map(|(v, t)| format!("{v} = {t}")));
        parts.extend(self.equalities.iter().map(|(l, r)| format!("{l} = {r}")));
        parts.extend(self.deferred.iter().map(|d| match d {
            Deferred::MapLookup { map, key, value } => format!("{map}[{key}] = {value}"),
            Deferred::SetMember { set, element, holds } => format!("({element} in {set}) = {holds}"),
            Deferred::ListGet { list, index, value } => format!("{list}[{index}] = {value}"),
            Deferred::MapChoice { map, key } => format!("{key} choice of {map}"),
            Deferred::SetChoice { set, element } => format!("{element} choice of {set}"),
        }));
        if parts.is_empty() {
            return f.write_str("true");
        }
        f.write_str(&parts.join(" /\\ "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests inspect known formulas")]
mod tests;
