use std::fmt;

use kil_ir::visit::substitute;
use kil_ir::{Term, Variable};
use rustc_hash::FxHashMap;

/// A binding of variables to terms.
///
/// Bindings are kept idempotent: no bound term mentions a bound variable, so
/// [`Substitution::apply`] needs a single pass.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    bindings: FxHashMap<Variable, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.bindings.get(var)
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.bindings.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.iter()
    }

    /// Bind `var` for one-way matching.
    ///
    /// Returns `false` when `var` is already bound to a different term.
    pub fn bind(&mut self, var: Variable, value: Term) -> bool {
        match self.bindings.get(&var) {
            Some(existing) => *existing == value,
            None => {
                self.bindings.insert(var, value);
                true
            }
        }
    }

    /// Bind `var` and propagate the binding into existing values.
    ///
    /// The caller guarantees `var` is unbound and does not occur in `value`.
    pub(crate) fn extend(&mut self, var: Variable, value: Term) {
        let value = self.apply(&value);
        let single = |v: &Variable| (*v == var).then(|| value.clone());
        for bound in self.bindings.values_mut() {
            if !bound.is_ground() {
                *bound = substitute(bound, &single);
            }
        }
        self.bindings.insert(var, value);
    }

    /// Instantiate `term`.
    pub fn apply(&self, term: &Term) -> Term {
        if self.bindings.is_empty() || term.is_ground() {
            return term.clone();
        }
        substitute(term, &|v| self.bindings.get(v).cloned())
    }

    /// Drop every binding not accepted by `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Variable) -> bool) {
        self.bindings.retain(|v, _| keep(v));
    }
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.bindings.iter().collect();
        entries.sort_by_key(|(v, _)| (v.name().as_str(), v.id()));
        f.debug_map().entries(entries).finish()
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.bindings.iter().collect();
        entries.sort_by_key(|(v, _)| (v.name().as_str(), v.id()));
        write!(f, "{{")?;
        for (i, (var, value)) in entries.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} |-> {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use kil_ir::{Sort, Term, Variable};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_bind_is_consistent() {
        let x = Variable::new("X", Sort::int());
        let mut subst = Substitution::new();
        assert!(subst.bind(x, Term::int(1)));
        assert!(subst.bind(x, Term::int(1)));
        assert!(!subst.bind(x, Term::int(2)));
    }

    #[test]
    fn test_extend_keeps_bindings_idempotent() {
        let x = Variable::new("X", Sort::kitem());
        let y = Variable::new("Y", Sort::int());
        let mut subst = Substitution::new();
        subst.extend(x, Term::apply("s", vec![Term::variable(y)]));
        subst.extend(y, Term::int(3));
        assert_eq!(
            subst.apply(&Term::variable(x)),
            Term::apply("s", vec![Term::int(3)])
        );
        assert_eq!(subst.to_string(), "{X |-> s(3), Y |-> 3}");
    }
}
