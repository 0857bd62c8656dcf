//! The constraint store.
//!
//! Two entry points share one notion of binding, [`Substitution`]:
//!
//! - [`match_all`] / [`match_from`]: one-way matching of a rule pattern
//!   against a subject, returning every way the pattern can be instantiated.
//!   Patterns may contain rewrite markers (matched by their left side) and
//!   automaton disjunctions (which narrow the set of live rules).
//! - [`ConjunctiveFormula`]: a conjunction of equalities built up with `add`.
//!   Plain equalities are unified eagerly; collection lookups and choices are
//!   deferred until their collection is concrete enough to resolve them.

mod formula;
mod matcher;
mod substitution;

pub use formula::{Choices, ConjunctiveFormula, Deferred};
pub use matcher::{match_all, match_from, MatchState};
pub use substitution::Substitution;

/// Unify two terms from scratch.
///
/// The result is false when the terms provably cannot be made equal; it may
/// keep residual equalities it could not decide.
pub fn unify(left: &kil_ir::Term, right: &kil_ir::Term) -> ConjunctiveFormula {
    let mut formula = ConjunctiveFormula::new();
    formula.add(left.clone(), right.clone());
    formula
}
