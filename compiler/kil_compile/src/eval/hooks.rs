//! Built-in operations.
//!
//! A hook only fires when its answer is certain: integer arithmetic needs
//! both operands as tokens and never overflows, `_==K_` answers `false` only
//! when the operands provably differ. Everything else is left unevaluated.

use std::sync::Arc;

use kil_constraint::ConjunctiveFormula;
use kil_ir::{Name, Sort, Term, TermKind};
use rustc_hash::FxHashSet;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    IntAdd,
    IntSub,
    IntMul,
    IntDiv,
    IntMod,
    IntLt,
    IntLe,
    IntGt,
    IntGe,
    IntEq,
    IntNe,
    BoolAnd,
    BoolOr,
    BoolNot,
    BoolImplies,
    KEq,
    KNe,
    MapLookup,
    SetIn,
    ListGet,
}

impl Hook {
    /// From a production's `hook` attribute.
    pub fn from_hook(hook: &str) -> Option<Hook> {
        let hook = match hook {
            "INT.add" => Hook::IntAdd,
            "INT.sub" => Hook::IntSub,
            "INT.mul" => Hook::IntMul,
            "INT.tdiv" => Hook::IntDiv,
            "INT.tmod" => Hook::IntMod,
            "INT.lt" => Hook::IntLt,
            "INT.le" => Hook::IntLe,
            "INT.gt" => Hook::IntGt,
            "INT.ge" => Hook::IntGe,
            "INT.eq" => Hook::IntEq,
            "INT.ne" => Hook::IntNe,
            "BOOL.and" => Hook::BoolAnd,
            "BOOL.or" => Hook::BoolOr,
            "BOOL.not" => Hook::BoolNot,
            "BOOL.implies" => Hook::BoolImplies,
            "KEQUAL.eq" => Hook::KEq,
            "KEQUAL.ne" => Hook::KNe,
            "MAP.lookup" => Hook::MapLookup,
            "SET.in" => Hook::SetIn,
            "LIST.get" => Hook::ListGet,
            _ => return None,
        };
        Some(hook)
    }

    /// Built-in labels that work without a production.
    pub fn from_label(label: &str) -> Option<Hook> {
        let hook = match label {
            "_+Int_" => Hook::IntAdd,
            "_-Int_" => Hook::IntSub,
            "_*Int_" => Hook::IntMul,
            "_/Int_" => Hook::IntDiv,
            "_%Int_" => Hook::IntMod,
            "_<Int_" => Hook::IntLt,
            "_<=Int_" => Hook::IntLe,
            "_>Int_" => Hook::IntGt,
            "_>=Int_" => Hook::IntGe,
            "_==Int_" => Hook::IntEq,
            "_=/=Int_" => Hook::IntNe,
            "_andBool_" => Hook::BoolAnd,
            "_orBool_" => Hook::BoolOr,
            "notBool_" => Hook::BoolNot,
            "_impliesBool_" => Hook::BoolImplies,
            "_==K_" => Hook::KEq,
            "_=/=K_" => Hook::KNe,
            "Map:lookup" => Hook::MapLookup,
            "Set:in" => Hook::SetIn,
            "List:get" => Hook::ListGet,
            _ => return None,
        };
        Some(hook)
    }

    /// Sort of the result, for built-in labels lowered without a production.
    pub fn result_sort(self) -> Option<Sort> {
        match self {
            Hook::IntAdd | Hook::IntSub | Hook::IntMul | Hook::IntDiv | Hook::IntMod => {
                Some(Sort::int())
            }
            Hook::MapLookup | Hook::ListGet => None,
            _ => Some(Sort::bool()),
        }
    }

    /// The result, when it is certain.
    pub fn apply(self, args: &[Term], functions: &Arc<FxHashSet<Name>>) -> Option<Term> {
        match (self, args) {
            (Hook::BoolNot, [a]) => as_bool(a).map(|a| Term::bool(!a)),
            (Hook::BoolAnd, [a, b]) => match (as_bool(a), as_bool(b)) {
                (Some(false), _) | (_, Some(false)) => Some(Term::bool(false)),
                (Some(true), _) => Some(b.clone()),
                (_, Some(true)) => Some(a.clone()),
                _ => None,
            },
            (Hook::BoolOr, [a, b]) => match (as_bool(a), as_bool(b)) {
                (Some(true), _) | (_, Some(true)) => Some(Term::bool(true)),
                (Some(false), _) => Some(b.clone()),
                (_, Some(false)) => Some(a.clone()),
                _ => None,
            },
            (Hook::BoolImplies, [a, b]) => match (as_bool(a), as_bool(b)) {
                (Some(false), _) | (_, Some(true)) => Some(Term::bool(true)),
                (Some(true), _) => Some(b.clone()),
                _ => None,
            },
            (Hook::KEq, [a, b]) => k_equal(a, b, functions).map(Term::bool),
            (Hook::KNe, [a, b]) => k_equal(a, b, functions).map(|eq| Term::bool(!eq)),
            (Hook::MapLookup, [map, key]) => match map.kind() {
                TermKind::Map(m) if key.is_ground() => m.get(key).cloned(),
                _ => None,
            },
            (Hook::SetIn, [element, set]) => match set.kind() {
                TermKind::Set(s) if element.is_ground() && s.contains(element) => {
                    Some(Term::bool(true))
                }
                TermKind::Set(s) if element.is_ground() && s.is_concrete() => Some(Term::bool(false)),
                _ => None,
            },
            (Hook::ListGet, [list, index]) => {
                let TermKind::List(l) = list.kind() else {
                    return None;
                };
                let index = as_int(index)?;
                let len = i128::try_from(l.left().len()).ok()?;
                let index = if index < 0 { index + len } else { index };
                l.get(usize::try_from(index).ok()?).cloned()
            }
            (_, [a, b]) => {
                let (a, b) = (as_int(a)?, as_int(b)?);
                integer(self, a, b)
            }
            _ => None,
        }
    }
}

fn integer(hook: Hook, a: i128, b: i128) -> Option<Term> {
    let value = match hook {
        Hook::IntAdd => a.checked_add(b)?,
        Hook::IntSub => a.checked_sub(b)?,
        Hook::IntMul => a.checked_mul(b)?,
        Hook::IntDiv => a.checked_div(b)?,
        Hook::IntMod => a.checked_rem(b)?,
        Hook::IntLt => return Some(Term::bool(a < b)),
        Hook::IntLe => return Some(Term::bool(a <= b)),
        Hook::IntGt => return Some(Term::bool(a > b)),
        Hook::IntGe => return Some(Term::bool(a >= b)),
        Hook::IntEq => return Some(Term::bool(a == b)),
        Hook::IntNe => return Some(Term::bool(a != b)),
        _ => return None,
    };
    Some(Term::int(value))
}

fn as_bool(term: &Term) -> Option<bool> {
    term.as_token().and_then(|t| t.as_bool())
}

fn as_int(term: &Term) -> Option<i128> {
    term.as_token().and_then(|t| t.as_int())
}

fn k_equal(a: &Term, b: &Term, functions: &Arc<FxHashSet<Name>>) -> Option<bool> {
    if a == b {
        return Some(true);
    }
    if a.is_ground() && b.is_ground() && !mentions(a, functions) && !mentions(b, functions) {
        return Some(false);
    }
    let mut formula = ConjunctiveFormula::new().with_functions(Arc::clone(functions));
    formula.add(a.clone(), b.clone());
    formula.is_false().then_some(false)
}

/// Whether `term` still contains an unevaluated function call.
fn mentions(term: &Term, functions: &FxHashSet<Name>) -> bool {
    let mut found = false;
    kil_ir::visit::for_each_subterm(term, &mut |t| {
        if t.constant_label().is_some_and(|l| functions.contains(&l)) {
            found = true;
        }
        !found
    });
    found
}
