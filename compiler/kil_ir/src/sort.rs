//! Sorts of the K term language.

use std::fmt;

use crate::well_known::names;
use crate::Name;

/// An interned sort name.
///
/// Subsorting is intentionally shallow: every sort is below `K`, every sort
/// other than `K` is below `KItem`, and otherwise sorts must coincide.
/// User-declared subsort lattices are resolved by the front end.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Sort(Name);

impl Sort {
    pub fn new(name: &str) -> Self {
        Sort(Name::intern(name))
    }

    #[inline]
    pub const fn from_name(name: Name) -> Self {
        Sort(name)
    }

    #[inline]
    pub const fn name(self) -> Name {
        self.0
    }

    #[inline]
    pub fn k() -> Self {
        names().sorts.k
    }

    #[inline]
    pub fn kitem() -> Self {
        names().sorts.kitem
    }

    #[inline]
    pub fn bool() -> Self {
        names().sorts.bool_
    }

    #[inline]
    pub fn int() -> Self {
        names().sorts.int
    }

    #[inline]
    pub fn string() -> Self {
        names().sorts.string
    }

    #[inline]
    pub fn bag() -> Self {
        names().sorts.bag
    }

    /// `K` and `KItem`: the sorts a rewrite position may hold.
    pub fn is_computational(self) -> bool {
        let sorts = &names().sorts;
        self == sorts.k || self == sorts.kitem
    }

    /// Sorts whose tokens carry a primitive value.
    pub fn is_builtin_data(self) -> bool {
        names().sorts.builtin_data.contains(&self)
    }

    pub fn is_subsort_of(self, other: Sort) -> bool {
        let sorts = &names().sorts;
        self == other || other == sorts.k || (other == sorts.kitem && self != sorts.k)
    }
}

impl fmt::Debug for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sort({})", self.0)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
