//! Attribute bags attached to front-end nodes, productions and rules.

use smallvec::SmallVec;

use crate::{Location, Name, Sort};

/// Key/value attributes with an optional source location.
///
/// Most sentences carry a handful of flags, so entries are kept inline and
/// looked up linearly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Att {
    entries: SmallVec<[(Name, Option<Name>); 4]>,
    location: Option<Location>,
}

impl Att {
    pub const FUNCTION: &'static str = "function";
    pub const ANYWHERE: &'static str = "anywhere";
    pub const MACRO: &'static str = "macro";
    pub const ALIAS: &'static str = "alias";
    pub const PATTERN: &'static str = "pattern";
    pub const PATTERN_FOLDING: &'static str = "pattern-folding";
    pub const ASSOC: &'static str = "assoc";
    pub const COMM: &'static str = "comm";
    pub const BAG: &'static str = "bag";
    pub const UNIT: &'static str = "unit";
    pub const ELEMENT: &'static str = "element";
    pub const HOOK: &'static str = "hook";
    pub const SORT: &'static str = "sort";
    pub const FRESH: &'static str = "fresh";
    pub const FRESH_VARIABLE: &'static str = "fresh-variable";
    pub const MULTIPLICITY: &'static str = "multiplicity";
    pub const LABEL: &'static str = "label";
    pub const TAG: &'static str = "tag";
    pub const CELL: &'static str = "cell";

    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flag with no value.
    #[must_use]
    pub fn with(mut self, key: &str) -> Self {
        self.insert(key, None);
        self
    }

    #[must_use]
    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.insert(key, Some(Name::intern(value)));
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    fn insert(&mut self, key: &str, value: Option<Name>) {
        let key = Name::intern(key);
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        let key = Name::intern(key);
        self.entries.iter().any(|(k, _)| *k == key)
    }

    /// Value of `key`, if present with a value.
    pub fn get(&self, key: &str) -> Option<&'static str> {
        let key = Name::intern(key);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.map(Name::as_str))
    }

    pub fn sort(&self) -> Option<Sort> {
        self.get(Self::SORT).map(Sort::new)
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Copy the entries of `other` that are not already present.
    pub fn inherit(&mut self, other: &Att) {
        for &(key, value) in &other.entries {
            if !self.entries.iter().any(|(k, _)| *k == key) {
                self.entries.push((key, value));
            }
        }
        if self.location.is_none() {
            self.location = other.location;
        }
    }
}
