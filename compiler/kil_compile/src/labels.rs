//! Per-label production metadata.

use std::sync::Arc;

use kil_ir::{Att, Name, Sort};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::kast::Production;

/// What a production declares about its label.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelInfo {
    pub sort: Sort,
    pub arity: usize,
    pub att: Att,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Map,
    Set,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionRole {
    Concat,
    Unit,
    Element,
}

/// Labels of a definition, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    labels: FxHashMap<Name, LabelInfo>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_productions<'a>(productions: impl IntoIterator<Item = &'a Production>) -> Self {
        let mut table = LabelTable::new();
        for production in productions {
            table.declare(production);
        }
        table
    }

    /// Later productions of the same label add attributes, they never drop any.
    pub fn declare(&mut self, production: &Production) {
        match self.labels.get_mut(&production.label) {
            Some(info) => info.att.inherit(&production.att),
            None => {
                self.labels.insert(
                    production.label,
                    LabelInfo {
                        sort: production.sort,
                        arity: production.arity,
                        att: production.att.clone(),
                    },
                );
            }
        }
    }

    pub fn get(&self, label: Name) -> Option<&LabelInfo> {
        self.labels.get(&label)
    }

    pub fn sort_of(&self, label: Name) -> Option<Sort> {
        self.get(label).map(|info| info.sort)
    }

    fn has(&self, label: Name, key: &str) -> bool {
        self.get(label).is_some_and(|info| info.att.contains(key))
    }

    pub fn is_function(&self, label: Name) -> bool {
        self.has(label, Att::FUNCTION)
    }

    pub fn is_anywhere(&self, label: Name) -> bool {
        self.has(label, Att::ANYWHERE)
    }

    pub fn hook(&self, label: Name) -> Option<&'static str> {
        self.get(label).and_then(|info| info.att.get(Att::HOOK))
    }

    /// Flattened into a list: associative without commutativity, or a bag.
    pub fn is_effectively_assoc(&self, label: Name) -> bool {
        let Some(info) = self.get(label) else {
            return false;
        };
        let att = &info.att;
        (att.contains(Att::ASSOC) && !att.contains(Att::COMM)) || att.contains(Att::BAG)
    }

    /// The unit constant of an associative label.
    pub fn unit(&self, label: Name) -> Option<Name> {
        self.get(label)
            .and_then(|info| info.att.get(Att::UNIT))
            .map(Name::intern)
    }

    /// The collection this label builds, from its `hook` attribute.
    pub fn collection(&self, label: Name) -> Option<(CollectionKind, CollectionRole)> {
        let (kind, role) = self.hook(label)?.split_once('.')?;
        let kind = match kind {
            "LIST" => CollectionKind::List,
            "MAP" => CollectionKind::Map,
            "SET" => CollectionKind::Set,
            _ => return None,
        };
        let role = match role {
            "concat" => CollectionRole::Concat,
            "unit" => CollectionRole::Unit,
            "element" => CollectionRole::Element,
            _ => return None,
        };
        Some((kind, role))
    }

    /// Labels that are evaluated rather than matched as constructors.
    pub fn functions(&self) -> Arc<FxHashSet<Name>> {
        Arc::new(
            self.labels
                .iter()
                .filter(|(_, info)| info.att.contains(Att::FUNCTION))
                .map(|(label, _)| *label)
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (Name, &LabelInfo)> {
        self.labels.iter().map(|(label, info)| (*label, info))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effectively_assoc() {
        let table = LabelTable::from_productions(&[
            Production::new("_,_", "Exps", 2)
                .with_att(Att::new().with(Att::ASSOC).with_value(Att::UNIT, ".Exps")),
            Production::new("_+_", "Exp", 2).with_att(Att::new().with(Att::ASSOC).with(Att::COMM)),
            Production::new("__", "Bag", 2).with_att(Att::new().with(Att::BAG)),
        ]);
        assert!(table.is_effectively_assoc(Name::intern("_,_")));
        assert!(!table.is_effectively_assoc(Name::intern("_+_")));
        assert!(table.is_effectively_assoc(Name::intern("__")));
        assert_eq!(table.unit(Name::intern("_,_")), Some(Name::intern(".Exps")));
    }

    #[test]
    fn test_collection_hooks() {
        let table = LabelTable::from_productions(&[
            Production::new("_Map_", "Map", 2).with_att(Att::new().with_value(Att::HOOK, "MAP.concat")),
            Production::new("_+Int_", "Int", 2).with_att(Att::new().with_value(Att::HOOK, "INT.add")),
        ]);
        assert_eq!(
            table.collection(Name::intern("_Map_")),
            Some((CollectionKind::Map, CollectionRole::Concat))
        );
        assert_eq!(table.collection(Name::intern("_+Int_")), None);
    }

    #[test]
    fn test_redeclaration_merges_attributes() {
        let mut table = LabelTable::new();
        table.declare(&Production::new("f", "Int", 1));
        table.declare(&Production::new("f", "Int", 1).with_att(Att::new().with(Att::FUNCTION)));
        assert!(table.is_function(Name::intern("f")));
        assert!(table.functions().contains(&Name::intern("f")));
    }
}
