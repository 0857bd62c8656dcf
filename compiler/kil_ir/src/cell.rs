//! Cell multiplicities and the configuration's cell table.

use rustc_hash::FxHashMap;

use crate::{Name, Sort};

/// How many instances of a cell a configuration may hold.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum Multiplicity {
    /// Exactly one instance.
    #[default]
    One,
    /// `?`: zero or one instance.
    Optional,
    /// `*`: any number of instances.
    Any,
    /// `+`: one or more instances.
    AtLeastOne,
}

impl Multiplicity {
    /// Parse the front end's multiplicity attribute (`1`, `?`, `*`, `+`).
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "1" => Some(Multiplicity::One),
            "?" => Some(Multiplicity::Optional),
            "*" => Some(Multiplicity::Any),
            "+" => Some(Multiplicity::AtLeastOne),
            _ => None,
        }
    }

    /// Whether several instances of the cell may coexist.
    pub fn is_multiple(self) -> bool {
        matches!(self, Multiplicity::Any | Multiplicity::AtLeastOne)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Multiplicity::One => "1",
            Multiplicity::Optional => "?",
            Multiplicity::Any => "*",
            Multiplicity::AtLeastOne => "+",
        }
    }
}

/// Declared shape of one cell.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CellInfo {
    pub multiplicity: Multiplicity,
    /// Sort of the cell's content.
    pub sort: Sort,
    /// Enclosing cell, `None` for the top cell.
    pub parent: Option<Name>,
}

/// The configuration's cell-label table.
#[derive(Clone, Debug, Default)]
pub struct CellConfig {
    cells: FxHashMap<Name, CellInfo>,
}

impl CellConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, label: Name, info: CellInfo) {
        self.cells.insert(label, info);
    }

    pub fn get(&self, label: Name) -> Option<&CellInfo> {
        self.cells.get(&label)
    }

    pub fn is_cell(&self, label: Name) -> bool {
        self.cells.contains_key(&label)
    }

    pub fn multiplicity(&self, label: Name) -> Multiplicity {
        self.cells
            .get(&label)
            .map_or(Multiplicity::One, |info| info.multiplicity)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
