//! Pre-interned names for hot-path dispatch.
//!
//! Passes, the evaluator and the indexer compare labels and sorts against
//! these values (a single `u32 == u32` check) instead of interning strings on
//! every visit. Interned once per process on first use.

use std::sync::OnceLock;

use crate::{Name, Sort};

/// Built-in sorts.
pub struct SortNames {
    pub k: Sort,
    pub kitem: Sort,
    pub klabel: Sort,
    pub klist: Sort,
    pub bool_: Sort,
    pub int: Sort,
    pub float: Sort,
    pub string: Sort,
    pub id: Sort,
    pub map: Sort,
    pub set: Sort,
    pub list: Sort,
    pub bag: Sort,
    /// Sorts whose tokens are indexed by sort.
    pub builtin_data: [Sort; 5],
}

/// Labels with fixed meaning in the compiler and evaluator.
pub struct LabelNames {
    pub kseq: Name,
    pub dot_k: Name,
    pub hole: Name,
    pub freezer: Name,
    pub and_bool: Name,
    pub or_bool: Name,
    pub not_bool: Name,
    pub implies_bool: Name,
    pub eq_k: Name,
    pub neq_k: Name,
    pub match_: Name,
    pub map_choice: Name,
    pub set_choice: Name,
    pub map_lookup: Name,
    pub map_choice_fn: Name,
    pub set_choice_fn: Name,
    pub set_in: Name,
    pub list_get: Name,
    pub map_item: Name,
    pub set_item: Name,
    pub list_item: Name,
    pub true_: Name,
    pub false_: Name,
}

/// Variable names reserved by the compiler.
pub struct VariableNames {
    /// Marker for variables that need no binding.
    pub dont_care: Name,
    /// Bound to the whole configuration by the rewrite driver.
    pub this_configuration: Name,
}

pub struct WellKnown {
    pub sorts: SortNames,
    pub labels: LabelNames,
    pub variables: VariableNames,
}

static WELL_KNOWN: OnceLock<WellKnown> = OnceLock::new();

/// The process-wide table of pre-interned names.
pub fn names() -> &'static WellKnown {
    WELL_KNOWN.get_or_init(WellKnown::new)
}

impl WellKnown {
    fn new() -> Self {
        let sort = |s: &str| Sort::from_name(Name::intern(s));
        let int = sort("Int");
        let bool_ = sort("Bool");
        let float = sort("Float");
        let string = sort("String");
        let id = sort("Id");
        WellKnown {
            sorts: SortNames {
                k: sort("K"),
                kitem: sort("KItem"),
                klabel: sort("KLabel"),
                klist: sort("KList"),
                bool_,
                int,
                float,
                string,
                id,
                map: sort("Map"),
                set: sort("Set"),
                list: sort("List"),
                bag: sort("Bag"),
                builtin_data: [bool_, int, float, string, id],
            },
            labels: LabelNames {
                kseq: Name::intern("#KSequence"),
                dot_k: Name::intern("#EmptyK"),
                hole: Name::intern("#hole"),
                freezer: Name::intern("#freezer"),
                and_bool: Name::intern("_andBool_"),
                or_bool: Name::intern("_orBool_"),
                not_bool: Name::intern("notBool_"),
                implies_bool: Name::intern("_impliesBool_"),
                eq_k: Name::intern("_==K_"),
                neq_k: Name::intern("_=/=K_"),
                match_: Name::intern("#match"),
                map_choice: Name::intern("#mapChoice"),
                set_choice: Name::intern("#setChoice"),
                map_lookup: Name::intern("Map:lookup"),
                map_choice_fn: Name::intern("Map:choice"),
                set_choice_fn: Name::intern("Set:choice"),
                set_in: Name::intern("Set:in"),
                list_get: Name::intern("List:get"),
                map_item: Name::intern("_|->_"),
                set_item: Name::intern("SetItem"),
                list_item: Name::intern("ListItem"),
                true_: Name::intern("true"),
                false_: Name::intern("false"),
            },
            variables: VariableNames {
                dont_care: Name::intern("THE_VARIABLE"),
                this_configuration: Name::intern("THIS_CONFIGURATION"),
            },
        }
    }
}
