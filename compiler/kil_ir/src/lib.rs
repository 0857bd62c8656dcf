//! KIL IR - the term model of the K rule compiler.
//!
//! This crate contains the data structures every other phase builds on:
//! - Names for interned labels, sorts and literals
//! - Locations and attribute bags carried from the front end
//! - The hash-consed [`Term`] type with its builders
//! - Rule-id bit-sets and the automaton disjunction node
//!
//! # Design Philosophy
//!
//! - **Intern constants**: tokens, nullary applications, label injections and
//!   the hole are canonical instances, so identity equality is structural equality.
//! - **Hash once**: every node caches its structural hash and [`TermFlags`] at
//!   construction; equality checks the hash before comparing children.
//! - **Freeze on build**: builders are uniquely owned and consumed by `build`.

mod att;
mod cell;
mod interner;
mod location;
mod name;
mod rule_set;
mod sort;
pub mod stack;
pub mod term;
pub mod unshare;
pub mod visit;
pub mod well_known;

pub use att::Att;
pub use cell::{CellConfig, CellInfo, Multiplicity};
pub use interner::{InternError, StringInterner};
pub use location::{Location, Span};
pub use name::Name;
pub use rule_set::RuleSet;
pub use sort::Sort;
pub use term::{
    intern, Application, Cell, CellBuilder, CellCollection, CollectionOps, Disjunction, InnerRhs,
    InternKey, Label, ListBuilder, ListCollection, MapBuilder, MapCollection, Rewrite,
    SequenceBuilder, Sequence, SetBuilder, SetCollection, Term, TermFlags, TermKind, Token,
    Variable,
};
