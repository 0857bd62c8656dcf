//! Cheap structural fingerprints for pruning candidate rules.
//!
//! Before a rule is matched against a redex, the rewrite driver compares the
//! [`IndexingPair`] of the rule's left-hand side with the pair of the subject.
//! Pairs are a sound over-approximation: when [`IndexingPair::is_unifiable`]
//! returns `false` no substitution can make the two terms equal; when it
//! returns `true` a full match is still required.

mod index;
mod pair;
mod table;

pub use index::{index, Index};
pub use pair::{indexing_pair, IndexingData, IndexingPair};
pub use table::IndexingTable;
