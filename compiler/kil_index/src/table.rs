use rustc_hash::FxHashMap;

use crate::{Index, IndexingPair};

/// Rule ids bucketed by the first index of their left-hand side.
#[derive(Clone, Debug, Default)]
pub struct IndexingTable {
    pairs: Vec<Option<IndexingPair>>,
    by_first: FxHashMap<Index, Vec<usize>>,
}

impl IndexingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the pair of `rule`.
    pub fn insert(&mut self, rule: usize, pair: IndexingPair) {
        if self.pairs.len() <= rule {
            self.pairs.resize(rule + 1, None);
        }
        if let Some(old) = self.pairs[rule].replace(pair) {
            if let Some(bucket) = self.by_first.get_mut(&old.first) {
                bucket.retain(|&r| r != rule);
            }
        }
        self.by_first.entry(pair.first).or_default().push(rule);
    }

    pub fn pair(&self, rule: usize) -> Option<IndexingPair> {
        self.pairs.get(rule).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.pairs.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rules whose pair is compatible with `subject`, in ascending id order.
    pub fn candidates(&self, subject: IndexingPair) -> Vec<usize> {
        let mut out: Vec<usize> = match subject.first {
            Index::Top => self.by_first.values().flatten().copied().collect(),
            first => [first, Index::Top]
                .iter()
                .filter_map(|index| self.by_first.get(index))
                .flatten()
                .copied()
                .collect(),
        };
        out.retain(|&rule| {
            self.pair(rule)
                .is_some_and(|pair| pair.is_unifiable(subject))
        });
        out.sort_unstable();
        out.dedup();
        out
    }
}
