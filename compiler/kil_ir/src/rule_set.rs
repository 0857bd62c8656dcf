//! Compact sets of rule identifiers.
//!
//! Automaton branches are annotated with the rules that share them. Most
//! definitions merge fewer than 128 rules at any position, so the words live
//! inline.

use std::fmt;

use smallvec::SmallVec;

const WORD_BITS: usize = 64;

/// A bit-set of rule ids.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct RuleSet {
    words: SmallVec<[u64; 2]>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(rule: usize) -> Self {
        let mut set = Self::new();
        set.insert(rule);
        set
    }

    pub fn insert(&mut self, rule: usize) {
        let word = rule / WORD_BITS;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (rule % WORD_BITS);
    }

    pub fn contains(&self, rule: usize) -> bool {
        self.words
            .get(rule / WORD_BITS)
            .is_some_and(|w| w & (1u64 << (rule % WORD_BITS)) != 0)
    }

    pub fn union_with(&mut self, other: &RuleSet) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    #[must_use]
    pub fn intersection(&self, other: &RuleSet) -> RuleSet {
        let mut words: SmallVec<[u64; 2]> = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| a & b)
            .collect();
        while words.last() == Some(&0) {
            words.pop();
        }
        RuleSet { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Rule ids in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| i * WORD_BITS + bit)
        })
    }
}

impl FromIterator<usize> for RuleSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = RuleSet::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
