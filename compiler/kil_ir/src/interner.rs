//! Interning table for labels, sorts, variable names and token text.
//!
//! Strings are spread over [`Name::NUM_SHARDS`] independently locked tables,
//! so concurrent compilations only contend when they hit the same shard.
//! Lookups take a read lock; a miss upgrades to insert-if-absent under the
//! write lock. A single process-wide instance backs [`Name`].

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use super::Name;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternError {
    /// A shard ran out of local ids.
    #[error("intern table shard {shard} is full ({count} entries, limit {limit})", limit = Name::MAX_LOCAL)]
    ShardOverflow { shard: usize, count: usize },
}

/// One lock's worth of the table. `by_id[i]` is the text of local id `i`.
#[derive(Default)]
struct Table {
    ids: FxHashMap<&'static str, u32>,
    by_id: Vec<&'static str>,
}

impl Table {
    fn insert_if_absent(&mut self, shard: usize, text: &str) -> Result<u32, InternError> {
        if let Some(&id) = self.ids.get(text) {
            return Ok(id);
        }
        let count = self.by_id.len();
        let id = match u32::try_from(count) {
            Ok(id) if id <= Name::MAX_LOCAL => id,
            _ => return Err(InternError::ShardOverflow { shard, count }),
        };
        // Entries are never removed, so the text lives as long as the process.
        let text: &'static str = Box::leak(Box::from(text));
        self.by_id.push(text);
        self.ids.insert(text, id);
        Ok(id)
    }
}

pub struct StringInterner {
    tables: [RwLock<Table>; Name::NUM_SHARDS],
    entries: AtomicUsize,
}

static GLOBAL: OnceLock<StringInterner> = OnceLock::new();

/// The table behind [`Name::intern`].
pub(crate) fn global() -> &'static StringInterner {
    GLOBAL.get_or_init(StringInterner::new)
}

/// Shard of `text`. The empty string is pinned to shard 0 so that it can
/// occupy [`Name::EMPTY`].
fn shard_of(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let mut hasher = FxHasher::default();
    text.hash(&mut hasher);
    #[allow(
        clippy::cast_possible_truncation,
        reason = "only the low bits select a shard"
    )]
    let bits = hasher.finish() as usize;
    bits % Name::NUM_SHARDS
}

impl StringInterner {
    pub fn new() -> Self {
        let interner = StringInterner {
            tables: std::array::from_fn(|_| RwLock::new(Table::default())),
            entries: AtomicUsize::new(0),
        };
        // Local id 0 of shard 0 is reserved for "".
        let mut first = interner.tables[0].write();
        first.by_id.push("");
        first.ids.insert("", 0);
        drop(first);
        interner.entries.store(1, Ordering::Relaxed);
        interner
    }

    /// Returns the name of `text`, adding it to the table if needed.
    pub fn try_intern(&self, text: &str) -> Result<Name, InternError> {
        let shard = shard_of(text);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "shard < NUM_SHARDS"
        )]
        let make = |id| Name::new(shard as u32, id);

        if let Some(&id) = self.tables[shard].read().ids.get(text) {
            return Ok(make(id));
        }

        let mut table = self.tables[shard].write();
        let before = table.by_id.len();
        let id = table.insert_if_absent(shard, text)?;
        if table.by_id.len() > before {
            self.entries.fetch_add(1, Ordering::Relaxed);
        }
        Ok(make(id))
    }

    /// Like [`try_intern`](Self::try_intern).
    ///
    /// # Panics
    /// When a shard is full; more than 2^28 distinct strings per shard is not
    /// something a compilation session recovers from.
    #[inline]
    pub fn intern(&self, text: &str) -> Name {
        match self.try_intern(text) {
            Ok(name) => name,
            Err(error) => panic!("{error}"),
        }
    }

    pub fn lookup(&self, name: Name) -> &'static str {
        self.tables[name.shard()].read().by_id[name.local()]
    }

    /// Number of distinct strings, counting the reserved empty string.
    pub fn len(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }

    /// True while only the empty string is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        StringInterner::new()
    }
}
