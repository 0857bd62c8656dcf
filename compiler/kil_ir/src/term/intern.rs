//! Process-wide table of canonical constant-like terms.
//!
//! Sharded like the string interner: a read lock on the fast path, then a
//! write lock with a double check before inserting.

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use super::{Application, Label, Sequence, Term, TermKind, Token};
use crate::{Name, Sort};

const NUM_SHARDS: usize = 16;

/// Payload identifying an interned term.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum InternKey {
    Token { sort: Sort, value: Name },
    /// Nullary application.
    Constant { label: Name, sort: Sort },
    LabelInjection(Name),
    Hole,
    EmptySequence,
}

impl InternKey {
    fn to_kind(&self) -> TermKind {
        match *self {
            InternKey::Token { sort, value } => TermKind::Token(Token { sort, value }),
            InternKey::Constant { label, sort } => TermKind::Application(Application {
                label: Label::Constant(label),
                args: Vec::new(),
                sort,
            }),
            InternKey::LabelInjection(label) => TermKind::LabelInjection(label),
            InternKey::Hole => TermKind::Hole,
            InternKey::EmptySequence => TermKind::Sequence(Sequence {
                items: Vec::new(),
                frame: None,
            }),
        }
    }
}

struct TermInterner {
    shards: [RwLock<FxHashMap<InternKey, Term>>; NUM_SHARDS],
}

static TERMS: OnceLock<TermInterner> = OnceLock::new();

fn shard_for(key: &InternKey) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    #[allow(
        clippy::cast_possible_truncation,
        reason = "reduced modulo NUM_SHARDS first"
    )]
    let shard = (hasher.finish() % NUM_SHARDS as u64) as usize;
    shard
}

/// Canonical term for `key`; repeated calls return the identical node.
pub fn intern(key: InternKey) -> Term {
    let table = TERMS.get_or_init(|| TermInterner {
        shards: std::array::from_fn(|_| RwLock::new(FxHashMap::default())),
    });
    let shard = &table.shards[shard_for(&key)];

    if let Some(term) = shard.read().get(&key) {
        return term.clone();
    }

    let mut guard = shard.write();
    guard
        .entry(key)
        .or_insert_with_key(|key| Term::new_interned(key.to_kind()))
        .clone()
}
