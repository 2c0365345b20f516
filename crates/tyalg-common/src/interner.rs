//! Name interning.
//!
//! Every name a descriptor carries (field names, string literal values,
//! `infer` variable names, type parameter names) is stored once and referred
//! to by an [`Atom`]. Descriptors compare and hash atoms, never strings.
//!
//! Names are spread over a fixed number of shards by hash. An atom packs the
//! shard in its low bits and the slot within that shard above them, so
//! resolving one touches exactly one shard.

use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Handle to an interned name. `Atom::NONE` is the empty string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    pub const NONE: Atom = Atom(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Atom::NONE
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    fn pack(shard: usize, slot: usize) -> Atom {
        assert!(slot <= MAX_SLOT, "interner shard {shard} is full");
        Atom(((slot as u32) << SHARD_BITS) | shard as u32)
    }

    #[inline]
    fn unpack(self) -> (usize, usize) {
        ((self.0 & SHARD_MASK) as usize, (self.0 >> SHARD_BITS) as usize)
    }
}

const SHARD_BITS: u32 = 4;
const SHARD_COUNT: usize = 1 << SHARD_BITS;
const SHARD_MASK: u32 = SHARD_COUNT as u32 - 1;
const MAX_SLOT: usize = (u32::MAX >> SHARD_BITS) as usize;

/// Names most descriptor graphs use, interned up front by the arena.
const COMMON_STRINGS: &[&str] = &[
    "T", "U", "K", "P", "R", "A", "args", "this", "value", "key", "id", "name", "length",
];

/// One shard: the slot of each name, and the names by slot.
#[derive(Default)]
struct NameTable {
    slots: FxHashMap<Arc<str>, Atom>,
    names: Vec<Arc<str>>,
}

impl NameTable {
    fn insert(&mut self, shard: usize, name: &str) -> Atom {
        if let Some(&atom) = self.slots.get(name) {
            return atom;
        }
        let atom = Atom::pack(shard, self.names.len());
        let name: Arc<str> = Arc::from(name);
        self.names.push(Arc::clone(&name));
        self.slots.insert(name, atom);
        atom
    }
}

/// Concurrent name interner shared by every evaluator on an arena.
pub struct ShardedInterner {
    shards: [RwLock<NameTable>; SHARD_COUNT],
}

impl ShardedInterner {
    pub fn new() -> Self {
        let interner = ShardedInterner {
            shards: std::array::from_fn(|_| RwLock::default()),
        };
        // Slot 0 of shard 0 is the empty string, which makes it `Atom::NONE`.
        let atom = interner.write(0).insert(0, "");
        debug_assert_eq!(atom, Atom::NONE);
        interner
    }

    /// The atom for `name`, allocating one the first time it is seen.
    pub fn intern(&self, name: &str) -> Atom {
        if name.is_empty() {
            return Atom::NONE;
        }
        let shard = Self::shard_of(name);
        if let Some(&atom) = self.read(shard).slots.get(name) {
            return atom;
        }
        // Another thread may have inserted between the two locks.
        self.write(shard).insert(shard, name)
    }

    /// The name behind `atom`, or the empty string for an atom this
    /// interner never handed out.
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        self.try_resolve(atom).unwrap_or_else(|| Arc::from(""))
    }

    pub fn try_resolve(&self, atom: Atom) -> Option<Arc<str>> {
        let (shard, slot) = atom.unpack();
        self.read(shard).names.get(slot).cloned()
    }

    /// Number of interned names, counting the empty string.
    pub fn len(&self) -> usize {
        (0..SHARD_COUNT).map(|shard| self.read(shard).names.len()).sum()
    }

    /// True while nothing but the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn intern_common(&self) {
        for name in COMMON_STRINGS {
            self.intern(name);
        }
    }

    fn shard_of(name: &str) -> usize {
        let mut hasher = FxHasher::default();
        name.hash(&mut hasher);
        hasher.finish() as usize & (SHARD_COUNT - 1)
    }

    fn read(&self, shard: usize) -> RwLockReadGuard<'_, NameTable> {
        self.shards[shard]
            .read()
            .expect("interner shard lock poisoned")
    }

    fn write(&self, shard: usize) -> RwLockWriteGuard<'_, NameTable> {
        self.shards[shard]
            .write()
            .expect("interner shard lock poisoned")
    }
}

impl Default for ShardedInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod interner_tests;
