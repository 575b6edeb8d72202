//! Storage nodes: the fact sets and child masks a mask addresses.
//!
//! Three variants share one contract:
//! - `PlainStorage` for agent-private beliefs (no locking),
//! - `SyncStorage`, a cloneable handle whose mutations are individually atomic,
//!   for beliefs shared between agents,
//! - `ImmutableStorage`, a read-only snapshot that rejects every mutation.
//!
//! Multi-element keys are the last functor segment; empty fact sets are pruned,
//! so a key is present exactly when at least one fact is stored under it.
//! Single elements link a child name to the storage of the child mask; which
//! mask nodes stand over that storage is up to each belief base.

use crate::term::Literal;
use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Identity of a storage node. Clones of a `SyncStorage` share one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(u64);

impl StorageId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        StorageId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Creates storages for masks that are created on demand.
pub type StorageFactory = Arc<dyn Fn() -> Box<dyn Storage> + Send + Sync>;

/// Factory producing `PlainStorage`.
pub fn plain_factory() -> StorageFactory {
    Arc::new(|| Box::new(PlainStorage::new()) as Box<dyn Storage>)
}

/// Factory producing independent `SyncStorage`s.
pub fn sync_factory() -> StorageFactory {
    Arc::new(|| Box::new(SyncStorage::new()) as Box<dyn Storage>)
}

pub trait Storage: Send + Sync + fmt::Debug {
    fn id(&self) -> StorageId;

    /// Insert a fact. Returns false when it was already stored.
    fn add_multi(&mut self, key: &str, literal: Literal) -> bool;

    /// Register the storage of a child mask. Returns false when `key` is
    /// taken or the storage refuses children.
    fn add_single(&mut self, key: &str, child: StorageId) -> bool;

    /// Remove the child or the fact set named `key`.
    fn remove(&mut self, key: &str) -> bool;

    fn remove_multi_element(&mut self, key: &str, literal: &Literal) -> bool;

    fn remove_single_element(&mut self, key: &str) -> bool;

    fn contains_multi(&self, key: &str) -> bool;

    fn contains_multi_element(&self, key: &str, literal: &Literal) -> bool;

    fn contains_single(&self, key: &str) -> bool;

    /// Facts stored under `key`.
    fn multi(&self, key: &str) -> Vec<Literal>;

    fn single(&self, key: &str) -> Option<StorageId>;

    /// Number of stored facts over all keys.
    fn size_multi(&self) -> usize;

    fn size_single(&self) -> usize;

    fn size(&self) -> usize {
        self.size_multi() + self.size_single()
    }

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Drop every fact and child. Returns false for read-only storage.
    fn clear(&mut self) -> bool;

    /// All stored facts. One pass only; call again to restart.
    fn iter_multi(&self) -> Box<dyn Iterator<Item = Literal> + '_>;

    /// All children as `(name, storage)`. One pass only.
    fn iter_single(&self) -> Box<dyn Iterator<Item = (Arc<str>, StorageId)> + '_>;

    /// Read-only copy of the current content.
    fn snapshot(&self) -> ImmutableStorage;

    /// A belief base started holding this storage.
    fn mounted(&self) {}

    /// A belief base stopped holding this storage.
    fn unmounted(&self) {}

    /// Number of belief bases holding this storage. Storages that cannot be
    /// shared report 1.
    fn mounts(&self) -> usize {
        1
    }
}

/// Unsynchronized storage for single-owner beliefs.
#[derive(Debug, Clone)]
pub struct PlainStorage {
    id: StorageId,
    multi: HashMap<Arc<str>, HashSet<Literal>>,
    single: HashMap<Arc<str>, StorageId>,
}

impl PlainStorage {
    pub fn new() -> Self {
        Self {
            id: StorageId::next(),
            multi: HashMap::new(),
            single: HashMap::new(),
        }
    }
}

impl Default for PlainStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for PlainStorage {
    fn id(&self) -> StorageId {
        self.id
    }

    fn add_multi(&mut self, key: &str, literal: Literal) -> bool {
        match self.multi.get_mut(key) {
            Some(set) => set.insert(literal),
            None => {
                let mut set = HashSet::new();
                set.insert(literal);
                self.multi.insert(Arc::from(key), set);
                true
            }
        }
    }

    fn add_single(&mut self, key: &str, child: StorageId) -> bool {
        if self.single.contains_key(key) {
            return false;
        }
        self.single.insert(Arc::from(key), child);
        true
    }

    fn remove(&mut self, key: &str) -> bool {
        let single = self.single.remove(key).is_some();
        let multi = self.multi.remove(key).is_some();
        single || multi
    }

    fn remove_multi_element(&mut self, key: &str, literal: &Literal) -> bool {
        let Some(set) = self.multi.get_mut(key) else {
            return false;
        };
        let removed = set.remove(literal);
        if set.is_empty() {
            self.multi.remove(key);
        }
        removed
    }

    fn remove_single_element(&mut self, key: &str) -> bool {
        self.single.remove(key).is_some()
    }

    fn contains_multi(&self, key: &str) -> bool {
        self.multi.contains_key(key)
    }

    fn contains_multi_element(&self, key: &str, literal: &Literal) -> bool {
        self.multi.get(key).map_or(false, |set| set.contains(literal))
    }

    fn contains_single(&self, key: &str) -> bool {
        self.single.contains_key(key)
    }

    fn multi(&self, key: &str) -> Vec<Literal> {
        self.multi
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn single(&self, key: &str) -> Option<StorageId> {
        self.single.get(key).copied()
    }

    fn size_multi(&self) -> usize {
        self.multi.values().map(HashSet::len).sum()
    }

    fn size_single(&self) -> usize {
        self.single.len()
    }

    fn clear(&mut self) -> bool {
        self.multi.clear();
        self.single.clear();
        true
    }

    fn iter_multi(&self) -> Box<dyn Iterator<Item = Literal> + '_> {
        Box::new(self.multi.values().flat_map(|set| set.iter().cloned()))
    }

    fn iter_single(&self) -> Box<dyn Iterator<Item = (Arc<str>, StorageId)> + '_> {
        Box::new(self.single.iter().map(|(k, v)| (Arc::clone(k), *v)))
    }

    fn snapshot(&self) -> ImmutableStorage {
        ImmutableStorage::from_content(self.multi.clone(), self.single.clone())
    }
}

/// Storage whose mutations are individually atomic.
///
/// Cloning the handle shares the content and the id, which is how two belief
/// bases mount the same shared facts. Child storages live in one belief base
/// only, so while more than one base holds the storage it refuses children.
#[derive(Debug, Clone)]
pub struct SyncStorage {
    id: StorageId,
    inner: Arc<RwLock<PlainStorage>>,
    mounts: Arc<AtomicUsize>,
}

impl SyncStorage {
    pub fn new() -> Self {
        let inner = PlainStorage::new();
        Self {
            id: inner.id,
            inner: Arc::new(RwLock::new(inner)),
            mounts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for SyncStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for SyncStorage {
    fn id(&self) -> StorageId {
        self.id
    }

    fn add_multi(&mut self, key: &str, literal: Literal) -> bool {
        self.inner.write().add_multi(key, literal)
    }

    fn add_single(&mut self, key: &str, child: StorageId) -> bool {
        if self.mounts() > 1 {
            return false;
        }
        self.inner.write().add_single(key, child)
    }

    fn remove(&mut self, key: &str) -> bool {
        self.inner.write().remove(key)
    }

    fn remove_multi_element(&mut self, key: &str, literal: &Literal) -> bool {
        self.inner.write().remove_multi_element(key, literal)
    }

    fn remove_single_element(&mut self, key: &str) -> bool {
        self.inner.write().remove_single_element(key)
    }

    fn contains_multi(&self, key: &str) -> bool {
        self.inner.read().contains_multi(key)
    }

    fn contains_multi_element(&self, key: &str, literal: &Literal) -> bool {
        self.inner.read().contains_multi_element(key, literal)
    }

    fn contains_single(&self, key: &str) -> bool {
        self.inner.read().contains_single(key)
    }

    fn multi(&self, key: &str) -> Vec<Literal> {
        self.inner.read().multi(key)
    }

    fn single(&self, key: &str) -> Option<StorageId> {
        self.inner.read().single(key)
    }

    fn size_multi(&self) -> usize {
        self.inner.read().size_multi()
    }

    fn size_single(&self) -> usize {
        self.inner.read().size_single()
    }

    fn clear(&mut self) -> bool {
        self.inner.write().clear()
    }

    // Iterators run over a copy taken under the read lock.
    fn iter_multi(&self) -> Box<dyn Iterator<Item = Literal> + '_> {
        let facts: Vec<Literal> = self.inner.read().iter_multi().collect();
        Box::new(facts.into_iter())
    }

    fn iter_single(&self) -> Box<dyn Iterator<Item = (Arc<str>, StorageId)> + '_> {
        let children: Vec<(Arc<str>, StorageId)> = self.inner.read().iter_single().collect();
        Box::new(children.into_iter())
    }

    fn snapshot(&self) -> ImmutableStorage {
        self.inner.read().snapshot()
    }

    fn mounted(&self) {
        self.mounts.fetch_add(1, Ordering::SeqCst);
    }

    fn unmounted(&self) {
        let _ = self
            .mounts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    fn mounts(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }
}

/// Read-only storage. Every mutation is refused and reports false.
#[derive(Debug, Clone)]
pub struct ImmutableStorage {
    content: PlainStorage,
}

impl ImmutableStorage {
    fn from_content(
        multi: HashMap<Arc<str>, HashSet<Literal>>,
        single: HashMap<Arc<str>, StorageId>,
    ) -> Self {
        Self {
            content: PlainStorage {
                id: StorageId::next(),
                multi,
                single,
            },
        }
    }

    /// An empty read-only storage.
    pub fn empty() -> Self {
        Self::from_content(HashMap::new(), HashMap::new())
    }
}

impl Storage for ImmutableStorage {
    fn id(&self) -> StorageId {
        self.content.id
    }

    fn add_multi(&mut self, _key: &str, _literal: Literal) -> bool {
        false
    }

    fn add_single(&mut self, _key: &str, _child: StorageId) -> bool {
        false
    }

    fn remove(&mut self, _key: &str) -> bool {
        false
    }

    fn remove_multi_element(&mut self, _key: &str, _literal: &Literal) -> bool {
        false
    }

    fn remove_single_element(&mut self, _key: &str) -> bool {
        false
    }

    fn contains_multi(&self, key: &str) -> bool {
        self.content.contains_multi(key)
    }

    fn contains_multi_element(&self, key: &str, literal: &Literal) -> bool {
        self.content.contains_multi_element(key, literal)
    }

    fn contains_single(&self, key: &str) -> bool {
        self.content.contains_single(key)
    }

    fn multi(&self, key: &str) -> Vec<Literal> {
        self.content.multi(key)
    }

    fn single(&self, key: &str) -> Option<StorageId> {
        self.content.single(key)
    }

    fn size_multi(&self) -> usize {
        self.content.size_multi()
    }

    fn size_single(&self) -> usize {
        self.content.size_single()
    }

    fn clear(&mut self) -> bool {
        false
    }

    fn iter_multi(&self) -> Box<dyn Iterator<Item = Literal> + '_> {
        self.content.iter_multi()
    }

    fn iter_single(&self) -> Box<dyn Iterator<Item = (Arc<str>, StorageId)> + '_> {
        self.content.iter_single()
    }

    fn snapshot(&self) -> ImmutableStorage {
        self.content.snapshot()
    }
}

#[cfg(test)]
#[path = "tests/storage.rs"]
mod tests;
