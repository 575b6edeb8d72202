//! The mask tree: a path-addressable hierarchy of storage nodes.
//!
//! A `BeliefBase` is an arena. It owns every storage it holds and one node per
//! mask. Storages link child names to child storages; nodes mirror those links
//! as a tree, so a storage mounted in two places stands under two nodes, each
//! with its own parent and path. Cycle checks follow storage links, and no
//! node ever holds a reference to another.
//!
//! Paths are relative to the mask they start from. The `..` segment moves to
//! the parent; every other segment names a child. Fully qualified paths leave
//! out the name of the tree root.

use crate::error::{Error, Result};
use crate::path::{Path, DEFAULT_SEPARATOR, PARENT};
use crate::storage::{plain_factory, PlainStorage, Storage, StorageFactory, StorageId};
use crate::term::Literal;
use crate::trace::{debug, trace, warn};
use hashbrown::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Handle of a mask inside its belief base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaskId(u32);

impl MaskId {
    pub fn raw(self) -> u32 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u32) -> Self {
        MaskId(raw)
    }
}

#[derive(Debug)]
struct MaskNode {
    name: Arc<str>,
    parent: Option<MaskId>,
    storage: StorageId,
    children: HashMap<Arc<str>, MaskId>,
}

/// A held storage and the number of nodes standing over it.
#[derive(Debug)]
struct Slot {
    storage: Box<dyn Storage>,
    masks: usize,
}

/// Owner of a tree of masks and their storages.
pub struct BeliefBase {
    masks: HashMap<MaskId, MaskNode>,
    storages: HashMap<StorageId, Slot>,
    root: MaskId,
    next_mask: u32,
    separator: char,
    factory: StorageFactory,
}

impl BeliefBase {
    /// Belief base whose root and auto-created masks use `PlainStorage`.
    pub fn new(name: &str) -> Result<Self> {
        Self::with_storage(name, Box::new(PlainStorage::new()), plain_factory())
    }

    /// Belief base with an explicit root storage and factory for masks created
    /// on demand by `add_literal`/`attach`.
    ///
    /// The root storage must not link to child storages yet.
    pub fn with_storage(
        name: &str,
        storage: Box<dyn Storage>,
        factory: StorageFactory,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::EmptyMaskName);
        }
        if storage.size_single() > 0 {
            return Err(Error::SharedChildren(Path::empty()));
        }
        let root = MaskId(0);
        let storage_id = storage.id();
        let mut masks = HashMap::new();
        masks.insert(
            root,
            MaskNode {
                name: Arc::from(name),
                parent: None,
                storage: storage_id,
                children: HashMap::new(),
            },
        );
        storage.mounted();
        let mut storages = HashMap::new();
        storages.insert(storage_id, Slot { storage, masks: 1 });
        Ok(Self {
            masks,
            storages,
            root,
            next_mask: 1,
            separator: DEFAULT_SEPARATOR,
            factory,
        })
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn root(&self) -> MaskId {
        self.root
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Parse `text` with this base's separator.
    pub fn path(&self, text: &str) -> Path {
        Path::parse_with(text, self.separator)
    }

    /// Number of live masks, the root included.
    pub fn mask_count(&self) -> usize {
        self.masks.len()
    }

    /// Number of storages held, shared ones counted once.
    pub fn storage_count(&self) -> usize {
        self.storages.len()
    }

    pub fn mask(&self, id: MaskId) -> Result<Mask<'_>> {
        self.node(id)?;
        Ok(Mask { base: self, id })
    }

    pub fn name(&self, id: MaskId) -> Result<&str> {
        Ok(&self.node(id)?.name)
    }

    pub fn parent(&self, id: MaskId) -> Result<Option<MaskId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn storage(&self, id: MaskId) -> Result<&dyn Storage> {
        let storage = self.node(id)?.storage;
        self.storages
            .get(&storage)
            .map(|slot| &*slot.storage)
            .ok_or(Error::UnknownMask(id))
    }

    fn storage_mut(&mut self, id: MaskId) -> Result<&mut Box<dyn Storage>> {
        let storage = self.node(id)?.storage;
        self.storages
            .get_mut(&storage)
            .map(|slot| &mut slot.storage)
            .ok_or(Error::UnknownMask(id))
    }

    fn node(&self, id: MaskId) -> Result<&MaskNode> {
        self.masks.get(&id).ok_or(Error::UnknownMask(id))
    }

    /// Every node standing over `storage`.
    fn nodes_over(&self, storage: StorageId) -> Vec<MaskId> {
        self.masks
            .iter()
            .filter(|(_, node)| node.storage == storage)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Create a child mask named `name` under `parent`, backed by `storage`.
    ///
    /// Passing a clone of a `SyncStorage` that is already mounted in this base
    /// shares it. The name must be free and the storage must not lead back to
    /// `parent` or one of its ancestors. A storage new to this base may only
    /// link to child storages this base already holds.
    pub fn create_mask(
        &mut self,
        parent: MaskId,
        name: &str,
        storage: Box<dyn Storage>,
    ) -> Result<MaskId> {
        if name.is_empty() {
            return Err(Error::EmptyMaskName);
        }
        let storage_id = storage.id();
        self.check_attach(parent, name, storage_id, Some(&*storage))?;
        let adopt = !self.storages.contains_key(&storage_id);
        if adopt
            && storage
                .iter_single()
                .any(|(_, child)| !self.storages.contains_key(&child))
        {
            return Err(Error::SharedChildren(self.fqn_path(parent)?.join(name)));
        }
        self.link(parent, Arc::from(name), storage_id, adopt.then_some(storage))
    }

    /// Navigate `path` from `from`.
    ///
    /// Missing children are created with `factory` when one is given;
    /// otherwise a missing segment fails with `PathNotFound`. Moving above the
    /// root fails with `NoParent`. An empty path yields `from`.
    pub fn resolve(
        &mut self,
        from: MaskId,
        path: &Path,
        factory: Option<&StorageFactory>,
    ) -> Result<MaskId> {
        let mut current = from;
        for segment in path.segments() {
            current = match self.step(current, segment)? {
                Some(next) => next,
                None => match factory {
                    Some(factory) => {
                        let storage = factory();
                        self.create_mask(current, segment, storage)?
                    }
                    None => return Err(self.not_found(current, segment)),
                },
            };
        }
        Ok(current)
    }

    /// Navigate `path` without creating anything.
    pub fn find(&self, from: MaskId, path: &Path) -> Result<MaskId> {
        let mut current = from;
        for segment in path.segments() {
            current = match self.step(current, segment)? {
                Some(next) => next,
                None => return Err(self.not_found(current, segment)),
            };
        }
        Ok(current)
    }

    fn step(&self, current: MaskId, segment: &str) -> Result<Option<MaskId>> {
        let node = self.node(current)?;
        if segment == PARENT {
            return match node.parent {
                Some(parent) => Ok(Some(parent)),
                None => Err(Error::NoParent(self.fqn_path(current)?)),
            };
        }
        Ok(node.children.get(segment).copied())
    }

    fn not_found(&self, at: MaskId, segment: &str) -> Error {
        Error::PathNotFound {
            path: self.fqn_path(at).unwrap_or_default(),
            segment: segment.to_string(),
        }
    }

    /// Store `literal` under its functor, relative to `at`.
    ///
    /// All functor segments but the last are mask names and are created when
    /// missing. The fact is stored with the last segment as its functor.
    pub fn add_literal(&mut self, at: MaskId, literal: &Literal) -> Result<bool> {
        let key = literal.functor().last_shared().cloned().ok_or(Error::EmptyFunctor)?;
        let factory = Arc::clone(&self.factory);
        let target = self.resolve(at, &literal.functor().parent(), Some(&factory))?;
        let local = literal.with_functor(Path::from_segments([key.as_ref()]));
        Ok(self.storage_mut(target)?.add_multi(&key, local))
    }

    /// Store `literal` below the mask at `path`, creating masks as needed.
    pub fn add_literal_at(&mut self, at: MaskId, path: &Path, literal: &Literal) -> Result<bool> {
        let factory = Arc::clone(&self.factory);
        let target = self.resolve(at, path, Some(&factory))?;
        self.add_literal(target, literal)
    }

    /// Remove a stored fact addressed by its functor, relative to `at`.
    pub fn remove_literal(&mut self, at: MaskId, literal: &Literal) -> Result<bool> {
        let key = literal.functor().last_shared().cloned().ok_or(Error::EmptyFunctor)?;
        let target = self.find(at, &literal.functor().parent())?;
        let local = literal.with_functor(Path::from_segments([key.as_ref()]));
        Ok(self.storage_mut(target)?.remove_multi_element(&key, &local))
    }

    /// Facts stored under the functor path `functor`, re-prefixed with it.
    pub fn literals_at(&self, at: MaskId, functor: &Path) -> Result<Vec<Literal>> {
        let key = functor.last().ok_or(Error::EmptyFunctor)?;
        let target = self.find(at, &functor.parent())?;
        let prefix = functor.parent();
        Ok(self
            .storage(target)?
            .multi(key)
            .into_iter()
            .map(|l| l.with_prefix(&prefix))
            .collect())
    }

    /// True when exactly `literal` is stored, addressed by its functor.
    pub fn contains_fact(&self, at: MaskId, literal: &Literal) -> bool {
        let Some(key) = literal.functor().last() else {
            return false;
        };
        let Ok(target) = self.find(at, &literal.functor().parent()) else {
            return false;
        };
        let local = literal.with_functor(Path::from_segments([key]));
        self.storage(target)
            .map(|s| s.contains_multi_element(key, &local))
            .unwrap_or(false)
    }

    /// Mount `mask` under the mask reached by `path` from `at`.
    ///
    /// The new mask keeps the source's name and shares its storage, so both
    /// see the same facts and children. Fails with `StorageCycle` when the
    /// storage leads back to the target or one of its ancestors, and with
    /// `AlreadyExists` when the target has a child of that name. Nothing
    /// changes on failure, except for masks on `path` that had to be created.
    pub fn attach(&mut self, at: MaskId, path: &Path, mask: MaskId) -> Result<MaskId> {
        let (name, storage) = {
            let source = self.node(mask)?;
            (Arc::clone(&source.name), source.storage)
        };
        let factory = Arc::clone(&self.factory);
        let target = self.resolve(at, path, Some(&factory))?;
        self.check_attach(target, &name, storage, None)?;
        self.link(target, name, storage, None)
    }

    /// Storages reachable from `storage` through child links, itself
    /// included. `incoming` supplies the content of a storage not held yet.
    fn reachable(&self, storage: StorageId, incoming: Option<&dyn Storage>) -> HashSet<StorageId> {
        let mut seen = HashSet::new();
        let mut pending = vec![storage];
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let children: Vec<StorageId> = match (self.storages.get(&id), incoming) {
                (Some(slot), _) => slot.storage.iter_single().map(|(_, child)| child).collect(),
                (None, Some(content)) if id == storage => {
                    content.iter_single().map(|(_, child)| child).collect()
                }
                (None, _) => Vec::new(),
            };
            pending.extend(children);
        }
        seen
    }

    fn check_attach(
        &self,
        parent: MaskId,
        name: &str,
        storage: StorageId,
        incoming: Option<&dyn Storage>,
    ) -> Result<()> {
        let below = self.reachable(storage, incoming);
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            let node = self.node(id)?;
            if below.contains(&node.storage) {
                let mask = self.fqn_path(parent)?.join(name);
                warn!(mask = %mask, "rejected attach: storage cycle");
                return Err(Error::StorageCycle { mask });
            }
            cursor = node.parent;
        }
        if self.storage(parent)?.contains_single(name) {
            return Err(Error::AlreadyExists(self.fqn_path(parent)?.join(name)));
        }
        Ok(())
    }

    /// Link `storage` as child `name` of `parent`'s storage and grow a node
    /// for it under every node over that storage. Returns the one under
    /// `parent`.
    fn link(
        &mut self,
        parent: MaskId,
        name: Arc<str>,
        storage: StorageId,
        adopt: Option<Box<dyn Storage>>,
    ) -> Result<MaskId> {
        let parent_storage = self.node(parent)?.storage;
        let target = self.storage_mut(parent)?;
        if !target.add_single(&name, storage) {
            let shared = target.mounts() > 1;
            let mask = self.fqn_path(parent)?.join(&*name);
            // Read-only parents refuse children too.
            return Err(if shared {
                Error::SharedChildren(mask)
            } else {
                Error::AlreadyExists(mask)
            });
        }
        if let Some(adopted) = adopt {
            adopted.mounted();
            self.storages.insert(storage, Slot { storage: adopted, masks: 0 });
        }
        let created = self.grow(parent, Arc::clone(&name), storage);
        for owner in self.nodes_over(parent_storage) {
            if owner != parent {
                self.grow(owner, Arc::clone(&name), storage);
            }
        }
        Ok(created)
    }

    /// Add a node for `storage` under `parent`, then nodes for everything
    /// below it.
    fn grow(&mut self, parent: MaskId, name: Arc<str>, storage: StorageId) -> MaskId {
        let top = self.add_node(parent, name, storage);
        let mut pending = vec![top];
        while let Some(id) = pending.pop() {
            let Some(storage) = self.masks.get(&id).map(|node| node.storage) else {
                continue;
            };
            let children: Vec<(Arc<str>, StorageId)> = match self.storages.get(&storage) {
                Some(slot) => slot
                    .storage
                    .iter_single()
                    .filter(|(_, child)| self.storages.contains_key(child))
                    .collect(),
                None => Vec::new(),
            };
            for (name, child) in children {
                pending.push(self.add_node(id, name, child));
            }
        }
        top
    }

    fn add_node(&mut self, parent: MaskId, name: Arc<str>, storage: StorageId) -> MaskId {
        let id = MaskId(self.next_mask);
        self.next_mask += 1;
        if let Some(slot) = self.storages.get_mut(&storage) {
            slot.masks += 1;
        }
        if let Some(node) = self.masks.get_mut(&parent) {
            node.children.insert(Arc::clone(&name), id);
        }
        debug!(mask = %name, id = id.0, "mask created");
        self.masks.insert(
            id,
            MaskNode {
                name,
                parent: Some(parent),
                storage,
                children: HashMap::new(),
            },
        );
        id
    }

    /// Remove the child mask at `path` (relative to `at`).
    ///
    /// The child disappears from every mask sharing the parent's storage.
    /// Storages no mask stands over any more are released. Returns false when
    /// the last segment names no child.
    pub fn remove_mask(&mut self, at: MaskId, path: &Path) -> Result<bool> {
        let Some(name) = path.last() else {
            return Ok(false);
        };
        let parent = self.find(at, &path.parent())?;
        if !self.storage_mut(parent)?.remove_single_element(name) {
            return Ok(false);
        }
        let storage = self.node(parent)?.storage;
        self.prune(storage, Some(name));
        Ok(true)
    }

    /// Drop every fact and child of `at`.
    pub fn clear(&mut self, at: MaskId) -> Result<()> {
        if self.storage_mut(at)?.clear() {
            let storage = self.node(at)?.storage;
            self.prune(storage, None);
        }
        Ok(())
    }

    /// Release the child nodes named `name` (all children for `None`) of
    /// every node over `storage`.
    fn prune(&mut self, storage: StorageId, name: Option<&str>) {
        let mut released = Vec::new();
        for node in self.masks.values_mut().filter(|node| node.storage == storage) {
            match name {
                Some(name) => released.extend(node.children.remove(name)),
                None => released.extend(node.children.drain().map(|(_, child)| child)),
            }
        }
        for id in released {
            self.release(id);
        }
    }

    fn release(&mut self, mask: MaskId) {
        let mut pending = vec![mask];
        while let Some(id) = pending.pop() {
            let Some(node) = self.masks.remove(&id) else {
                continue;
            };
            trace!(mask = %node.name, "mask released");
            pending.extend(node.children.into_values());
            let Some(slot) = self.storages.get_mut(&node.storage) else {
                continue;
            };
            slot.masks = slot.masks.saturating_sub(1);
            if slot.masks == 0 {
                if let Some(slot) = self.storages.remove(&node.storage) {
                    slot.storage.unmounted();
                }
            }
        }
    }

    /// Fact lookup by path: one segment checks the facts of `at`, longer paths
    /// descend one mask and recurse. The empty path is vacuously contained.
    pub fn contains_literal(&self, at: MaskId, path: &Path) -> bool {
        self.contains_with(at, path, |base, at, key| {
            base.storage(at).map_or(false, |storage| storage.contains_multi(key))
        })
    }

    /// Like `contains_literal`, but for child masks.
    pub fn contains_mask(&self, at: MaskId, path: &Path) -> bool {
        self.contains_with(at, path, |base, at, key| {
            base.node(at).map_or(false, |node| node.children.contains_key(key))
        })
    }

    fn contains_with(
        &self,
        at: MaskId,
        path: &Path,
        check: fn(&BeliefBase, MaskId, &str) -> bool,
    ) -> bool {
        match path.len() {
            0 => true,
            1 => match path.first() {
                Some(key) => key != PARENT && check(self, at, key),
                None => false,
            },
            _ => match path.first().map(|segment| self.step(at, segment)) {
                Some(Ok(Some(next))) => self.contains_with(next, &path.tail(), check),
                _ => false,
            },
        }
    }

    /// Path from the root to `id`, root name excluded.
    pub fn fqn_path(&self, id: MaskId) -> Result<Path> {
        let mut names = Vec::new();
        let mut cursor = self.node(id)?;
        while let Some(parent) = cursor.parent {
            names.push(Arc::clone(&cursor.name));
            cursor = self.node(parent)?;
        }
        let mut path = Path::empty();
        for name in names.into_iter().rev() {
            path.push_shared(name);
        }
        Ok(path)
    }

    /// Prefix used for facts yielded by iteration started at `id`.
    fn iteration_prefix(&self, id: MaskId) -> Result<Path> {
        let node = self.node(id)?;
        Ok(match node.parent {
            Some(_) => Path::from_segments([node.name.as_ref()]),
            None => Path::empty(),
        })
    }

    /// Lazy depth-first walk over the facts of `id` and all its descendants.
    ///
    /// Each fact is re-prefixed with its mask path relative to `id`, starting
    /// with `id`'s own name (left out when `id` is the root).
    pub fn iter_literals(&self, id: MaskId) -> Result<LiteralIter<'_>> {
        let prefix = self.iteration_prefix(id)?;
        Ok(LiteralIter {
            base: self,
            frontier: vec![(prefix, id)],
            current: None,
        })
    }

    /// Lazy depth-first walk over all descendant masks of `id`, with their
    /// paths relative to `id` (named as in `iter_literals`).
    pub fn iter_masks(&self, id: MaskId) -> Result<MaskIter<'_>> {
        let prefix = self.iteration_prefix(id)?;
        Ok(MaskIter {
            base: self,
            frontier: vec![(prefix, id)],
            current: None,
        })
    }

    /// Every fact of the subtree, grouped by full functor path.
    pub fn literals(&self, id: MaskId) -> Result<HashMap<Path, HashSet<Literal>>> {
        let mut grouped: HashMap<Path, HashSet<Literal>> = HashMap::new();
        for literal in self.iter_literals(id)? {
            grouped
                .entry(literal.functor().clone())
                .or_default()
                .insert(literal);
        }
        Ok(grouped)
    }

    /// Every descendant mask, keyed by path.
    pub fn masks(&self, id: MaskId) -> Result<HashMap<Path, MaskId>> {
        Ok(self.iter_masks(id)?.collect())
    }

    /// Number of facts in the subtree of `id`.
    pub fn fact_count(&self, id: MaskId) -> Result<usize> {
        Ok(self.iter_literals(id)?.count())
    }
}

impl fmt::Debug for BeliefBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeliefBase")
            .field("root", &self.root)
            .field("masks", &self.masks.len())
            .field("storages", &self.storages.len())
            .field("separator", &self.separator)
            .finish()
    }
}

impl Drop for BeliefBase {
    fn drop(&mut self) {
        for slot in self.storages.values() {
            slot.storage.unmounted();
        }
    }
}

/// Read-only view of one mask.
#[derive(Clone, Copy)]
pub struct Mask<'a> {
    base: &'a BeliefBase,
    id: MaskId,
}

impl<'a> Mask<'a> {
    pub fn id(&self) -> MaskId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.base.name(self.id).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Mask<'a>> {
        let parent = self.base.parent(self.id).ok().flatten()?;
        Some(Mask {
            base: self.base,
            id: parent,
        })
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    pub fn fqn_path(&self) -> Path {
        self.base.fqn_path(self.id).unwrap_or_default()
    }

    pub fn storage(&self) -> Option<&'a dyn Storage> {
        self.base.storage(self.id).ok()
    }

    pub fn contains_literal(&self, path: &str) -> bool {
        self.base.contains_literal(self.id, &self.base.path(path))
    }

    pub fn contains_mask(&self, path: &str) -> bool {
        self.base.contains_mask(self.id, &self.base.path(path))
    }

    pub fn child(&self, path: &str) -> Result<Mask<'a>> {
        let id = self.base.find(self.id, &self.base.path(path))?;
        Ok(Mask { base: self.base, id })
    }

    pub fn literals(&self) -> LiteralIter<'a> {
        LiteralIter {
            base: self.base,
            frontier: vec![(self.base.iteration_prefix(self.id).unwrap_or_default(), self.id)],
            current: None,
        }
    }
}

impl fmt::Debug for Mask<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mask")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

/// Depth-first fact iterator with an explicit frontier.
pub struct LiteralIter<'a> {
    base: &'a BeliefBase,
    frontier: Vec<(Path, MaskId)>,
    current: Option<(Path, Box<dyn Iterator<Item = Literal> + 'a>)>,
}

impl<'a> Iterator for LiteralIter<'a> {
    type Item = Literal;

    fn next(&mut self) -> Option<Literal> {
        loop {
            if let Some((prefix, facts)) = &mut self.current {
                if let Some(literal) = facts.next() {
                    return Some(literal.with_prefix(prefix));
                }
                self.current = None;
            }
            let base = self.base;
            let (prefix, id) = self.frontier.pop()?;
            let (Ok(node), Ok(storage)) = (base.node(id), base.storage(id)) else {
                continue;
            };
            for (name, child) in node.children.iter() {
                let mut child_prefix = prefix.clone();
                child_prefix.push_shared(Arc::clone(name));
                self.frontier.push((child_prefix, *child));
            }
            self.current = Some((prefix, storage.iter_multi()));
        }
    }
}

/// Depth-first mask iterator with an explicit frontier.
pub struct MaskIter<'a> {
    base: &'a BeliefBase,
    frontier: Vec<(Path, MaskId)>,
    current: Option<Box<dyn Iterator<Item = (Path, MaskId)> + 'a>>,
}

impl<'a> Iterator for MaskIter<'a> {
    type Item = (Path, MaskId);

    fn next(&mut self) -> Option<(Path, MaskId)> {
        loop {
            if let Some(children) = &mut self.current {
                if let Some((path, id)) = children.next() {
                    self.frontier.push((path.clone(), id));
                    return Some((path, id));
                }
                self.current = None;
            }
            let base = self.base;
            let (prefix, id) = self.frontier.pop()?;
            let Ok(node) = base.node(id) else {
                continue;
            };
            self.current = Some(Box::new(node.children.iter().map(move |(name, child)| {
                let mut path = prefix.clone();
                path.push_shared(Arc::clone(name));
                (path, *child)
            })));
        }
    }
}

#[cfg(test)]
#[path = "tests/mask.rs"]
mod tests;
