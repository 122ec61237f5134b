//! Keyed object caches.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::observer::Action;

/// An object a cache can hold.
pub trait CacheObject: Clone + PartialEq + Debug {
    /// Identity of the object. Two snapshots with the same key describe the
    /// same kernel object.
    type Key: Ord + Clone + Debug;

    fn key(&self) -> Self::Key;

    /// Whether this object belongs in the cache at all.
    fn is_cacheable(&self) -> bool {
        true
    }
}

/// Mirror of one kind of kernel object, ordered by key.
#[derive(Debug, Clone)]
pub struct ObjectCache<T: CacheObject> {
    entries: BTreeMap<T::Key, T>,
}

impl<T: CacheObject> Default for ObjectCache<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: CacheObject> ObjectCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Replace the contents without reporting anything.
    pub fn fill(&mut self, objects: impl IntoIterator<Item = T>) {
        self.entries = objects
            .into_iter()
            .filter(T::is_cacheable)
            .map(|obj| (obj.key(), obj))
            .collect();
    }

    /// Insert or replace an object.
    ///
    /// Returns `New` for an unknown key, `Change` when the stored object
    /// differs, and nothing when the update is identical.
    pub fn include(&mut self, obj: T) -> Option<(Action, T)> {
        if !obj.is_cacheable() {
            return None;
        }
        match self.entries.insert(obj.key(), obj.clone()) {
            None => Some((Action::New, obj)),
            Some(old) if old == obj => None,
            Some(_) => Some((Action::Change, obj)),
        }
    }

    /// Drop the object with the same key, returning what was stored.
    pub fn remove(&mut self, obj: &T) -> Option<(Action, T)> {
        if !obj.is_cacheable() {
            return None;
        }
        self.entries
            .remove(&obj.key())
            .map(|old| (Action::Del, old))
    }

    /// Replace the contents with a fresh dump and report the difference.
    ///
    /// Removals come first, then additions and changes, each in key order.
    pub fn resync(&mut self, fresh: impl IntoIterator<Item = T>) -> Vec<(Action, T)> {
        let mut next = ObjectCache::new();
        next.fill(fresh);

        let mut changes: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| !next.entries.contains_key(*key))
            .map(|(_, old)| (Action::Del, old.clone()))
            .collect();
        for (key, obj) in &next.entries {
            match self.entries.get(key) {
                None => changes.push((Action::New, obj.clone())),
                Some(old) if old != obj => changes.push((Action::Change, obj.clone())),
                Some(_) => {}
            }
        }

        *self = next;
        changes
    }
}
